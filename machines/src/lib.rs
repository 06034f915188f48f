pub mod cpu;
pub mod headless;
pub mod media;
pub mod registry;
pub mod snapshot;
pub mod video;

pub use headless::HeadlessMachine;
