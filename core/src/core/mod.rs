pub mod machine;

pub use machine::{
    AnticRegisters, CpuRegisters, DriveStatus, GtiaRegisters, Machine, PiaRegisters,
    PokeyRegisters,
};
