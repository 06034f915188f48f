//! Wire format: length-prefixed JSON envelopes.
//!
//! ```text
//! request:  <decimal-length>\n<payload-bytes>
//! response: <decimal-length>\n<payload-bytes>
//! ```

pub mod codec;
pub mod request;
pub mod response;

pub use codec::{Decoded, FrameDecoder, encode_frame};
pub use request::Request;
pub use response::Response;
