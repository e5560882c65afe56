mod base36;
mod error;
mod format;
mod legacy;

pub use base36::{decode, encode, looks_valid};
pub use error::*;
pub use format::*;
pub use legacy::{decode_legacy, looks_valid_legacy};
