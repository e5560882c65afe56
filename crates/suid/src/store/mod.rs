mod pool;
mod storage;

pub(crate) use pool::*;
pub use storage::*;
