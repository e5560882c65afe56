mod backoff;
mod client;
#[cfg(feature = "http")]
mod http;
mod transport;

pub(crate) use backoff::*;
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
#[cfg(feature = "http")]
pub use http::*;
pub use transport::*;
