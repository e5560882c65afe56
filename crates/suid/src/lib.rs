//! Short, service-unique identifiers allocated from server-granted blocks.
//!
//! A remote allocation service hands out [`Block`]s: each is the first of
//! [`IDSIZE`] identifiers spaced [`SHARDSIZE`] apart. An [`Allocator`] keeps a
//! small persisted pool of blocks, issues identifiers from the oldest one by
//! bumping a local counter, and tops the pool up in the background with
//! adaptive retry when the service is struggling.
//!
//! Identifiers are plain integers up to [`MAX_SAFE`] rendered as lowercase
//! base-36 (see [`codec`]).

mod allocator;
pub mod codec;
mod config;
mod error;
mod id;
mod replenish;
mod runtime;
#[cfg(feature = "serde")]
mod serde;
mod store;
mod time;

pub use crate::allocator::*;
pub use crate::codec::{EncodingError, Format};
pub use crate::config::*;
pub use crate::error::*;
pub use crate::id::*;
pub use crate::replenish::*;
pub use crate::runtime::*;
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
#[cfg(feature = "serde")]
pub use crate::serde::*;
pub use crate::store::*;
pub use crate::time::*;
