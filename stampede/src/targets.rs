//! Ready-made [`Target`](crate::Target) implementations.
#[cfg(feature = "http")]
mod shortener;

#[cfg(feature = "http")]
pub use shortener::{Session, ShortenerTarget};
