//! Wire protocol for the assistant service
//!
//! The response body is a text stream of records separated by `\0`. Every
//! record after a separator starts with a one-character tag naming the
//! payload that follows; the first record of the body (and any data that
//! arrives before the next separator) continues whatever channel is open.

mod frame;
mod types;

#[cfg(test)]
mod proptests;

pub use frame::{FrameScanner, Record, Utf8Decoder};
pub use types::*;
