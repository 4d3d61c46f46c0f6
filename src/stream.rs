//! Channels carved out of the response stream
//!
//! Every payload in a response gets its own channel. The writer half stays
//! on the [`StreamStack`] while the payload is being received; the reader
//! half goes to whoever consumes the payload.

mod channel;
mod stack;

#[cfg(test)]
mod proptests;

pub use channel::{channel, ChannelReader};
pub use stack::{Dispatch, StreamStack};
