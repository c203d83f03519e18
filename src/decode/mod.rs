//! Decoding the bsencode grammar.
//!
//! The usual entry point is [`Value::decode`][crate::Value::decode] which
//! simply forwards to [`decode_slice`]. The remaining items of this
//! module appear in error reporting: all decoding failures are a
//! [`DecodeError`] carrying a message and the byte position at which the
//! problem was detected.

pub use self::error::{ContentError, DecodeError};
pub use self::source::{Pos, SliceSource};
pub use self::tree::decode_slice;

mod error;
mod source;
mod tree;
