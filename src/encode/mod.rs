//! Encoding values into the bsencode grammar.
//!
//! Encoding is deterministic: the same logical value always produces
//! identical bytes. The usual entry points are
//! [`Value::to_vec`][crate::Value::to_vec] for an in-memory buffer and
//! [`Value::write_encoded`][crate::Value::write_encoded] for writing to
//! a [`Target`].

pub use self::target::{infallible, IoTarget, Target};
pub(crate) use self::values::Frame;

mod target;
mod values;
