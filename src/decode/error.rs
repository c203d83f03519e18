//! Decoding errors.
//!
//! This is a private module. Its public content is being re-exported by the
//! parent module.

use std::{error, fmt};
use std::borrow::Cow;
use super::source::Pos;


//------------ ContentError --------------------------------------------------

/// Data did not conform to the bsencode grammar.
///
/// The error only carries a human-readable message describing the
/// problem. A [`DecodeError`] combines it with the position at which the
/// problem was encountered.
#[derive(Clone, Debug)]
pub struct ContentError(Cow<'static, str>);

impl From<&'static str> for ContentError {
    fn from(msg: &'static str) -> Self {
        ContentError(Cow::Borrowed(msg))
    }
}

impl From<String> for ContentError {
    fn from(msg: String) -> Self {
        ContentError(Cow::Owned(msg))
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl error::Error for ContentError { }


//------------ DecodeError ---------------------------------------------------

/// An error happened while decoding data.
///
/// The error carries a content error along with the position in the
/// input data at which the error was detected. For errors in the interior
/// of a list, the position refers to the offending element rather than
/// the start of the list.
#[derive(Clone, Debug)]
pub struct DecodeError {
    error: ContentError,
    pos: Pos,
}

impl DecodeError {
    /// Creates a decode error from a content error and a position.
    pub fn content(error: impl Into<ContentError>, pos: Pos) -> Self {
        DecodeError { error: error.into(), pos }
    }

    /// Returns the position at which the error was detected.
    pub fn pos(&self) -> Pos {
        self.pos
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at position {})", self.error, self.pos)
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.error)
    }
}
