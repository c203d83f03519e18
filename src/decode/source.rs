//! The decoder's view of the input data.
//!
//! This is a private module. Its public content is being re-exported by the
//! parent module.

use std::{fmt, ops};
use super::error::{ContentError, DecodeError};


//------------ SliceSource ---------------------------------------------------

/// A forward-only cursor over a byte slice.
///
/// The grammar requires the complete input to be available before
/// decoding starts, so the source is simply a slice with the current
/// read position threaded through the parsing functions. The position
/// only ever advances.
#[derive(Clone, Copy, Debug)]
pub struct SliceSource<'s> {
    data: &'s [u8],
    pos: usize,
}

impl<'s> SliceSource<'s> {
    /// Creates a new source for the given data.
    pub fn new(data: &'s [u8]) -> Self {
        SliceSource { data, pos: 0 }
    }

    /// Returns the current position.
    pub fn pos(&self) -> Pos {
        self.pos.into()
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Advances the position by `by` bytes.
    ///
    /// The caller must have established through [`peek`][Self::peek] or
    /// [`take_slice`][Self::take_slice] that this many bytes are present.
    pub fn advance(&mut self, by: usize) {
        debug_assert!(by <= self.data.len() - self.pos);
        self.pos += by;
    }

    /// Takes the next `len` bytes from the source.
    ///
    /// Returns `None` without consuming anything if fewer bytes are left.
    pub fn take_slice(&mut self, len: usize) -> Option<&'s [u8]> {
        let end = self.pos.checked_add(len)?;
        let res = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(res)
    }

    /// Takes the longest prefix of bytes for which `test` returns true.
    pub fn take_while(
        &mut self, mut test: impl FnMut(u8) -> bool
    ) -> &'s [u8] {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if !test(byte) {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Returns a content error at the current position of the source.
    pub fn content_err(&self, err: impl Into<ContentError>) -> DecodeError {
        DecodeError::content(err, self.pos())
    }
}


//------------ Pos -----------------------------------------------------------

/// The logical position within the input data.
///
/// Values of this type can only be used for diagnostics. This is why we
/// use a newtype.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Pos(usize);

impl Pos {
    /// Returns the position as a plain byte offset.
    pub fn to_usize(self) -> usize {
        self.0
    }
}

impl From<usize> for Pos {
    fn from(pos: usize) -> Pos {
        Pos(pos)
    }
}

impl ops::Add for Pos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Pos(self.0 + rhs.0)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
