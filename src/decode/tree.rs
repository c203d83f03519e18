//! Parsing the bsencode grammar.
//!
//! Decoding happens in two stages. The first parses the raw grammar of
//! lists, byte strings, and symbols into a [`Node`] tree, remembering
//! the position of every list element for error reporting. The second
//! stage, inflation, interprets extended types: a list whose first raw
//! element is one of the tag symbols `bin`, `date`, `dict`, `float`, or
//! `regex` must match that tag's shape exactly, everything else becomes
//! a plain value. A shape mismatch is an error, never a silent fallback.
//!
//! This is a private module. Its public content is being re-exported by the
//! parent module.

use std::str;
use bytes::Bytes;
use chrono::{NaiveDateTime, TimeZone, Utc};
use crate::value::{Dict, Int, Regex, RegexFlags, Value};
use super::error::DecodeError;
use super::source::{Pos, SliceSource};

const EOF: &str = "reached end of file while parsing";

/// The maximum list nesting depth.
///
/// Parsing and inflation recurse once per level, so unbounded nesting
/// would overflow the stack on hostile input.
const MAX_DEPTH: usize = 1024;


//------------ decode_slice --------------------------------------------------

/// Decodes a single value from the start of a byte buffer.
///
/// Bytes following the encoded value are ignored.
pub fn decode_slice(data: &[u8]) -> Result<Value, DecodeError> {
    let mut source = SliceSource::new(data);
    let pos = source.pos();
    let node = Node::parse(&mut source, 0)?;
    node.inflate(pos)
}


//------------ Node ----------------------------------------------------------

/// A node of the raw grammar tree.
enum Node<'s> {
    /// A list of further nodes.
    List(Vec<Element<'s>>),

    /// A length-prefixed byte string.
    Bytes(&'s [u8]),

    /// A maximal run of bytes in the symbol range.
    Symbol(&'s str),
}

/// A list element together with the position it started at.
struct Element<'s> {
    pos: Pos,
    node: Node<'s>,
}

/// Returns whether a byte may appear in a symbol.
fn is_symbol_byte(byte: u8) -> bool {
    (0x2A..=0x7A).contains(&byte)
}

impl<'s> Node<'s> {
    /// Parses a single node from the source.
    ///
    /// `depth` counts the lists enclosing the node.
    fn parse(
        source: &mut SliceSource<'s>, depth: usize
    ) -> Result<Self, DecodeError> {
        match source.peek() {
            Some(b'(') => Self::parse_list(source, depth),
            Some(b'\'') => Self::parse_bytes(source),
            Some(byte) if is_symbol_byte(byte) => {
                Ok(Node::Symbol(Self::parse_symbol(source)?))
            }
            Some(_) => Err(source.content_err("expected symbol, '(' or \"'\"")),
            None => Err(source.content_err(EOF)),
        }
    }

    /// Parses a list. The source is positioned on the opening parenthesis.
    fn parse_list(
        source: &mut SliceSource<'s>, depth: usize
    ) -> Result<Self, DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(source.content_err("nesting too deep"))
        }
        source.advance(1);
        let mut elements = Vec::new();
        loop {
            match source.peek() {
                None => return Err(source.content_err(EOF)),
                Some(b')') => {
                    source.advance(1);
                    return Ok(Node::List(elements))
                }
                Some(b' ') => source.advance(1),
                Some(_) => { }
            }
            let pos = source.pos();
            let node = Node::parse(source, depth + 1)?;
            elements.push(Element { pos, node });
            match source.peek() {
                None => return Err(source.content_err(EOF)),
                Some(b' ') | Some(b')') => { }
                Some(_) => {
                    return Err(
                        source.content_err("expected either ')' or ' '")
                    )
                }
            }
        }
    }

    /// Parses a byte string. The source is positioned on the quote.
    fn parse_bytes(source: &mut SliceSource<'s>) -> Result<Self, DecodeError> {
        source.advance(1);
        let digits = source.take_while(|byte| byte.is_ascii_digit());
        match source.peek() {
            None => return Err(source.content_err(EOF)),
            Some(b':') => { }
            Some(_) => {
                return Err(source.content_err("invalid length specification"))
            }
        }
        let len = match parse_len(digits) {
            Some(len) => len,
            None => {
                return Err(source.content_err("invalid length specification"))
            }
        };
        let err = source.content_err("invalid length specification");
        source.advance(1);
        match source.take_slice(len) {
            Some(data) => Ok(Node::Bytes(data)),
            None => Err(err),
        }
    }

    /// Parses a symbol. The source is positioned on its first byte.
    ///
    /// Running into the end of the input simply ends the symbol.
    fn parse_symbol(
        source: &mut SliceSource<'s>
    ) -> Result<&'s str, DecodeError> {
        let pos = source.pos();
        let res = source.take_while(is_symbol_byte);
        // The symbol range is pure ASCII, so this cannot actually fail.
        str::from_utf8(res).map_err(|_| {
            DecodeError::content("unrecognized symbol", pos)
        })
    }
}

/// Parses the length prefix of a byte string.
///
/// An empty digit run and extraneous leading zeros are invalid, as are
/// lengths that do not fit into memory.
fn parse_len(digits: &[u8]) -> Option<usize> {
    match digits.first() {
        Some(b'0') if digits.len() > 1 => return None,
        Some(_) => { }
        None => return None,
    }
    str::from_utf8(digits).ok()?.parse().ok()
}


//--- Inflation

impl<'s> Node<'s> {
    /// Interprets the raw node as a value.
    ///
    /// `pos` is the position the node started at in the input and is used
    /// for error reporting.
    fn inflate(&self, pos: Pos) -> Result<Value, DecodeError> {
        match self {
            Node::Bytes(data) => {
                match str::from_utf8(data) {
                    Ok(text) => Ok(Value::Text(text.into())),
                    Err(_) => {
                        Err(DecodeError::content("invalid utf-8 in text", pos))
                    }
                }
            }
            Node::Symbol(symbol) => Self::inflate_symbol(symbol, pos),
            Node::List(elements) => Self::inflate_list(elements, pos),
        }
    }

    /// Interprets a bare symbol.
    fn inflate_symbol(symbol: &str, pos: Pos) -> Result<Value, DecodeError> {
        match symbol {
            "null" => Ok(Value::Null),
            "false" => Ok(Value::Bool(false)),
            "true" => Ok(Value::Bool(true)),
            _ => {
                match Int::from_decimal(symbol) {
                    Ok(int) => Ok(Value::Int(int)),
                    Err(_) => {
                        Err(DecodeError::content("unrecognized symbol", pos))
                    }
                }
            }
        }
    }

    /// Interprets a raw list, dispatching on a possible leading tag.
    ///
    /// Only a raw symbol in the first position can be a tag. A byte
    /// string `'3:bin` heading a list leaves it a plain list.
    fn inflate_list(
        elements: &[Element<'s>], pos: Pos
    ) -> Result<Value, DecodeError> {
        if let Some(Element { node: Node::Symbol(tag), .. }) = elements.first() {
            match *tag {
                "bin" => return Self::inflate_bin(elements, pos),
                "date" => return Self::inflate_date(elements, pos),
                "dict" => return Self::inflate_dict(elements),
                "float" => return Self::inflate_float(elements, pos),
                "regex" => return Self::inflate_regex(elements, pos),
                _ => { }
            }
        }
        elements.iter().map(|el| el.node.inflate(el.pos)).collect::<
            Result<Vec<_>, _>
        >().map(Value::List)
    }

    /// Returns the position to report a shape error of a tagged list at.
    ///
    /// That is the position of the first element after the tag if there
    /// is one and the position of the list itself otherwise.
    fn shape_pos(elements: &[Element<'s>], pos: Pos) -> Pos {
        elements.get(1).map_or(pos, |el| el.pos)
    }

    fn inflate_bin(
        elements: &[Element<'s>], pos: Pos
    ) -> Result<Value, DecodeError> {
        match elements {
            [_, Element { node: Node::Bytes(data), .. }] => {
                Ok(Value::Bytes(Bytes::copy_from_slice(data)))
            }
            _ => {
                Err(DecodeError::content(
                    "expected one byte string", Self::shape_pos(elements, pos)
                ))
            }
        }
    }

    fn inflate_date(
        elements: &[Element<'s>], pos: Pos
    ) -> Result<Value, DecodeError> {
        let pos = Self::shape_pos(elements, pos);
        let symbol = match elements {
            [_, Element { node: Node::Symbol(symbol), .. }]
                if is_iso_date_symbol(symbol) => *symbol,
            _ => {
                return Err(DecodeError::content("expected a date symbol", pos))
            }
        };
        match NaiveDateTime::parse_from_str(symbol, "%Y-%m-%dT%H:%M:%S%.3fZ") {
            Ok(naive) => Ok(Value::Date(Utc.from_utc_datetime(&naive))),
            Err(_) => {
                Err(DecodeError::content(
                    "expected a valid date specification", pos
                ))
            }
        }
    }

    fn inflate_dict(
        elements: &[Element<'s>]
    ) -> Result<Value, DecodeError> {
        let mut dict = Dict::new();
        for el in &elements[1..] {
            let pair = match &el.node {
                Node::List(pair) if pair.len() == 2 => pair,
                _ => {
                    return Err(DecodeError::content(
                        "not a valid (key, val) pair", el.pos
                    ))
                }
            };
            let key = match pair[0].node.inflate(pair[0].pos)? {
                Value::Text(key) if !dict.contains_key(&key) => key,
                _ => {
                    return Err(DecodeError::content("invalid key", el.pos))
                }
            };
            dict.insert(key, pair[1].node.inflate(pair[1].pos)?);
        }
        Ok(Value::Dict(dict))
    }

    fn inflate_float(
        elements: &[Element<'s>], pos: Pos
    ) -> Result<Value, DecodeError> {
        let pos = Self::shape_pos(elements, pos);
        match elements {
            [_, Element { node: Node::Bytes(data), .. }] => {
                match <[u8; 8]>::try_from(*data) {
                    Ok(data) => Ok(Value::Float(f64::from_le_bytes(data))),
                    Err(_) => {
                        Err(DecodeError::content(
                            "expected an 8-byte string", pos
                        ))
                    }
                }
            }
            _ => Err(DecodeError::content("expected one byte string", pos)),
        }
    }

    fn inflate_regex(
        elements: &[Element<'s>], pos: Pos
    ) -> Result<Value, DecodeError> {
        let pos = Self::shape_pos(elements, pos);
        let (data, flags) = match elements {
            [
                _,
                Element { node: Node::Bytes(data), .. },
                Element { node: Node::Symbol(flags), .. },
            ] => (*data, *flags),
            _ => {
                return Err(DecodeError::content(
                    "expected a byte string and flags", pos
                ))
            }
        };
        let flags = match RegexFlags::from_symbol(flags) {
            Some(flags) => flags,
            None => {
                return Err(DecodeError::content(
                    "expected a byte string and flags", pos
                ))
            }
        };
        match str::from_utf8(data) {
            Ok(source) => Ok(Value::Regex(Regex::new(source, flags))),
            Err(_) => {
                Err(DecodeError::content(
                    "expected a valid regex specification", pos
                ))
            }
        }
    }
}

/// Returns whether a symbol has the shape of an ISO 8601 instant.
///
/// That is `YYYY-MM-DDThh:mm:ss.fffZ`, the millisecond-precision UTC
/// pattern. Whether the digits form a real calendar date is checked
/// separately.
fn is_iso_date_symbol(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    if bytes.len() != 24 {
        return false
    }
    bytes.iter().enumerate().all(|(idx, &byte)| {
        match idx {
            4 | 7 => byte == b'-',
            10 => byte == b'T',
            13 | 16 => byte == b':',
            19 => byte == b'.',
            23 => byte == b'Z',
            _ => byte.is_ascii_digit(),
        }
    })
}


//============ Tests =========================================================
