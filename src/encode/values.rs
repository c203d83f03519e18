//! Building the wire encoding.
//!
//! Encoding is a two-stage pipeline. A [`Value`] is first reduced into a
//! [`Frame`], a tree of the three raw shapes of the grammar: byte
//! strings, symbols, and lists. The frame then writes itself out:
//! byte strings as `'<len>:<bytes>`, symbols as their literal ASCII
//! bytes, and lists as `(` followed by the space-joined children and
//! `)`, with the empty list as the fixed two-byte literal `()`.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use std::borrow::Cow;
use bytes::Bytes;
use chrono::Datelike;
use crate::value::Value;
use super::target::Target;


//------------ Frame ---------------------------------------------------------

/// The intermediate shape of a value being encoded.
pub(crate) enum Frame {
    /// A length-prefixed byte string.
    Bytes(Bytes),

    /// A bare symbol.
    Symbol(Cow<'static, str>),

    /// A list of further frames.
    List(Vec<Frame>),
}

impl Frame {
    /// Reduces a value into its frame.
    ///
    /// Extended types reduce to their tagged lists: binary blobs to
    /// `bin`, dates to `date` with the ISO 8601 millisecond rendering,
    /// dictionaries to `dict` with their pairs in canonical key order,
    /// floats to `float` with the little-endian double, and regular
    /// expression literals to `regex` with pattern and flag symbol.
    /// Non-finite floats and dates outside four-digit years have no
    /// rendering and reduce to `null`.
    pub fn build(value: &Value) -> Self {
        match value {
            Value::Null => Frame::symbol("null"),
            Value::Bool(false) => Frame::symbol("false"),
            Value::Bool(true) => Frame::symbol("true"),
            Value::Int(int) => {
                Frame::Symbol(Cow::Owned(int.as_str().into()))
            }
            Value::Float(val) => {
                if val.is_finite() {
                    Frame::List(vec![
                        Frame::symbol("float"),
                        Frame::Bytes(
                            Bytes::copy_from_slice(&val.to_le_bytes())
                        ),
                    ])
                }
                else {
                    Frame::symbol("null")
                }
            }
            Value::Text(text) => {
                Frame::Bytes(Bytes::copy_from_slice(text.as_bytes()))
            }
            Value::Bytes(data) => {
                Frame::List(vec![
                    Frame::symbol("bin"),
                    Frame::Bytes(data.clone()),
                ])
            }
            Value::Date(date) => {
                // The wire pattern has exactly four year digits.
                if !(0..=9999).contains(&date.year()) {
                    return Frame::symbol("null")
                }
                Frame::List(vec![
                    Frame::symbol("date"),
                    Frame::Symbol(Cow::Owned(
                        date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
                    )),
                ])
            }
            Value::Regex(regex) => {
                Frame::List(vec![
                    Frame::symbol("regex"),
                    Frame::Bytes(
                        Bytes::copy_from_slice(regex.source.as_bytes())
                    ),
                    Frame::Symbol(Cow::Owned(regex.flags.to_symbol())),
                ])
            }
            Value::List(items) => {
                Frame::List(items.iter().map(Frame::build).collect())
            }
            Value::Dict(dict) => {
                let mut items = Vec::with_capacity(dict.len() + 1);
                items.push(Frame::symbol("dict"));
                // The map iterates in canonical key order already.
                items.extend(dict.iter().map(|(key, value)| {
                    Frame::List(vec![
                        Frame::Bytes(Bytes::copy_from_slice(key.as_bytes())),
                        Frame::build(value),
                    ])
                }));
                Frame::List(items)
            }
        }
    }

    fn symbol(symbol: &'static str) -> Self {
        Frame::Symbol(Cow::Borrowed(symbol))
    }

    /// Returns the length of the encoded frame in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::Bytes(data) => {
                1 + decimal_len(data.len()) + 1 + data.len()
            }
            Frame::Symbol(symbol) => symbol.len(),
            Frame::List(items) => {
                if items.is_empty() {
                    2
                }
                else {
                    // Parentheses plus the children joined by spaces.
                    items.iter().map(Frame::encoded_len).sum::<usize>()
                        + items.len() + 1
                }
            }
        }
    }

    /// Writes the encoded frame to the given target.
    pub fn write<T: Target>(&self, target: &mut T) -> Result<(), T::Error> {
        match self {
            Frame::Bytes(data) => {
                target.write_all(b"'")?;
                write_decimal(target, data.len())?;
                target.write_all(b":")?;
                target.write_all(data)
            }
            Frame::Symbol(symbol) => target.write_all(symbol.as_bytes()),
            Frame::List(items) => {
                target.write_all(b"(")?;
                let mut first = true;
                for item in items {
                    if !first {
                        target.write_all(b" ")?;
                    }
                    first = false;
                    item.write(target)?;
                }
                target.write_all(b")")
            }
        }
    }
}

/// Returns the number of digits in the decimal rendering of `value`.
fn decimal_len(mut value: usize) -> usize {
    let mut res = 1;
    while value >= 10 {
        value /= 10;
        res += 1;
    }
    res
}

/// Writes the decimal rendering of `value` to the target.
fn write_decimal<T: Target>(
    target: &mut T, mut value: usize
) -> Result<(), T::Error> {
    let mut buf = [0u8; 20];
    let mut idx = buf.len();
    loop {
        idx -= 1;
        buf[idx] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    target.write_all(&buf[idx..])
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use crate::value::{Dict, Regex, RegexFlags};
    use super::*;

    fn encode(value: &Value) -> Vec<u8> {
        value.to_vec()
    }

    #[test]
    fn symbols_and_strings() {
        assert_eq!(encode(&Value::Null), b"null");
        assert_eq!(encode(&Value::Bool(true)), b"true");
        assert_eq!(encode(&Value::from(0i64)), b"0");
        assert_eq!(encode(&Value::from(-0f64)), b"0");
        assert_eq!(encode(&Value::from(-42i64)), b"-42");
        assert_eq!(encode(&Value::text("hello")), b"'5:hello");
        assert_eq!(encode(&Value::text("")), b"'0:");
    }

    #[test]
    fn lists() {
        assert_eq!(encode(&Value::List(Vec::new())), b"()");
        assert_eq!(
            encode(&Value::List(vec![
                Value::Null, Value::from(1i64), Value::List(Vec::new()),
            ])),
            b"(null 1 ())"
        );
    }

    #[test]
    fn floats() {
        assert_eq!(
            encode(&Value::from(3.5)),
            b"(float '8:\x00\x00\x00\x00\x00\x00\x0c\x40)"
        );
        assert_eq!(encode(&Value::Float(f64::NAN)), b"null");
        assert_eq!(encode(&Value::Float(f64::INFINITY)), b"null");
        // An integral double forced into the float variant keeps the
        // float framing.
        assert_eq!(
            encode(&Value::Float(2.0)),
            b"(float '8:\x00\x00\x00\x00\x00\x00\x00\x40)"
        );
    }

    #[test]
    fn extended_types() {
        assert_eq!(
            encode(&Value::bytes(b"\x00\x01".as_ref())),
            b"(bin '2:\x00\x01)"
        );
        assert_eq!(
            encode(&Value::date(
                Utc.with_ymd_and_hms(2012, 1, 10, 2, 47, 58).unwrap()
            )),
            b"(date 2012-01-10T02:47:58.000Z)"
        );
        assert_eq!(
            encode(&Value::Regex(Regex::new("a.c", RegexFlags {
                global: true, case_insensitive: false, multiline: true,
            }))),
            b"(regex '3:a.c :gm)"
        );
    }

    #[test]
    fn dates_need_four_digit_years() {
        let far = Value::date(
            Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(encode(&far), b"null");
        assert_eq!(Value::decode(&encode(&far)).unwrap(), Value::Null);
        let early = Value::date(
            Utc.with_ymd_and_hms(-44, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(encode(&early), b"null");
        let edge = Value::date(
            Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()
        );
        assert_eq!(
            encode(&edge).as_slice(),
            b"(date 9999-12-31T23:59:59.000Z)".as_ref()
        );
    }

    #[test]
    fn dicts_encode_in_canonical_order() {
        let mut dict = Dict::new();
        dict.insert("pad", Value::Null);
        dict.insert("data", Value::from(1i64));
        assert_eq!(
            encode(&Value::Dict(dict)),
            b"(dict ('4:data 1) ('3:pad null))"
        );
    }

    #[test]
    fn chocolates() {
        let mut dict = Dict::new();
        dict.insert(
            "life",
            Value::List(
                ["like", "a", "box", "of", "chocolates"]
                    .map(Value::from).into()
            )
        );
        assert_eq!(
            encode(&Value::Dict(dict)).as_slice(),
            b"(dict ('4:life ('4:like '1:a '3:box '2:of '10:chocolates)))"
                .as_ref()
        );
    }

    #[test]
    fn deterministic() {
        let mut dict = Dict::new();
        dict.insert("b", Value::from(2i64));
        dict.insert("a", Value::from(1i64));
        let value = Value::List(vec![
            Value::Dict(dict), Value::text("x"), Value::from(3.25),
        ]);
        assert_eq!(encode(&value), encode(&value.clone()));
    }

    #[test]
    fn encoded_len_matches_output() {
        let mut dict = Dict::new();
        dict.insert("key", Value::bytes(vec![0u8; 12]));
        dict.insert("more", Value::from(1234i64));
        let value = Value::List(vec![
            Value::Dict(dict),
            Value::from(2.5),
            Value::text("some text"),
        ]);
        let frame = Frame::build(&value);
        assert_eq!(frame.encoded_len(), value.to_vec().len());
    }
}
