//! The values of the bsencode data model.
//!
//! The grammar only knows three raw shapes: lists, byte strings, and
//! symbols. Everything richer, such as dates, dictionaries, or regular
//! expression literals, is layered on top through tagged lists. [`Value`]
//! is the decoded form of all of that: a tree of variants that encodes to
//! canonical bytes and decodes back without loss.

use std::{error, fmt};
use std::collections::BTreeMap;
use std::collections::btree_map;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use crate::decode::{self, DecodeError};
use crate::encode::{infallible, Frame, Target};


//------------ Value ---------------------------------------------------------

/// A single value of the bsencode data model.
///
/// Values form a tree: lists hold further values and dictionaries map
/// text keys to values. All other variants are leaves. A value owns its
/// content; the grammar does not permit aliasing or cycles.
///
/// Dictionaries keep their keys sorted by their raw UTF-8 bytes, so
/// encoding the same logical value always produces identical bytes. The
/// container format relies on this when it authenticates encoded data.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,

    /// A boolean.
    Bool(bool),

    /// An integer of arbitrary size.
    Int(Int),

    /// An IEEE 754 double precision number.
    Float(f64),

    /// A UTF-8 string.
    Text(String),

    /// A raw binary blob.
    Bytes(Bytes),

    /// A UTC instant with millisecond precision.
    Date(DateTime<Utc>),

    /// A regular expression literal.
    Regex(Regex),

    /// An ordered sequence of values.
    List(Vec<Value>),

    /// A mapping from text keys to values.
    Dict(Dict),
}

impl Value {
    /// Creates a text value.
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    /// Creates a binary blob value.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Value::Bytes(data.into())
    }

    /// Creates a date value.
    ///
    /// The wire format carries dates with millisecond precision, so the
    /// given instant is truncated to whole milliseconds. It also renders
    /// years with exactly four digits; instants outside years 0 through
    /// 9999 encode as `null`.
    pub fn date(when: DateTime<Utc>) -> Self {
        let millis = when.timestamp_millis();
        Value::Date(Utc.timestamp_millis_opt(millis).single().unwrap_or(when))
    }

    /// Decodes a value from a byte buffer.
    ///
    /// Bytes after the end of the encoded value are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        decode::decode_slice(data)
    }

    /// Writes the canonical encoding of the value to a target.
    pub fn write_encoded<T: Target>(
        &self, target: &mut T
    ) -> Result<(), T::Error> {
        Frame::build(self).write(target)
    }

    /// Returns the canonical encoding of the value as a vec.
    pub fn to_vec(&self) -> Vec<u8> {
        let frame = Frame::build(self);
        let mut target = Vec::with_capacity(frame.encoded_len());
        infallible(frame.write(&mut target));
        target
    }

    /// Returns a reference to the text if the value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns a reference to the blob if the value is a binary blob.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(data) => Some(data.as_ref()),
            _ => None,
        }
    }

    /// Returns a reference to the dictionary if the value is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns a reference to the elements if the value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}


//--- From

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<Int> for Value {
    fn from(val: Int) -> Self {
        Value::Int(val)
    }
}

/// Doubles carrying an integral value become integers.
///
/// This mirrors the behavior of dynamically typed hosts where `2.0` and
/// `2` are the same number: any finite double without a fractional part
/// that a double can still represent exactly (up to 2⁵³ in magnitude)
/// converts to [`Value::Int`], with `-0.0` converting to `0`. Anything
/// else, including non-finite values, becomes [`Value::Float`]. Construct
/// `Value::Float` directly to force the float encoding.
impl From<f64> for Value {
    fn from(val: f64) -> Self {
        const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
        if val.is_finite() && val.fract() == 0.0 && val.abs() <= MAX_EXACT {
            Value::Int(Int::from(val as i64))
        }
        else {
            Value::Float(val)
        }
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::Text(val.into())
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::Text(val)
    }
}

impl From<Bytes> for Value {
    fn from(val: Bytes) -> Self {
        Value::Bytes(val)
    }
}

impl From<Vec<u8>> for Value {
    fn from(val: Vec<u8>) -> Self {
        Value::Bytes(val.into())
    }
}

impl From<Regex> for Value {
    fn from(val: Regex) -> Self {
        Value::Regex(val)
    }
}

impl From<Vec<Value>> for Value {
    fn from(val: Vec<Value>) -> Self {
        Value::List(val)
    }
}

impl From<Dict> for Value {
    fn from(val: Dict) -> Self {
        Value::Dict(val)
    }
}

macro_rules! int_from_impl {
    ( $( $type:ident ),* ) => {
        $(
            impl From<$type> for Int {
                fn from(val: $type) -> Self {
                    // The decimal rendering of a builtin integer never
                    // has leading zeros or a lone minus.
                    Int(val.to_string().into())
                }
            }

            impl From<$type> for Value {
                fn from(val: $type) -> Self {
                    Value::Int(val.into())
                }
            }
        )*
    }
}

int_from_impl!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);


//------------ Int -----------------------------------------------------------

/// An integer of arbitrary size.
///
/// The grammar renders integers as decimal symbols with no bound on their
/// magnitude, so this type keeps the validated decimal rendering rather
/// than converting to a fixed-width native type. The rendering is an
/// optional minus followed by digits with no extraneous leading zeros;
/// `-0` is not a valid integer literal.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Int(Box<str>);

impl Int {
    /// Creates an integer from its decimal rendering.
    pub fn from_decimal(
        literal: impl Into<String>
    ) -> Result<Self, InvalidInteger> {
        let literal = literal.into();
        if Self::is_valid(&literal) {
            Ok(Int(literal.into()))
        }
        else {
            Err(InvalidInteger(()))
        }
    }

    /// Returns whether a string is a valid integer literal.
    fn is_valid(literal: &str) -> bool {
        let digits = literal.strip_prefix('-').unwrap_or(literal);
        match digits.as_bytes().first() {
            Some(b'0') => digits.len() == 1 && !literal.starts_with('-'),
            Some(first) => {
                first.is_ascii_digit()
                    && digits.bytes().all(|byte| byte.is_ascii_digit())
            }
            None => false,
        }
    }

    /// Returns the decimal rendering of the integer.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the integer into an `i64` if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//------------ InvalidInteger ------------------------------------------------

/// A string was not a valid decimal integer literal.
#[derive(Clone, Copy, Debug)]
pub struct InvalidInteger(());

impl fmt::Display for InvalidInteger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid integer literal")
    }
}

impl error::Error for InvalidInteger { }


//------------ Regex ---------------------------------------------------------

/// A regular expression literal.
///
/// The pattern itself is kept as text; no attempt is made to compile or
/// otherwise interpret it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Regex {
    /// The source pattern.
    pub source: String,

    /// The flags of the literal.
    pub flags: RegexFlags,
}

impl Regex {
    /// Creates a regular expression literal.
    pub fn new(source: impl Into<String>, flags: RegexFlags) -> Self {
        Regex { source: source.into(), flags }
    }
}


//------------ RegexFlags ----------------------------------------------------

/// The flag set of a regular expression literal.
///
/// On the wire the flags appear as the symbol `:g?i?m?`, i.e., a colon
/// followed by the flag letters in that fixed order.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RegexFlags {
    pub global: bool,
    pub case_insensitive: bool,
    pub multiline: bool,
}

impl RegexFlags {
    /// Parses the flag symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let mut tail = symbol.strip_prefix(':')?;
        let mut flags = RegexFlags::default();
        for (letter, slot) in [
            ('g', &mut flags.global),
            ('i', &mut flags.case_insensitive),
            ('m', &mut flags.multiline),
        ] {
            if let Some(rest) = tail.strip_prefix(letter) {
                *slot = true;
                tail = rest;
            }
        }
        if tail.is_empty() {
            Some(flags)
        }
        else {
            None
        }
    }

    /// Returns the flag symbol.
    pub fn to_symbol(self) -> String {
        let mut res = String::from(":");
        if self.global {
            res.push('g');
        }
        if self.case_insensitive {
            res.push('i');
        }
        if self.multiline {
            res.push('m');
        }
        res
    }
}


//------------ Dict ----------------------------------------------------------

/// A mapping from text keys to values.
///
/// Keys are unique and kept ordered by their raw UTF-8 byte encoding.
/// Since that is exactly the canonical wire order, encoding simply walks
/// the map and is deterministic no matter in which order keys were
/// inserted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dict(BTreeMap<String, Value>);

impl Dict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key-value pair, returning any previous value of the key.
    pub fn insert(
        &mut self, key: impl Into<String>, value: impl Into<Value>
    ) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value of a key if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns whether the dictionary contains a key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the entries in canonical key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for Dict {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Dict(map)
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Dict(iter.into_iter().collect())
    }
}

impl IntoIterator for Dict {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_literals() {
        assert!(Int::from_decimal("0").is_ok());
        assert!(Int::from_decimal("7").is_ok());
        assert!(Int::from_decimal("-7").is_ok());
        assert!(Int::from_decimal("1234567890123456789012345").is_ok());

        assert!(Int::from_decimal("").is_err());
        assert!(Int::from_decimal("-").is_err());
        assert!(Int::from_decimal("-0").is_err());
        assert!(Int::from_decimal("01").is_err());
        assert!(Int::from_decimal("+1").is_err());
        assert!(Int::from_decimal("1.5").is_err());
        assert!(Int::from_decimal("12 ").is_err());
    }

    #[test]
    fn int_conversions() {
        assert_eq!(Int::from(-42i64).as_str(), "-42");
        assert_eq!(Int::from(0u8).as_str(), "0");
        assert_eq!(Int::from(u64::MAX).to_i64(), None);
        assert_eq!(Int::from(i64::MIN).to_i64(), Some(i64::MIN));
    }

    #[test]
    fn float_coercion() {
        assert_eq!(Value::from(0f64), Value::from(0i64));
        assert_eq!(Value::from(-0f64), Value::from(0i64));
        assert_eq!(Value::from(2f64), Value::from(2i64));
        assert_eq!(Value::from(-17f64), Value::from(-17i64));
        assert_eq!(Value::from(3.5), Value::Float(3.5));
        assert_eq!(Value::from(1e300), Value::Float(1e300));
        assert!(matches!(
            Value::from(f64::INFINITY), Value::Float(_)
        ));
        assert!(matches!(Value::from(f64::NAN), Value::Float(_)));
    }

    #[test]
    fn regex_flags() {
        assert_eq!(
            RegexFlags::from_symbol(":gim").unwrap(),
            RegexFlags {
                global: true, case_insensitive: true, multiline: true
            }
        );
        assert_eq!(
            RegexFlags::from_symbol(":").unwrap(), RegexFlags::default()
        );
        assert_eq!(
            RegexFlags::from_symbol(":m").unwrap().to_symbol(), ":m"
        );
        assert!(RegexFlags::from_symbol("").is_none());
        assert!(RegexFlags::from_symbol("g").is_none());
        assert!(RegexFlags::from_symbol(":mg").is_none());
        assert!(RegexFlags::from_symbol(":gg").is_none());
        assert_eq!(
            RegexFlags::from_symbol(":gim").unwrap().to_symbol(), ":gim"
        );
    }

    #[test]
    fn dict_order() {
        let mut dict = Dict::new();
        dict.insert("zeta", 1i64);
        dict.insert("alpha", 2i64);
        dict.insert("Beta", 3i64);
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.as_str()).collect();
        // Uppercase sorts before lowercase in raw byte order.
        assert_eq!(keys, ["Beta", "alpha", "zeta"]);
    }

    #[test]
    fn date_truncates_to_millis() {
        let when = Utc.with_ymd_and_hms(2012, 1, 10, 2, 47, 58).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        match Value::date(when) {
            Value::Date(date) => {
                assert_eq!(date.timestamp_subsec_millis(), 123);
                assert_eq!(date.timestamp_subsec_nanos() % 1_000_000, 0);
            }
            _ => panic!("expected a date"),
        }
    }
}
