//! The adso container format.
//!
//! A container is a bsencode list of the tag `adso`, a cleartext header
//! dictionary, and a binary blob holding the encoded inner envelope.
//! The inner envelope is itself a list of the tag `encrypted`, a
//! dictionary naming the cipher method, nonce, and modification time,
//! and the ciphertext. The message authentication tag stored in the
//! outer header is computed over the inner envelope's exact encoded
//! bytes, keyed with the password-derived key; decoding recomputes and
//! checks it before any decryption is attempted.
//!
//! The human-facing header fields embed CRLF line breaks around their
//! content so the start of a container stays legible when viewed as
//! text. Base64 header fields are decoded with ASCII whitespace
//! stripped to compensate.

use std::{error, fmt};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use crate::crypto::{self, CipherError, Method};
use crate::decode::DecodeError;
use crate::kdf::{self, KeyTooLongError};
use crate::value::{Dict, Value};

/// The tag of the outer container list.
const OUTER_TAG: &str = "adso";

/// The tag of the inner envelope list.
const INNER_TAG: &str = "encrypted";

/// An empty line, CRLF style.
const BLANK_LINE: &str = "\r\n\r\n";

/// The nonce length in bytes.
const NONCE_LEN: usize = 16;

/// The salt length in bytes.
const SALT_LEN: usize = 8;

/// The exclusive upper bound on the random padding length.
const MAX_PAD: usize = 1024;


//------------ Encoder -------------------------------------------------------

/// An encoder of containers for one application.
///
/// The encoder only holds the application identifier and description
/// that go into every container's cleartext header. Each call to
/// [`encode`][Self::encode] draws a fresh nonce, salt, and padding, so
/// encoding the same payload twice produces different bytes that both
/// decode to the same value.
#[derive(Clone, Debug)]
pub struct Encoder {
    /// The application identifier.
    app: String,

    /// The human-readable description.
    descr: String,
}

impl Encoder {
    /// Creates an encoder with the given application identity.
    pub fn new(app: impl Into<String>, descr: impl Into<String>) -> Self {
        Encoder { app: app.into(), descr: descr.into() }
    }

    /// Encodes a payload into a container under a password.
    ///
    /// Uses the default cipher method.
    pub fn encode(
        &self, data: &Value, password: &str
    ) -> Result<Vec<u8>, ContainerError> {
        self.encode_with(data, password, Method::default())
    }

    /// Encodes a payload into a container with an explicit cipher method.
    pub fn encode_with(
        &self, data: &Value, password: &str, method: Method
    ) -> Result<Vec<u8>, ContainerError> {
        let nonce = crypto::random_bytes(NONCE_LEN);
        let salt = crypto::random_bytes(SALT_LEN);
        let key = kdf::derive(password, &salt, kdf::ROUNDS, kdf::KEY_LEN)?;

        // The payload is padded with a random-length blob so that the
        // ciphertext length does not reveal the payload length exactly.
        let mut payload = Dict::new();
        payload.insert("data", data.clone());
        payload.insert(
            "pad",
            Value::bytes(crypto::random_bytes_between(0, MAX_PAD))
        );
        let ciphertext = crypto::encrypt(
            method, &key, &nonce, &Value::Dict(payload).to_vec()
        )?;

        let mut header = Dict::new();
        header.insert("last modified", Value::date(Utc::now()));
        header.insert("method", Value::text(method.name()));
        header.insert(
            "nonce",
            Value::text(BASE64.encode(&nonce) + BLANK_LINE)
        );
        let validated = Value::List(vec![
            Value::text(format!("{}\r\n", INNER_TAG)),
            Value::Dict(header),
            Value::bytes(ciphertext),
        ]).to_vec();

        let tag = crypto::hmac_sha512(&key, &validated);
        let mut outer = Dict::new();
        outer.insert("app", Value::text(to_crlf(&self.app)));
        outer.insert(
            "descr",
            Value::text(
                format!("{}{}{}", BLANK_LINE, to_crlf(&self.descr), BLANK_LINE)
            )
        );
        outer.insert("hmac", Value::text(BASE64.encode(tag)));
        outer.insert("salt", Value::text(BASE64.encode(&salt)));
        Ok(Value::List(vec![
            Value::text(OUTER_TAG),
            Value::Dict(outer),
            Value::bytes(validated),
        ]).to_vec())
    }
}


//------------ decode --------------------------------------------------------

/// Decodes a container, returning the payload it was encoded with.
///
/// The stored authentication tag is recomputed and compared in constant
/// time before anything is decrypted. A mismatch fails with
/// [`ContainerError::Authentication`] which deliberately does not
/// distinguish a wrong password from tampered data.
pub fn decode(raw: &[u8], password: &str) -> Result<Value, ContainerError> {
    let outer = Value::decode(raw)?;
    let (header, validated) = split_envelope(&outer, OUTER_TAG)?;
    let salt = base64_field(header, "salt")?;
    let stored = base64_field(header, "hmac")?;

    let key = kdf::derive(password, &salt, kdf::ROUNDS, kdf::KEY_LEN)?;
    let tag = crypto::hmac_sha512(&key, validated);
    if !crypto::equal_bytes(&tag, &stored) {
        return Err(ContainerError::Authentication)
    }

    let inner = Value::decode(validated)?;
    let (header, ciphertext) = split_envelope(&inner, INNER_TAG)?;
    let method = Method::from_name(text_field(header, "method")?)?;
    let nonce = base64_field(header, "nonce")?;
    let plaintext = crypto::decrypt(method, &key, &nonce, ciphertext)?;

    match Value::decode(&plaintext)? {
        Value::Dict(mut payload) => {
            payload.remove("data").ok_or(
                ContainerError::Malformed("payload has no data field")
            )
        }
        _ => Err(ContainerError::Malformed("payload is not a dictionary")),
    }
}


//------------ Helpers -------------------------------------------------------

/// Normalizes line breaks to CRLF.
fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Takes an envelope apart into its header and binary blob.
///
/// An envelope is a three-element list of a tag, a dictionary, and a
/// blob. The tag is compared with ASCII whitespace trimmed since the
/// inner tag carries a line break for legibility.
fn split_envelope<'a>(
    envelope: &'a Value, tag: &str
) -> Result<(&'a Dict, &'a [u8]), ContainerError> {
    let items = match envelope.as_list() {
        Some(items) if items.len() == 3 => items,
        _ => {
            return Err(ContainerError::Malformed(
                "envelope is not a three-element list"
            ))
        }
    };
    match items[0].as_text() {
        Some(found) if found.trim() == tag => { }
        _ => return Err(ContainerError::Malformed("unexpected envelope tag")),
    }
    let header = items[1].as_dict().ok_or(
        ContainerError::Malformed("envelope header is not a dictionary")
    )?;
    let blob = items[2].as_bytes().ok_or(
        ContainerError::Malformed("envelope body is not a binary blob")
    )?;
    Ok((header, blob))
}

/// Returns a text field of a header dictionary.
fn text_field<'a>(
    header: &'a Dict, key: &'static str
) -> Result<&'a str, ContainerError> {
    header.get(key).and_then(Value::as_text).ok_or(
        ContainerError::Malformed("missing header field")
    )
}

/// Returns a base64 field of a header dictionary, decoded.
///
/// ASCII whitespace is stripped before decoding since the header
/// convention pads fields with line breaks.
fn base64_field(
    header: &Dict, key: &'static str
) -> Result<Vec<u8>, ContainerError> {
    let text: String = text_field(header, key)?
        .chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(text).map_err(|_| {
        ContainerError::Malformed("invalid base64 in header field")
    })
}


//------------ ContainerError ------------------------------------------------

/// A container could not be encoded or decoded.
#[derive(Debug)]
pub enum ContainerError {
    /// Bytes did not conform to the bsencode grammar.
    Decode(DecodeError),

    /// A decoded structure did not have the expected shape.
    Malformed(&'static str),

    /// The key-derivation parameters were unusable.
    KeyDerivation(KeyTooLongError),

    /// The stored authentication tag did not match.
    Authentication,

    /// The cipher could not process its input.
    Decryption(CipherError),
}

impl From<DecodeError> for ContainerError {
    fn from(err: DecodeError) -> Self {
        ContainerError::Decode(err)
    }
}

impl From<KeyTooLongError> for ContainerError {
    fn from(err: KeyTooLongError) -> Self {
        ContainerError::KeyDerivation(err)
    }
}

impl From<CipherError> for ContainerError {
    fn from(err: CipherError) -> Self {
        ContainerError::Decryption(err)
    }
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContainerError::Decode(err) => err.fmt(f),
            ContainerError::Malformed(msg) => f.write_str(msg),
            ContainerError::KeyDerivation(err) => err.fmt(f),
            ContainerError::Authentication => {
                f.write_str("wrong password or corrupted data")
            }
            ContainerError::Decryption(err) => err.fmt(f),
        }
    }
}

impl error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ContainerError::Decode(err) => Some(err),
            ContainerError::KeyDerivation(err) => Some(err),
            ContainerError::Decryption(err) => Some(err),
            _ => None,
        }
    }
}


//============ Tests =========================================================
