//! Password-protected containers encoded in the bsencode grammar.
//!
//! This crate implements two layered formats. The bsencode grammar is a
//! self-describing binary serialization for structured values: nested
//! lists, dictionaries, byte strings, dates, floats, regular expression
//! literals, and atomic symbols. The adso container format builds on it
//! to store an arbitrary serialized value encrypted under a
//! password-derived key, authenticated with HMAC-SHA512 so that
//! tampering and wrong passwords are detected before decryption.
//!
//! Values are represented by the [`Value`] enum which can be encoded to
//! canonical bytes with [`Value::to_vec`] and decoded back with
//! [`Value::decode`]. Containers are produced by an [`Encoder`] carrying
//! the application's header identity and read back with
//! [`container::decode`].
//!
//! ```
//! use adso::{container, Encoder, Value};
//!
//! let keyring = Encoder::new(
//!     "adso-keyring", "Encrypted password and key storage."
//! );
//! let encoded = keyring.encode(
//!     &Value::text("box of chocolates"), "run, forrest"
//! ).unwrap();
//! assert_eq!(
//!     container::decode(&encoded, "run, forrest").unwrap(),
//!     Value::text("box of chocolates")
//! );
//! assert!(container::decode(&encoded, "wrong password").is_err());
//! ```

pub use self::container::{ContainerError, Encoder};
pub use self::crypto::Method;
pub use self::decode::DecodeError;
pub use self::value::{Dict, Int, Regex, RegexFlags, Value};

pub mod container;
pub mod crypto;
pub mod decode;
pub mod encode;
pub mod kdf;
pub mod value;
