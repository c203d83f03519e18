//! The cryptographic collaborators of the container format.
//!
//! The container protocol treats these as supplied services: a block
//! cipher in CBC mode selected through [`Method`], the HMAC-SHA512
//! primitive, a secure random byte source, and a constant-time byte
//! comparison. Only their contracts matter to the rest of the crate.

use std::{error, fmt};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::cipher::block_padding::Pkcs7;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::Sha512;
use subtle::ConstantTimeEq;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// The length of an HMAC-SHA512 tag in bytes.
pub const TAG_LEN: usize = 64;


//------------ Method --------------------------------------------------------

/// The symmetric cipher algorithm of a container.
///
/// Containers name their cipher in a header field so that the set of
/// algorithms can grow without a format change. The name is stored as
/// plain text in both directions.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    /// AES with a 256 bit key in CBC mode with PKCS#7 padding.
    #[default]
    Aes256Cbc,
}

impl Method {
    /// Returns the name of the method as stored in a container.
    pub fn name(self) -> &'static str {
        match self {
            Method::Aes256Cbc => "AES-256-CBC",
        }
    }

    /// Looks up a method by its stored name.
    ///
    /// Matching ignores case and surrounding ASCII whitespace.
    pub fn from_name(name: &str) -> Result<Self, CipherError> {
        if name.trim().eq_ignore_ascii_case("aes-256-cbc") {
            Ok(Method::Aes256Cbc)
        }
        else {
            Err(CipherError::UnsupportedMethod(name.trim().into()))
        }
    }

    /// Returns the key length of the method in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Method::Aes256Cbc => 32,
        }
    }

    /// Returns the nonce length of the method in bytes.
    pub fn nonce_len(self) -> usize {
        match self {
            Method::Aes256Cbc => 16,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}


//------------ encrypt, decrypt ----------------------------------------------

/// Encrypts data with the given method, key, and nonce.
pub fn encrypt(
    method: Method, key: &[u8], nonce: &[u8], data: &[u8]
) -> Result<Vec<u8>, CipherError> {
    match method {
        Method::Aes256Cbc => {
            let cipher = Aes256CbcEnc::new_from_slices(key, nonce)
                .map_err(|_| CipherError::InvalidKey)?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(data))
        }
    }
}

/// Decrypts data with the given method, key, and nonce.
///
/// Fails if the ciphertext is not a whole number of blocks or its
/// padding is invalid.
pub fn decrypt(
    method: Method, key: &[u8], nonce: &[u8], data: &[u8]
) -> Result<Vec<u8>, CipherError> {
    match method {
        Method::Aes256Cbc => {
            let cipher = Aes256CbcDec::new_from_slices(key, nonce)
                .map_err(|_| CipherError::InvalidKey)?;
            cipher.decrypt_padded_vec_mut::<Pkcs7>(data)
                .map_err(|_| CipherError::Rejected)
        }
    }
}


//------------ hmac_sha512 ---------------------------------------------------

/// Computes the HMAC-SHA512 tag of a message under a key.
pub fn hmac_sha512(key: &[u8], message: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = Hmac::<Sha512>::new_from_slice(key)
        .expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().into()
}


//------------ random_bytes --------------------------------------------------

/// Returns `len` bytes from the secure random source.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut res = vec![0u8; len];
    OsRng.fill(res.as_mut_slice());
    res
}

/// Returns a buffer of uniformly chosen length in `[min, max)` filled
/// from the secure random source.
///
/// If the range is empty, the length is simply `min`.
pub fn random_bytes_between(min: usize, max: usize) -> Vec<u8> {
    let len = if max > min {
        OsRng.gen_range(min..max)
    }
    else {
        min
    };
    random_bytes(len)
}


//------------ equal_bytes ---------------------------------------------------

/// Compares two byte slices in constant time.
///
/// Buffers of unequal length compare unequal without a timing
/// dependency on their content.
pub fn equal_bytes(left: &[u8], right: &[u8]) -> bool {
    left.ct_eq(right).into()
}


//------------ CipherError ---------------------------------------------------

/// The cipher could not process its input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CipherError {
    /// The named cipher method is not known.
    UnsupportedMethod(Box<str>),

    /// The key or nonce had the wrong length for the method.
    InvalidKey,

    /// The cipher rejected the ciphertext or its padding.
    Rejected,
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CipherError::UnsupportedMethod(name) => {
                write!(f, "unsupported cipher method '{}'", name)
            }
            CipherError::InvalidKey => {
                f.write_str("invalid key or nonce length")
            }
            CipherError::Rejected => {
                f.write_str("cipher rejected the ciphertext")
            }
        }
    }
}

impl error::Error for CipherError { }


//============ Tests =========================================================
