//! Deriving keys from passwords.
//!
//! The container format derives its symmetric key from a password and a
//! per-container salt using the PBKDF2 construction from RFC 2898 over
//! HMAC-SHA512, built here directly from the HMAC primitive. Output is
//! produced in 64-byte blocks: for block `b`, counting from 1, a
//! chaining value is seeded with the salt followed by `b` as a
//! big-endian 32 bit integer, then repeatedly run through HMAC-SHA512
//! keyed with the password, XOR-accumulating every iteration's digest.
//! Blocks are concatenated and the last one truncated to the requested
//! length.
//!
//! Deriving a key is the dominant cost of every container operation.
//! The loop is pure CPU work without internal concurrency; callers that
//! need responsiveness should run it on a worker thread.

use std::{error, fmt};
use crate::crypto;

/// The number of HMAC iterations the container format uses.
///
/// The original implementation never passed an iteration count at its
/// call sites; the container format fixes it here instead so that both
/// encode and decode agree.
pub const ROUNDS: u32 = 10_000;

/// The derived key length in bytes the container format uses.
///
/// Matches the AES-256 key size of the default cipher method.
pub const KEY_LEN: usize = 32;

/// The output length of the underlying hash in bytes.
const HASH_LEN: usize = 64;


//------------ derive --------------------------------------------------------

/// Derives `out_len` bytes of key material from a password and salt.
///
/// Requesting more than `64 * (2³² - 1)` bytes fails; requesting zero
/// bytes returns an empty buffer.
pub fn derive(
    password: &str, salt: &[u8], rounds: u32, out_len: usize
) -> Result<Vec<u8>, KeyTooLongError> {
    if out_len as u64 > (HASH_LEN as u64) * u64::from(u32::MAX) {
        return Err(KeyTooLongError(()))
    }
    let mut output = Vec::with_capacity(out_len);
    let blocks = out_len.div_ceil(HASH_LEN) as u32;
    for block in 1..=blocks {
        let mut current = [0u8; HASH_LEN];
        let mut chain = Vec::with_capacity(salt.len() + 4);
        chain.extend_from_slice(salt);
        chain.extend_from_slice(&block.to_be_bytes());
        for _ in 0..rounds {
            let digest = crypto::hmac_sha512(password.as_bytes(), &chain);
            for (acc, byte) in current.iter_mut().zip(digest.iter()) {
                *acc ^= byte;
            }
            chain.clear();
            chain.extend_from_slice(&digest);
        }
        let remaining = out_len - output.len();
        output.extend_from_slice(&current[..HASH_LEN.min(remaining)]);
    }
    Ok(output)
}


//------------ KeyTooLongError -----------------------------------------------

/// The requested key length exceeds what the construction can produce.
#[derive(Clone, Copy, Debug)]
pub struct KeyTooLongError(());

impl fmt::Display for KeyTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("derived key too long")
    }
}

impl error::Error for KeyTooLongError { }


//============ Tests =========================================================
