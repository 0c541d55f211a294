//! Minimal ABI helpers for precompiled contract return data.
//!
//! The table contracts only ever return two shapes that the client must
//! understand without generated bindings: a single `int256` return word and
//! the standard `Error(string)` revert payload. Both are hex strings with a
//! `0x` prefix.

use thiserror::Error;

/// Size of one ABI word in bytes.
pub const WORD_SIZE: usize = 32;

/// Function selector of the standard `Error(string)` revert payload.
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Errors decoding ABI return data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    /// The data is not valid hex.
    #[error("Invalid hex in return data: {0}")]
    InvalidHex(String),

    /// The data has the wrong number of bytes.
    #[error("Expected {expected} bytes of return data, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// The word holds a value outside the `i64` range.
    #[error("Return word does not fit in a 64-bit signed integer")]
    Overflow,
}

/// Decodes a `0x`-prefixed hex string into bytes.
///
/// An empty string and a bare `0x` both decode to no bytes.
pub fn decode_hex(data: &str) -> Result<Vec<u8>, AbiError> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(digits).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// Encodes an `i64` as a two's-complement `int256` return word.
#[must_use]
pub fn encode_int_word(value: i64) -> String {
    let mut word = if value < 0 { [0xffu8; WORD_SIZE] } else { [0u8; WORD_SIZE] };
    word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    format!("0x{}", hex::encode(word))
}

/// Decodes a two's-complement `int256` return word.
///
/// The high 24 bytes must be pure sign extension of the low 8.
pub fn decode_int_word(data: &str) -> Result<i64, AbiError> {
    let bytes = decode_hex(data)?;
    if bytes.len() != WORD_SIZE {
        return Err(AbiError::InvalidLength { expected: WORD_SIZE, actual: bytes.len() });
    }

    let (high, low) = bytes.split_at(WORD_SIZE - 8);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    let value = i64::from_be_bytes(buf);

    let fill = if value < 0 { 0xff } else { 0x00 };
    if high.iter().any(|b| *b != fill) {
        return Err(AbiError::Overflow);
    }
    Ok(value)
}

/// Encodes a revert reason as an `Error(string)` payload.
#[must_use]
pub fn encode_revert_reason(reason: &str) -> String {
    let bytes = reason.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD_SIZE) * WORD_SIZE;

    let mut out = Vec::with_capacity(4 + 2 * WORD_SIZE + padded_len);
    out.extend_from_slice(&REVERT_SELECTOR);
    out.extend_from_slice(&usize_word(WORD_SIZE));
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(4 + 2 * WORD_SIZE + padded_len, 0);
    format!("0x{}", hex::encode(out))
}

/// Extracts the reason from an `Error(string)` revert payload.
///
/// Returns `None` for anything that is not a well-formed revert payload,
/// including plain return words.
#[must_use]
pub fn decode_revert_reason(data: &str) -> Option<String> {
    let bytes = decode_hex(data).ok()?;
    let body = bytes.strip_prefix(&REVERT_SELECTOR[..])?;

    let offset = word_to_usize(body.get(..WORD_SIZE)?)?;
    let len_start = offset;
    let len = word_to_usize(body.get(len_start..len_start.checked_add(WORD_SIZE)?)?)?;
    let data_start = len_start + WORD_SIZE;
    let reason = body.get(data_start..data_start.checked_add(len)?)?;
    String::from_utf8(reason.to_vec()).ok()
}

fn usize_word(value: usize) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    let value = u64::try_from(value).unwrap_or(u64::MAX);
    word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_to_usize(word: &[u8]) -> Option<usize> {
    let (high, low) = word.split_at(WORD_SIZE - 8);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    usize::try_from(u64::from_be_bytes(buf)).ok()
}
