//! Short-id codec
//!
//! Stories are addressed on the site by a six-character base-36 slug
//! (`0-9a-z`), most significant digit first and zero-padded. The codec is a
//! bijection on `[0, 36^6)`; ids beyond that wrap modulo `36^6`, which is
//! acceptable because preload volumes stay far below the wrap point.

use crate::Result;
use anyhow::bail;

/// Number of digits in a short id
const SHORT_ID_LEN: usize = 6;

/// Base of the encoding
const BASE: i64 = 36;

/// Size of the short-id space, `36^6`
pub const ID_SPACE: i64 = 2_176_782_336;

/// Encode an id as a six-digit base-36 string
pub fn to_short_id(id: i64) -> String {
    let mut id = id.rem_euclid(ID_SPACE);
    let mut digits = [b'0'; SHORT_ID_LEN];

    for slot in digits.iter_mut().rev() {
        let digit = (id % BASE) as u8;
        *slot = if digit < 10 {
            b'0' + digit
        } else {
            b'a' + digit - 10
        };
        id /= BASE;
    }

    digits.iter().map(|&b| b as char).collect()
}

/// Decode a six-digit base-36 string back into an id
///
/// # Errors
///
/// Fails on strings that are not exactly six characters of `0-9a-z`.
pub fn parse_short_id(short_id: &str) -> Result<i64> {
    if short_id.len() != SHORT_ID_LEN {
        bail!("short id '{short_id}' is not {SHORT_ID_LEN} characters");
    }

    let mut id: i64 = 0;
    for c in short_id.bytes() {
        let digit = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'z' => c - b'a' + 10,
            _ => bail!("short id '{short_id}' contains invalid character '{}'", c as char),
        };
        id = id * BASE + i64::from(digit);
    }

    Ok(id)
}
