//! Raw transaction payloads arrive from the UI as hex text. Decoding
//! happens before any device call so malformed input never reaches the
//! signer.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexDecodeError {
    #[error("hex payload is empty")]
    Empty,
    #[error("hex payload has odd length {0}")]
    OddLength(usize),
    #[error("invalid hex digit at position {0}")]
    InvalidDigit(usize),
}

/// Decodes a hex string into bytes. Accepts an optional `0x`/`0X` prefix
/// and surrounding whitespace; rejects everything else.
pub fn decode_hex_string(input: &str) -> Result<Vec<u8>, HexDecodeError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(HexDecodeError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(HexDecodeError::OddLength(digits.len()));
    }

    hex::decode(digits).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            HexDecodeError::InvalidDigit(index)
        }
        hex::FromHexError::OddLength => HexDecodeError::OddLength(digits.len()),
        hex::FromHexError::InvalidStringLength => HexDecodeError::OddLength(digits.len()),
    })
}
