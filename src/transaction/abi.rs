//! Decoding of ABI words found in receipt logs

use crate::error::WalletError;
use crate::types::{strip_hex_prefix, Address};
use crate::Result;

pub const WORD_LEN: usize = 32;

/// Split hex log data into 32-byte words.
///
/// A word whose upper 12 bytes are zero is rendered as a 20-byte address,
/// any other word as its full 32-byte hex. Empty or ragged data fails.
pub fn decode_words(data: &str) -> Result<Vec<String>> {
    let bytes = hex::decode(strip_hex_prefix(data))
        .map_err(|e| WalletError::encoding(format!("log data is not hex: {}", e)))?;

    if bytes.is_empty() || bytes.len() % WORD_LEN != 0 {
        return Err(WalletError::encoding(format!(
            "log data of {} bytes is not a sequence of words",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks(WORD_LEN)
        .map(|word| {
            if word[..12].iter().all(|b| *b == 0) {
                format!("0x{}", hex::encode(&word[12..]))
            } else {
                format!("0x{}", hex::encode(word))
            }
        })
        .collect())
}

/// Address held in the low 20 bytes of a 32-byte word (e.g. an indexed topic)
pub fn decode_address_word(word: &str) -> Result<Address> {
    let bytes = hex::decode(strip_hex_prefix(word))
        .map_err(|e| WalletError::encoding(format!("topic is not hex: {}", e)))?;
    if bytes.len() != WORD_LEN {
        return Err(WalletError::encoding(format!(
            "topic has {} bytes, expected {}",
            bytes.len(),
            WORD_LEN
        )));
    }
    Address::from_slice(&bytes[12..])
}

/// 32-byte word as a big-endian number is zero
pub fn is_zero_word(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}
