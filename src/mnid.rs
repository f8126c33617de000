//! Multi-network identifier (MNID) codec
//!
//! Wire layout before base-58:
//!
//! ```text
//! [version: 1][chain id: n][address: 20][checksum: 4]
//! ```
//!
//! The checksum is the first 4 bytes of SHA3-256 over everything before it.

use sha3::{Digest, Sha3_256};

use crate::error::WalletError;
use crate::types::{strip_hex_prefix, Address};

pub const VERSION: u8 = 1;
const CHECKSUM_LEN: usize = 4;
/// Address plus checksum, counted back from the end of the buffer
const TAIL_LEN: usize = Address::LEN + CHECKSUM_LEN;

/// Decoded identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MnidParts {
    pub chain_id: Vec<u8>,
    pub address: Address,
}

impl MnidParts {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.chain_id))
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha3_256::digest(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

pub fn encode(address: &Address, chain_id: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + chain_id.len() + TAIL_LEN);
    payload.push(VERSION);
    payload.extend_from_slice(chain_id);
    payload.extend_from_slice(address.as_bytes());
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);
    bs58::encode(payload).into_string()
}

/// Encode with a hex chain id such as `"0x00"` or `"0x04"`
pub fn encode_hex(address: &Address, chain_id_hex: &str) -> Result<String, WalletError> {
    let chain_id = hex::decode(strip_hex_prefix(chain_id_hex))
        .map_err(|e| WalletError::encoding(format!("invalid chain id {}: {}", chain_id_hex, e)))?;
    Ok(encode(address, &chain_id))
}

pub fn decode(identifier: &str) -> Result<MnidParts, WalletError> {
    let data = bs58::decode(identifier)
        .into_vec()
        .map_err(|e| WalletError::InvalidIdentifier(format!("{}: {}", identifier, e)))?;

    if data.len() <= TAIL_LEN {
        return Err(WalletError::InvalidIdentifier(format!(
            "{}: decoded length {} too short",
            identifier,
            data.len()
        )));
    }

    let address_start = data.len() - TAIL_LEN;
    let checksum_start = data.len() - CHECKSUM_LEN;

    if checksum(&data[..checksum_start]) != data[checksum_start..] {
        return Err(WalletError::InvalidIdentifier(format!(
            "{}: checksum mismatch",
            identifier
        )));
    }

    Ok(MnidParts {
        chain_id: data[1..address_start].to_vec(),
        address: Address::from_slice(&data[address_start..checksum_start])?,
    })
}

/// Cheap structural check; does not verify the checksum
pub fn is_identifier(identifier: &str) -> bool {
    match bs58::decode(identifier).into_vec() {
        Ok(data) => data.len() > TAIL_LEN && data[0] == VERSION,
        Err(_) => false,
    }
}
