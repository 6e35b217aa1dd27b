//! Minimal ABI codec for contract read calls.
//!
//! Only the subset the discovery pipeline needs: selector hashing, calls
//! with zero or one `uint256` argument, and word-level decoding of address
//! and unsigned-integer return values.

use crate::error::{ChainError, ChainResult};
use sha3::{Digest, Keccak256};
use vaultscan_core::{Address, ADDRESS_SIZE};

/// Length of a function selector in bytes.
pub const SELECTOR_SIZE: usize = 4;

/// Length of an ABI word in bytes.
pub const WORD_SIZE: usize = 32;

/// Computes the 4-byte function selector for a canonical signature,
/// e.g. `token()` or `poolInfo(uint256)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; SELECTOR_SIZE] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; SELECTOR_SIZE];
    out.copy_from_slice(&digest[..SELECTOR_SIZE]);
    out
}

/// Encodes a call with no arguments.
#[must_use]
pub fn encode_call(signature: &str) -> Vec<u8> {
    selector(signature).to_vec()
}

/// Encodes a call with a single `uint256` argument.
#[must_use]
pub fn encode_call_u256(signature: &str, value: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(SELECTOR_SIZE + WORD_SIZE);
    data.extend_from_slice(&selector(signature));
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    data.extend_from_slice(&word);
    data
}

/// Decodes an address from the first return word.
pub fn decode_address(data: &[u8]) -> ChainResult<Address> {
    decode_address_at(data, 0)
}

/// Decodes an address from the return word at `word_index`.
///
/// Struct returns lay their fields out one word each; `poolInfo` carries
/// its LP token address in word 0.
pub fn decode_address_at(data: &[u8], word_index: usize) -> ChainResult<Address> {
    let word = return_word(data, word_index)?;
    if word[..WORD_SIZE - ADDRESS_SIZE].iter().any(|b| *b != 0) {
        return Err(ChainError::AbiDecode(format!(
            "word {word_index} has non-zero padding for an address value"
        )));
    }
    Address::from_bytes(&word[WORD_SIZE - ADDRESS_SIZE..])
        .map_err(|e| ChainError::AbiDecode(e.to_string()))
}

/// Decodes a `uint256` return word into a `u64`, rejecting larger values.
pub fn decode_u64(data: &[u8]) -> ChainResult<u64> {
    let word = return_word(data, 0)?;
    if word[..WORD_SIZE - 8].iter().any(|b| *b != 0) {
        return Err(ChainError::AbiDecode(
            "integer return value exceeds u64 range".to_string(),
        ));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD_SIZE - 8..]);
    Ok(u64::from_be_bytes(bytes))
}

fn return_word(data: &[u8], word_index: usize) -> ChainResult<&[u8]> {
    let start = word_index * WORD_SIZE;
    let end = start + WORD_SIZE;
    if data.len() < end {
        return Err(ChainError::AbiDecode(format!(
            "return data too short: {} bytes, wanted word {}",
            data.len(),
            word_index
        )));
    }
    Ok(&data[start..end])
}
