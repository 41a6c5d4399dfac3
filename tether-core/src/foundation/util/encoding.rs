use crate::foundation::{Hash32, TetherError};

pub fn decode_hex(s: &str) -> Result<Vec<u8>, TetherError> {
    hex::decode(s).map_err(|e| e.into())
}

pub fn parse_hex_32bytes(s: &str) -> Result<Hash32, TetherError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = decode_hex(stripped)?;
    let array: Hash32 =
        bytes.as_slice().try_into().map_err(|_| TetherError::ParseError(format!("expected 32 bytes, got {}", bytes.len())))?;
    Ok(array)
}
