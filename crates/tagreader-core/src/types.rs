use crate::{
    Result,
    constants::{DEFAULT_DATA_BLOCK, MAX_UID_LENGTH, MIN_UID_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card unique identifier (4-10 bytes, ISO 14443).
///
/// Serialized as a `0x`-prefixed lowercase hex string, e.g. `0x8f82d28f`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CardUid(Vec<u8>);

impl CardUid {
    /// Create a new UID with length validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if the UID is not 4-10 bytes long.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let len = bytes.len();
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(Error::InvalidUid(format!(
                "UID must be {MIN_UID_LENGTH}-{MAX_UID_LENGTH} bytes, got {len}"
            )));
        }
        Ok(CardUid(bytes))
    }

    /// Parse a hex string, with or without a `0x` prefix.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` for odd-length or non-hex input, or a
    /// decoded length outside 4-10 bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() % 2 != 0 {
            return Err(Error::InvalidUid(format!("Odd number of hex digits: {s}")));
        }

        let bytes = (0..digits.len())
            .step_by(2)
            .map(|i| {
                digits
                    .get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| Error::InvalidUid(format!("Invalid hex: {s}")))
            })
            .collect::<Result<Vec<u8>>>()?;

        CardUid::new(bytes)
    }

    /// Raw UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex without prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Big-endian integer value of the UID.
    ///
    /// Only the first 8 bytes are used for UIDs longer than 8 bytes.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
            .iter()
            .take(8)
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardUid::from_hex(s)
    }
}

impl From<CardUid> for String {
    fn from(uid: CardUid) -> Self {
        uid.to_string()
    }
}

impl TryFrom<String> for CardUid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        CardUid::from_hex(&s)
    }
}

/// Card memory block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(u8);

impl BlockId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        BlockId(id)
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for BlockId {
    fn from(id: u8) -> Self {
        BlockId(id)
    }
}

/// A named data field stored in one card block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Key used in the `blocks` map of a read result.
    pub name: String,

    /// Block holding the field value.
    pub block: BlockId,
}

impl DataField {
    pub fn new(name: impl Into<String>, block: impl Into<BlockId>) -> Self {
        Self {
            name: name.into(),
            block: block.into(),
        }
    }

    /// Field named after its block number, e.g. `"4"` for block 4.
    pub fn for_block(block: u8) -> Self {
        Self::new(block.to_string(), block)
    }
}

impl Default for DataField {
    fn default() -> Self {
        Self::for_block(DEFAULT_DATA_BLOCK)
    }
}

/// Decode raw block bytes into a field value.
///
/// The value ends at the first NUL byte; invalid UTF-8 is replaced and
/// trailing whitespace is trimmed.
#[must_use]
pub fn decode_block_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("8f82d28f", vec![0x8f, 0x82, 0xd2, 0x8f])]
    #[case("0x8F82D28F", vec![0x8f, 0x82, 0xd2, 0x8f])]
    #[case("04a1b2c3d4e5f6", vec![0x04, 0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6])]
    fn test_uid_from_hex_valid(#[case] input: &str, #[case] expected: Vec<u8>) {
        let uid = CardUid::from_hex(input).unwrap();
        assert_eq!(uid.as_bytes(), expected.as_slice());
    }

    #[rstest]
    #[case("")] // empty
    #[case("010203")] // 3 bytes
    #[case("0102030")] // odd length
    #[case("zz020304")] // non-hex
    #[case("0102030405060708090a0b")] // 11 bytes
    fn test_uid_from_hex_invalid(#[case] input: &str) {
        assert!(CardUid::from_hex(input).is_err());
    }

    #[test]
    fn test_uid_display() {
        let uid = CardUid::new(vec![0x8f, 0x82, 0xd2, 0x8f]).unwrap();
        assert_eq!(uid.to_string(), "0x8f82d28f");
        assert_eq!(uid.to_hex(), "8f82d28f");
        assert_eq!(uid.as_u64(), 0x8f82_d28f);
    }

    #[test]
    fn test_uid_serde_as_hex_string() {
        let uid = CardUid::new(vec![0x8f, 0x82, 0xd2, 0x8f]).unwrap();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"0x8f82d28f\"");

        let back: CardUid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uid);
    }

    #[test]
    fn test_uid_serde_rejects_short_uid() {
        let result: std::result::Result<CardUid, _> = serde_json::from_str("\"0x0102\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_data_field() {
        let field = DataField::default();
        assert_eq!(field.name, "4");
        assert_eq!(field.block, BlockId::new(4));
    }

    #[rstest]
    #[case(b"159\0\0\0\0\0\0\0\0\0\0\0\0\0".as_slice(), "159")]
    #[case(b"album 7   ".as_slice(), "album 7")]
    #[case(b"".as_slice(), "")]
    #[case(b"\0abc".as_slice(), "")]
    fn test_decode_block_text(#[case] raw: &[u8], #[case] expected: &str) {
        assert_eq!(decode_block_text(raw), expected);
    }
}
