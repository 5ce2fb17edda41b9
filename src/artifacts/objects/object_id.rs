//! Object identifier (SHA-1 digest)
//!
//! Object IDs are 40-character hexadecimal strings naming the SHA-1 hash of
//! an object's serialized form. They identify every object in the store.
//!
//! ## Storage
//!
//! Objects live at `.grit/objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use std::io;
use std::path::PathBuf;

/// A validated 40-hex-character SHA-1 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate a digest from its hex rendering.
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// The all-zero digest, used on the wire to mean "ref does not exist".
    pub fn zero() -> Self {
        Self("0".repeat(OBJECT_ID_LENGTH))
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Write the digest as 20 raw bytes.
    ///
    /// Used when serializing tree entries and pack delta base references.
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read a digest from 20 raw bytes.
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut raw)?;

        Ok(Self::from_h40(&raw))
    }

    /// Build a digest from its 20-byte binary form.
    pub fn from_h40(raw: &[u8; OBJECT_ID_LENGTH / 2]) -> Self {
        let mut hex = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in raw {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    /// Path of the object file relative to the objects root: `XX/YYYY...`.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters, the usual abbreviation for display.
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_digest_and_normalizes_case() {
        let hex = "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709";
        let oid = ObjectId::try_parse(hex.to_string()).unwrap();
        assert_eq!(oid.as_ref(), hex.to_ascii_lowercase());
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(ObjectId::try_parse("abc".to_string()).is_err());
        assert!(ObjectId::try_parse("g".repeat(40)).is_err());
    }

    #[test]
    fn binary_round_trip() {
        let oid =
            ObjectId::try_parse("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string()).unwrap();

        let mut raw = Vec::new();
        oid.write_h40_to(&mut raw).unwrap();
        assert_eq!(raw.len(), 20);

        let back = ObjectId::read_h40_from(&mut raw.as_slice()).unwrap();
        assert_eq!(back, oid);
    }

    #[test]
    fn zero_digest_is_recognized() {
        assert!(ObjectId::zero().is_zero());
        let nonzero =
            ObjectId::try_parse("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string()).unwrap();
        assert!(!nonzero.is_zero());
    }

    #[test]
    fn fan_out_path_splits_after_two_chars() {
        let oid =
            ObjectId::try_parse("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string()).unwrap();
        assert_eq!(
            oid.to_path(),
            PathBuf::from("da").join("39a3ee5e6b4b0d3255bfef95601890afd80709")
        );
    }
}
