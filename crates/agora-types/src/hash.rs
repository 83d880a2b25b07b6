use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// blake3 digest identifying engine content: proposal ids, description
/// hashes and action payload hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const LEN: usize = 32;

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Leading four bytes in hex. Proposals are logged by this prefix.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl FromStr for Hash {
    type Err = TypesError;

    /// Parses 64 hex digits, with or without a `0x` prefix. Script files
    /// reference proposals this way.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim_start_matches("0x");
        if digits.len() != Self::LEN * 2 {
            return Err(TypesError::InvalidHashLength(digits.len() / 2));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_tracks_content() {
        let funding = Hash::compute(b"fund the audit");
        assert_eq!(funding, Hash::compute(b"fund the audit"));
        assert_ne!(funding, Hash::compute(b"fund the audit twice"));
        assert_ne!(Hash::compute(&[]), Hash::default());
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let id = Hash::compute(b"proposal");
        assert_eq!(id.to_string().parse::<Hash>().unwrap(), id);
        assert_eq!(id.to_hex().parse::<Hash>().unwrap(), id);
        assert_eq!(
            "0x1234".parse::<Hash>(),
            Err(TypesError::InvalidHashLength(2))
        );
        assert!("zz".repeat(32).parse::<Hash>().is_err());
    }

    #[test]
    fn test_short_prefix() {
        let id = Hash::from_bytes([0xab; 32]);
        assert_eq!(id.short(), "abababab");
        assert_eq!(format!("{id:?}"), "Hash(abababab)");
    }
}
