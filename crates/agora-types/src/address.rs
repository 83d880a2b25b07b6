use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// Principal keying every ledger: role holders, reputation accounts, token
/// holders, proposers, voters and action targets.
///
/// Callers arrive pre-authenticated; the engine never derives or verifies
/// an address. Displayed as bech32m under the `agr` prefix; `{:x}` gives the
/// `0x` form used in logs and scripts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);
    pub const LEN: usize = 20;

    pub const BECH32_HRP: &'static str = "agr";

    /// Bytes that are zero in every system address.
    const SYSTEM_PREFIX: usize = 16;

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Engine-owned account: zero except for a big-endian `tag` in the last
    /// four bytes. Governance, the treasury and the system call targets live
    /// here; nothing outside the engine can sign as one.
    pub const fn system(tag: u32) -> Self {
        let tag = tag.to_be_bytes();
        let mut bytes = [0u8; 20];
        let mut i = 0;
        while i < 4 {
            bytes[Self::SYSTEM_PREFIX + i] = tag[i];
            i += 1;
        }
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn is_system(&self) -> bool {
        !self.is_zero() && self.0[..Self::SYSTEM_PREFIX].iter().all(|b| *b == 0)
    }

    fn hrp() -> bech32::Hrp {
        bech32::Hrp::parse_unchecked(Self::BECH32_HRP)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded =
            bech32::encode::<bech32::Bech32m>(Self::hrp(), &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:x})", self)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    /// Accepts `0x` hex or `agr1...` bech32m.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(digits) = s.strip_prefix("0x") {
            if digits.len() != Self::LEN * 2 {
                return Err(TypesError::InvalidAddressLength(digits.len() / 2));
            }
            let mut bytes = [0u8; 20];
            hex::decode_to_slice(digits, &mut bytes)?;
            return Ok(Self(bytes));
        }

        if !s.starts_with("agr1") {
            return Err(TypesError::InvalidAddressFormat(s.to_string()));
        }
        let (hrp, data) =
            bech32::decode(s).map_err(|e| TypesError::Bech32Error(e.to_string()))?;
        if hrp != Self::hrp() {
            return Err(TypesError::InvalidAddressFormat(format!(
                "prefix {hrp}, expected {}",
                Self::BECH32_HRP
            )));
        }
        let bytes: [u8; 20] = data
            .as_slice()
            .try_into()
            .map_err(|_| TypesError::InvalidAddressLength(data.len()))?;
        Ok(Self(bytes))
    }
}
