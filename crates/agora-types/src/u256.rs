use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// 256-bit unsigned integer for balances, tallies and reputation.
///
/// Stored as 4 x u64 in little-endian limb order.
/// There are deliberately no `Add`/`Sub`/`Mul` operator impls: every
/// arithmetic path goes through the `checked_*` family so that ledger code
/// has to decide what an overflow means.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]); // [low, mid_low, mid_high, high] little-endian limbs

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for i in (0..4).rev() {
            match self.0[i].cmp(&other.0[i]) {
                std::cmp::Ordering::Equal => continue,
                ord => return ord,
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl U256 {
    pub const ZERO: Self = Self([0, 0, 0, 0]);
    pub const ONE: Self = Self([1, 0, 0, 0]);
    pub const MAX: Self = Self([u64::MAX, u64::MAX, u64::MAX, u64::MAX]);

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; 4] {
        &self.0
    }

    /// Create from a u64 value
    pub const fn from_u64(val: u64) -> Self {
        Self([val, 0, 0, 0])
    }

    /// Create from a u128 value
    pub const fn from_u128(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64, 0, 0])
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut result = [0u64; 4];
        let mut carry = false;

        for i in 0..4 {
            let (sum1, o1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum2, o2) = sum1.overflowing_add(carry as u64);
            result[i] = sum2;
            carry = o1 || o2;
        }

        if carry {
            None
        } else {
            Some(Self(result))
        }
    }

    /// Checked subtraction
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        if self < rhs {
            return None;
        }

        let mut result = [0u64; 4];
        let mut borrow = false;

        for i in 0..4 {
            let (diff1, u1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff2, u2) = diff1.overflowing_sub(borrow as u64);
            result[i] = diff2;
            borrow = u1 || u2;
        }

        Some(Self(result))
    }

    /// Checked multiplication (schoolbook over 64-bit limbs).
    pub fn checked_mul(&self, rhs: &Self) -> Option<Self> {
        if self.is_zero() || rhs.is_zero() {
            return Some(Self::ZERO);
        }

        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry = 0u128;
            for j in 0..4 {
                let cur = wide[i + j] as u128
                    + (self.0[i] as u128) * (rhs.0[j] as u128)
                    + carry;
                wide[i + j] = cur as u64;
                carry = cur >> 64;
            }
            wide[i + 4] = carry as u64;
        }

        if wide[4..].iter().any(|&l| l != 0) {
            return None;
        }

        Some(Self([wide[0], wide[1], wide[2], wide[3]]))
    }

    /// Quotient and remainder, `None` on division by zero.
    pub fn div_rem(&self, rhs: &Self) -> Option<(Self, Self)> {
        if rhs.is_zero() {
            return None;
        }
        if self < rhs {
            return Some((Self::ZERO, *self));
        }

        let mut quotient = Self::ZERO;
        let mut remainder = Self::ZERO;

        for i in (0..self.bit_len()).rev() {
            // a set top bit means the shifted remainder is >= 2^256 > rhs
            let carried = remainder.bit(255);
            remainder = remainder.shl1();
            if self.bit(i) {
                remainder.0[0] |= 1;
            }
            if carried || remainder >= *rhs {
                remainder = remainder.wrapping_sub(rhs);
                quotient.0[(i / 64) as usize] |= 1u64 << (i % 64);
            }
        }

        Some((quotient, remainder))
    }

    /// Checked division
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        self.div_rem(rhs).map(|(q, _)| q)
    }

    /// Checked remainder
    pub fn checked_rem(&self, rhs: &Self) -> Option<Self> {
        self.div_rem(rhs).map(|(_, r)| r)
    }

    /// `self * mul / div`, floored. `None` if the product overflows or `div` is zero.
    pub fn mul_div(&self, mul: &Self, div: &Self) -> Option<Self> {
        self.checked_mul(mul)?.checked_div(div)
    }

    /// Saturating subtraction, clamps at zero.
    pub fn saturating_sub(&self, rhs: &Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }

    fn wrapping_sub(&self, rhs: &Self) -> Self {
        let mut result = [0u64; 4];
        let mut borrow = false;
        for i in 0..4 {
            let (diff1, u1) = self.0[i].overflowing_sub(rhs.0[i]);
            let (diff2, u2) = diff1.overflowing_sub(borrow as u64);
            result[i] = diff2;
            borrow = u1 || u2;
        }
        Self(result)
    }

    // Shift left by one bit, dropping the top bit.
    fn shl1(&self) -> Self {
        let mut result = [0u64; 4];
        for i in (0..4).rev() {
            result[i] = self.0[i] << 1;
            if i > 0 {
                result[i] |= self.0[i - 1] >> 63;
            }
        }
        Self(result)
    }

    /// Get bit at position
    pub fn bit(&self, pos: u32) -> bool {
        if pos >= 256 {
            return false;
        }
        let limb = (pos / 64) as usize;
        (self.0[limb] >> (pos % 64)) & 1 != 0
    }

    /// Bit length (position of highest set bit + 1)
    pub fn bit_len(&self) -> u32 {
        for i in (0..4).rev() {
            if self.0[i] != 0 {
                return (i as u32 + 1) * 64 - self.0[i].leading_zeros();
            }
        }
        0
    }

    /// Integer square root, exact floor.
    ///
    /// Newton iteration seeded above the root (`2^ceil(bits/2)`), so the
    /// sequence decreases monotonically and stops at `floor(sqrt(n))`.
    pub fn isqrt(&self) -> Self {
        if self.is_zero() {
            return Self::ZERO;
        }

        let shift = self.bit_len().div_ceil(2);
        let mut x = Self::ZERO;
        x.0[(shift / 64) as usize] = 1u64 << (shift % 64);

        loop {
            // x > 0 throughout, so the division cannot fail
            let Some(q) = self.checked_div(&x) else {
                return x;
            };
            let y = match x.checked_add(&q) {
                Some(sum) => sum.half(),
                // only reachable when both terms are near MAX; x is then already tight
                None => return x,
            };
            if y >= x {
                return x;
            }
            x = y;
        }
    }

    fn half(&self) -> Self {
        let mut result = [0u64; 4];
        for i in 0..4 {
            result[i] = self.0[i] >> 1;
            if i < 3 {
                result[i] |= self.0[i + 1] << 63;
            }
        }
        Self(result)
    }

    /// Convert to big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        bytes
    }

    /// Convert from big-endian bytes
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut limb_bytes = [0u8; 8];
            limb_bytes.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            limbs[3 - i] = u64::from_be_bytes(limb_bytes);
        }
        Self(limbs)
    }

    /// Convert to little-endian bytes
    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for i in 0..4 {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&self.0[i].to_le_bytes());
        }
        bytes
    }

    /// Convert from little-endian bytes
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut limb_bytes = [0u8; 8];
            limb_bytes.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            limbs[i] = u64::from_le_bytes(limb_bytes);
        }
        Self(limbs)
    }

    /// Parse from decimal string
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        if s.is_empty() {
            return Err(TypesError::InvalidU256String(s.to_string()));
        }

        let ten = Self::from_u64(10);
        let mut result = Self::ZERO;

        for c in s.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| TypesError::InvalidU256String(s.to_string()))?;
            result = result
                .checked_mul(&ten)
                .and_then(|r| r.checked_add(&Self::from_u64(digit as u64)))
                .ok_or(TypesError::U256Overflow)?;
        }

        Ok(result)
    }
}

impl From<u8> for U256 {
    fn from(val: u8) -> Self {
        Self::from_u64(val as u64)
    }
}

impl From<u16> for U256 {
    fn from(val: u16) -> Self {
        Self::from_u64(val as u64)
    }
}

impl From<u32> for U256 {
    fn from(val: u32) -> Self {
        Self::from_u64(val as u64)
    }
}

impl From<u64> for U256 {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<u128> for U256 {
    fn from(val: u128) -> Self {
        Self::from_u128(val)
    }
}

impl TryFrom<U256> for u64 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value.0[1] != 0 || value.0[2] != 0 || value.0[3] != 0 {
            Err(TypesError::U256Overflow)
        } else {
            Ok(value.0[0])
        }
    }
}

impl TryFrom<U256> for u128 {
    type Error = TypesError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value.0[2] != 0 || value.0[3] != 0 {
            Err(TypesError::U256Overflow)
        } else {
            Ok((value.0[1] as u128) << 64 | value.0[0] as u128)
        }
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.pad("0");
        }

        // peel off 19 decimal digits at a time
        let chunk = Self::from_u64(10_000_000_000_000_000_000);
        let mut n = *self;
        let mut parts = Vec::new();
        while !n.is_zero() {
            let (q, r) = n.div_rem(&chunk).ok_or(fmt::Error)?;
            parts.push(r.0[0]);
            n = q;
        }

        let mut s = String::new();
        for (i, part) in parts.iter().rev().enumerate() {
            if i == 0 {
                s.push_str(&part.to_string());
            } else {
                s.push_str(&format!("{:019}", part));
            }
        }
        f.pad(&s)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl FromStr for U256 {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let bytes = hex::decode(stripped)?;
            if bytes.len() > 32 {
                return Err(TypesError::U256Overflow);
            }
            let mut padded = [0u8; 32];
            padded[32 - bytes.len()..].copy_from_slice(&bytes);
            Ok(Self::from_be_bytes(padded))
        } else {
            Self::from_decimal_str(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_u256_zero_one_max() {
        assert_eq!(U256::ZERO, U256([0, 0, 0, 0]));
        assert_eq!(U256::ONE, U256([1, 0, 0, 0]));
        assert_eq!(U256::MAX, U256([u64::MAX; 4]));
    }

    #[test]
    fn test_u256_from_u128() {
        let val: u128 = 0x1234567890abcdef_1122334455667788;
        let u256 = U256::from(val);
        assert_eq!(u256.0[0], 0x1122334455667788);
        assert_eq!(u256.0[1], 0x1234567890abcdef);
        assert_eq!(u128::try_from(u256).unwrap(), val);
    }

    #[test]
    fn test_u256_add_overflow() {
        assert_eq!(
            U256::from(100u64).checked_add(&U256::from(200u64)),
            Some(U256::from(300u64))
        );
        assert!(U256::MAX.checked_add(&U256::ONE).is_none());
    }

    #[test]
    fn test_u256_sub_underflow() {
        assert_eq!(
            U256::from(300u64).checked_sub(&U256::from(200u64)),
            Some(U256::from(100u64))
        );
        assert!(U256::from(100u64).checked_sub(&U256::from(200u64)).is_none());
        assert_eq!(U256::from(1u64).saturating_sub(&U256::from(2u64)), U256::ZERO);
    }

    #[test]
    fn test_u256_mul_carries_across_limbs() {
        let a = U256::from(u64::MAX);
        let product = a.checked_mul(&a).unwrap();
        assert_eq!(
            u128::try_from(product).unwrap(),
            (u64::MAX as u128) * (u64::MAX as u128)
        );

        let big = U256::from_limbs([0, 0, 1, 0]); // 2^128
        assert_eq!(big.checked_mul(&big), None); // 2^256
        assert_eq!(
            big.checked_mul(&U256::from(2u64)),
            Some(U256::from_limbs([0, 0, 2, 0]))
        );
    }

    #[test]
    fn test_u256_div_rem() {
        let (q, r) = U256::from(200u64).div_rem(&U256::from(7u64)).unwrap();
        assert_eq!(q, U256::from(28u64));
        assert_eq!(r, U256::from(4u64));
        assert!(U256::from(1u64).checked_div(&U256::ZERO).is_none());

        // divisor above 2^255
        let divisor = U256::from_limbs([1, 0, 0, 1 << 63]);
        let (q, r) = U256::MAX.div_rem(&divisor).unwrap();
        assert_eq!(q, U256::ONE);
        assert_eq!(r, U256::from_limbs([u64::MAX - 1, u64::MAX, u64::MAX, (1 << 63) - 1]));
    }

    #[test]
    fn test_u256_mul_div_floors() {
        let fee = U256::from(10_000u64)
            .mul_div(&U256::from(50u64), &U256::from(10_000u64))
            .unwrap();
        assert_eq!(fee, U256::from(50u64));

        let third = U256::from(10u64)
            .mul_div(&U256::ONE, &U256::from(3u64))
            .unwrap();
        assert_eq!(third, U256::from(3u64));
    }

    #[test]
    fn test_u256_isqrt() {
        assert_eq!(U256::ZERO.isqrt(), U256::ZERO);
        assert_eq!(U256::ONE.isqrt(), U256::ONE);
        assert_eq!(U256::from(15u64).isqrt(), U256::from(3u64));
        assert_eq!(U256::from(16u64).isqrt(), U256::from(4u64));
        assert_eq!(U256::from(1_000_000u64).isqrt(), U256::from(1_000u64));
        assert_eq!(U256::MAX.isqrt(), U256::from(u128::MAX));
    }

    #[test]
    fn test_u256_decimal_display() {
        assert_eq!(U256::ZERO.to_string(), "0");
        assert_eq!(U256::from(12345u64).to_string(), "12345");
        assert_eq!(
            U256::from(10_000_000_000_000_000_000u128).to_string(),
            "10000000000000000000"
        );
        assert_eq!(
            U256::MAX.to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn test_u256_from_str() {
        assert_eq!(U256::from_str("0").unwrap(), U256::ZERO);
        assert_eq!(U256::from_str("12345").unwrap(), U256::from(12345u64));
        assert_eq!(U256::from_str("0xFF").unwrap(), U256::from(255u64));
        assert!(U256::from_str("").is_err());
        assert!(U256::from_str("12a").is_err());
        assert!(U256::from_str(
            "115792089237316195423570985008687907853269984665640564039457584007913129639936"
        )
        .is_err());
    }

    #[test]
    fn test_u256_bytes_roundtrip() {
        let original = U256::from(0x1234567890abcdef_1122334455667788u128);
        assert_eq!(U256::from_be_bytes(original.to_be_bytes()), original);
        assert_eq!(U256::from_le_bytes(original.to_le_bytes()), original);
    }

    proptest! {
        #[test]
        fn prop_isqrt_is_floor(n in any::<u128>()) {
            let root = U256::from(n).isqrt();
            let r = u128::try_from(root).unwrap();
            let r_sq = U256::from(r).checked_mul(&U256::from(r)).unwrap();
            let next = U256::from(r + 1);
            let next_sq = next.checked_mul(&next).unwrap();
            prop_assert!(r_sq <= U256::from(n));
            prop_assert!(next_sq > U256::from(n));
        }

        #[test]
        fn prop_display_parses_back(n in any::<u128>()) {
            let value = U256::from(n);
            prop_assert_eq!(U256::from_str(&value.to_string()).unwrap(), value);
            prop_assert_eq!(value.to_string(), n.to_string());
        }
    }
}
