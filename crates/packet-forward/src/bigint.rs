#![allow(clippy::assign_op_pattern)]
#![allow(clippy::ptr_offset_with_cast)]
#![allow(clippy::manual_range_contains)]

use uint::construct_uint;

construct_uint! {
    pub struct U256(4);
}

construct_uint! {
    /// Wide enough to hold the product of two `U256` values.
    pub struct U512(8);
}

impl From<U256> for U512 {
    fn from(value: U256) -> Self {
        let mut words = [0u64; 8];
        words[..4].copy_from_slice(&value.0);
        Self(words)
    }
}

impl TryFrom<U512> for U256 {
    type Error = U512;

    fn try_from(value: U512) -> Result<Self, Self::Error> {
        if value.0[4..].iter().any(|word| *word != 0) {
            return Err(value);
        }
        let mut words = [0u64; 4];
        words.copy_from_slice(&value.0[..4]);
        Ok(Self(words))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::{U256, U512};

    #[test]
    fn widening_and_narrowing() {
        let max = U512::from(U256::MAX);
        assert_eq!(U256::try_from(max), Ok(U256::MAX));

        let product = max * U512::from(2u64);
        assert!(U256::try_from(product).is_err());
        assert_eq!(U256::try_from(product / 2), Ok(U256::MAX));
    }
}
