use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use ibc_packet_forward_proto::packetforward::v1::Params as RawParams;

use super::error::Error;
use crate::applications::transfer::amount::Amount;
use crate::bigint::{U256, U512};

/// A fixed-point decimal with 18 fractional digits, the precision cosmos
/// chains use for their decimal parameters.
///
/// Adapted from `cosmwasm-std`
///
/// <https://docs.rs/cosmwasm-std/latest/src/cosmwasm_std/math/decimal.rs.html>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(U256);

impl Decimal {
    const DECIMAL_FRACTIONAL: u64 = 1_000_000_000_000_000_000; // 1*10**18
    pub const DECIMAL_PLACES: u32 = 18;

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    pub fn one() -> Self {
        Self(Self::fractional())
    }

    /// Creates a decimal from a percentage, eg. `Decimal::percent(10)` is `0.1`.
    pub fn percent(x: u64) -> Self {
        Self(U256::from(x) * U256::from(Self::DECIMAL_FRACTIONAL / 100))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `floor(amount * self)`, or `None` when the result does not fit an amount.
    pub fn mul_floor(&self, amount: Amount) -> Option<Amount> {
        let product = U512::from(U256::from(amount)).checked_mul(U512::from(self.0))?;
        let floored = product / U512::from(Self::fractional());
        U256::try_from(floored).ok().map(Amount::from)
    }

    /// Parses the wire form of a decimal: the value scaled by 10^18 as a
    /// plain integer string, so `0.1` is `"100000000000000000"`.
    pub fn from_atomics_str(s: &str) -> Result<Self, Error> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_decimal(s.to_string()));
        }
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|_| Error::invalid_decimal(s.to_string()))
    }

    /// The wire form of the decimal, see [`Decimal::from_atomics_str`].
    pub fn to_atomics_string(&self) -> String {
        self.0.to_string()
    }

    fn fractional() -> U256 {
        U256::from(Self::DECIMAL_FRACTIONAL)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::invalid_decimal(s.to_string());
        let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

        let (whole, fractional) = s.split_once('.').unwrap_or((s, "0"));
        if !is_digits(whole)
            || !is_digits(fractional)
            || fractional.len() > Self::DECIMAL_PLACES as usize
        {
            return Err(invalid());
        }

        let whole = U256::from_dec_str(whole).map_err(|_| invalid())?;
        let fractional = U256::from_dec_str(fractional).map_err(|_| invalid())?;
        let exponent = Self::DECIMAL_PLACES as usize - s.split_once('.').map_or(1, |(_, f)| f.len());
        let fractional = fractional
            .checked_mul(U256::exp10(exponent))
            .ok_or_else(invalid)?;

        whole
            .checked_mul(Self::fractional())
            .and_then(|w| w.checked_add(fractional))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use core::fmt::Write;

        let whole = self.0 / Self::fractional();
        let fractional = self.0 % Self::fractional();

        if fractional.is_zero() {
            write!(f, "{whole}")
        } else {
            let fractional_string = format!(
                "{:0>padding$}",
                fractional.to_string(),
                padding = Self::DECIMAL_PLACES as usize
            );
            f.write_str(&whole.to_string())?;
            f.write_char('.')?;
            f.write_str(fractional_string.trim_end_matches('0'))?;
            Ok(())
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<Self>()
            .map_err(|e| serde::de::Error::custom(e.trace()))
    }
}

/// The governance-controlled parameters of the middleware.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Share of every forwarded amount paid to the community pool
    pub fee_percentage: Decimal,
}

impl Params {
    pub fn new(fee_percentage: Decimal) -> Self {
        Self { fee_percentage }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.fee_percentage > Decimal::one() {
            return Err(Error::invalid_fee_percentage(self.fee_percentage.to_string()));
        }
        Ok(())
    }
}

impl TryFrom<RawParams> for Params {
    type Error = Error;

    fn try_from(raw: RawParams) -> Result<Self, Self::Error> {
        let params = Self::new(Decimal::from_atomics_str(&raw.fee_percentage)?);
        params.validate()?;
        Ok(params)
    }
}

impl From<Params> for RawParams {
    fn from(params: Params) -> Self {
        RawParams {
            fee_percentage: params.fee_percentage.to_atomics_string(),
        }
    }
}
