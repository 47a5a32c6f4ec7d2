use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

// -------------------------------------------------------------------------------------------------

/// An amount of currency, as a non-negative fixed-point decimal number with four decimal places.
///
/// Arithmetic on prices saturates at [`Price::MAX`] rather than overflowing, so a total can
/// be computed for any fill; a price that large will simply never be affordable.
///
/// Prices are written and parsed as decimal text:
///
/// ```
/// use cubefill::Price;
///
/// let unit: Price = "0.50".parse().unwrap();
/// assert_eq!(unit.saturating_mul(14).to_string(), "7.00");
/// assert_eq!(Price::from_scaled(5).to_string(), "0.0005");
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Price(u64);

impl Price {
    /// Number of decimal places represented.
    pub const DECIMALS: u32 = 4;

    /// Value of [`Price::scaled()`] for a price of exactly 1.
    pub const SCALE: u64 = 10u64.pow(Self::DECIMALS);

    /// A price of zero.
    pub const ZERO: Self = Self(0);

    /// The largest representable price.
    pub const MAX: Self = Self(u64::MAX);

    /// Constructs a price from its value in units of 1/[`SCALE`](Self::SCALE).
    #[inline]
    pub const fn from_scaled(scaled: u64) -> Self {
        Self(scaled)
    }

    /// Constructs a price equal to the given whole number, saturating at [`Price::MAX`].
    #[inline]
    pub const fn from_whole(units: u64) -> Self {
        Self(units.saturating_mul(Self::SCALE))
    }

    /// Returns the value in units of 1/[`SCALE`](Self::SCALE).
    #[inline]
    pub const fn scaled(self) -> u64 {
        self.0
    }

    #[allow(missing_docs)]
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two prices, saturating at [`Price::MAX`].
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies by a [`PriceMultiplier`], rounding half a unit of the last decimal place
    /// upward and saturating at [`Price::MAX`].
    ///
    /// ```
    /// use cubefill::{Price, PriceMultiplier};
    ///
    /// let m: PriceMultiplier = "1.5".parse().unwrap();
    /// assert_eq!(Price::from_scaled(3).scaled_by(m), Price::from_scaled(5));
    /// ```
    #[inline]
    #[must_use]
    pub fn scaled_by(self, multiplier: PriceMultiplier) -> Self {
        let product = u128::from(self.0) * u128::from(multiplier.0);
        let rounded = (product + u128::from(PriceMultiplier::SCALE / 2))
            / u128::from(PriceMultiplier::SCALE);
        Self(u64::try_from(rounded).unwrap_or(u64::MAX))
    }

    /// Multiplies by a count of items, saturating at [`Price::MAX`].
    #[inline]
    #[must_use]
    pub const fn saturating_mul(self, count: u64) -> Self {
        Self(self.0.saturating_mul(count))
    }

    /// Subtracts, returning [`None`] if the result would be negative.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

/// Saturating addition.
impl Add for Price {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

/// Saturating sum.
impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Price::ZERO, Price::saturating_add)
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({self})")
    }
}

/// Writes the price with at least two decimal places, and more only if they are nonzero.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0, Self::DECIMALS, 2)
    }
}

impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(ParsePriceError::Negative);
        }
        Ok(Self(parse_fixed(s, Self::DECIMALS)?))
    }
}

/// Error when parsing a [`Price`] or [`PriceMultiplier`] from text.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ParsePriceError {
    /// The text was a negative number.
    #[error("must not be negative")]
    Negative,
    /// The text was not a suitable decimal number.
    #[error("invalid price")]
    Syntax(#[from] ParseDecimalError),
}

/// A factor by which prices are scaled, such as a tool's surcharge or discount.
///
/// Like [`Price`], it is a non-negative fixed-point decimal with four decimal places, so
/// applying it gives the same result on every platform.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PriceMultiplier(u64);

impl PriceMultiplier {
    /// Number of decimal places represented.
    pub const DECIMALS: u32 = 4;

    /// Value of [`PriceMultiplier::scaled()`] for a multiplier of exactly 1.
    pub const SCALE: u64 = 10u64.pow(Self::DECIMALS);

    /// The multiplier which leaves prices unchanged.
    pub const ONE: Self = Self(Self::SCALE);

    /// Constructs a multiplier from its value in units of 1/[`SCALE`](Self::SCALE).
    #[inline]
    pub const fn from_scaled(scaled: u64) -> Self {
        Self(scaled)
    }

    /// Returns the value in units of 1/[`SCALE`](Self::SCALE).
    #[inline]
    pub const fn scaled(self) -> u64 {
        self.0
    }
}

impl Default for PriceMultiplier {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Debug for PriceMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "×{self}")
    }
}

impl fmt::Display for PriceMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0, Self::DECIMALS, 0)
    }
}

impl FromStr for PriceMultiplier {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(ParsePriceError::Negative);
        }
        Ok(Self(parse_fixed(s, Self::DECIMALS)?))
    }
}

#[cfg(feature = "serde")]
mod serialization {
    use super::*;
    use serde::de::{self, Visitor};

    impl serde::Serialize for Price {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    /// Accepts either a decimal string, or an integer number of whole units.
    /// Floating-point numbers are rejected since they cannot represent most prices exactly.
    impl<'de> serde::Deserialize<'de> for Price {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(PriceVisitor)
        }
    }

    struct PriceVisitor;

    impl Visitor<'_> for PriceVisitor {
        type Value = Price;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal price string such as \"0.50\", or a whole number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
            v.checked_mul(Price::SCALE)
                .map(Price)
                .ok_or_else(|| E::custom("price is too large"))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::custom(ParsePriceError::Negative)),
            }
        }
    }

    impl serde::Serialize for PriceMultiplier {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    /// Accepts the same forms as [`Price`].
    impl<'de> serde::Deserialize<'de> for PriceMultiplier {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let Price(scaled) = deserializer.deserialize_any(PriceVisitor)?;
            Ok(PriceMultiplier(scaled))
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Fixed-point decimal text, shared by `Price` and `Percent`.

/// Error when parsing a fixed-point decimal number.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseDecimalError {
    /// The text contained no digits.
    #[error("no digits")]
    Empty,
    /// The text contained something other than digits and one decimal point.
    #[error("unexpected character; expected digits with an optional decimal point")]
    InvalidDigit,
    /// The text had more decimal places than the type can represent.
    #[error("too many decimal places; at most {0} are allowed")]
    TooPrecise(u32),
    /// The number was too large to represent.
    #[error("number too large")]
    Overflow,
}

/// Parses unsigned decimal text into an integer scaled by `10^decimals`.
pub(crate) fn parse_fixed(text: &str, decimals: u32) -> Result<u64, ParseDecimalError> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    if whole.is_empty() || fraction == Some("") {
        return Err(ParseDecimalError::Empty);
    }

    let digits = |s: &str| -> Result<u64, ParseDecimalError> {
        s.bytes().try_fold(0u64, |acc, byte| {
            if !byte.is_ascii_digit() {
                return Err(ParseDecimalError::InvalidDigit);
            }
            acc.checked_mul(10)
                .and_then(|acc| acc.checked_add(u64::from(byte - b'0')))
                .ok_or(ParseDecimalError::Overflow)
        })
    };

    let scale = 10u64.pow(decimals);
    let mut value = digits(whole)?
        .checked_mul(scale)
        .ok_or(ParseDecimalError::Overflow)?;
    if let Some(fraction) = fraction {
        let places = u32::try_from(fraction.len()).unwrap_or(u32::MAX);
        if places > decimals {
            // Still report garbage as garbage rather than as excess precision.
            digits(fraction)?;
            return Err(ParseDecimalError::TooPrecise(decimals));
        }
        let fraction_value = digits(fraction)? * 10u64.pow(decimals - places);
        value = value
            .checked_add(fraction_value)
            .ok_or(ParseDecimalError::Overflow)?;
    }
    Ok(value)
}

/// Writes `value / 10^decimals` as decimal text, with trailing fractional zeros
/// removed down to `min_decimals` places.
pub(crate) fn write_fixed(
    f: &mut fmt::Formatter<'_>,
    value: u64,
    decimals: u32,
    min_decimals: u32,
) -> fmt::Result {
    let scale = 10u64.pow(decimals);
    let whole = value / scale;
    let mut fraction = value % scale;
    let mut places = decimals;
    while places > min_decimals && fraction % 10 == 0 {
        fraction /= 10;
        places -= 1;
    }
    if places == 0 {
        write!(f, "{whole}")
    } else {
        write!(f, "{whole}.{fraction:0width$}", width = places as usize)
    }
}
