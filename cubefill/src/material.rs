use core::fmt;
use core::str::FromStr;

use arcstr::ArcStr;

use crate::price::{ParseDecimalError, parse_fixed, write_fixed};

// -------------------------------------------------------------------------------------------------

/// Identifier of a kind of block which can be placed in the world, such as `"stone"`.
///
/// Materials are compared by exact string equality; no normalization of case or namespace
/// is performed. Cloning a [`Material`] is cheap.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Material(ArcStr);

impl Material {
    /// Constructs a [`Material`] with the given identifier.
    pub fn new(id: impl Into<ArcStr>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Material({:?})", self.as_str())
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Material {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}
impl From<String> for Material {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}
impl From<ArcStr> for Material {
    fn from(value: ArcStr) -> Self {
        Self(value)
    }
}

// -------------------------------------------------------------------------------------------------

/// A percentage in the range 0 to 100 inclusive, with two decimal places of precision.
///
/// ```
/// use cubefill::Percent;
///
/// let p: Percent = "12.5".parse().unwrap();
/// assert_eq!(p.hundredths(), 1250);
/// assert_eq!(p.to_string(), "12.5");
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Percent(u16);

impl Percent {
    /// Number of [`Percent::hundredths()`] units in one percent.
    pub const SCALE: u16 = 100;

    /// 0%.
    pub const ZERO: Self = Self(0);
    /// 100%.
    pub const HUNDRED: Self = Self(100 * Self::SCALE);

    /// Constructs a [`Percent`] from a whole number of percent.
    pub fn whole(percent: u8) -> Result<Self, PercentError> {
        Self::from_hundredths(u16::from(percent) * Self::SCALE)
    }

    /// Constructs a [`Percent`] from hundredths of a percent; for example, `1250` is 12.5%.
    pub const fn from_hundredths(hundredths: u16) -> Result<Self, PercentError> {
        if hundredths > Self::HUNDRED.0 {
            Err(PercentError::OutOfRange)
        } else {
            Ok(Self(hundredths))
        }
    }

    /// Returns this percentage in hundredths of a percent.
    pub const fn hundredths(self) -> u16 {
        self.0
    }

    /// Returns whether this is 0%.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}%")
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, u64::from(self.0), 2, 0)
    }
}

impl FromStr for Percent {
    type Err = PercentError;

    /// Parses a decimal number such as `"75"` or `"12.5"`, optionally followed by `%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix('%').unwrap_or(s);
        if s.starts_with('-') {
            return Err(PercentError::OutOfRange);
        }
        let hundredths = parse_fixed(s, 2).map_err(PercentError::Syntax)?;
        match u16::try_from(hundredths) {
            Ok(h) => Self::from_hundredths(h),
            Err(_) => Err(PercentError::OutOfRange),
        }
    }
}

/// Error when constructing or parsing a [`Percent`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PercentError {
    /// The value was negative or greater than 100.
    #[error("percentage must be between 0 and 100")]
    OutOfRange,

    /// The text was not a decimal number with at most two decimal places.
    #[error("invalid percentage")]
    Syntax(#[source] ParseDecimalError),
}

// -------------------------------------------------------------------------------------------------

/// A material and the share of a fill it should make up.
///
/// Shares in a fill request need not sum to 100%; they are weights relative to each other.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct MaterialPercent {
    #[allow(missing_docs)]
    pub material: Material,
    #[allow(missing_docs)]
    pub percent: Percent,
}

impl MaterialPercent {
    #[allow(missing_docs)]
    pub fn new(material: impl Into<Material>, percent: Percent) -> Self {
        Self {
            material: material.into(),
            percent,
        }
    }
}

impl FromStr for MaterialPercent {
    type Err = ParseMaterialPercentError;

    /// Parses `material:percent`, such as `"stone:75"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (material, percent) = s
            .rsplit_once(':')
            .ok_or(ParseMaterialPercentError::MissingSeparator)?;
        if material.is_empty() {
            return Err(ParseMaterialPercentError::MissingMaterial);
        }
        Ok(Self::new(material, percent.parse()?))
    }
}

/// Error when parsing a [`MaterialPercent`] from text.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseMaterialPercentError {
    /// There was no `:` between the material and the percentage.
    #[error("expected `material:percent`")]
    MissingSeparator,
    /// The material was empty.
    #[error("material name is empty")]
    MissingMaterial,
    /// The percentage was invalid.
    #[error(transparent)]
    Percent(#[from] PercentError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("75", 7500)]
    #[case("12.5", 1250)]
    #[case("0.01", 1)]
    #[case("100", 10000)]
    #[case(" 25% ", 2500)]
    fn percent_parse_ok(#[case] text: &str, #[case] hundredths: u16) {
        assert_eq!(text.parse::<Percent>().unwrap().hundredths(), hundredths);
    }

    #[rstest]
    #[case("-1")]
    #[case("100.01")]
    #[case("250")]
    #[case("99999999999")]
    fn percent_parse_out_of_range(#[case] text: &str) {
        assert_eq!(text.parse::<Percent>(), Err(PercentError::OutOfRange));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1.005")]
    #[case("1.2.3")]
    fn percent_parse_syntax_error(#[case] text: &str) {
        assert!(matches!(text.parse::<Percent>(), Err(PercentError::Syntax(_))));
    }

    #[test]
    fn percent_whole_limits() {
        assert_eq!(Percent::whole(100), Ok(Percent::HUNDRED));
        assert_eq!(Percent::whole(101), Err(PercentError::OutOfRange));
        assert!(Percent::whole(0).unwrap().is_zero());
    }

    #[test]
    fn percent_display() {
        assert_eq!(Percent::whole(75).unwrap().to_string(), "75");
        assert_eq!(Percent::from_hundredths(1205).unwrap().to_string(), "12.05");
        assert_eq!(format!("{:?}", Percent::from_hundredths(50).unwrap()), "0.5%");
    }

    #[test]
    fn material_percent_parse() {
        assert_eq!(
            "minecraft:stone:12.5".parse::<MaterialPercent>(),
            Ok(MaterialPercent::new(
                "minecraft:stone",
                Percent::from_hundredths(1250).unwrap()
            ))
        );
        assert_eq!(
            "stone".parse::<MaterialPercent>(),
            Err(ParseMaterialPercentError::MissingSeparator)
        );
        assert_eq!(
            ":5".parse::<MaterialPercent>(),
            Err(ParseMaterialPercentError::MissingMaterial)
        );
    }

    #[test]
    fn material_equality_is_exact() {
        assert_eq!(Material::from("stone"), Material::new(arcstr::literal!("stone")));
        assert_ne!(Material::from("stone"), Material::from("Stone"));
        assert_eq!(format!("{:?}", Material::from("dirt")), "Material(\"dirt\")");
    }
}
