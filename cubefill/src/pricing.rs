use hashbrown::HashMap;

use crate::{Distribution, Material, Price, PriceMultiplier};

// -------------------------------------------------------------------------------------------------

/// The unit price of one material, as listed in a [`PriceCatalog`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[expect(clippy::exhaustive_structs)]
pub struct BlockPrice {
    #[allow(missing_docs)]
    pub material: Material,
    /// Price of a single block of this material.
    pub price: Price,
}

impl BlockPrice {
    #[allow(missing_docs)]
    pub fn new(material: impl Into<Material>, price: Price) -> Self {
        Self {
            material: material.into(),
            price,
        }
    }
}

/// Unit prices of materials, with a default price for materials not listed.
///
/// A catalog is built once, before any fills are requested, and is then shared read-only
/// (typically in an [`Arc`](std::sync::Arc)).
#[derive(Clone, Debug)]
pub struct PriceCatalog {
    prices: HashMap<Material, Price>,
    default_price: Price,
}

impl PriceCatalog {
    /// Constructs a catalog from a default price and a list of specific prices.
    ///
    /// If a material is listed more than once, the last listing is used.
    pub fn new(default_price: Price, prices: impl IntoIterator<Item = BlockPrice>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|BlockPrice { material, price }| (material, price))
                .collect(),
            default_price,
        }
    }

    /// Validates loaded configuration and constructs a catalog from it.
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        let CatalogConfig {
            default_price,
            prices,
        } = config;
        let default_price = default_price.ok_or(CatalogError::MissingDefaultPrice)?;
        let mut table = HashMap::with_capacity(prices.len());
        for BlockPrice { material, price } in prices {
            if table.contains_key(&material) {
                return Err(CatalogError::DuplicateMaterial(material));
            }
            table.insert(material, price);
        }
        Ok(Self {
            prices: table,
            default_price,
        })
    }

    /// Returns the price used for materials which are not specifically listed.
    pub fn default_price(&self) -> Price {
        self.default_price
    }

    /// Returns the materials which have a specific listing, in no particular order.
    pub fn listed_materials(&self) -> impl Iterator<Item = &Material> + '_ {
        self.prices.keys()
    }

    /// Returns the unit price of `material`, which is the default price if it is not listed.
    pub fn price_of(&self, material: &Material) -> Price {
        self.prices
            .get(material)
            .copied()
            .unwrap_or(self.default_price)
    }

    /// Returns the total price of all the blocks in `materials`.
    pub fn total_price(&self, materials: &Distribution) -> Price {
        materials
            .iter()
            .map(|(material, count)| self.price_of(material).saturating_mul(count_u64(count)))
            .sum()
    }

    /// Returns the price of each material in `materials`, omitting those with a count of
    /// zero.
    pub fn breakdown(&self, materials: &Distribution) -> Vec<QuoteLine> {
        materials
            .iter()
            .filter(|&(_, count)| count > 0)
            .map(|(material, count)| {
                let unit_price = self.price_of(material);
                QuoteLine {
                    material: material.clone(),
                    count,
                    unit_price,
                    line_total: unit_price.saturating_mul(count_u64(count)),
                }
            })
            .collect()
    }

    /// Returns the total price of `materials` together with its [breakdown](Self::breakdown).
    pub fn quote(&self, materials: &Distribution) -> Quote {
        self.quote_scaled(materials, PriceMultiplier::ONE)
    }

    /// Like [`quote()`](Self::quote), but the total is the sum of the lines scaled by
    /// `multiplier`. The lines themselves are not scaled.
    pub fn quote_scaled(&self, materials: &Distribution, multiplier: PriceMultiplier) -> Quote {
        let lines = self.breakdown(materials);
        let subtotal: Price = lines.iter().map(|line| line.line_total).sum();
        Quote {
            total: subtotal.scaled_by(multiplier),
            subtotal,
            multiplier,
            lines,
        }
    }
}

fn count_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Serializable form of a [`PriceCatalog`], as it would appear in a configuration file.
///
/// Use [`PriceCatalog::from_config()`] to validate it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
#[expect(clippy::exhaustive_structs)]
pub struct CatalogConfig {
    /// Price of any material not listed in `prices`. Required.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_price: Option<Price>,
    /// Prices of specific materials.
    #[cfg_attr(feature = "serde", serde(default))]
    pub prices: Vec<BlockPrice>,
}

/// Error from [`PriceCatalog::from_config()`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// The configuration did not specify a default price.
    #[error("price catalog has no default price")]
    MissingDefaultPrice,
    /// The configuration listed the same material twice.
    #[error("price catalog lists material '{0}' more than once")]
    DuplicateMaterial(Material),
}

// -------------------------------------------------------------------------------------------------

/// The price of a fill, as shown to the user before they confirm it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Quote {
    total: Price,
    subtotal: Price,
    multiplier: PriceMultiplier,
    lines: Vec<QuoteLine>,
}

impl Quote {
    /// The total price of the fill; this is what the user is charged.
    pub fn total(&self) -> Price {
        self.total
    }

    /// The sum of the [lines](Self::lines), before the [multiplier](Self::multiplier).
    pub fn subtotal(&self) -> Price {
        self.subtotal
    }

    /// The factor applied to the subtotal by the tool the fill was requested with.
    pub fn multiplier(&self) -> PriceMultiplier {
        self.multiplier
    }

    /// Per-material breakdown of the total. Materials receiving no blocks are not listed.
    pub fn lines(&self) -> &[QuoteLine] {
        &self.lines
    }
}

/// One material's part of a [`Quote`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct QuoteLine {
    #[allow(missing_docs)]
    pub material: Material,
    /// Number of blocks of this material.
    pub count: usize,
    /// Price of one block of this material.
    pub unit_price: Price,
    /// `count` × `unit_price`.
    pub line_total: Price,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn counts(pairs: &[(&str, usize)]) -> Distribution {
        Distribution::from_counts(pairs.iter().map(|&(m, c)| (Material::from(m), c)))
    }

    fn catalog() -> PriceCatalog {
        PriceCatalog::new(
            p("2.00"),
            [
                BlockPrice::new("stone", p("1.00")),
                BlockPrice::new("dirt", p("0.50")),
            ],
        )
    }

    #[test]
    fn price_of_falls_back_to_default() {
        let catalog = catalog();
        assert_eq!(catalog.price_of(&"stone".into()), p("1.00"));
        assert_eq!(catalog.price_of(&"gold".into()), p("2.00"));
        // Lookup is exact.
        assert_eq!(catalog.price_of(&"Stone".into()), p("2.00"));
    }

    #[test]
    fn later_listing_wins() {
        let catalog = PriceCatalog::new(
            Price::ZERO,
            [BlockPrice::new("a", p("1")), BlockPrice::new("a", p("3"))],
        );
        assert_eq!(catalog.price_of(&"a".into()), p("3"));
    }

    #[test]
    fn quote_breakdown() {
        let materials = counts(&[("stone", 6), ("air", 0), ("dirt", 2)]);
        let quote = catalog().quote(&materials);
        assert_eq!(quote.total(), p("7.00"));
        assert_eq!(quote.total(), catalog().total_price(&materials));
        assert_eq!(
            quote.lines(),
            &[
                QuoteLine {
                    material: "stone".into(),
                    count: 6,
                    unit_price: p("1.00"),
                    line_total: p("6.00"),
                },
                QuoteLine {
                    material: "dirt".into(),
                    count: 2,
                    unit_price: p("0.50"),
                    line_total: p("1.00"),
                },
            ]
        );
    }

    #[test]
    fn scaled_quote_keeps_lines() {
        let materials = counts(&[("stone", 3), ("dirt", 1)]);
        let plain = catalog().quote(&materials);
        let scaled = catalog().quote_scaled(&materials, "1.25".parse().unwrap());
        assert_eq!(plain.multiplier(), PriceMultiplier::ONE);
        assert_eq!(plain.total(), plain.subtotal());
        assert_eq!(scaled.subtotal(), p("3.50"));
        assert_eq!(scaled.total(), p("4.375"));
        assert_eq!(scaled.lines(), plain.lines());
    }

    #[test]
    fn listed_materials() {
        let catalog = catalog();
        let mut listed: Vec<&Material> = catalog.listed_materials().collect();
        listed.sort();
        assert_eq!(listed, [&Material::from("dirt"), &Material::from("stone")]);
    }

    #[test]
    fn total_is_additive_over_disjoint_materials() {
        let catalog = catalog();
        let a: [(Material, usize); 2] = [("stone".into(), 13), ("gold".into(), 4)];
        let b: [(Material, usize); 2] = [("dirt".into(), 7), ("glass".into(), 1)];
        let both = Distribution::from_counts(a.iter().chain(&b).cloned());
        assert_eq!(
            catalog.total_price(&both),
            catalog.total_price(&Distribution::from_counts(a))
                + catalog.total_price(&Distribution::from_counts(b))
        );
    }

    #[test]
    fn total_saturates() {
        let catalog = PriceCatalog::new(Price::MAX, Vec::new());
        let materials = counts(&[("a", 2), ("b", 2)]);
        assert_eq!(catalog.total_price(&materials), Price::MAX);
    }

    #[test]
    fn config_validation() {
        assert_eq!(
            PriceCatalog::from_config(CatalogConfig::default()).unwrap_err(),
            CatalogError::MissingDefaultPrice
        );
        assert_eq!(
            PriceCatalog::from_config(CatalogConfig {
                default_price: Some(Price::ZERO),
                prices: vec![BlockPrice::new("a", p("1")), BlockPrice::new("a", p("2"))],
            })
            .unwrap_err(),
            CatalogError::DuplicateMaterial("a".into())
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() {
        let config: CatalogConfig = serde_json::from_str(indoc::indoc! {r#"
            {
                "default_price": "2.00",
                "prices": [
                    { "material": "stone", "price": "1.00" },
                    { "material": "dirt", "price": "0.5" }
                ]
            }
        "#})
        .unwrap();
        let catalog = PriceCatalog::from_config(config).unwrap();
        assert_eq!(catalog.price_of(&"dirt".into()), p("0.50"));
        assert_eq!(catalog.default_price(), p("2"));

        let config: CatalogConfig = serde_json::from_str(r#"{ "prices": [] }"#).unwrap();
        assert_eq!(
            PriceCatalog::from_config(config).unwrap_err(),
            CatalogError::MissingDefaultPrice
        );
    }
}
