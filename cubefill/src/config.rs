use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use arcstr::ArcStr;

use crate::{DEFAULT_CHUNK_SIZE, Material, PriceMultiplier, ResourcePolicy};

/// Name of the tool in [`FillConfig::default()`].
pub const DEFAULT_TOOL: &str = "wand";

/// Settings for a [`FillService`](crate::FillService).
///
/// With the `serde` feature, this can be read from a configuration file; every field is
/// optional and defaults as documented.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[expect(clippy::exhaustive_structs)]
pub struct FillConfig {
    /// Number of blocks placed per chunk. Defaults to [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: NonZeroUsize,
    /// Which resources are checked and charged. Defaults to [`ResourcePolicy::default()`].
    pub policy: ResourcePolicy,
    /// The tools users may fill with, by name. Defaults to a single unlimited tool named
    /// [`DEFAULT_TOOL`].
    ///
    /// Names are matched without regard to ASCII case, so no two should differ only in case.
    pub tools: BTreeMap<ArcStr, FillTool>,
    /// Materials which may not be used in a fill.
    pub blacklist: Vec<Material>,
}

impl FillConfig {
    /// Looks up a tool by name, ignoring ASCII case. Returns the configured name and the tool.
    pub fn tool(&self, name: &str) -> Option<(&ArcStr, &FillTool)> {
        self.tools
            .get_key_value(name)
            .or_else(|| {
                self.tools
                    .iter()
                    .find(|(tool_name, _)| tool_name.eq_ignore_ascii_case(name))
            })
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            policy: ResourcePolicy::default(),
            tools: BTreeMap::from([(ArcStr::from(DEFAULT_TOOL), FillTool::default())]),
            blacklist: Vec::new(),
        }
    }
}

/// A tool users fill with: limits on the regions it may fill, and how its fills are
/// priced. [`None`] means unlimited.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[expect(clippy::exhaustive_structs)]
pub struct FillTool {
    /// Maximum number of blocks in one fill.
    pub max_blocks: Option<usize>,
    /// Maximum size of the region along any one axis.
    pub max_distance: Option<u32>,
    /// Number of fills each user may place with this tool.
    pub max_use: Option<u32>,
    /// Factor applied to the price of every fill made with this tool.
    pub price_multiplier: PriceMultiplier,
}

impl FillTool {
    /// Returns whether a region of `volume` blocks whose largest dimension is `max_extent`
    /// is within these limits.
    pub fn allows(&self, volume: usize, max_extent: u32) -> bool {
        self.max_blocks.is_none_or(|max| volume <= max)
            && self.max_distance.is_none_or(|max| max_extent <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_limits() {
        let unlimited = FillTool::default();
        assert!(unlimited.allows(usize::MAX, u32::MAX));

        let limited = FillTool {
            max_blocks: Some(1000),
            max_distance: Some(16),
            ..FillTool::default()
        };
        assert!(limited.allows(1000, 16));
        assert!(!limited.allows(1001, 10));
        assert!(!limited.allows(17, 17));
    }

    #[test]
    fn tool_lookup_ignores_case() {
        let mut config = FillConfig::default();
        config.tools.insert(
            "GoldWand".into(),
            FillTool {
                max_use: Some(3),
                ..FillTool::default()
            },
        );

        let (name, tool) = config.tool("goldwand").unwrap();
        assert_eq!(name.as_str(), "GoldWand");
        assert_eq!(tool.max_use, Some(3));
        assert_eq!(config.tool("WAND").unwrap().0.as_str(), DEFAULT_TOOL);
        assert_eq!(config.tool("shovel"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_json() {
        use crate::ResourceKinds;
        use pretty_assertions::assert_eq;

        let config: FillConfig = serde_json::from_str(indoc::indoc! {r#"
            {
                "chunk_size": 250,
                "policy": { "at_confirm": "CURRENCY" },
                "tools": {
                    "wand": { "max_blocks": 50000 },
                    "golden_wand": { "max_use": 5, "price_multiplier": "1.5" }
                },
                "blacklist": ["bedrock", "barrier"]
            }
        "#})
        .unwrap();
        assert_eq!(
            config,
            FillConfig {
                chunk_size: NonZeroUsize::new(250).unwrap(),
                policy: ResourcePolicy {
                    at_confirm: ResourceKinds::CURRENCY,
                    ..ResourcePolicy::default()
                },
                tools: BTreeMap::from([
                    (
                        "wand".into(),
                        FillTool {
                            max_blocks: Some(50000),
                            ..FillTool::default()
                        }
                    ),
                    (
                        "golden_wand".into(),
                        FillTool {
                            max_use: Some(5),
                            price_multiplier: PriceMultiplier::from_scaled(15_000),
                            ..FillTool::default()
                        }
                    ),
                ]),
                blacklist: vec!["bedrock".into(), "barrier".into()],
            }
        );

        assert_eq!(serde_json::from_str::<FillConfig>("{}").unwrap(), FillConfig::default());
        assert!(serde_json::from_str::<FillConfig>(r#"{ "chunk_size": 0 }"#).is_err());
    }
}
