//! Replay rules that differ between platforms or between readings of the log.

use serde::{Deserialize, Serialize};

/// How a hand is compared against a cost when listing purchase options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affordability {
    /// Every count in the hand is at least the cost
    #[default]
    Inclusive,
    /// Every count in the hand exceeds the cost
    Strict,
}

impl Affordability {
    pub fn covers(self, held: u32, cost: u32) -> bool {
        match self {
            Affordability::Inclusive => held >= cost,
            Affordability::Strict => held > cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub affordability: Affordability,
    /// Knights needed before largest army can be awarded
    pub largest_army_minimum: u32,
    /// Road length needed before longest road can be awarded
    pub longest_road_minimum: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            affordability: Affordability::Inclusive,
            largest_army_minimum: 3,
            longest_road_minimum: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affordability() {
        assert!(Affordability::Inclusive.covers(1, 1));
        assert!(!Affordability::Strict.covers(1, 1));
        assert!(Affordability::Strict.covers(2, 1));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ReplayConfig = serde_json::from_str(r#"{"affordability": "strict"}"#).unwrap();
        assert_eq!(config.affordability, Affordability::Strict);
        assert_eq!(config.largest_army_minimum, 3);
        assert_eq!(config.longest_road_minimum, 3);
    }
}
