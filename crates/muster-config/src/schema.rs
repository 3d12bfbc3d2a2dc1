//! Raw policy schema (as parsed from TOML or JSON)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw policy file as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Run settings
    #[serde(default)]
    pub settings: RawSettings,

    /// Policy definitions, registered alongside the built-ins
    #[serde(default)]
    pub policies: Vec<RawPolicy>,
}

/// Settings for one reporting run
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    /// Minimum gap between two retained scans (default: 60)
    pub frequency_filter_seconds: Option<i64>,

    /// Fixed UTC offset for local days, e.g. "+08:00" (default: system zone)
    pub utc_offset: Option<String>,

    /// "text" or "numeric" (default: text)
    pub member_id_style: Option<String>,

    /// Register the built-in policies (default: true)
    pub include_builtin: Option<bool>,
}

/// Raw policy definition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicy {
    /// Unique policy name
    pub name: String,

    /// Minimum flexible hours, flat or per category
    #[serde(default)]
    pub flex_threshold: Option<RawFlexThreshold>,

    /// Weekday index (0 = Monday), day token like "sat", "daily" or "none"
    #[serde(default)]
    pub regular: Option<RawRegular>,

    /// Required window for a fixed weekday
    #[serde(default)]
    pub window: Option<RawWindow>,

    /// Training days and their window
    #[serde(default)]
    pub training: Option<RawTraining>,
}

/// Flexible-hour threshold
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawFlexThreshold {
    Flat(i64),
    ByCategory(RawCategoryThreshold),
}

/// Per-category hours with a fallback for unlisted categories
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawCategoryThreshold {
    pub default: i64,
    #[serde(default)]
    pub categories: BTreeMap<String, i64>,
}

/// Regular attendance specification
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawRegular {
    Index(i64),
    Token(String),
}

/// Time-of-day window
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawWindow {
    pub start: RawTimeOfDay,
    pub end: RawTimeOfDay,
}

/// Time of day: seconds since midnight, or "HH:MM" / "HH:MM:SS"
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTimeOfDay {
    Seconds(i64),
    Clock(String),
}

/// Training days; exactly one of `range`, `interval` or `days`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawTraining {
    #[serde(default)]
    pub range: Option<RawDateRange>,

    #[serde(default)]
    pub interval: Option<RawInterval>,

    /// Explicit dates, "YYYY-MM-DD"
    #[serde(default)]
    pub days: Option<Vec<String>>,

    #[serde(default)]
    pub window: Option<RawWindow>,
}

/// Inclusive date range, "YYYY-MM-DD"
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawDateRange {
    pub from: String,
    pub to: String,
}

/// Every n-th day of an inclusive date range, starting at `from`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawInterval {
    pub from: String,
    pub to: String,
    pub every_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_weekly_policy() {
        let toml_str = r#"
            config_version = 1

            [[policies]]
            name = "weekend-lab"
            flex_threshold = { default = 14, categories = { competitor = 16 } }
            regular = "sat"
            window = { start = "12:00", end = "17:00" }
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.policies.len(), 1);
        assert_eq!(config.policies[0].name, "weekend-lab");
        assert!(matches!(
            &config.policies[0].flex_threshold,
            Some(RawFlexThreshold::ByCategory(t)) if t.default == 14 && t.categories["competitor"] == 16
        ));
        assert!(matches!(&config.policies[0].regular, Some(RawRegular::Token(t)) if t == "sat"));
    }

    #[test]
    fn parse_training_policy() {
        let toml_str = r#"
            config_version = 1

            [settings]
            frequency_filter_seconds = 120
            utc_offset = "+08:00"

            [[policies]]
            name = "camp"

            [policies.training]
            interval = { from = "2025-01-20", to = "2025-02-05", every_days = 2 }
            window = { start = 32400, end = "17:00" }
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.settings.frequency_filter_seconds, Some(120));
        let training = config.policies[0].training.as_ref().unwrap();
        assert_eq!(training.interval.as_ref().unwrap().every_days, 2);
        let window = training.window.as_ref().unwrap();
        assert!(matches!(window.start, RawTimeOfDay::Seconds(32400)));
        assert!(matches!(&window.end, RawTimeOfDay::Clock(c) if c == "17:00"));
    }

    #[test]
    fn flat_threshold_and_numeric_weekday() {
        let toml_str = r#"
            config_version = 1

            [[policies]]
            name = "flat"
            flex_threshold = 20
            regular = 5
            window = { start = "12:00", end = "17:00" }
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.policies[0].flex_threshold, Some(RawFlexThreshold::Flat(20))));
        assert!(matches!(config.policies[0].regular, Some(RawRegular::Index(5))));
    }

    #[test]
    fn unknown_policy_fields_are_rejected() {
        let toml_str = r#"
            config_version = 1

            [[policies]]
            name = "typo"
            flex_treshold = 14
        "#;

        assert!(toml::from_str::<RawConfig>(toml_str).is_err());
    }

    #[test]
    fn unknown_threshold_keys_are_rejected() {
        let toml_str = r#"
            config_version = 1

            [[policies]]
            name = "typo"
            flex_threshold = { default = 14, categorys = { competitor = 16 } }
            regular = "none"
        "#;

        assert!(toml::from_str::<RawConfig>(toml_str).is_err());
    }
}
