//! Validated policy types
//!
//! These are the "compiled" form of the raw schema: every value has been
//! checked, so evaluation can use them without re-validating.

use chrono::{Days, NaiveDate, Weekday};
use muster_util::{Calendar, DayWindow, MemberIdStyle, PolicyName};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::schema::{RawConfig, RawPolicy};
use crate::validation::{ValidationError, validate_policy, validate_settings};

/// Default minimum gap between two retained scans, in seconds
pub const DEFAULT_FREQUENCY_FILTER_SECS: u64 = 60;

/// Validated policy file
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub policies: Vec<PolicyDefinition>,
}

impl Config {
    /// Convert a raw config, collecting every validation error
    pub fn from_raw(raw: RawConfig) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let settings = match validate_settings(&raw.settings) {
            Ok(settings) => Some(settings),
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        let mut seen = BTreeSet::new();
        let mut policies = Vec::with_capacity(raw.policies.len());
        for policy in &raw.policies {
            let name = policy.name.trim();
            if !name.is_empty() && !seen.insert(name.to_string()) {
                errors.push(ValidationError::DuplicatePolicyName(name.to_string()));
            }
            match validate_policy(policy) {
                Ok(definition) => policies.push(definition),
                Err(e) => errors.extend(e),
            }
        }

        match settings {
            Some(settings) if errors.is_empty() => Ok(Self { settings, policies }),
            _ => Err(errors),
        }
    }
}

/// Settings for one reporting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Minimum gap between two retained scans
    pub frequency_filter_secs: u64,
    /// Maps timestamps onto local days
    pub calendar: Calendar,
    pub member_id_style: MemberIdStyle,
    /// Whether the built-in policies are registered alongside the file's
    pub include_builtin: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequency_filter_secs: DEFAULT_FREQUENCY_FILTER_SECS,
            calendar: Calendar::System,
            member_id_style: MemberIdStyle::Text,
            include_builtin: true,
        }
    }
}

/// A named, validated attendance policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefinition {
    pub name: PolicyName,
    /// Minimum flexible hours; `None` means no flex check
    pub flex_threshold: Option<FlexThreshold>,
    pub regular: RegularSpec,
}

impl PolicyDefinition {
    /// Validate a raw definition; every failing field is reported
    pub fn from_raw(raw: &RawPolicy) -> Result<Self, Vec<ValidationError>> {
        validate_policy(raw)
    }

    pub fn kind(&self) -> PolicyKind {
        match self.regular {
            RegularSpec::Weekday { .. } => PolicyKind::WeeklyRegular,
            RegularSpec::Daily => PolicyKind::Daily,
            RegularSpec::None => PolicyKind::FlexibleOnly,
            RegularSpec::Training(_) => PolicyKind::TrainingWindow,
        }
    }

    /// One-line human summary, used by the CLI listings
    pub fn describe(&self) -> String {
        let flex = match &self.flex_threshold {
            Some(threshold) => format!("flex >= {}", threshold),
            None => "no flex check".to_string(),
        };
        let regular = match &self.regular {
            RegularSpec::Weekday { day, window } => format!("{} {}", day, window),
            RegularSpec::Daily => "distinct days".to_string(),
            RegularSpec::None => "no regular check".to_string(),
            RegularSpec::Training(training) => format!(
                "{} training day(s) {}",
                training.required_days().len(),
                training.window
            ),
        };
        format!("{}; {}", flex, regular)
    }
}

/// Built-in combination rule a definition falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    WeeklyRegular,
    FlexibleOnly,
    Daily,
    TrainingWindow,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyKind::WeeklyRegular => "weekly-regular",
            PolicyKind::FlexibleOnly => "flexible-only",
            PolicyKind::Daily => "daily",
            PolicyKind::TrainingWindow => "training-window",
        };
        f.write_str(s)
    }
}

/// Flexible-hour threshold, optionally per member category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexThreshold {
    default: u32,
    categories: BTreeMap<String, u32>,
}

impl FlexThreshold {
    pub fn flat(hours: u32) -> Self {
        Self {
            default: hours,
            categories: BTreeMap::new(),
        }
    }

    /// Category names are trimmed
    pub fn by_category<S: AsRef<str>>(
        default: u32,
        categories: impl IntoIterator<Item = (S, u32)>,
    ) -> Self {
        Self {
            default,
            categories: categories
                .into_iter()
                .map(|(name, hours)| (name.as_ref().trim().to_string(), hours))
                .collect(),
        }
    }

    pub fn default_hours(&self) -> u32 {
        self.default
    }

    pub fn categories(&self) -> &BTreeMap<String, u32> {
        &self.categories
    }

    /// Threshold for a category label; unknown labels get the default
    pub fn for_category(&self, category: &str) -> u32 {
        self.categories
            .get(category.trim())
            .copied()
            .unwrap_or(self.default)
    }
}

impl fmt::Display for FlexThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default)?;
        if !self.categories.is_empty() {
            let by_cat: Vec<String> = self
                .categories
                .iter()
                .map(|(name, hours)| format!("{}={}", name, hours))
                .collect();
            write!(f, " ({})", by_cat.join(", "))?;
        }
        Ok(())
    }
}

/// How regular attendance is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegularSpec {
    /// One window on a fixed weekday, binary over the whole range
    Weekday { day: Weekday, window: DayWindow },
    /// Count of distinct local days with a session
    Daily,
    /// No regular check
    None,
    /// Every required training day checked on its own
    Training(TrainingSpec),
}

/// Training days and the window each must be attended in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSpec {
    days: TrainingDays,
    required: BTreeSet<NaiveDate>,
    pub window: DayWindow,
}

impl TrainingSpec {
    pub fn new(days: TrainingDays, window: DayWindow) -> Self {
        let required = days.resolve();
        Self {
            days,
            required,
            window,
        }
    }

    pub fn days(&self) -> &TrainingDays {
        &self.days
    }

    /// Resolved set of required dates
    pub fn required_days(&self) -> &BTreeSet<NaiveDate> {
        &self.required
    }
}

/// How the training day set was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingDays {
    /// Every day of an inclusive range
    Range { from: NaiveDate, to: NaiveDate },
    /// Every `every_days`-th day of an inclusive range, starting at `from`
    Interval {
        from: NaiveDate,
        to: NaiveDate,
        every_days: u32,
    },
    /// Explicit dates
    Dates(BTreeSet<NaiveDate>),
}

impl TrainingDays {
    /// Expand into the set of dates
    pub fn resolve(&self) -> BTreeSet<NaiveDate> {
        match self {
            TrainingDays::Range { from, to } => step_dates(*from, *to, 1),
            TrainingDays::Interval {
                from,
                to,
                every_days,
            } => step_dates(*from, *to, *every_days),
            TrainingDays::Dates(dates) => dates.clone(),
        }
    }
}

fn step_dates(from: NaiveDate, to: NaiveDate, step: u32) -> BTreeSet<NaiveDate> {
    let mut dates = BTreeSet::new();
    let mut day = Some(from);
    while let Some(d) = day
        && d <= to
    {
        dates.insert(d);
        day = d.checked_add_days(Days::new(u64::from(step.max(1))));
    }
    dates
}
