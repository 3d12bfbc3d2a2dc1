//! Policy validation
//!
//! Raw definitions are checked field by field and every failure is
//! collected, so one pass reports everything wrong with a definition.

use chrono::{FixedOffset, NaiveDate, Weekday};
use muster_util::{Calendar, DayWindow, MemberIdStyle, PolicyName, TimeOfDay, weekday_from_index};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::policy::{
    DEFAULT_FREQUENCY_FILTER_SECS, FlexThreshold, PolicyDefinition, RegularSpec, Settings,
    TrainingDays, TrainingSpec,
};
use crate::schema::{
    RawCategoryThreshold, RawConfig, RawFlexThreshold, RawPolicy, RawRegular, RawSettings,
    RawTimeOfDay, RawTraining, RawWindow,
};

/// Longest training day set a definition may expand to
pub const MAX_TRAINING_SPAN_DAYS: i64 = 3660;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Policy '{policy}': {field}: {message}")]
    InvalidField {
        policy: String,
        field: String,
        message: String,
    },

    #[error("Duplicate policy name: {0}")]
    DuplicatePolicyName(String),

    #[error("Settings: {field}: {message}")]
    InvalidSetting { field: String, message: String },
}

impl ValidationError {
    /// Path of the offending field, if the error is about one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::InvalidField { field, .. }
            | ValidationError::InvalidSetting { field, .. } => Some(field),
            ValidationError::DuplicatePolicyName(_) => None,
        }
    }
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    match crate::Config::from_raw(config.clone()) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

/// Collects field errors for one policy
struct FieldErrors {
    policy: String,
    errors: Vec<ValidationError>,
}

impl FieldErrors {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::InvalidField {
            policy: self.policy.clone(),
            field: field.into(),
            message: message.into(),
        });
    }

    /// Keep the value, or record the error under `field`
    fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }
}

enum ParsedRegular {
    Weekday(Weekday),
    Daily,
    None,
}

/// Validate and convert one raw policy definition
pub fn validate_policy(raw: &RawPolicy) -> Result<PolicyDefinition, Vec<ValidationError>> {
    let mut errs = FieldErrors {
        policy: raw.name.trim().to_string(),
        errors: Vec::new(),
    };

    let name = PolicyName::new(&raw.name);
    if name.is_none() {
        errs.push("name", "must not be empty");
    }

    let flex_threshold = match &raw.flex_threshold {
        Some(raw_flex) => parse_flex_threshold(raw_flex, &mut errs),
        None => None,
    };

    let regular = match &raw.regular {
        Some(r) => errs.check("regular", parse_regular(r)),
        None => None,
    };

    let window = match &raw.window {
        Some(w) => parse_window(w, "window", &mut errs),
        None => None,
    };

    let spec = match &raw.training {
        Some(training) => {
            if matches!(regular, Some(ParsedRegular::Weekday(_) | ParsedRegular::Daily)) {
                errs.push(
                    "regular",
                    "cannot be combined with training; omit it or use \"none\"",
                );
            }
            if raw.flex_threshold.is_some() {
                errs.push("flex_threshold", "not used by training policies");
            }
            if raw.window.is_some() {
                errs.push("window", "training policies take their window from training.window");
            }
            parse_training(training, &mut errs).map(RegularSpec::Training)
        }
        None => match (regular, &raw.regular) {
            (Some(ParsedRegular::Weekday(day)), _) => match (window, &raw.window) {
                (Some(window), _) => Some(RegularSpec::Weekday { day, window }),
                (None, None) => {
                    errs.push("window", "is required for a fixed weekday");
                    None
                }
                // Already reported
                (None, Some(_)) => None,
            },
            (Some(other), _) => {
                if raw.window.is_some() {
                    errs.push("window", "only applies to a fixed weekday or training");
                }
                Some(match other {
                    ParsedRegular::Daily => RegularSpec::Daily,
                    _ => RegularSpec::None,
                })
            }
            (None, None) => {
                errs.push(
                    "regular",
                    "is required: a weekday, \"daily\" or \"none\" (or give training)",
                );
                None
            }
            (None, Some(_)) => None,
        },
    };

    match (name, spec) {
        (Some(name), Some(regular)) if errs.errors.is_empty() => Ok(PolicyDefinition {
            name,
            flex_threshold,
            regular,
        }),
        _ => Err(errs.errors),
    }
}

fn parse_flex_threshold(raw: &RawFlexThreshold, errs: &mut FieldErrors) -> Option<FlexThreshold> {
    match raw {
        RawFlexThreshold::Flat(hours) => errs
            .check("flex_threshold", parse_hours(*hours))
            .map(FlexThreshold::flat),
        RawFlexThreshold::ByCategory(RawCategoryThreshold {
            default,
            categories,
        }) => {
            let default = errs.check("flex_threshold.default", parse_hours(*default));
            let mut parsed = Vec::with_capacity(categories.len());
            for (category, hours) in categories {
                if category.trim().is_empty() {
                    errs.push("flex_threshold.categories", "category names must not be empty");
                    continue;
                }
                let field = format!("flex_threshold.categories.{}", category.trim());
                if let Some(hours) = errs.check(&field, parse_hours(*hours)) {
                    parsed.push((category.as_str(), hours));
                }
            }
            default.map(|default| FlexThreshold::by_category(default, parsed))
        }
    }
}

fn parse_hours(hours: i64) -> Result<u32, String> {
    u32::try_from(hours).map_err(|_| format!("must be a non-negative hour count, got {}", hours))
}

fn parse_regular(raw: &RawRegular) -> Result<ParsedRegular, String> {
    match raw {
        RawRegular::Index(index) => u8::try_from(*index)
            .ok()
            .and_then(weekday_from_index)
            .map(ParsedRegular::Weekday)
            .ok_or_else(|| format!("weekday index must be 0-6 (0 = Monday), got {}", index)),
        RawRegular::Token(token) => match token.trim().to_lowercase().as_str() {
            "daily" => Ok(ParsedRegular::Daily),
            "none" => Ok(ParsedRegular::None),
            other => parse_weekday(other).map(ParsedRegular::Weekday),
        },
    }
}

/// Parse a day token such as `sat` or `saturday`
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    match s.trim().to_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        "sun" | "sunday" => Ok(Weekday::Sun),
        other => Err(format!(
            "unknown day '{}': expected 0-6, mon..sun, \"daily\" or \"none\"",
            other
        )),
    }
}

fn parse_window(raw: &RawWindow, field: &str, errs: &mut FieldErrors) -> Option<DayWindow> {
    let start = errs.check(&format!("{}.start", field), parse_time_of_day(&raw.start));
    let end = errs.check(&format!("{}.end", field), parse_time_of_day(&raw.end));
    let (start, end) = (start?, end?);
    let window = DayWindow::new(start, end);
    if window.is_none() {
        errs.push(
            field,
            format!("start {} must be before end {}", start, end),
        );
    }
    window
}

/// Parse a time of day given as seconds since midnight or as a clock string
pub fn parse_time_of_day(raw: &RawTimeOfDay) -> Result<TimeOfDay, String> {
    match raw {
        RawTimeOfDay::Seconds(secs) => u32::try_from(*secs)
            .ok()
            .and_then(TimeOfDay::from_seconds)
            .ok_or_else(|| format!("seconds-of-day must be 0-86400, got {}", secs)),
        RawTimeOfDay::Clock(s) => parse_time(s),
    }
}

/// Parse `HH:MM` or `HH:MM:SS`; `24:00` is the end of the day
pub fn parse_time(s: &str) -> Result<TimeOfDay, String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(format!("expected HH:MM or HH:MM:SS, got '{}'", s));
    }

    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| format!("invalid hour in '{}'", s))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| format!("invalid minute in '{}'", s))?;
    let second: u32 = match parts.get(2) {
        Some(sec) => sec.parse().map_err(|_| format!("invalid second in '{}'", s))?,
        None => 0,
    };

    TimeOfDay::from_hms(hour, minute, second)
        .ok_or_else(|| format!("'{}' is not a time of day between 00:00 and 24:00", s))
}

/// Parse `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("expected a YYYY-MM-DD date, got '{}'", s))
}

fn parse_training(raw: &RawTraining, errs: &mut FieldErrors) -> Option<TrainingSpec> {
    let given = [raw.range.is_some(), raw.interval.is_some(), raw.days.is_some()]
        .iter()
        .filter(|g| **g)
        .count();
    if given != 1 {
        errs.push("training", "exactly one of range, interval or days must be given");
    }

    let window = match &raw.window {
        Some(w) => parse_window(w, "training.window", errs),
        None => {
            errs.push("training.window", "is required");
            None
        }
    };

    let days = if let Some(range) = &raw.range {
        parse_date_span(&range.from, &range.to, "training.range", errs)
            .map(|(from, to)| TrainingDays::Range { from, to })
    } else if let Some(interval) = &raw.interval {
        let span = parse_date_span(&interval.from, &interval.to, "training.interval", errs);
        let every_days = match u32::try_from(interval.every_days) {
            Ok(n) if n > 0 => Some(n),
            _ => {
                errs.push(
                    "training.interval.every_days",
                    format!("must be positive, got {}", interval.every_days),
                );
                None
            }
        };
        match (span, every_days) {
            (Some((from, to)), Some(every_days)) => Some(TrainingDays::Interval {
                from,
                to,
                every_days,
            }),
            _ => None,
        }
    } else if let Some(list) = &raw.days {
        if list.is_empty() {
            errs.push("training.days", "must not be empty");
        }
        let mut dates = BTreeSet::new();
        let mut ok = true;
        for (i, day) in list.iter().enumerate() {
            match parse_date(day) {
                Ok(date) => {
                    dates.insert(date);
                }
                Err(e) => {
                    errs.push(format!("training.days[{}]", i), e);
                    ok = false;
                }
            }
        }
        (ok && !dates.is_empty()).then_some(TrainingDays::Dates(dates))
    } else {
        None
    };

    Some(TrainingSpec::new(days?, window?))
}

fn parse_date_span(
    from: &str,
    to: &str,
    field: &str,
    errs: &mut FieldErrors,
) -> Option<(NaiveDate, NaiveDate)> {
    let from = errs.check(&format!("{}.from", field), parse_date(from));
    let to = errs.check(&format!("{}.to", field), parse_date(to));
    let (from, to) = (from?, to?);

    if to < from {
        errs.push(
            format!("{}.to", field),
            format!("{} is before {}.from {}", to, field, from),
        );
        return None;
    }
    if (to - from).num_days() > MAX_TRAINING_SPAN_DAYS {
        errs.push(
            field,
            format!("spans more than {} days", MAX_TRAINING_SPAN_DAYS),
        );
        return None;
    }
    Some((from, to))
}

/// Validate and convert the run settings
pub fn validate_settings(raw: &RawSettings) -> Result<Settings, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut invalid = |field: &str, message: String| {
        errors.push(ValidationError::InvalidSetting {
            field: field.to_string(),
            message,
        })
    };

    let defaults = Settings::default();

    let frequency_filter_secs = match raw.frequency_filter_seconds {
        Some(secs) => u64::try_from(secs).unwrap_or_else(|_| {
            invalid(
                "frequency_filter_seconds",
                format!("must be non-negative, got {}", secs),
            );
            DEFAULT_FREQUENCY_FILTER_SECS
        }),
        None => DEFAULT_FREQUENCY_FILTER_SECS,
    };

    let calendar = match &raw.utc_offset {
        Some(offset) => parse_utc_offset(offset).unwrap_or_else(|e| {
            invalid("utc_offset", e);
            defaults.calendar
        }),
        None => defaults.calendar,
    };

    let member_id_style = match &raw.member_id_style {
        Some(style) => style.parse::<MemberIdStyle>().unwrap_or_else(|e| {
            invalid("member_id_style", e);
            defaults.member_id_style
        }),
        None => defaults.member_id_style,
    };

    let settings = Settings {
        frequency_filter_secs,
        calendar,
        member_id_style,
        include_builtin: raw.include_builtin.unwrap_or(defaults.include_builtin),
    };

    if errors.is_empty() {
        Ok(settings)
    } else {
        Err(errors)
    }
}

/// Parse `UTC`, `Z`, `+HH:MM`, `-HH:MM` or `+HH` into a fixed calendar
pub fn parse_utc_offset(s: &str) -> Result<Calendar, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return Ok(Calendar::utc());
    }

    let err = || format!("expected a UTC offset like +08:00, got '{}'", s);
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(err()),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| err())?;
    let minutes: i32 = minutes.parse().map_err(|_| err())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(err());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(Calendar::Fixed)
        .ok_or_else(err)
}
