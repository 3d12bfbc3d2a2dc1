//! Built-in policy table
//!
//! The built-ins are plain policy definitions shipped with the binary and
//! go through the same parser and validator as any user-supplied file.

use crate::{ConfigResult, PolicyDefinition, parse_config};

/// Policies registered at start-up
const BUILTIN_POLICIES: &str = r#"
config_version = 1

# Term-time rule: flexible hours plus the Saturday afternoon session
[[policies]]
name = "term-regular"
flex_threshold = { default = 14, categories = { full-member = 14, competitor = 16 } }
regular = "sat"
window = { start = "12:00", end = "17:00" }

# Two-week stretch with raised hour targets
[[policies]]
name = "spring-intensive-2024"
flex_threshold = { default = 20, categories = { full-member = 20, competitor = 22 } }
regular = "sat"
window = { start = "12:00", end = "17:00" }

# May holiday training block
[[policies]]
name = "may-training-2024"
regular = "none"

[policies.training]
range = { from = "2024-05-02", to = "2024-05-04" }
window = { start = "09:00", end = "17:00" }

# Exam weeks: hours only
[[policies]]
name = "exam-weeks-2024"
flex_threshold = { default = 14, categories = { full-member = 14, competitor = 16 } }
regular = "none"

# October holiday training block
[[policies]]
name = "october-training-2024"
regular = "none"

[policies.training]
range = { from = "2024-10-01", to = "2024-10-04" }
window = { start = "09:00", end = "17:00" }
"#;

/// Policies registered when a registry is created with built-ins
pub fn builtin_policies() -> ConfigResult<Vec<PolicyDefinition>> {
    parse_config(BUILTIN_POLICIES).map(|config| config.policies)
}
