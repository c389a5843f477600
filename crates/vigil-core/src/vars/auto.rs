//! Auto-generated process variables.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;

/// Reserved prefix for variables the runner materializes itself.
pub const AUTO_VAR_PREFIX: &str = "__runner_";

/// Name of the start-timestamp auto-variable.
pub const DATETIME_VAR: &str = "__runner_datetime";

/// Name of the process-id auto-variable.
pub const PID_VAR: &str = "__runner_pid";

/// Generates the process auto-variables from an injected clock.
///
/// The datetime layout is `YYYYMMDDHHmmSS.mmm` in UTC with milliseconds
/// truncated from nanoseconds, never rounded. The working-directory
/// auto-variable is group-scoped and assigned by the executor, so it is
/// not produced here.
///
/// # Examples
///
/// ```
/// use chrono::TimeZone;
/// use chrono::Utc;
/// use vigil_core::vars::generate_auto_vars_at;
///
/// let clock = Utc.with_ymd_and_hms(2025, 10, 5, 14, 30, 22).unwrap()
///     + chrono::Duration::nanoseconds(123_456_789);
/// let vars = generate_auto_vars_at(clock);
/// assert_eq!(vars["__runner_datetime"], "20251005143022.123");
/// ```
#[must_use]
pub fn generate_auto_vars_at(now: DateTime<Utc>) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert(
        DATETIME_VAR.to_string(),
        now.format("%Y%m%d%H%M%S%.3f").to_string(),
    );
    vars.insert(PID_VAR.to_string(), std::process::id().to_string());
    vars
}

/// Generates the process auto-variables from the wall clock.
#[must_use]
pub fn generate_auto_vars() -> BTreeMap<String, String> {
    generate_auto_vars_at(Utc::now())
}
