use std::env::VarError;

use anyhow::{Result, bail};

/// Get an env var as a String; a value that isn't unicode is an
/// error, an unset var is `None`.
pub fn getenv(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(s) => Ok(Some(s)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => bail!("{name:?} env var is not unicode"),
    }
}

/// Like `getenv`, but falls back to `fallbackvalue` if the var is
/// unset, or reports an error naming the var if there's no fallback.
pub fn getenv_or(name: &str, fallbackvalue: Option<&str>) -> Result<String> {
    match (getenv(name)?, fallbackvalue) {
        (Some(s), _) => Ok(s),
        (None, Some(v)) => Ok(v.to_string()),
        (None, None) => bail!("{name:?} env var is missing and no default provided"),
    }
}

/// Interpret a flag value: empty, "0", "no", "false" and "off" are
/// false (case-insensitive), anything else is true.
pub fn flag_value(s: &str) -> bool {
    !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "0" | "no" | "false" | "off")
}
