use std::{fmt::Display, str::FromStr};

use crate::loader::error::ConfigLoadError;

/// Parses `key` through `var`, turning a malformed value into
/// [`ConfigLoadError::InvalidValue`].
pub(crate) fn parse_var<T, V>(var: &V, key: &str) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: Display,
    V: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err: T::Err| ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: err.to_string(),
        })
}
