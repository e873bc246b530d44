//! Loose query-string parameter access.
//!
//! Clients send multi-valued filters as repeated keys (`a=1&a=2`), bracketed
//! keys (`a[]=1&a[]=2`), comma-joined values (`a=1,2`) or a mix of all three.

use std::collections::HashMap;

/// Decoded query-string pairs grouped by key, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    values: HashMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let key = key.strip_suffix("[]").unwrap_or(key);
            values.entry(key.to_string()).or_default().push(value.into());
        }
        Self { values }
    }

    /// Every value for `key`, comma-split, trimmed, empties dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.values
            .get(key)
            .map(|raw| {
                raw.iter()
                    .flat_map(|v| v.split(','))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The first non-empty value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// Integer value for `key`; unparsable values give `None`.
    pub fn int(&self, key: &str) -> Option<i64> {
        parse_int(self.get(key)?)
    }

    /// Boolean value for `key` with the common spellings, else `default`.
    pub fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(parse_bool).unwrap_or(default)
    }
}

/// Parses a finite integer. Whole-valued decimals such as `"5.0"` are
/// accepted because spreadsheets and form encoders produce them.
pub fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let float = value.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 {
        Some(float as i64)
    } else {
        None
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Some(true),
        "false" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}
