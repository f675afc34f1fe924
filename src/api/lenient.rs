//! Serde helpers for legacy payloads
//!
//! Legacy decimal columns (codes, contracts, amounts) reach us as JSON
//! strings (`"4819716"`, `"125.50"`) or numbers depending on the endpoint.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value_to_code(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                // "4819716.0" style decimals with zero scale
                Some(
                    trimmed
                        .strip_suffix(".0")
                        .unwrap_or(trimmed)
                        .to_string(),
                )
            }
        }
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        _ => None,
    }
}

fn value_to_amount(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Optional identifier that may be a string or a number
pub fn opt_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_code))
}

/// List of identifiers that may be strings or numbers
pub fn code_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(value_to_code)
        .collect())
}

/// Optional amount that may be a decimal string, a number or null
pub fn opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_amount))
}

/// Count that may be a number, numeric string or null (null reads as 0)
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(value_to_amount)
        .map_or(0, |n| if n.is_sign_negative() { 0 } else { n as u64 }))
}
