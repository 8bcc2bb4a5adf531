//! Lenient field decoders for provider JSON that mixes numbers and numeric strings.

use intercept_core::time::parse_epoch;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Epochs arrive as JD numbers, timestamps, or dates with a fractional day (`2024-10-17.5`).
pub(crate) fn lenient_epoch<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(text)) => parse_fractional_date(&text),
        None => None,
    })
}

pub(crate) fn parse_fractional_date(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(jd) = parse_epoch(text) {
        return Some(jd);
    }
    let (date, fraction) = text.rsplit_once('.')?;
    let midnight = parse_epoch(date).ok()?;
    let fraction: f64 = format!("0.{fraction}").parse().ok()?;
    Some(midnight + fraction)
}
