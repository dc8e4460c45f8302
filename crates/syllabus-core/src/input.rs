use crate::config::DurationConfig;
use crate::error::{Result, SyllabusError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// CourseRequest (upstream input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Hours(i64),
    Text(String),
}

impl From<i64> for DurationInput {
    fn from(hours: i64) -> Self {
        DurationInput::Hours(hours)
    }
}

impl From<&str> for DurationInput {
    fn from(text: &str) -> Self {
        DurationInput::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: String,
    pub duration: Option<DurationInput>,
}

impl CourseRequest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        scope: impl Into<String>,
        duration: impl Into<DurationInput>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            scope: scope.into(),
            duration: Some(duration.into()),
        }
    }

    /// Check every required field and resolve the duration to whole hours.
    /// Nothing downstream runs unless this succeeds.
    pub fn validate(&self, cfg: &DurationConfig) -> Result<ValidatedRequest> {
        let title = required("title", &self.title)?;
        let description = required("description", &self.description)?;
        let scope = required("scope", &self.scope)?;
        let hours = match &self.duration {
            None => {
                return Err(SyllabusError::MissingField {
                    field: "duration".to_string(),
                })
            }
            Some(DurationInput::Text(t)) if t.trim().is_empty() => {
                return Err(SyllabusError::MissingField {
                    field: "duration".to_string(),
                })
            }
            Some(d) => parse_duration(d, cfg)?,
        };
        Ok(ValidatedRequest {
            title,
            description,
            scope,
            hours,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyllabusError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub title: String,
    pub description: String,
    pub scope: String,
    pub hours: u32,
}

// ---------------------------------------------------------------------------
// Duration parsing
// ---------------------------------------------------------------------------

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

fn duration_re() -> &'static Regex {
    DURATION_RE.get_or_init(|| {
        Regex::new(r"(?i)([+-]?\d+)\s*(hours?|hrs?|h|weeks?|wks?|w)?\b").unwrap()
    })
}

/// Resolve a duration to a positive number of hours.
///
/// Integers are hours. Text uses its first integer, with an optional unit:
/// hours by default, or weeks multiplied by `hours_per_week`.
pub fn parse_duration(input: &DurationInput, cfg: &DurationConfig) -> Result<u32> {
    let (raw, value, unit) = match input {
        DurationInput::Hours(h) => (h.to_string(), *h, None),
        DurationInput::Text(t) => {
            let caps = duration_re()
                .captures(t)
                .ok_or_else(|| SyllabusError::InvalidDuration(t.clone()))?;
            let value: i64 = caps[1]
                .parse()
                .map_err(|_| SyllabusError::InvalidDuration(t.clone()))?;
            let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
            (t.clone(), value, unit)
        }
    };
    if value <= 0 {
        return Err(SyllabusError::InvalidDuration(raw));
    }
    let hours = match unit.as_deref() {
        Some(u) if u.starts_with('w') => value.checked_mul(i64::from(cfg.hours_per_week)),
        _ => Some(value),
    };
    hours
        .filter(|h| *h > 0)
        .and_then(|h| u32::try_from(h).ok())
        .ok_or(SyllabusError::InvalidDuration(raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DurationConfig {
        DurationConfig::default()
    }

    fn request(duration: DurationInput) -> CourseRequest {
        CourseRequest {
            title: "Data Structures".to_string(),
            description: "Lists, trees and graphs.".to_string(),
            scope: "Undergraduate computing".to_string(),
            duration: Some(duration),
        }
    }

    #[test]
    fn integer_duration_is_hours() {
        assert_eq!(parse_duration(&DurationInput::Hours(36), &cfg()).unwrap(), 36);
    }

    #[test]
    fn text_duration_units() {
        assert_eq!(parse_duration(&"40".into(), &cfg()).unwrap(), 40);
        assert_eq!(parse_duration(&"40 hours".into(), &cfg()).unwrap(), 40);
        assert_eq!(parse_duration(&"12h".into(), &cfg()).unwrap(), 12);
        assert_eq!(parse_duration(&"12 weeks".into(), &cfg()).unwrap(), 36);
        assert_eq!(parse_duration(&"about 1 Week".into(), &cfg()).unwrap(), 3);
    }

    #[test]
    fn zero_and_negative_durations_fail() {
        for bad in [
            DurationInput::Hours(0),
            DurationInput::Hours(-4),
            "0".into(),
            "-3 hours".into(),
            "a few weeks".into(),
        ] {
            let err = parse_duration(&bad, &cfg()).unwrap_err();
            assert!(matches!(err, SyllabusError::InvalidDuration(_)), "{bad:?}");
        }
    }

    #[test]
    fn validate_trims_and_resolves() {
        let mut req = request("10 hours".into());
        req.title = "  Data Structures ".to_string();
        let v = req.validate(&cfg()).unwrap();
        assert_eq!(v.title, "Data Structures");
        assert_eq!(v.hours, 10);
    }

    #[test]
    fn missing_fields_are_named() {
        let mut req = request(DurationInput::Hours(10));
        req.scope = "   ".to_string();
        match req.validate(&cfg()).unwrap_err() {
            SyllabusError::MissingField { field } => assert_eq!(field, "scope"),
            other => panic!("unexpected error: {other}"),
        }

        let mut req = request(DurationInput::Hours(10));
        req.duration = None;
        match req.validate(&cfg()).unwrap_err() {
            SyllabusError::MissingField { field } => assert_eq!(field, "duration"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn request_deserializes_string_or_integer_duration() {
        let a: CourseRequest = serde_json::from_str(
            r#"{"title":"t","description":"d","scope":"s","duration":12}"#,
        )
        .unwrap();
        assert_eq!(a.duration, Some(DurationInput::Hours(12)));
        let b: CourseRequest = serde_json::from_str(
            r#"{"title":"t","description":"d","scope":"s","duration":"12 weeks"}"#,
        )
        .unwrap();
        assert_eq!(b.duration, Some(DurationInput::Text("12 weeks".to_string())));
    }
}
