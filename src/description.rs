//! Structured metadata extraction from camera descriptions.
//!
//! Operators record deployment metadata as labeled lines in a camera's
//! free-text description ("Use case: ...", "Manufacturer: ...", and so on).
//! This parser pulls those fields out; anything missing is reported as
//! "Not Available".

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Placeholder for a field the description does not carry
pub const NOT_AVAILABLE: &str = "Not Available";

/// Fields extractable from a camera description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionFields {
    pub use_case: String,
    pub manufacturer: String,
    pub model: String,
    pub kitchen: String,
    pub line: String,
}

impl DescriptionFields {
    fn not_available() -> Self {
        Self {
            use_case: NOT_AVAILABLE.to_string(),
            manufacturer: NOT_AVAILABLE.to_string(),
            model: NOT_AVAILABLE.to_string(),
            kitchen: NOT_AVAILABLE.to_string(),
            line: NOT_AVAILABLE.to_string(),
        }
    }
}

struct FieldPatterns {
    use_case: Regex,
    manufacturer: Regex,
    model: Regex,
    kitchen: Regex,
    line: Regex,
}

fn patterns() -> &'static FieldPatterns {
    static PATTERNS: OnceLock<FieldPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FieldPatterns {
        use_case: Regex::new(r"Use case:\s*(.*?)\n").expect("valid regex"),
        manufacturer: Regex::new(r"Manufacturer:\s*(.*?)\n").expect("valid regex"),
        model: Regex::new(r"Model:\s*(.*?)\n").expect("valid regex"),
        kitchen: Regex::new(r"Kitchen:\s*(.*?)\n").expect("valid regex"),
        // Line may be the last field, with no trailing newline
        line: Regex::new(r"Line:\s*(.*?)(?:\n|$)").expect("valid regex"),
    })
}

fn capture(pattern: &Regex, description: &str) -> String {
    pattern
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Extract the structured fields from a camera description.
pub fn extract_fields(description: Option<&str>) -> DescriptionFields {
    let description = match description {
        Some(d) if !d.is_empty() => d,
        _ => return DescriptionFields::not_available(),
    };

    let patterns = patterns();
    DescriptionFields {
        use_case: capture(&patterns.use_case, description),
        manufacturer: capture(&patterns.manufacturer, description),
        model: capture(&patterns.model, description),
        kitchen: capture(&patterns.kitchen, description),
        line: capture(&patterns.line, description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_description() {
        let description = "Use case: Spill detection\nManufacturer: Axis\nModel: P3245\nKitchen: North\nLine: 3";
        let fields = extract_fields(Some(description));
        assert_eq!(fields.use_case, "Spill detection");
        assert_eq!(fields.manufacturer, "Axis");
        assert_eq!(fields.model, "P3245");
        assert_eq!(fields.kitchen, "North");
        assert_eq!(fields.line, "3");
    }

    #[test]
    fn test_line_with_trailing_newline() {
        let fields = extract_fields(Some("Line: 7\n"));
        assert_eq!(fields.line, "7");
    }

    #[test]
    fn test_partial_description() {
        let fields = extract_fields(Some("Manufacturer: Bosch\nModel: FLEXIDOME\n"));
        assert_eq!(fields.use_case, NOT_AVAILABLE);
        assert_eq!(fields.manufacturer, "Bosch");
        assert_eq!(fields.model, "FLEXIDOME");
        assert_eq!(fields.kitchen, NOT_AVAILABLE);
        assert_eq!(fields.line, NOT_AVAILABLE);
    }

    #[test]
    fn test_missing_description() {
        assert_eq!(extract_fields(None), DescriptionFields::not_available());
        assert_eq!(extract_fields(Some("")), DescriptionFields::not_available());
    }
}
