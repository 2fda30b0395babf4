//! String to scalar coercion for formats whose syntax only carries text

use crate::model::CellValue;

/// Which coercion rules are active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoercionPolicy {
    /// Tabular notation: empty/`null` become null and quoted literals are unwrapped
    #[default]
    Tabular,
    /// Markup formats (XML, HTML, Markdown): no null or quoted-literal rule
    Markup,
}

impl CoercionPolicy {
    /// Classify a token, stopping at the first rule that matches
    pub fn coerce(self, token: &str) -> CellValue {
        let trimmed = token.trim();

        if self == CoercionPolicy::Tabular
            && (trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null"))
        {
            return CellValue::Null;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        if self == CoercionPolicy::Tabular {
            if let Some(inner) = quoted_literal(trimmed) {
                return CellValue::String(inner.replace("\"\"", "\""));
            }
        }

        if is_digits(trimmed) {
            if let Ok(i) = trimmed.parse::<i64>() {
                return CellValue::Int(i);
            }
        }

        if looks_numeric(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return CellValue::Float(f);
            }
        }

        CellValue::String(trimmed.to_string())
    }
}

/// Coerce with the tabular notation rules
pub fn coerce(token: &str) -> CellValue {
    CoercionPolicy::Tabular.coerce(token)
}

/// Coerce with the markup rules
pub fn coerce_markup(token: &str) -> CellValue {
    CoercionPolicy::Markup.coerce(token)
}

fn quoted_literal(s: &str) -> Option<&str> {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// Keeps `inf`/`nan` words out of the float rule
fn looks_numeric(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_and_empty() {
        assert_eq!(coerce(""), CellValue::Null);
        assert_eq!(coerce("  "), CellValue::Null);
        assert_eq!(coerce("null"), CellValue::Null);
        assert_eq!(coerce("NULL"), CellValue::Null);
    }

    #[test]
    fn test_booleans_any_case() {
        assert_eq!(coerce("true"), CellValue::Bool(true));
        assert_eq!(coerce("TRUE"), CellValue::Bool(true));
        assert_eq!(coerce("False"), CellValue::Bool(false));
    }

    #[test]
    fn test_quoted_literal_bypasses_coercion() {
        assert_eq!(coerce("\"42\""), CellValue::from("42"));
        assert_eq!(coerce("\"true\""), CellValue::from("true"));
        assert_eq!(coerce("\"say \"\"hi\"\"\""), CellValue::from("say \"hi\""));
        assert_eq!(coerce("\"\""), CellValue::from(""));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce("42"), CellValue::Int(42));
        assert_eq!(coerce("3.14"), CellValue::Float(3.14));
        assert_eq!(coerce("1e3"), CellValue::Float(1000.0));

        // Signed digits are not integers
        match coerce("-5") {
            CellValue::Float(f) => assert_eq!(f, -5.0),
            other => panic!("expected float, got {other:?}"),
        }
        assert!(matches!(coerce("+7"), CellValue::Float(_)));

        // Too large for i64
        assert!(matches!(coerce("99999999999999999999"), CellValue::Float(_)));
    }

    #[test]
    fn test_strings_fall_through() {
        assert_eq!(coerce("hello"), CellValue::from("hello"));
        assert_eq!(coerce("inf"), CellValue::from("inf"));
        assert_eq!(coerce("NaN"), CellValue::from("NaN"));
        assert_eq!(coerce("1.2.3"), CellValue::from("1.2.3"));
        assert_eq!(coerce("  padded "), CellValue::from("padded"));
    }

    #[test]
    fn test_markup_policy() {
        assert_eq!(coerce_markup(""), CellValue::from(""));
        assert_eq!(coerce_markup("null"), CellValue::from("null"));
        assert_eq!(coerce_markup("\"42\""), CellValue::from("\"42\""));
        assert_eq!(coerce_markup("7"), CellValue::Int(7));
        assert_eq!(coerce_markup("true"), CellValue::Bool(true));
    }
}
