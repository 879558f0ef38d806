//! Answer validation.
//!
//! A [`Solution`] is parsed once from the catalog's `solution` object and
//! judged against player answers with [`validate`]. Coercions follow the
//! loose rules players expect from form inputs: `"42"` equals `42`, blank
//! strings count as zero, and text comparisons trim whitespace.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{instrument, warn};

/// Expected answer for one puzzle.
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    /// Case-insensitive, trimmed text.
    Exact {
        /// Expected text (or any scalar, compared as text).
        value: Value,
    },
    /// Numeric equality after coercion.
    Number {
        /// Expected number.
        value: f64,
    },
    /// Inclusive numeric range.
    Range {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Position-sensitive sequence.
    Order {
        /// Expected sequence.
        value: Vec<Value>,
    },
    /// Index-wise numeric equality.
    MultiValue {
        /// Expected numbers by position.
        values: Vec<Value>,
    },
    /// Named fields with trimmed, case-sensitive text matches.
    Blanks {
        /// Expected text per field.
        values: Map<String, Value>,
    },
    /// Order-independent selection.
    MultiChoice {
        /// Expected selection.
        values: Vec<Value>,
    },
    /// Two-dimensional grid.
    Grid {
        /// Expected rows.
        grid: Vec<Value>,
    },
    /// A kind this build does not understand. Never accepts an answer.
    Unsupported {
        /// Declared kind.
        kind: String,
    },
}

impl Solution {
    /// Parses a catalog `solution` object.
    ///
    /// Unknown kinds become [`Solution::Unsupported`]. A known kind with a
    /// missing or mistyped field is an error.
    pub fn from_spec(spec: &Value) -> Result<Self, String> {
        let kind = spec
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| "solution has no 'type'".to_string())?;

        let field = |name: &str| {
            spec.get(name)
                .ok_or_else(|| format!("'{}' solution has no '{}'", kind, name))
        };
        let number = |name: &str| {
            field(name).and_then(|v| {
                to_number(v).ok_or_else(|| format!("'{}' solution field '{}' is not numeric", kind, name))
            })
        };
        let array = |name: &str| {
            field(name).and_then(|v| {
                v.as_array()
                    .cloned()
                    .ok_or_else(|| format!("'{}' solution field '{}' is not a list", kind, name))
            })
        };

        let solution = match kind {
            "exact" => Self::Exact {
                value: field("value")?.clone(),
            },
            "number" => Self::Number {
                value: number("value")?,
            },
            "range" => Self::Range {
                min: number("min")?,
                max: number("max")?,
            },
            "order" => Self::Order {
                value: array("value")?,
            },
            "multi-value" => Self::MultiValue {
                values: array("values")?,
            },
            "blanks" => Self::Blanks {
                values: field("values")?
                    .as_object()
                    .cloned()
                    .ok_or_else(|| "'blanks' solution field 'values' is not a mapping".to_string())?,
            },
            "multi-choice" => match spec.get("values") {
                Some(_) => Self::MultiChoice {
                    values: array("values")?,
                },
                None => Self::MultiChoice {
                    values: vec![field("value")?.clone()],
                },
            },
            "grid" => Self::Grid {
                grid: array("grid")?,
            },
            other => {
                warn!(kind = other, "Unknown solution type; puzzle can never be solved");
                Self::Unsupported {
                    kind: other.to_string(),
                }
            }
        };
        Ok(solution)
    }

    /// Kind tag as written in the catalog.
    pub fn kind(&self) -> &str {
        match self {
            Self::Exact { .. } => "exact",
            Self::Number { .. } => "number",
            Self::Range { .. } => "range",
            Self::Order { .. } => "order",
            Self::MultiValue { .. } => "multi-value",
            Self::Blanks { .. } => "blanks",
            Self::MultiChoice { .. } => "multi-choice",
            Self::Grid { .. } => "grid",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// Outcome of a validation with per-field detail for composite answers.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Verdict {
    #[getter(copy)]
    correct: bool,
    /// Per-field results for `blanks` (by key) and `multi-value` (by index).
    parts: Option<BTreeMap<String, bool>>,
}

/// Returns `true` if `answer` satisfies `solution`.
pub fn validate(solution: &Solution, answer: &Value) -> bool {
    validate_detailed(solution, answer).correct
}

/// Judges `answer`, reporting per-field detail where the kind has fields.
#[instrument(skip(answer), fields(kind = solution.kind()))]
pub fn validate_detailed(solution: &Solution, answer: &Value) -> Verdict {
    let whole = |correct| Verdict {
        correct,
        parts: None,
    };

    match solution {
        Solution::Exact { value } => whole(
            to_js_string(answer).trim().to_lowercase() == to_js_string(value).trim().to_lowercase(),
        ),
        Solution::Number { value } => whole(to_number(answer) == Some(*value)),
        Solution::Range { min, max } => {
            whole(to_number(answer).is_some_and(|n| *min <= n && n <= *max))
        }
        Solution::Order { value } => whole(
            answer
                .as_array()
                .is_some_and(|given| sequences_equal(given, value)),
        ),
        Solution::MultiValue { values } => {
            let Some(given) = answer.as_array() else {
                return whole(false);
            };
            let parts: BTreeMap<String, bool> = values
                .iter()
                .enumerate()
                .map(|(i, expected)| {
                    let hit = match (given.get(i).and_then(to_number), to_number(expected)) {
                        (Some(a), Some(b)) => a == b,
                        _ => false,
                    };
                    (i.to_string(), hit)
                })
                .collect();
            Verdict {
                correct: parts.values().all(|hit| *hit),
                parts: Some(parts),
            }
        }
        Solution::Blanks { values } => {
            let Some(given) = answer.as_object() else {
                return whole(false);
            };
            let parts: BTreeMap<String, bool> = values
                .iter()
                .map(|(key, expected)| {
                    let text = given
                        .get(key)
                        .map(to_js_string)
                        .unwrap_or_else(|| "undefined".to_string());
                    (key.clone(), text.trim() == to_js_string(expected).trim())
                })
                .collect();
            Verdict {
                correct: parts.values().all(|hit| *hit),
                parts: Some(parts),
            }
        }
        Solution::MultiChoice { values } => {
            let chosen: BTreeSet<String> = match answer {
                Value::Array(items) => items.iter().map(canonical).collect(),
                Value::String(_) => std::iter::once(canonical(answer)).collect(),
                _ => return whole(false),
            };
            let expected: BTreeSet<String> = values.iter().map(canonical).collect();
            whole(chosen == expected)
        }
        Solution::Grid { grid } => whole(
            answer
                .as_array()
                .is_some_and(|given| sequences_equal(given, grid)),
        ),
        Solution::Unsupported { kind } => {
            warn!(kind = %kind, "Unknown solution type");
            whole(false)
        }
    }
}

/// Loose numeric coercion. `None` stands for "not a number".
///
/// Numbers pass through, booleans are 1/0, `null` and blank strings are 0,
/// other strings parse as decimal after trimming. An empty array is 0 and a
/// one-element array takes its element's number.
pub fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let s = s.trim();
            match s {
                "" => 0.0,
                "Infinity" | "+Infinity" => f64::INFINITY,
                "-Infinity" => f64::NEG_INFINITY,
                _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
                    return None;
                }
                _ => s.parse::<f64>().ok()?,
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] | [Value::Null] => 0.0,
            [item @ (Value::Number(_) | Value::String(_) | Value::Array(_))] => to_number(item)?,
            _ => return None,
        },
        Value::Object(_) => return None,
    };
    (!n.is_nan()).then_some(n)
}

/// Text form of a value as a form field would show it.
pub fn to_js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => format_float(f),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{:.0}", f)
    } else {
        f.to_string()
    }
}

fn canonical(value: &Value) -> String {
    match value {
        Value::Number(_) => format!("n:{}", to_js_string(value)),
        Value::String(s) => format!("s:{}", s),
        other => format!("j:{}", other),
    }
}

fn sequences_equal(given: &[Value], expected: &[Value]) -> bool {
    given.len() == expected.len() && given.iter().zip(expected).all(|(a, b)| json_equal(a, b))
}

/// Structural equality where `1` and `1.0` are the same number.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => sequences_equal(x, y),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, xv)| y.get(key).is_some_and(|yv| json_equal(xv, yv)))
        }
        _ => a == b,
    }
}
