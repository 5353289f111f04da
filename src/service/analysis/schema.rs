//! Output schema for claim analysis
//!
//! The same field table drives the format instructions embedded in the prompt
//! and the validation of the provider's raw text.

use std::collections::HashMap;

use serde_json::{Map, Value};
use url::Url;

use crate::model::{AnalysisResult, Icon};

pub const FACT_SCORE: &str = "factScore";
pub const EXPLANATION: &str = "explanation";
pub const ICON_KEY: &str = "iconKey";
pub const SOURCE_URL: &str = "sourceUrl";
pub const RELEVANT: &str = "relevant";

/// Type and validation rule of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer within an inclusive range
    Integer { min: i64, max: i64 },
    /// Non-empty text with a word limit
    Text { max_words: usize },
    /// Index into the icon catalog
    IconIndex,
    /// Absolute http(s) URL
    Url,
    Boolean,
}

impl FieldKind {
    fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Integer { .. } | FieldKind::IconIndex => "integer",
            FieldKind::Text { .. } | FieldKind::Url => "string",
            FieldKind::Boolean => "boolean",
        }
    }
}

/// One field of the provider output contract
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

/// Fields the provider must return for every claim
pub const ANALYSIS_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: FACT_SCORE,
        kind: FieldKind::Integer { min: 0, max: 100 },
        description: "How historically accurate the claim is, from 0 (false) to 100 (fully accurate). Use your best judgement.",
    },
    FieldSpec {
        name: EXPLANATION,
        kind: FieldKind::Text { max_words: 200 },
        description: "Why the claim received this score, referencing the historical evidence. At most 200 words.",
    },
    FieldSpec {
        name: ICON_KEY,
        kind: FieldKind::IconIndex,
        description: "Index of the icon that best matches the topic of the claim.",
    },
    FieldSpec {
        name: SOURCE_URL,
        kind: FieldKind::Url,
        description: "URL of a reputable source supporting the explanation.",
    },
    FieldSpec {
        name: RELEVANT,
        kind: FieldKind::Boolean,
        description: "true if the claim is about history, false otherwise. Fill in every other field either way.",
    },
];

/// Reasons raw provider text fails the schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaViolation {
    #[error("no JSON object found in provider output")]
    NoJsonObject,

    #[error("provider output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not a valid {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' value {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("field '{field}' value {value} is not a known icon index")]
    UnknownIcon { field: &'static str, value: i64 },

    #[error("field '{field}' is empty")]
    Empty { field: &'static str },

    #[error("field '{field}' has {words} words, limit is {max_words}")]
    TooLong {
        field: &'static str,
        words: usize,
        max_words: usize,
    },

    #[error("field '{field}' is not an absolute http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
}

/// A field value after coercion and validation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Icon(Icon),
    Url(String),
    Boolean(bool),
}

/// All schema fields of one provider response, validated
#[derive(Debug, Default)]
pub struct ValidatedFields {
    values: HashMap<&'static str, FieldValue>,
}

impl ValidatedFields {
    fn get(&self, name: &'static str) -> Result<&FieldValue, SchemaViolation> {
        self.values
            .get(name)
            .ok_or(SchemaViolation::MissingField(name))
    }

    pub fn integer(&self, name: &'static str) -> Result<i64, SchemaViolation> {
        match self.get(name)? {
            FieldValue::Integer(v) => Ok(*v),
            _ => Err(SchemaViolation::WrongType {
                field: name,
                expected: "integer",
            }),
        }
    }

    pub fn text(&self, name: &'static str) -> Result<String, SchemaViolation> {
        match self.get(name)? {
            FieldValue::Text(v) | FieldValue::Url(v) => Ok(v.clone()),
            _ => Err(SchemaViolation::WrongType {
                field: name,
                expected: "string",
            }),
        }
    }

    pub fn icon(&self, name: &'static str) -> Result<Icon, SchemaViolation> {
        match self.get(name)? {
            FieldValue::Icon(v) => Ok(*v),
            _ => Err(SchemaViolation::WrongType {
                field: name,
                expected: "icon index",
            }),
        }
    }

    pub fn boolean(&self, name: &'static str) -> Result<bool, SchemaViolation> {
        match self.get(name)? {
            FieldValue::Boolean(v) => Ok(*v),
            _ => Err(SchemaViolation::WrongType {
                field: name,
                expected: "boolean",
            }),
        }
    }
}

/// Render formatting instructions for the provider from a schema
pub fn format_instructions(schema: &[FieldSpec]) -> String {
    let mut out = String::from(
        "The output must be a single JSON object with exactly the fields below. \
         Every field is required. Do not add commentary outside the JSON object.\n\n{\n",
    );

    for (i, field) in schema.iter().enumerate() {
        let constraint = match field.kind {
            FieldKind::Integer { min, max } => format!(" between {} and {}", min, max),
            FieldKind::Text { max_words } => format!(", at most {} words", max_words),
            FieldKind::IconIndex => format!(
                ", one of: {}",
                Icon::ALL
                    .iter()
                    .map(|icon| format!("{} {} ({})", icon.index(), icon.name(), icon.topic()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            FieldKind::Url => ", an absolute https URL".to_string(),
            FieldKind::Boolean => String::new(),
        };
        let separator = if i + 1 < schema.len() { "," } else { "" };
        out.push_str(&format!(
            "  \"{}\": <{}{}>{}  // {}\n",
            field.name,
            field.kind.type_name(),
            constraint,
            separator,
            field.description
        ));
    }

    out.push('}');
    out
}

/// Validate raw provider text against a schema
pub fn validate(schema: &[FieldSpec], raw: &str) -> Result<ValidatedFields, SchemaViolation> {
    let object = extract_json_object(raw)?;
    let mut fields = ValidatedFields::default();

    for field in schema {
        let value = object
            .get(field.name)
            .filter(|v| !v.is_null())
            .ok_or(SchemaViolation::MissingField(field.name))?;
        let validated = validate_field(field, value)?;
        fields.values.insert(field.name, validated);
    }

    Ok(fields)
}

/// Parse raw provider text into an [`AnalysisResult`]
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, SchemaViolation> {
    let fields = validate(ANALYSIS_SCHEMA, raw)?;

    let fact_score = fields.integer(FACT_SCORE)?;
    let fact_score = u8::try_from(fact_score).map_err(|_| SchemaViolation::OutOfRange {
        field: FACT_SCORE,
        value: fact_score,
        min: 0,
        max: 100,
    })?;

    Ok(AnalysisResult {
        fact_score,
        explanation: fields.text(EXPLANATION)?,
        icon: fields.icon(ICON_KEY)?,
        source_url: fields.text(SOURCE_URL)?,
        relevant: fields.boolean(RELEVANT)?,
    })
}

/// Locate the outermost JSON object in free-form text (tolerates code fences
/// and stray prose around the object)
fn extract_json_object(raw: &str) -> Result<Map<String, Value>, SchemaViolation> {
    let start = raw.find('{').ok_or(SchemaViolation::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(SchemaViolation::NoJsonObject)?;
    if end < start {
        return Err(SchemaViolation::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SchemaViolation::NoJsonObject),
        Err(e) => Err(SchemaViolation::InvalidJson(e.to_string())),
    }
}

fn validate_field(field: &FieldSpec, value: &Value) -> Result<FieldValue, SchemaViolation> {
    let name = field.name;
    match field.kind {
        FieldKind::Integer { min, max } => {
            let v = coerce_integer(value).ok_or(SchemaViolation::WrongType {
                field: name,
                expected: "integer",
            })?;
            if v < min || v > max {
                return Err(SchemaViolation::OutOfRange {
                    field: name,
                    value: v,
                    min,
                    max,
                });
            }
            Ok(FieldValue::Integer(v))
        }
        FieldKind::Text { max_words } => {
            let text = value.as_str().ok_or(SchemaViolation::WrongType {
                field: name,
                expected: "string",
            })?;
            let text = text.trim();
            if text.is_empty() {
                return Err(SchemaViolation::Empty { field: name });
            }
            let words = text.split_whitespace().count();
            if words > max_words {
                return Err(SchemaViolation::TooLong {
                    field: name,
                    words,
                    max_words,
                });
            }
            Ok(FieldValue::Text(text.to_string()))
        }
        FieldKind::IconIndex => {
            let v = coerce_integer(value).ok_or(SchemaViolation::WrongType {
                field: name,
                expected: "integer",
            })?;
            Icon::from_index(v)
                .map(FieldValue::Icon)
                .ok_or(SchemaViolation::UnknownIcon {
                    field: name,
                    value: v,
                })
        }
        FieldKind::Url => {
            let text = value.as_str().ok_or(SchemaViolation::WrongType {
                field: name,
                expected: "string",
            })?;
            let text = text.trim();
            let valid = Url::parse(text)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !valid {
                return Err(SchemaViolation::InvalidUrl {
                    field: name,
                    value: text.to_string(),
                });
            }
            Ok(FieldValue::Url(text.to_string()))
        }
        FieldKind::Boolean => coerce_boolean(value)
            .map(FieldValue::Boolean)
            .ok_or(SchemaViolation::WrongType {
                field: name,
                expected: "boolean",
            }),
    }
}

/// Integers, integral floats and numeric strings
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| integral(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| integral(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
