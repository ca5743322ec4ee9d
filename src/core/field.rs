//! Field declarations, value kinds and format validation

use chrono::DateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::sync::OnceLock;
use uuid::Uuid;

/// Storage kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Map/JSON typed field, deep-merged on write
    Json,
    /// To-one relation holding the key of another entity
    Relation,
}

impl FieldKind {
    /// Human readable name used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Json => "json",
            FieldKind::Relation => "relation",
        }
    }
}

/// Field format validators applied on write
#[derive(Debug, Clone)]
pub enum FieldFormat {
    Email,
    Uuid,
    Url,
    Phone,
    Custom(Regex),
}

impl FieldFormat {
    /// Parse a format declaration (`email`, `uuid`, `url`, `phone` or `regex:<pattern>`)
    pub fn parse(declaration: &str) -> Result<Self, String> {
        match declaration {
            "email" => Ok(FieldFormat::Email),
            "uuid" => Ok(FieldFormat::Uuid),
            "url" => Ok(FieldFormat::Url),
            "phone" => Ok(FieldFormat::Phone),
            other => match other.strip_prefix("regex:") {
                Some(pattern) => Regex::new(pattern)
                    .map(FieldFormat::Custom)
                    .map_err(|e| format!("invalid pattern '{}': {}", pattern, e)),
                None => Err(format!("unknown field format '{}'", other)),
            },
        }
    }

    /// Validate a value against this format; non-string values never match
    pub fn validate(&self, value: &Value) -> bool {
        let Some(string_value) = value.as_str() else {
            return false;
        };

        match self {
            FieldFormat::Email => Self::is_valid_email(string_value),
            FieldFormat::Uuid => Uuid::parse_str(string_value).is_ok(),
            FieldFormat::Url => Self::is_valid_url(string_value),
            FieldFormat::Phone => Self::is_valid_phone(string_value),
            FieldFormat::Custom(regex) => regex.is_match(string_value),
        }
    }

    fn is_valid_email(email: &str) -> bool {
        static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("email pattern is valid")
        });
        regex.is_match(email)
    }

    fn is_valid_url(url: &str) -> bool {
        static URL_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = URL_REGEX.get_or_init(|| {
            Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url pattern is valid")
        });
        regex.is_match(url)
    }

    fn is_valid_phone(phone: &str) -> bool {
        static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
        // E.164: 8 to 15 digits
        let regex = PHONE_REGEX
            .get_or_init(|| Regex::new(r"^\+?[1-9]\d{7,14}$").expect("phone pattern is valid"));
        regex.is_match(phone)
    }
}

impl TryFrom<String> for FieldFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldFormat::parse(&value)
    }
}

impl From<FieldFormat> for String {
    fn from(format: FieldFormat) -> Self {
        match format {
            FieldFormat::Email => "email".to_string(),
            FieldFormat::Uuid => "uuid".to_string(),
            FieldFormat::Url => "url".to_string(),
            FieldFormat::Phone => "phone".to_string(),
            FieldFormat::Custom(regex) => format!("regex:{}", regex.as_str()),
        }
    }
}

impl Serialize for FieldFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from(self.clone()))
    }
}

impl<'de> Deserialize<'de> for FieldFormat {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldFormat::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn default_editable() -> bool {
    true
}

/// Declaration of a single field on an entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    pub kind: FieldKind,

    #[serde(default)]
    pub nullable: bool,

    /// Value given to blank instances before the create payload is applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Fields marked non-editable are ignored in write payloads
    #[serde(default = "default_editable")]
    pub editable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,

    /// Target entity type for relation fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
            editable: true,
            format: None,
            related: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// A to-one relation to `related` entity type (nullable by default)
    pub fn relation(name: impl Into<String>, related: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldKind::Relation);
        field.related = Some(related.into());
        field.nullable = true;
        field
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn is_relation(&self) -> bool {
        self.kind == FieldKind::Relation
    }

    pub fn is_json(&self) -> bool {
        self.kind == FieldKind::Json
    }

    /// Value a freshly instantiated record carries for this field
    pub fn initial_value(&self) -> Value {
        match (&self.default, self.kind) {
            (Some(value), _) => value.clone(),
            (None, FieldKind::Json) if !self.nullable => Value::Object(Default::default()),
            _ => Value::Null,
        }
    }

    /// Check a payload value against the field kind, nullability and format
    pub fn check_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("may not be null".to_string())
            };
        }

        let kind_matches = match self.kind {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::DateTime => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            FieldKind::Json => true,
            FieldKind::Relation => value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()),
        };
        if !kind_matches {
            return Err(format!("expected a {} value", self.kind.label()));
        }

        match &self.format {
            Some(format) if !format.validate(value) => {
                Err(format!("does not match the {} format", String::from(format.clone())))
            }
            _ => Ok(()),
        }
    }

    /// Coerce a raw query-string value into a typed value for filtering
    pub fn coerce_param(&self, raw: &str) -> Option<Value> {
        match self.kind {
            FieldKind::String | FieldKind::DateTime => Some(Value::String(raw.to_string())),
            FieldKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            FieldKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldKind::Json => {
                Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
            FieldKind::Relation => Uuid::parse_str(raw)
                .ok()
                .map(|key| Value::String(key.to_string())),
        }
    }
}
