//! Caller-declared output shapes.
//!
//! A [`Schema`] wraps a recursive [`SchemaType`] tree. The tree is rendered into natural
//! language for the backend by [`describe`], and checked against extracted candidates by
//! [`validate`]. Trees are plain owned values, so they cannot be self-referential; depth is
//! still capped at [`MAX_SCHEMA_DEPTH`] and enforced when a schema is constructed.
mod describe;
mod validate;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use strum_macros::Display;
use thiserror::Error;

use crate::extract::extract;

pub use describe::{describe, instruction_prompt};
pub use validate::validate;

/// Deepest nesting accepted by [`Schema::new`]; rendering stops here as well.
pub const MAX_SCHEMA_DEPTH: usize = 32;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema nesting exceeds the maximum depth of {MAX_SCHEMA_DEPTH}")]
    TooDeep,

    #[error("Duplicate field `{0}`")]
    DuplicateField(String),

    #[error("Enum must declare at least one value")]
    EmptyEnum,

    #[error("Duplicate enum value `{0}`")]
    DuplicateEnumValue(String),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Tool parameters must be an object schema, got {0}")]
    NotAnObject(String),

    #[error("Failed to parse schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named field of an object schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub schema: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The structural definition of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaType {
    Object {
        fields: Vec<Field>,
    },
    Array {
        items: Box<SchemaType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    Enum {
        values: Vec<String>,
    },
    Optional {
        inner: Box<SchemaType>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
        #[serde(default)]
        integer: bool,
    },
    Boolean,
}

impl SchemaType {
    pub fn object() -> Self {
        SchemaType::Object { fields: Vec::new() }
    }

    pub fn array(items: SchemaType) -> Self {
        SchemaType::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaType::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn string() -> Self {
        SchemaType::String {
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    pub fn number() -> Self {
        SchemaType::Number {
            minimum: None,
            maximum: None,
            integer: false,
        }
    }

    pub fn integer() -> Self {
        SchemaType::Number {
            minimum: None,
            maximum: None,
            integer: true,
        }
    }

    pub fn boolean() -> Self {
        SchemaType::Boolean
    }

    /// Wrap this schema so that the value may be absent
    pub fn optional(self) -> Self {
        SchemaType::Optional {
            inner: Box::new(self),
        }
    }

    /// Add a field to an object schema. Has no effect on other variants.
    pub fn field<S: Into<String>>(self, name: S, schema: SchemaType) -> Self {
        self.push_field(Field {
            name: name.into(),
            schema,
            description: None,
        })
    }

    /// Add a field with a human-readable description to an object schema
    pub fn described_field<S: Into<String>, D: Into<String>>(
        self,
        name: S,
        schema: SchemaType,
        description: D,
    ) -> Self {
        self.push_field(Field {
            name: name.into(),
            schema,
            description: Some(description.into()),
        })
    }

    fn push_field(mut self, field: Field) -> Self {
        if let SchemaType::Object { fields } = &mut self {
            fields.push(field);
        }
        self
    }

    /// Inclusive lower bound for numbers
    pub fn min(mut self, value: f64) -> Self {
        if let SchemaType::Number { minimum, .. } = &mut self {
            *minimum = Some(value);
        }
        self
    }

    /// Inclusive upper bound for numbers
    pub fn max(mut self, value: f64) -> Self {
        if let SchemaType::Number { maximum, .. } = &mut self {
            *maximum = Some(value);
        }
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn min_items(mut self, count: usize) -> Self {
        if let SchemaType::Array { min_items, .. } = &mut self {
            *min_items = Some(count);
        }
        self
    }

    pub fn max_items(mut self, count: usize) -> Self {
        if let SchemaType::Array { max_items, .. } = &mut self {
            *max_items = Some(count);
        }
        self
    }

    pub fn min_length(mut self, count: usize) -> Self {
        if let SchemaType::String { min_length, .. } = &mut self {
            *min_length = Some(count);
        }
        self
    }

    pub fn max_length(mut self, count: usize) -> Self {
        if let SchemaType::String { max_length, .. } = &mut self {
            *max_length = Some(count);
        }
        self
    }

    pub fn pattern<S: Into<String>>(mut self, regex: S) -> Self {
        if let SchemaType::String { pattern, .. } = &mut self {
            *pattern = Some(regex.into());
        }
        self
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, SchemaType::Optional { .. })
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaType::Object { .. } => "object",
            SchemaType::Array { .. } => "array",
            SchemaType::Enum { .. } => "enum",
            SchemaType::Optional { .. } => "optional",
            SchemaType::String { .. } => "string",
            SchemaType::Number { .. } => "number",
            SchemaType::Boolean => "boolean",
        }
    }

    /// Number of nested levels, counting this one
    pub fn depth(&self) -> usize {
        match self {
            SchemaType::Object { fields } => {
                1 + fields.iter().map(|f| f.schema.depth()).max().unwrap_or(0)
            }
            SchemaType::Array { items, .. } => 1 + items.depth(),
            SchemaType::Optional { inner } => 1 + inner.depth(),
            _ => 1,
        }
    }

    /// Check the tree for constructions that can never validate or cannot be rendered
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.depth() > MAX_SCHEMA_DEPTH {
            return Err(SchemaError::TooDeep);
        }
        self.check_node()
    }

    fn check_node(&self) -> Result<(), SchemaError> {
        match self {
            SchemaType::Object { fields } => {
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(SchemaError::DuplicateField(field.name.clone()));
                    }
                    field.schema.check_node()?;
                }
            }
            SchemaType::Array {
                items,
                min_items,
                max_items,
            } => {
                if let (Some(min), Some(max)) = (min_items, max_items) {
                    if min > max {
                        return Err(SchemaError::InvalidBounds(format!(
                            "min_items {min} is greater than max_items {max}"
                        )));
                    }
                }
                items.check_node()?;
            }
            SchemaType::Enum { values } => {
                if values.is_empty() {
                    return Err(SchemaError::EmptyEnum);
                }
                let mut seen = HashSet::new();
                for value in values {
                    if !seen.insert(value.as_str()) {
                        return Err(SchemaError::DuplicateEnumValue(value.clone()));
                    }
                }
            }
            SchemaType::Optional { inner } => inner.check_node()?,
            SchemaType::String {
                min_length,
                max_length,
                pattern,
            } => {
                if let (Some(min), Some(max)) = (min_length, max_length) {
                    if min > max {
                        return Err(SchemaError::InvalidBounds(format!(
                            "min_length {min} is greater than max_length {max}"
                        )));
                    }
                }
                if let Some(pattern) = pattern {
                    Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                }
            }
            SchemaType::Number {
                minimum, maximum, ..
            } => {
                if let (Some(min), Some(max)) = (minimum, maximum) {
                    if min > max {
                        return Err(SchemaError::InvalidBounds(format!(
                            "minimum {min} is greater than maximum {max}"
                        )));
                    }
                }
            }
            SchemaType::Boolean => {}
        }
        Ok(())
    }
}

/// A named, validated output schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub root: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl Schema {
    pub fn new<S: Into<String>>(name: S, root: SchemaType) -> Result<Self, SchemaError> {
        root.check()?;
        Ok(Self {
            name: name.into(),
            description: None,
            root,
            example: None,
        })
    }

    /// Load a schema from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.root.check()?;
        Ok(schema)
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn describe(&self) -> String {
        describe(&self.root)
    }

    pub fn validate(&self, candidate: &Value) -> ParsedOutcome {
        validate(&self.root, candidate)
    }

    /// Extract a candidate from free-form backend text and validate it
    pub fn parse(&self, text: &str) -> ParsedOutcome {
        match extract(text) {
            Some(candidate) => self.validate(&candidate),
            None => ParsedOutcome::Failure(vec![ValidationError::no_candidate()]),
        }
    }
}

/// Machine-readable kind of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    TypeMismatch,
    MissingRequired,
    OutOfRange,
    EnumMismatch,
    MinItems,
    MaxItems,
    TooShort,
    TooLong,
    PatternMismatch,
    NotInteger,
    DepthExceeded,
    NoCandidate,
    MalformedToolCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location of the offending value in dot/bracket notation; empty for the root
    pub path: String,
    pub message: String,
    pub code: ErrorCode,
}

impl ValidationError {
    pub fn new<P: Into<String>, M: Into<String>>(path: P, message: M, code: ErrorCode) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }

    pub fn no_candidate() -> Self {
        Self::new(
            "",
            "no JSON object could be extracted from the response",
            ErrorCode::NoCandidate,
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} ({})", self.message, self.code)
        } else {
            write!(f, "`{}` {} ({})", self.path, self.message, self.code)
        }
    }
}

/// Result of validating a candidate: the canonical value, or every violation found
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutcome {
    Success(Value),
    Failure(Vec<ValidationError>),
}

impl ParsedOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParsedOutcome::Success(_))
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ParsedOutcome::Success(_) => &[],
            ParsedOutcome::Failure(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<Value, Vec<ValidationError>> {
        match self {
            ParsedOutcome::Success(value) => Ok(value),
            ParsedOutcome::Failure(errors) => Err(errors),
        }
    }
}
