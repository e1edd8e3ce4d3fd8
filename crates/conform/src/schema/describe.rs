use serde::Serialize;

use super::{Schema, SchemaType, MAX_SCHEMA_DEPTH};
use crate::prompt_template::load_prompt;

const STRUCTURED_OUTPUT_TEMPLATE: &str = include_str!("../prompts/structured_output.md");

#[derive(Serialize)]
struct InstructionContext<'a> {
    name: &'a str,
    description: Option<&'a str>,
    schema: String,
    example: Option<String>,
}

/// Render a schema tree as an indented, human-readable structure
pub fn describe(schema: &SchemaType) -> String {
    describe_at(schema, 0, 1)
}

fn describe_at(schema: &SchemaType, indent: usize, depth: usize) -> String {
    if depth > MAX_SCHEMA_DEPTH {
        return "...".to_string();
    }
    match schema {
        SchemaType::Object { fields } => {
            if fields.is_empty() {
                return "{}".to_string();
            }
            let spaces = " ".repeat(indent);
            let properties = fields
                .iter()
                .map(|field| {
                    let description = describe_at(&field.schema, indent + 2, depth + 1);
                    let note = field
                        .description
                        .as_deref()
                        .map(|d| format!(" // {d}"))
                        .unwrap_or_default();
                    format!("{spaces}  \"{}\": {description}{note}", field.name)
                })
                .collect::<Vec<_>>()
                .join(",\n");
            format!("{{\n{properties}\n{spaces}}}")
        }
        SchemaType::Array {
            items,
            min_items,
            max_items,
        } => {
            let mut out = format!("array of {}", describe_at(items, indent, depth + 1));
            if let Some(min) = min_items {
                out.push_str(&format!(" (min {min} items)"));
            }
            if let Some(max) = max_items {
                out.push_str(&format!(" (max {max} items)"));
            }
            out
        }
        SchemaType::Enum { values } => {
            let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
            format!("enum({})", quoted.join(", "))
        }
        SchemaType::Optional { inner } => {
            format!("{} (optional)", describe_at(inner, indent, depth + 1))
        }
        SchemaType::String {
            min_length,
            max_length,
            pattern,
        } => {
            let mut notes = Vec::new();
            match (min_length, max_length) {
                (Some(min), Some(max)) => notes.push(format!("between {min} and {max} characters")),
                (Some(min), None) => notes.push(format!("at least {min} characters")),
                (None, Some(max)) => notes.push(format!("at most {max} characters")),
                (None, None) => {}
            }
            if let Some(pattern) = pattern {
                notes.push(format!("matching /{pattern}/"));
            }
            annotate("string", &notes)
        }
        SchemaType::Number {
            minimum,
            maximum,
            integer,
        } => {
            let name = if *integer { "integer" } else { "number" };
            let notes: Vec<String> = match (minimum, maximum) {
                (Some(min), Some(max)) => {
                    vec![format!("between {} and {}", fmt_number(*min), fmt_number(*max))]
                }
                (Some(min), None) => vec![format!("minimum {}", fmt_number(*min))],
                (None, Some(max)) => vec![format!("maximum {}", fmt_number(*max))],
                (None, None) => vec![],
            };
            annotate(name, &notes)
        }
        SchemaType::Boolean => "boolean".to_string(),
    }
}

fn annotate(name: &str, notes: &[String]) -> String {
    if notes.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({})", notes.join(", "))
    }
}

/// Print whole numbers without a trailing `.0`
pub(crate) fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Wrap the schema description in the fixed directive asking for exactly one JSON object
pub fn instruction_prompt(schema: &Schema) -> Result<String, tera::Error> {
    let example = match &schema.example {
        Some(value) => Some(serde_json::to_string_pretty(value).map_err(|e| {
            tera::Error::chain("Failed to serialize schema example", e)
        })?),
        None => None,
    };
    let context = InstructionContext {
        name: &schema.name,
        description: schema.description.as_deref(),
        schema: schema.describe(),
        example,
    };
    load_prompt(STRUCTURED_OUTPUT_TEMPLATE, &context)
}
