//! Tool catalog contract types.
//!
//! Every tool the sandbox may run declares a `ToolSpec`: its input schema,
//! rate limit, cost and timeout. The sandbox reads only this contract and
//! never inspects tool internals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The primitive JSON types an input schema may declare for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    /// Parse a JSON Schema `type` keyword. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(JsonType::String),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "boolean" => Some(JsonType::Boolean),
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    /// The JSON Schema name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
        }
    }

    /// The JSON Schema name of the type `value` actually has.
    pub fn name_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Declared shape of one input field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Primitive type the field must have, when declared.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<JsonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A flat input schema: required field names plus per-field primitive types.
///
/// Validation goes through `jsonschema` on the shallow rendering from
/// `to_json_schema`, so nested schemas are never descended into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
}

impl InputSchema {
    /// Start an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field of the given type.
    pub fn required(mut self, name: impl Into<String>, kind: JsonType) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(
            name,
            PropertySchema {
                kind: Some(kind),
                description: None,
            },
        );
        self
    }

    /// Declare an optional field of the given type.
    pub fn optional(mut self, name: impl Into<String>, kind: JsonType) -> Self {
        self.properties.insert(
            name.into(),
            PropertySchema {
                kind: Some(kind),
                description: None,
            },
        );
        self
    }

    /// Read the `required` and `properties.*.type` keywords out of a JSON
    /// Schema document. Everything else in the document is ignored.
    pub fn from_json_schema(schema: &Value) -> Self {
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| {
                        let kind = prop.get("type").and_then(Value::as_str).and_then(JsonType::parse);
                        let description = prop
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        (name.clone(), PropertySchema { kind, description })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            required,
            properties,
        }
    }

    /// Render as a JSON Schema document with only `type`, `required` and
    /// `properties.*.type`.
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, prop)| {
                let declared = match prop.kind {
                    Some(kind) => json!({ "type": kind.name() }),
                    None => json!({}),
                };
                (name.clone(), declared)
            })
            .collect();

        json!({
            "type": "object",
            "required": self.required,
            "properties": properties,
        })
    }

    /// Check `input` against this schema and return every violation found.
    /// An empty vector means valid.
    pub fn violations(&self, input: &Value) -> Vec<String> {
        schema_violations(&self.to_json_schema(), input)
    }
}

/// Reduce a JSON Schema document to its top-level `type`, `required` and
/// `properties.*.type` keywords. Nested schemas are dropped, so validation
/// never descends past the first level.
pub fn shallow_schema(schema: &Value) -> Value {
    let mut shallow = serde_json::Map::new();

    if let Some(kind) = schema.get("type") {
        shallow.insert("type".to_string(), kind.clone());
    }
    if let Some(required) = schema.get("required").filter(|r| r.is_array()) {
        shallow.insert("required".to_string(), required.clone());
    }
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let typed: serde_json::Map<String, Value> = props
            .iter()
            .map(|(name, prop)| {
                let declared = match prop.get("type") {
                    Some(kind) => json!({ "type": kind }),
                    None => json!({}),
                };
                (name.clone(), declared)
            })
            .collect();
        shallow.insert("properties".to_string(), Value::Object(typed));
    }

    Value::Object(shallow)
}

/// Validate `instance` against the shallow form of `schema`, collecting
/// every violation. A schema that does not compile is one violation.
pub fn schema_violations(schema: &Value, instance: &Value) -> Vec<String> {
    let validator = match jsonschema::validator_for(&shallow_schema(schema)) {
        Ok(validator) => validator,
        Err(e) => return vec![format!("invalid JSON Schema document: {e}")],
    };

    validator
        .iter_errors(instance)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            }
        })
        .collect()
}

/// Everything the sandbox needs to know about a tool before running it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique catalog name, e.g. `web_search`.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: InputSchema,
    /// Maximum calls per principal inside one rate window.
    pub calls_per_minute: u32,
    /// Credits charged for every attempt.
    pub credits_per_execution: u64,
    /// Hard timeout for the tool body, in milliseconds.
    pub timeout_ms: u64,
    /// Disabled tools fail immediately at zero cost.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolSpec {
    /// A spec with permissive defaults: 60 calls/minute, 1 credit, 30s timeout.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: InputSchema::default(),
            calls_per_minute: 60,
            credits_per_execution: 1,
            timeout_ms: 30_000,
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_rate_limit(mut self, calls_per_minute: u32) -> Self {
        self.calls_per_minute = calls_per_minute;
        self
    }

    pub fn with_cost(mut self, credits: u64) -> Self {
        self.credits_per_execution = credits;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Caller context handed to every tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolContext {
    /// The principal on whose behalf the tool runs. Keys rate limits and credits.
    pub principal_id: String,
    /// Correlation id of the surrounding Plan execution or Task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl ToolContext {
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            correlation_id: None,
            metadata: Value::Null,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Status tag carried by every `ToolResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Failure,
    RateLimited,
    Timeout,
}

/// The sanitized outcome of one sandboxed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Sanitized tool output. Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent inside the sandbox, in milliseconds.
    pub elapsed_ms: u64,
    /// Credits deducted for this invocation.
    pub cost: u64,
    pub status: ToolStatus,
}

impl ToolResult {
    pub fn success(data: Value, elapsed_ms: u64, cost: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            elapsed_ms,
            cost,
            status: ToolStatus::Success,
        }
    }

    /// A non-success result with the given status and message.
    pub fn rejected(status: ToolStatus, error: impl Into<String>, elapsed_ms: u64, cost: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            elapsed_ms,
            cost,
            status,
        }
    }

    pub fn failure(error: impl Into<String>, elapsed_ms: u64, cost: u64) -> Self {
        Self::rejected(ToolStatus::Failure, error, elapsed_ms, cost)
    }
}
