//! Tool trait definition and the statically-declared parameter schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// JSON type tag of a declared parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    /// Used whenever the author does not pick a type.
    #[default]
    String,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Whether `value` is acceptable for this tag. Integers pass as numbers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub type_tag: ParamType,
    pub description: String,
    pub required: bool,
}

/// Name, description and ordered parameter list of a tool.
///
/// Built once when the tool is declared and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Declare a parameter without a default value (required).
    pub fn param(self, name: impl Into<String>, type_tag: ParamType) -> Self {
        self.push_param(name.into(), type_tag, None, true)
    }

    /// Declare a required parameter with an explicit description.
    pub fn param_described(
        self,
        name: impl Into<String>,
        type_tag: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.push_param(name.into(), type_tag, Some(description.into()), true)
    }

    /// Declare a parameter that has a default value (not required).
    pub fn optional_param(self, name: impl Into<String>, type_tag: ParamType) -> Self {
        self.push_param(name.into(), type_tag, None, false)
    }

    fn push_param(
        mut self,
        name: String,
        type_tag: ParamType,
        description: Option<String>,
        required: bool,
    ) -> Self {
        let description =
            description.unwrap_or_else(|| format!("parameter {} of type {}", name, type_tag));
        self.params.push(ParamSpec {
            name,
            type_tag,
            description,
            required,
        });
        self
    }

    /// JSON Schema for the parameters, properties in declaration order.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in &self.params {
            properties.insert(
                p.name.clone(),
                json!({
                    "type": p.type_tag,
                    "description": p.description,
                }),
            );
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Export in the shape advertised to the model backend.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }

    /// Check `args` against the declared parameters.
    ///
    /// Undeclared extra arguments are ignored.
    pub fn check_arguments(&self, args: &Map<String, Value>) -> Result<(), ToolError> {
        for p in &self.params {
            match args.get(&p.name) {
                None | Some(Value::Null) if p.required => {
                    return Err(ToolError::MissingArgument(p.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) if !p.type_tag.accepts(value) => {
                    return Err(ToolError::InvalidArgument {
                        name: p.name.clone(),
                        expected: p.type_tag,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Definition of a tool exposed to the inference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Failure of one tool invocation attempt.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("argument '{name}' must be of type {expected}")]
    InvalidArgument { name: String, expected: ParamType },

    #[error("arguments must be a JSON object")]
    ArgumentsNotObject,

    #[error("tool timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Typed read access to the arguments of one call.
#[derive(Debug, Clone, Copy)]
pub struct ToolArgs<'a> {
    values: &'a Map<String, Value>,
}

impl<'a> ToolArgs<'a> {
    pub fn new(values: &'a Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    fn require(&self, name: &str) -> Result<&'a Value, ToolError> {
        self.get(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.require(name)?
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArgument {
                name: name.to_string(),
                expected: ParamType::Integer,
            })
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArgument {
                name: name.to_string(),
                expected: ParamType::Number,
            })
    }

    pub fn str(&self, name: &str) -> Result<&'a str, ToolError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| ToolError::InvalidArgument {
                name: name.to_string(),
                expected: ParamType::String,
            })
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| ToolError::InvalidArgument {
                name: name.to_string(),
                expected: ParamType::Boolean,
            })
    }
}

/// A locally invocable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declared name, description and parameters.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute the tool with already type-checked arguments.
    async fn execute(&self, args: ToolArgs<'_>) -> Result<Value, ToolError>;
}
