use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Represents a parameter in a function tool
#[derive(Debug, Clone, Serialize)]
pub struct ParameterProperty {
    /// The type of the parameter (e.g. "string", "number", "array", etc)
    #[serde(rename = "type")]
    pub property_type: String,
    /// Description of what the parameter does
    pub description: String,
    /// When type is "array", this defines the type of the array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterProperty>>,
    /// When type is "enum", this defines the possible values for the parameter
    #[serde(skip_serializing_if = "Option::is_none", rename = "enum")]
    pub enum_list: Option<Vec<String>>,
}

/// Represents the parameters schema for a function tool
#[derive(Debug, Clone, Serialize)]
pub struct ParametersSchema {
    /// The type of the parameters object (usually "object")
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Map of parameter names to their properties
    pub properties: HashMap<String, ParameterProperty>,
    /// List of required parameter names
    pub required: Vec<String>,
}

impl From<ParametersSchema> for Value {
    fn from(schema: ParametersSchema) -> Self {
        serde_json::to_value(&schema).unwrap_or(Value::Null)
    }
}

/// Represents a function definition for a tool.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionTool {
    /// Name of the function
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema describing the parameters
    pub parameters: Value,
}

/// A tool declaration, serialized to Dify in OpenAI's function-tool shape.
///
/// Dify has no native tool support; these declarations only ever reach the
/// model as JSON text appended to the tool-call instruction block.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// The type of tool, always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The function definition
    pub function: FunctionTool,
}

impl Tool {
    /// Convenience constructor for a function tool.
    ///
    /// Parameters accept either a raw `serde_json::Value` schema or a typed
    /// [`ParametersSchema`].
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: impl Into<Value>,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: name.into(),
                description: description.into(),
                parameters: parameters.into(),
            },
        }
    }
}
