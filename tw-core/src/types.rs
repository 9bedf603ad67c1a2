use crate::error::{AdapterError, Result};
use crate::schema::SchemaNode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Empty means "no description".
    #[serde(default)]
    pub description: String,
    /// Root is an object node.
    #[serde(default)]
    pub parameters: SchemaNode,
}

impl ToolSpec {
    /// Create a `ToolSpec` after validating the name against all provider constraints
    /// and checking that the parameter schema root is an object.
    pub fn validated(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: SchemaNode,
    ) -> Result<Self> {
        let name = name.into();
        crate::adapter::validate_tool_name_all_providers(&name)?;
        if parameters.as_object().is_none() {
            return Err(AdapterError::InvalidSpec(format!(
                "tool {name}: parameter schema root must be an object, got {}",
                parameters.type_name()
            )));
        }
        Ok(Self {
            name,
            description: description.into(),
            parameters,
        })
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoicePolicy {
    /// Model decides whether to call a tool.
    #[default]
    Auto,
    /// Tools are offered but must not be called.
    None,
    /// Model must call the named tool exactly once.
    Forced(String),
}

/// A single tool call requested by a model, in vendor-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

/// The result of running one [`ToolInvocation`], sent back on the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub invocation_id: String,
    pub tool_name: String,
    pub content: Value,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(invocation: &ToolInvocation, content: Value) -> Self {
        Self {
            invocation_id: invocation.id.clone(),
            tool_name: invocation.tool_name.clone(),
            content,
            is_error: false,
        }
    }

    pub fn failure(invocation: &ToolInvocation, message: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation.id.clone(),
            tool_name: invocation.tool_name.clone(),
            content: Value::String(message.into()),
            is_error: true,
        }
    }
}

/// The `tools` / tool-selection portion of a vendor request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorToolRequestFragment(Map<String, Value>);

impl VendorToolRequestFragment {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Copy every fragment field into `body`, replacing existing keys of the
    /// same name and leaving all other keys untouched.
    pub fn merge_into(&self, body: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            body.insert(key.clone(), value.clone());
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// The ordered array of vendor call objects from a model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorToolResponseFragment(Vec<Value>);

impl VendorToolResponseFragment {
    pub fn new(calls: Vec<Value>) -> Self {
        Self(calls)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(calls) => Ok(Self(calls)),
            Value::Null => Ok(Self::default()),
            other => Err(AdapterError::ResponseFormat(format!(
                "tool call fragment must be an array, got {other}"
            ))),
        }
    }

    pub fn calls(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
