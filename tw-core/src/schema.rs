//! Structural parameter schema.
//!
//! A JSON-Schema subset every supported vendor accepts. Property order is
//! kept as declared so encoded declarations are stable.

use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum SchemaNode {
    Object(ObjectSchema),
    Array {
        description: Option<String>,
        items: Box<SchemaNode>,
    },
    String {
        description: Option<String>,
    },
    Number {
        description: Option<String>,
    },
    Integer {
        description: Option<String>,
    },
    Boolean {
        description: Option<String>,
    },
    /// Written as `{"type": "string", "enum": [...]}`.
    Enum {
        description: Option<String>,
        values: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub description: Option<String>,
    pub properties: Vec<(String, SchemaNode)>,
    pub required: Vec<String>,
    pub additional_properties: Option<bool>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    pub fn required_property(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.push((name, schema));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }
}

impl Default for SchemaNode {
    fn default() -> Self {
        SchemaNode::Object(ObjectSchema::default())
    }
}

impl From<ObjectSchema> for SchemaNode {
    fn from(object: ObjectSchema) -> Self {
        SchemaNode::Object(object)
    }
}

impl SchemaNode {
    pub fn string() -> Self {
        SchemaNode::String { description: None }
    }

    pub fn number() -> Self {
        SchemaNode::Number { description: None }
    }

    pub fn integer() -> Self {
        SchemaNode::Integer { description: None }
    }

    pub fn boolean() -> Self {
        SchemaNode::Boolean { description: None }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            description: None,
            items: Box::new(items),
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaNode::Enum {
            description: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            SchemaNode::Object(object) => object.description = text,
            SchemaNode::Array { description, .. }
            | SchemaNode::String { description }
            | SchemaNode::Number { description }
            | SchemaNode::Integer { description }
            | SchemaNode::Boolean { description }
            | SchemaNode::Enum { description, .. } => *description = text,
        }
        self
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            SchemaNode::Object(object) => object.description.as_deref(),
            SchemaNode::Array { description, .. }
            | SchemaNode::String { description }
            | SchemaNode::Number { description }
            | SchemaNode::Integer { description }
            | SchemaNode::Boolean { description }
            | SchemaNode::Enum { description, .. } => description.as_deref(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaNode::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaNode::Object(_) => "object",
            SchemaNode::Array { .. } => "array",
            SchemaNode::String { .. } | SchemaNode::Enum { .. } => "string",
            SchemaNode::Number { .. } => "number",
            SchemaNode::Integer { .. } => "integer",
            SchemaNode::Boolean { .. } => "boolean",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_string(), Value::String(self.type_name().to_string()));
        if let Some(description) = self.description() {
            out.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }

        match self {
            SchemaNode::Object(object) => {
                let properties = object
                    .properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json()))
                    .collect::<Map<String, Value>>();
                out.insert("properties".to_string(), Value::Object(properties));
                if !object.required.is_empty() {
                    out.insert(
                        "required".to_string(),
                        Value::Array(
                            object
                                .required
                                .iter()
                                .map(|r| Value::String(r.clone()))
                                .collect(),
                        ),
                    );
                }
                if let Some(additional) = object.additional_properties {
                    out.insert("additionalProperties".to_string(), Value::Bool(additional));
                }
            }
            SchemaNode::Array { items, .. } => {
                out.insert("items".to_string(), items.to_json());
            }
            SchemaNode::Enum { values, .. } => {
                out.insert(
                    "enum".to_string(),
                    Value::Array(values.iter().map(|v| Value::String(v.clone())).collect()),
                );
            }
            SchemaNode::String { .. }
            | SchemaNode::Number { .. }
            | SchemaNode::Integer { .. }
            | SchemaNode::Boolean { .. } => {}
        }

        Value::Object(out)
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        parse_node(value, "$")
    }
}

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode> {
    let Value::Object(node) = value else {
        return Err(invalid(path, format!("expected a schema object, got {value}")));
    };

    let description = match node.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(invalid(path, format!("description must be a string, got {other}")));
        }
    };

    if let Some(values) = node.get("enum") {
        let values = string_list(values, path, "enum")?;
        return Ok(SchemaNode::Enum {
            description,
            values,
        });
    }

    let type_name = match node.get("type") {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(invalid(path, format!("type must be a string, got {other}"))),
        None => return Err(invalid(path, "missing type")),
    };

    match type_name {
        "object" => {
            let mut properties = Vec::new();
            match node.get("properties") {
                None | Some(Value::Null) => {}
                Some(Value::Object(props)) => {
                    for (name, schema) in props {
                        let child = parse_node(schema, &format!("{path}.{name}"))?;
                        properties.push((name.clone(), child));
                    }
                }
                Some(other) => {
                    return Err(invalid(path, format!("properties must be an object, got {other}")));
                }
            }
            let required = match node.get("required") {
                None | Some(Value::Null) => Vec::new(),
                Some(values) => string_list(values, path, "required")?,
            };
            let additional_properties = match node.get("additionalProperties") {
                None | Some(Value::Null) => None,
                Some(Value::Bool(b)) => Some(*b),
                Some(other) => {
                    return Err(invalid(
                        path,
                        format!("additionalProperties must be a boolean, got {other}"),
                    ));
                }
            };
            Ok(SchemaNode::Object(ObjectSchema {
                description,
                properties,
                required,
                additional_properties,
            }))
        }
        "array" => {
            let Some(items) = node.get("items") else {
                return Err(invalid(path, "array node without items"));
            };
            Ok(SchemaNode::Array {
                description,
                items: Box::new(parse_node(items, &format!("{path}[]"))?),
            })
        }
        "string" => Ok(SchemaNode::String { description }),
        "number" => Ok(SchemaNode::Number { description }),
        "integer" => Ok(SchemaNode::Integer { description }),
        "boolean" => Ok(SchemaNode::Boolean { description }),
        other => Err(invalid(path, format!("unsupported type {other:?}"))),
    }
}

fn string_list(value: &Value, path: &str, field: &str) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(invalid(path, format!("{field} must be an array of strings")));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(
                path,
                format!("{field} entries must be strings, got {other}"),
            )),
        })
        .collect()
}

fn invalid(path: &str, msg: impl std::fmt::Display) -> AdapterError {
    AdapterError::InvalidSpec(format!("schema {path}: {msg}"))
}

impl TryFrom<Value> for SchemaNode {
    type Error = AdapterError;

    fn try_from(value: Value) -> Result<Self> {
        SchemaNode::from_json(&value)
    }
}

impl From<SchemaNode> for Value {
    fn from(schema: SchemaNode) -> Self {
        schema.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calculator_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The type of operation to execute"
                },
                "number1": { "type": "number", "description": "First integer" },
                "number2": { "type": "number", "description": "Second integer" }
            },
            "required": ["operation", "number1", "number2"]
        })
    }

    #[test]
    fn parses_calculator_schema_in_declared_order() {
        let schema = SchemaNode::from_json(&calculator_schema()).expect("valid schema");
        let object = schema.as_object().expect("object root");
        let names: Vec<_> = object.properties.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["operation", "number1", "number2"]);
        assert_eq!(object.required, vec!["operation", "number1", "number2"]);

        match object.get("operation").expect("operation property") {
            SchemaNode::Enum {
                values,
                description,
            } => {
                assert_eq!(values.len(), 4);
                assert_eq!(
                    description.as_deref(),
                    Some("The type of operation to execute")
                );
            }
            other => panic!("expected enum node, got {other:?}"),
        }
    }

    #[test]
    fn enum_without_type_is_accepted() {
        let schema = SchemaNode::from_json(&json!({ "enum": ["a", "b"] })).expect("enum node");
        assert_eq!(schema, SchemaNode::enumeration(["a", "b"]));
        assert_eq!(
            schema.to_json(),
            json!({ "type": "string", "enum": ["a", "b"] })
        );
    }

    #[test]
    fn json_form_reparses_to_the_same_tree() {
        let schema = SchemaNode::from(
            ObjectSchema::new()
                .with_description("search request")
                .required_property("query", SchemaNode::string().with_description("terms"))
                .property(
                    "tags",
                    SchemaNode::array(SchemaNode::string()).with_description("filters"),
                )
                .property("limit", SchemaNode::integer()),
        );
        let reparsed = SchemaNode::from_json(&schema.to_json()).expect("reparse");
        assert_eq!(reparsed, schema);
    }

    #[test]
    fn rejects_unknown_types_with_path() {
        let err = SchemaNode::from_json(&json!({
            "type": "object",
            "properties": { "when": { "type": "date" } }
        }))
        .expect_err("date is not supported");
        let msg = err.to_string();
        assert!(msg.contains("$.when"), "{msg}");
        assert!(msg.contains("date"), "{msg}");
    }

    #[test]
    fn rejects_array_without_items() {
        let err = SchemaNode::from_json(&json!({ "type": "array" })).expect_err("no items");
        assert!(matches!(err, AdapterError::InvalidSpec(_)));
    }

    #[test]
    fn deserializes_through_serde() {
        let schema: SchemaNode =
            serde_json::from_value(json!({ "type": "boolean", "description": "flag" }))
                .expect("deserialize");
        assert_eq!(schema, SchemaNode::boolean().with_description("flag"));
        assert_eq!(
            serde_json::to_value(&schema).expect("serialize"),
            json!({ "type": "boolean", "description": "flag" })
        );
    }
}
