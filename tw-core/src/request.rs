use crate::error::{AdapterError, Result};
use crate::schema::{ObjectSchema, SchemaNode};
use crate::types::{ToolChoicePolicy, ToolSpec, VendorToolRequestFragment};
use crate::vendor::{ChoiceShape, ChoiceStyle, DeclarationShape, VendorProfile};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

/// Tool names must match `^[A-Za-z_][A-Za-z0-9_]*$` and fit the vendor's length limit.
pub(crate) fn check_tool_name(name: &str, max_len: usize) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(AdapterError::InvalidSpec("tool name is empty".to_string()));
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(AdapterError::InvalidSpec(format!(
            "tool name {name:?} must start with a letter or underscore"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AdapterError::InvalidSpec(format!(
            "tool name {name:?} may only contain letters, digits and underscores"
        )));
    }
    if name.len() > max_len {
        return Err(AdapterError::InvalidSpec(format!(
            "tool name {name:?} is longer than {max_len} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_spec(tool: &ToolSpec, profile: &VendorProfile) -> Result<()> {
    check_tool_name(&tool.name, profile.max_tool_name_len)?;
    let Some(root) = tool.parameters.as_object() else {
        return Err(AdapterError::InvalidSpec(format!(
            "tool {}: parameter schema root must be an object, got {}",
            tool.name,
            tool.parameters.type_name()
        )));
    };
    check_required(&tool.name, root, &tool.name)?;

    if profile.strict_descriptions {
        if !tool.has_description() {
            return Err(AdapterError::MissingDescription {
                tool: tool.name.clone(),
                path: tool.name.clone(),
            });
        }
        if let Some(path) = first_undescribed(root, &tool.name) {
            return Err(AdapterError::MissingDescription {
                tool: tool.name.clone(),
                path,
            });
        }
    }
    Ok(())
}

fn check_required(tool: &str, object: &ObjectSchema, path: &str) -> Result<()> {
    let mut declared = HashSet::new();
    for (name, _) in &object.properties {
        if !declared.insert(name.as_str()) {
            return Err(AdapterError::InvalidSpec(format!(
                "tool {tool}: {path} declares property {name:?} twice"
            )));
        }
    }
    for key in &object.required {
        if object.get(key).is_none() {
            return Err(AdapterError::InvalidSpec(format!(
                "tool {tool}: {path} requires undeclared property {key:?}"
            )));
        }
    }
    for (name, schema) in &object.properties {
        if let Some(nested) = nested_object(schema) {
            check_required(tool, nested, &format!("{path}.{name}"))?;
        }
    }
    Ok(())
}

/// Dotted path of the first parameter node without a description.
fn first_undescribed(object: &ObjectSchema, prefix: &str) -> Option<String> {
    for (name, schema) in &object.properties {
        let path = format!("{prefix}.{name}");
        let described = schema.description().is_some_and(|d| !d.trim().is_empty());
        if !described {
            return Some(path);
        }
        if let Some(nested) = nested_object(schema) {
            if let Some(found) = first_undescribed(nested, &path) {
                return Some(found);
            }
        }
    }
    None
}

/// Object reachable from a property: the property itself or its array items.
fn nested_object(schema: &SchemaNode) -> Option<&ObjectSchema> {
    match schema {
        SchemaNode::Object(object) => Some(object),
        SchemaNode::Array { items, .. } => nested_object(items),
        _ => None,
    }
}

pub(crate) fn encode_request(
    tools: &[ToolSpec],
    choice: &ToolChoicePolicy,
    profile: &VendorProfile,
) -> Result<VendorToolRequestFragment> {
    let mut seen = HashSet::new();
    for tool in tools {
        validate_spec(tool, profile)?;
        if !seen.insert(tool.name.as_str()) {
            return Err(AdapterError::InvalidSpec(format!(
                "duplicate tool name {:?}",
                tool.name
            )));
        }
    }

    match choice {
        ToolChoicePolicy::Forced(name) if !seen.contains(name.as_str()) => {
            return Err(AdapterError::UnknownTool(name.clone()));
        }
        ToolChoicePolicy::None if tools.is_empty() => {
            return Err(AdapterError::InvalidSpec(
                "tool choice none requires at least one tool".to_string(),
            ));
        }
        _ => {}
    }

    let mut fields = Map::new();
    if tools.is_empty() {
        return Ok(VendorToolRequestFragment::new(fields));
    }

    let shape = &profile.declarations;
    let declarations: Vec<Value> = tools.iter().map(|t| encode_declaration(t, shape)).collect();
    let tools_value = match shape.group_key {
        Some(group) => {
            let mut entry = Map::new();
            entry.insert(group.to_string(), Value::Array(declarations));
            Value::Array(vec![Value::Object(entry)])
        }
        None => Value::Array(declarations),
    };
    fields.insert(shape.tools_key.to_string(), tools_value);
    fields.insert(profile.choice.key.to_string(), encode_choice(choice, &profile.choice));

    if let (ToolChoicePolicy::Forced(_), Some(key)) = (choice, profile.choice.parallel_key) {
        fields.insert(key.to_string(), Value::Bool(false));
    }

    Ok(VendorToolRequestFragment::new(fields))
}

fn encode_declaration(tool: &ToolSpec, shape: &DeclarationShape) -> Value {
    let mut declaration = Map::new();
    declaration.insert(shape.name_key.to_string(), Value::String(tool.name.clone()));
    if tool.has_description() {
        declaration.insert(
            shape.description_key.to_string(),
            Value::String(tool.description.clone()),
        );
    }
    declaration.insert(shape.parameters_key.to_string(), tool.parameters.to_json());

    match shape.wrapper {
        Some(wrapper) => {
            let mut outer = Map::new();
            outer.insert(
                "type".to_string(),
                Value::String(wrapper.type_value.to_string()),
            );
            outer.insert(wrapper.key.to_string(), Value::Object(declaration));
            Value::Object(outer)
        }
        None => Value::Object(declaration),
    }
}

fn encode_choice(choice: &ToolChoicePolicy, shape: &ChoiceShape) -> Value {
    match (shape.style, choice) {
        (ChoiceStyle::FunctionObject, ToolChoicePolicy::Auto) => json!("auto"),
        (ChoiceStyle::FunctionObject, ToolChoicePolicy::None) => json!("none"),
        (ChoiceStyle::FunctionObject, ToolChoicePolicy::Forced(name)) => {
            json!({ "type": "function", "function": { "name": name } })
        }
        (ChoiceStyle::TypedObject, ToolChoicePolicy::Auto) => json!({ "type": "auto" }),
        (ChoiceStyle::TypedObject, ToolChoicePolicy::None) => json!({ "type": "none" }),
        (ChoiceStyle::TypedObject, ToolChoicePolicy::Forced(name)) => {
            json!({ "type": "tool", "name": name, "disable_parallel_tool_use": true })
        }
        (ChoiceStyle::CallingMode, ToolChoicePolicy::Auto) => {
            json!({ "functionCallingConfig": { "mode": "AUTO" } })
        }
        (ChoiceStyle::CallingMode, ToolChoicePolicy::None) => {
            json!({ "functionCallingConfig": { "mode": "NONE" } })
        }
        (ChoiceStyle::CallingMode, ToolChoicePolicy::Forced(name)) => {
            json!({ "functionCallingConfig": { "mode": "ANY", "allowedFunctionNames": [name] } })
        }
    }
}

pub(crate) fn decode_request(
    fragment: &VendorToolRequestFragment,
    profile: &VendorProfile,
) -> Result<(Vec<ToolSpec>, ToolChoicePolicy)> {
    let shape = &profile.declarations;
    let entries = match fragment.get(shape.tools_key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.clone(),
        Some(other) => {
            return Err(AdapterError::InvalidSpec(format!(
                "{} must be an array, got {other}",
                shape.tools_key
            )));
        }
    };

    let declarations = match shape.group_key {
        Some(group) => {
            let mut flat = Vec::new();
            for entry in &entries {
                match entry.get(group) {
                    Some(Value::Array(items)) => flat.extend(items.iter().cloned()),
                    _ => {
                        return Err(AdapterError::InvalidSpec(format!(
                            "tool entry without {group} array: {entry}"
                        )));
                    }
                }
            }
            flat
        }
        None => entries,
    };

    let tools = declarations
        .iter()
        .map(|d| decode_declaration(d, shape))
        .collect::<Result<Vec<_>>>()?;

    let choice = match fragment.get(profile.choice.key) {
        None | Some(Value::Null) => ToolChoicePolicy::Auto,
        Some(value) => decode_choice(value, profile.choice.style)?,
    };

    Ok((tools, choice))
}

fn decode_declaration(entry: &Value, shape: &DeclarationShape) -> Result<ToolSpec> {
    let declaration = match shape.wrapper {
        Some(wrapper) => entry.get(wrapper.key).ok_or_else(|| {
            AdapterError::InvalidSpec(format!("tool entry without {}: {entry}", wrapper.key))
        })?,
        None => entry,
    };

    let Some(name) = declaration.get(shape.name_key).and_then(Value::as_str) else {
        return Err(AdapterError::InvalidSpec(format!(
            "tool declaration without {}: {declaration}",
            shape.name_key
        )));
    };
    let description = declaration
        .get(shape.description_key)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let parameters = match declaration.get(shape.parameters_key) {
        None | Some(Value::Null) => SchemaNode::default(),
        Some(schema) => SchemaNode::from_json(schema)?,
    };

    ToolSpec::validated(name, description, parameters)
}

fn decode_choice(value: &Value, style: ChoiceStyle) -> Result<ToolChoicePolicy> {
    let unsupported =
        || AdapterError::InvalidSpec(format!("unsupported tool choice for {style:?}: {value}"));

    match style {
        ChoiceStyle::FunctionObject => match value {
            Value::String(s) if s == "auto" => Ok(ToolChoicePolicy::Auto),
            Value::String(s) if s == "none" => Ok(ToolChoicePolicy::None),
            Value::Object(_) => value
                .pointer("/function/name")
                .and_then(Value::as_str)
                .map(|name| ToolChoicePolicy::Forced(name.to_string()))
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        },
        ChoiceStyle::TypedObject => match value.get("type").and_then(Value::as_str) {
            Some("auto") => Ok(ToolChoicePolicy::Auto),
            Some("none") => Ok(ToolChoicePolicy::None),
            Some("tool") => value
                .get("name")
                .and_then(Value::as_str)
                .map(|name| ToolChoicePolicy::Forced(name.to_string()))
                .ok_or_else(unsupported),
            _ => Err(unsupported()),
        },
        ChoiceStyle::CallingMode => {
            let config = value.get("functionCallingConfig").ok_or_else(unsupported)?;
            match config.get("mode").and_then(Value::as_str) {
                Some("AUTO") => Ok(ToolChoicePolicy::Auto),
                Some("NONE") => Ok(ToolChoicePolicy::None),
                Some("ANY") => match config.get("allowedFunctionNames") {
                    Some(Value::Array(names)) if names.len() == 1 => names[0]
                        .as_str()
                        .map(|name| ToolChoicePolicy::Forced(name.to_string()))
                        .ok_or_else(unsupported),
                    _ => Err(unsupported()),
                },
                _ => Err(unsupported()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_tool() -> ToolSpec {
        ToolSpec {
            name: "lookup".to_string(),
            description: "Find a record".to_string(),
            parameters: ObjectSchema::new()
                .required_property("id", SchemaNode::string().with_description("record id"))
                .property(
                    "filters",
                    SchemaNode::array(
                        ObjectSchema::new()
                            .property("field", SchemaNode::string().with_description("column"))
                            .property("value", SchemaNode::string())
                            .into(),
                    )
                    .with_description("optional filters"),
                )
                .into(),
        }
    }

    #[test]
    fn tool_name_rules() {
        assert!(check_tool_name("_private", 64).is_ok());
        assert!(check_tool_name("get_weather2", 64).is_ok());
        assert!(check_tool_name("", 64).is_err());
        assert!(check_tool_name("get-weather", 64).is_err());
        assert!(check_tool_name("2fast", 64).is_err());
        assert!(check_tool_name(&"a".repeat(65), 64).is_err());
        assert!(check_tool_name(&"a".repeat(64), 64).is_ok());
    }

    #[test]
    fn strict_vendor_reports_first_undescribed_nested_node() {
        let err = validate_spec(&lookup_tool(), &VendorProfile::vertex_ai())
            .expect_err("filters[].value has no description");
        match err {
            AdapterError::MissingDescription { tool, path } => {
                assert_eq!(tool, "lookup");
                assert_eq!(path, "lookup.filters.value");
            }
            other => panic!("expected MissingDescription, got {other:?}"),
        }
    }

    #[test]
    fn strict_vendor_requires_tool_description() {
        let mut tool = lookup_tool();
        tool.description = "  ".to_string();
        let err = validate_spec(&tool, &VendorProfile::vertex_ai()).expect_err("blank");
        assert!(matches!(err, AdapterError::MissingDescription { ref path, .. } if path == "lookup"));
    }

    #[test]
    fn loose_vendors_accept_missing_descriptions() {
        let mut tool = lookup_tool();
        tool.description.clear();
        for profile in [
            VendorProfile::openai(),
            VendorProfile::anthropic(),
            VendorProfile::mistral(),
            VendorProfile::together_ai(),
        ] {
            validate_spec(&tool, &profile).expect("loose vendor accepts");
        }
    }

    #[test]
    fn required_keys_must_be_declared() {
        let tool = ToolSpec {
            name: "broken".to_string(),
            description: "d".to_string(),
            parameters: SchemaNode::Object(ObjectSchema {
                required: vec!["missing".to_string()],
                ..ObjectSchema::default()
            }),
        };
        let err = validate_spec(&tool, &VendorProfile::openai()).expect_err("dangling required");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn duplicate_property_names_are_rejected() {
        let tool = ToolSpec {
            name: "twice".to_string(),
            description: "d".to_string(),
            parameters: ObjectSchema::new()
                .required_property("a", SchemaNode::string().with_description("first"))
                .property("a", SchemaNode::number().with_description("second"))
                .into(),
        };
        let err = validate_spec(&tool, &VendorProfile::openai()).expect_err("shadowed property");
        assert!(matches!(err, AdapterError::InvalidSpec(ref msg) if msg.contains("\"a\" twice")));
        assert!(encode_request(&[tool], &ToolChoicePolicy::Auto, &VendorProfile::openai()).is_err());
    }

    #[test]
    fn duplicate_nested_property_names_are_rejected() {
        let tool = ToolSpec {
            name: "nested".to_string(),
            description: "d".to_string(),
            parameters: ObjectSchema::new()
                .property(
                    "rows",
                    SchemaNode::array(
                        ObjectSchema::new()
                            .property("k", SchemaNode::string())
                            .property("k", SchemaNode::integer())
                            .into(),
                    ),
                )
                .into(),
        };
        let err = validate_spec(&tool, &VendorProfile::anthropic()).expect_err("nested duplicate");
        assert!(err.to_string().contains("nested.rows"));
    }

    #[test]
    fn none_without_tools_is_rejected() {
        let err = encode_request(&[], &ToolChoicePolicy::None, &VendorProfile::openai())
            .expect_err("nothing to withhold");
        assert!(matches!(err, AdapterError::InvalidSpec(_)));
    }

    #[test]
    fn auto_without_tools_is_empty() {
        let fragment = encode_request(&[], &ToolChoicePolicy::Auto, &VendorProfile::anthropic())
            .expect("empty fragment");
        assert!(fragment.is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tools = vec![lookup_tool(), lookup_tool()];
        let err = encode_request(&tools, &ToolChoicePolicy::Auto, &VendorProfile::openai())
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn anthropic_shape_uses_input_schema_and_typed_choice() {
        let fragment = encode_request(
            &[lookup_tool()],
            &ToolChoicePolicy::Forced("lookup".to_string()),
            &VendorProfile::anthropic(),
        )
        .expect("encode");
        let tools = fragment.get("tools").expect("tools");
        assert_eq!(tools[0]["name"], json!("lookup"));
        assert_eq!(tools[0]["description"], json!("Find a record"));
        assert_eq!(tools[0]["input_schema"]["type"], json!("object"));
        assert_eq!(
            fragment.get("tool_choice"),
            Some(&json!({ "type": "tool", "name": "lookup", "disable_parallel_tool_use": true }))
        );
        assert!(fragment.get("parallel_tool_calls").is_none());
    }

    #[test]
    fn vertex_shape_groups_declarations_and_uses_calling_mode() {
        let mut tool = lookup_tool();
        tool.parameters = ObjectSchema::new()
            .required_property("id", SchemaNode::string().with_description("record id"))
            .into();
        let fragment = encode_request(
            &[tool],
            &ToolChoicePolicy::Forced("lookup".to_string()),
            &VendorProfile::vertex_ai(),
        )
        .expect("encode");

        let tools = fragment.get("tools").expect("tools");
        assert_eq!(tools.as_array().map(Vec::len), Some(1));
        assert_eq!(tools[0]["functionDeclarations"][0]["name"], json!("lookup"));
        assert_eq!(
            fragment.get("toolConfig"),
            Some(&json!({
                "functionCallingConfig": { "mode": "ANY", "allowedFunctionNames": ["lookup"] }
            }))
        );
    }

    #[test]
    fn openai_forced_disables_parallel_calls() {
        let fragment = encode_request(
            &[lookup_tool()],
            &ToolChoicePolicy::Forced("lookup".to_string()),
            &VendorProfile::openai(),
        )
        .expect("encode");
        assert_eq!(
            fragment.get("tool_choice"),
            Some(&json!({ "type": "function", "function": { "name": "lookup" } }))
        );
        assert_eq!(fragment.get("parallel_tool_calls"), Some(&json!(false)));

        let together = encode_request(
            &[lookup_tool()],
            &ToolChoicePolicy::Forced("lookup".to_string()),
            &VendorProfile::together_ai(),
        )
        .expect("encode");
        assert!(together.get("parallel_tool_calls").is_none());
    }

    #[test]
    fn decode_choice_rejects_unrepresentable_values() {
        assert!(decode_choice(&json!("required"), ChoiceStyle::FunctionObject).is_err());
        assert!(decode_choice(&json!({ "type": "any" }), ChoiceStyle::TypedObject).is_err());
        assert!(
            decode_choice(
                &json!({ "functionCallingConfig": { "mode": "ANY" } }),
                ChoiceStyle::CallingMode
            )
            .is_err()
        );
    }

    #[test]
    fn decode_request_defaults_missing_choice_to_auto() {
        let fragment = VendorToolRequestFragment::new(
            json!({
                "tools": [{
                    "type": "function",
                    "function": { "name": "ping", "parameters": { "type": "object", "properties": {} } }
                }]
            })
            .as_object()
            .cloned()
            .expect("object"),
        );
        let (tools, choice) =
            decode_request(&fragment, &VendorProfile::openai()).expect("decode request");
        assert_eq!(choice, ToolChoicePolicy::Auto);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "ping");
        assert!(!tools[0].has_description());
    }
}
