//! Vendor lookup table.
//!
//! Every wire difference between vendors is data on a [`VendorProfile`]: key
//! names, wrapper objects, selection styles and strictness flags. The encode
//! and decode paths read these fields and never branch on a vendor id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(Cow<'static, str>);

impl VendorId {
    pub const OPENAI: VendorId = VendorId(Cow::Borrowed("openai"));
    pub const ANTHROPIC: VendorId = VendorId(Cow::Borrowed("anthropic"));
    pub const MISTRAL: VendorId = VendorId(Cow::Borrowed("mistral"));
    pub const VERTEX_AI: VendorId = VendorId(Cow::Borrowed("vertexai"));
    pub const TOGETHER_AI: VendorId = VendorId(Cow::Borrowed("togetherai"));

    /// Normalizes to trimmed lowercase so `"OpenAI "` and `"openai"` match.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Cow::Owned(id.as_ref().trim().to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VendorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// `{"type": <type_value>, <key>: {...declaration...}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationWrapper {
    pub type_value: &'static str,
    pub key: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationShape {
    /// Request field holding the declarations.
    pub tools_key: &'static str,
    /// When set, all declarations sit in one `[{<group_key>: [...]}]` entry.
    pub group_key: Option<&'static str>,
    pub wrapper: Option<DeclarationWrapper>,
    pub name_key: &'static str,
    pub description_key: &'static str,
    pub parameters_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceStyle {
    /// `"auto"` / `"none"`; forced is `{"type":"function","function":{"name":..}}`.
    FunctionObject,
    /// `{"type":"auto"}` / `{"type":"none"}` / `{"type":"tool","name":..}`.
    TypedObject,
    /// `{"functionCallingConfig":{"mode":"AUTO"|"NONE"|"ANY"}}`.
    CallingMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceShape {
    pub key: &'static str,
    pub style: ChoiceStyle,
    /// Request flag set to `false` on a forced call so the tool runs exactly once.
    pub parallel_key: Option<&'static str>,
}

/// Which entries of a response array are tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFilter {
    All,
    TypeTag {
        key: &'static str,
        value: &'static str,
    },
    HasKey(&'static str),
}

impl CallFilter {
    pub fn matches(&self, entry: &Value) -> bool {
        match self {
            CallFilter::All => true,
            CallFilter::TypeTag { key, value } => {
                entry.get(*key).and_then(Value::as_str) == Some(*value)
            }
            CallFilter::HasKey(key) => entry.get(*key).is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentsEncoding {
    /// Arguments travel as a string holding a JSON object.
    JsonString,
    /// Arguments travel as a JSON object.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseShape {
    /// JSON pointer to the call array inside a complete response body.
    pub body_pointer: &'static str,
    pub filter: CallFilter,
    /// `(key, value)` written on each call object when re-encoding.
    pub type_tag: Option<(&'static str, &'static str)>,
    /// Nested object holding name and arguments; `None` means the entry itself.
    pub call_key: Option<&'static str>,
    pub id_key: Option<&'static str>,
    pub name_key: &'static str,
    pub arguments_key: &'static str,
    pub arguments: ArgumentsEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStyle {
    /// One `{"role":"tool","tool_call_id":..}` message per result.
    ToolMessages { include_name: bool },
    /// One `user` message carrying `tool_result` blocks.
    ToolResultBlocks,
    /// One `function` turn carrying `functionResponse` parts.
    FunctionResponseParts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorProfile {
    pub id: VendorId,
    pub declarations: DeclarationShape,
    pub choice: ChoiceShape,
    pub response: ResponseShape,
    pub results: ResultStyle,
    pub max_tool_name_len: usize,
    /// Require descriptions on the tool and on every parameter node.
    pub strict_descriptions: bool,
    /// Call ids that mean "no id" for this vendor, in addition to `""`.
    pub absent_id_sentinels: Vec<String>,
}

const OPENAI_DECLARATIONS: DeclarationShape = DeclarationShape {
    tools_key: "tools",
    group_key: None,
    wrapper: Some(DeclarationWrapper {
        type_value: "function",
        key: "function",
    }),
    name_key: "name",
    description_key: "description",
    parameters_key: "parameters",
};

const OPENAI_RESPONSE: ResponseShape = ResponseShape {
    body_pointer: "/choices/0/message/tool_calls",
    filter: CallFilter::All,
    type_tag: Some(("type", "function")),
    call_key: Some("function"),
    id_key: Some("id"),
    name_key: "name",
    arguments_key: "arguments",
    arguments: ArgumentsEncoding::JsonString,
};

impl VendorProfile {
    pub fn openai() -> Self {
        Self {
            id: VendorId::OPENAI,
            declarations: OPENAI_DECLARATIONS,
            choice: ChoiceShape {
                key: "tool_choice",
                style: ChoiceStyle::FunctionObject,
                parallel_key: Some("parallel_tool_calls"),
            },
            response: OPENAI_RESPONSE,
            results: ResultStyle::ToolMessages {
                include_name: false,
            },
            max_tool_name_len: 64,
            strict_descriptions: false,
            absent_id_sentinels: Vec::new(),
        }
    }

    /// OpenAI-compatible endpoint without the parallel-calls flag.
    pub fn together_ai() -> Self {
        Self {
            id: VendorId::TOGETHER_AI,
            choice: ChoiceShape {
                key: "tool_choice",
                style: ChoiceStyle::FunctionObject,
                parallel_key: None,
            },
            ..Self::openai()
        }
    }

    /// OpenAI-shaped, but tool messages carry the tool name and some model
    /// versions report missing call ids as the literal string `"null"`.
    pub fn mistral() -> Self {
        Self {
            id: VendorId::MISTRAL,
            results: ResultStyle::ToolMessages { include_name: true },
            absent_id_sentinels: vec!["null".to_string()],
            ..Self::openai()
        }
    }

    pub fn anthropic() -> Self {
        Self {
            id: VendorId::ANTHROPIC,
            declarations: DeclarationShape {
                tools_key: "tools",
                group_key: None,
                wrapper: None,
                name_key: "name",
                description_key: "description",
                parameters_key: "input_schema",
            },
            choice: ChoiceShape {
                key: "tool_choice",
                style: ChoiceStyle::TypedObject,
                parallel_key: None,
            },
            response: ResponseShape {
                body_pointer: "/content",
                filter: CallFilter::TypeTag {
                    key: "type",
                    value: "tool_use",
                },
                type_tag: Some(("type", "tool_use")),
                call_key: None,
                id_key: Some("id"),
                name_key: "name",
                arguments_key: "input",
                arguments: ArgumentsEncoding::Inline,
            },
            results: ResultStyle::ToolResultBlocks,
            max_tool_name_len: 64,
            strict_descriptions: false,
            absent_id_sentinels: Vec::new(),
        }
    }

    /// Gemini on Vertex AI. Function calls carry no id and the API rejects
    /// parameters that lack a description.
    pub fn vertex_ai() -> Self {
        Self {
            id: VendorId::VERTEX_AI,
            declarations: DeclarationShape {
                tools_key: "tools",
                group_key: Some("functionDeclarations"),
                wrapper: None,
                name_key: "name",
                description_key: "description",
                parameters_key: "parameters",
            },
            choice: ChoiceShape {
                key: "toolConfig",
                style: ChoiceStyle::CallingMode,
                parallel_key: None,
            },
            response: ResponseShape {
                body_pointer: "/candidates/0/content/parts",
                filter: CallFilter::HasKey("functionCall"),
                type_tag: None,
                call_key: Some("functionCall"),
                id_key: None,
                name_key: "name",
                arguments_key: "args",
                arguments: ArgumentsEncoding::Inline,
            },
            results: ResultStyle::FunctionResponseParts,
            max_tool_name_len: 64,
            strict_descriptions: true,
            absent_id_sentinels: Vec::new(),
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![
            Self::openai(),
            Self::anthropic(),
            Self::mistral(),
            Self::vertex_ai(),
            Self::together_ai(),
        ]
    }

    /// Same wire shape under a different id, e.g. an OpenAI-compatible gateway.
    pub fn aliased(&self, id: VendorId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }

    pub fn is_absent_id(&self, id: &str) -> bool {
        let id = id.trim();
        id.is_empty() || self.absent_id_sentinels.iter().any(|s| s == id)
    }
}
