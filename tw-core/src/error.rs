use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool {tool} is missing a description at {path}")]
    MissingDescription { tool: String, path: String },

    #[error("malformed arguments in tool call {index}: {reason} raw={raw}")]
    MalformedArguments {
        index: usize,
        raw: String,
        reason: String,
    },

    #[error("unsupported vendor: {0}")]
    UnsupportedVendor(String),

    #[error("invalid tool spec: {0}")]
    InvalidSpec(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        Self::ResponseFormat(e.to_string())
    }
}
