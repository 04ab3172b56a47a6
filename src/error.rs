use wasm_bindgen::JsValue;

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string `type` field")]
    MissingType,
    #[error("unrecognized message type `{0}`")]
    UnknownType(String),
    #[error("malformed `{kind}` payload: {source}")]
    BadPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid client config: {0}")]
    Config(String),
    #[error("could not parse client config: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("socket error: {0}")]
    Socket(String),
    #[error("dom error: {0}")]
    Dom(String),
}

impl ClientError {
    /// Wraps a JS exception raised by a browser API.
    pub fn socket(err: JsValue) -> Self {
        ClientError::Socket(describe_js(&err))
    }

    pub fn dom(err: JsValue) -> Self {
        ClientError::Dom(describe_js(&err))
    }
}

impl From<ClientError> for JsValue {
    fn from(err: ClientError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

fn describe_js(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}
