use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("network error: {0}")]
    Network(String),

    #[error("response missing expected fields: {0}")]
    Schema(String),

    #[error("transaction missing required field: {0}")]
    MissingField(&'static str),

    #[error("feature vector has {got} features, model expects {want}")]
    Classification { got: usize, want: usize },
}

impl From<reqwest::Error> for GraphError {
    fn from(e: reqwest::Error) -> Self {
        GraphError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Schema(e.to_string())
    }
}
