use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template error: {message}")]
    Template { message: String },
}

impl CommonError {
    pub(crate) fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }
}
