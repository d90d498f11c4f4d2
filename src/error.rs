use thiserror::Error;

pub type Result<T> = std::result::Result<T, InviteError>;

#[derive(Error, Debug)]
pub enum InviteError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Config ID mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Render target not found: {0}")]
    RenderTargetMissing(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Failed to encode record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to generate QR code: {0}")]
    Qr(String),
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("Failed to encode image: {0}")]
    Image(#[from] ::image::ImageError),
    #[error("Failed to load background: {0}")]
    Background(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InviteError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
