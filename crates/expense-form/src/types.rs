use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid amount '{0}'")]
    Amount(String),
    #[error("{0} total overflows")]
    Overflow(&'static str),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("QR code error: {0}")]
    Qr(#[from] qrcode::types::QrError),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FormError>;
