use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed webhook payload: {0}")]
    MalformedWebhook(String),

    #[error("no phone number id configured")]
    NoPhoneNumberId,
}
