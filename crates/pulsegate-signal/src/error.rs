use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no phone number configured")]
    NoPhoneNumber,
}
