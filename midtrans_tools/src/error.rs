use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MidtransApiError {
    #[error("Could not initialize the Midtrans API client. {0}")]
    Initialization(String),
    #[error("Error sending request to Midtrans. {0}")]
    ResponseError(String),
    #[error("Could not deserialize Midtrans response. {0}")]
    JsonError(String),
    #[error("Midtrans returned an error status: {status}. {message}")]
    QueryError { status: u16, message: String },
}
