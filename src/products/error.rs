use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("no free reference code after {attempts} attempts")]
    CodeExhausted { attempts: u32 },
    #[error("score {0} is outside 1..=5")]
    InvalidScore(u8),
    #[error("unknown product `{0}`")]
    UnknownProduct(String),
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}
