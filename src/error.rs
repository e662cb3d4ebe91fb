use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Value {value} outside histogram domain [{min}, {max}]")]
    DomainViolation { value: i64, min: i64, max: i64 },

    #[error("Histogram has an empty domain")]
    EmptyDomain,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Type error: {0}")]
    Type(String),
}
