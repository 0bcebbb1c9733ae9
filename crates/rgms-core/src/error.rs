use thiserror::Error;

#[derive(Error, Debug)]
pub enum RgmsError {
    #[error("Cadet not found: {0}")]
    CadetNotFound(i64),

    #[error("Merit/demerit log not found: {0}")]
    MeritLogNotFound(i64),

    #[error("Log {log_id} belongs to cadet {log_cadet_id}, not cadet {cadet_id}")]
    CadetMismatch {
        log_id: i64,
        log_cadet_id: i64,
        cadet_id: i64,
    },

    #[error("Invalid merit type '{0}' (expected 'merit' or 'demerit')")]
    InvalidMeritType(String),

    #[error("Invalid points: {0}")]
    InvalidPoints(String),

    #[error("Invalid cadet: {0}")]
    InvalidCadet(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    Json(#[from] serde_json::Error),
}

impl RgmsError {
    /// True for errors caused by the caller's input rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RgmsError::InvalidMeritType(_)
                | RgmsError::InvalidPoints(_)
                | RgmsError::InvalidCadet(_)
                | RgmsError::CadetMismatch { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RgmsError::CadetNotFound(_) | RgmsError::MeritLogNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RgmsError>;
