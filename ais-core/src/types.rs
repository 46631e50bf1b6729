//! Shared types and error enums for ais-core.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// All errors produced by ais-core.
#[derive(Debug, Error)]
pub enum AisError {
    #[error("invalid MMSI: {0}")]
    InvalidMmsi(String),
    #[error("report is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("report is not a JSON object")]
    NotAnObject,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the durable identity store. Kept separate from
/// [`AisError`] so the `IdentityStore` contract stays narrow.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AisError>;

// ---------------------------------------------------------------------------
// MMSI
// ---------------------------------------------------------------------------

/// Maritime Mobile Service Identity — the registry key.
///
/// Only identities that pass [`Mmsi::new`] exist: at least 9 decimal
/// digits (shorter numbers are base stations, navigation aids and the
/// like), and not starting with `111` (search-and-rescue aircraft).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Mmsi(u64);

impl Mmsi {
    /// Validate a raw numeric identity.
    pub fn new(raw: u64) -> Result<Self> {
        let digits = raw.to_string();
        if digits.len() < 9 {
            return Err(AisError::InvalidMmsi(format!("{digits} is not a vessel")));
        }
        if digits.starts_with("111") {
            return Err(AisError::InvalidMmsi(format!("{digits} is a SAR aircraft")));
        }
        Ok(Mmsi(raw))
    }

    /// Parse an MMSI from a decoded report value, which decoders emit
    /// as either an integer or a digit string.
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw = match value {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| AisError::InvalidMmsi(n.to_string()))?,
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| AisError::InvalidMmsi(s.clone()))?,
            other => return Err(AisError::InvalidMmsi(other.to_string())),
        };
        Self::new(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Mmsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Mmsi {
    type Err = AisError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|_| AisError::InvalidMmsi(s.to_string()))?;
        Self::new(raw)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Current UNIX time in whole seconds.
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
