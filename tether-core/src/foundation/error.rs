use secp256k1::Error as SecpError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidPublicKey,
    InvalidThreshold,
    DuplicateParticipant,
    EmptyParticipants,
    UnknownParticipant,
    InvalidStateTransition,
    SessionExpired,
    SessionTerminal,
    IdentityNotFound,
    WalletNotFound,
    SessionNotFound,
    ContactNotFound,
    NetworkMismatch,
    InvalidNetwork,
    StorageError,
    StorageLockPoisoned,
    RocksDbOpenError,
    SchemaMismatch,
    SerializationError,
    ConfigError,
    NetworkError,
    ParseError,
    Unimplemented,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum TetherError {
    #[error("invalid public key: input={input} reason={reason}")]
    InvalidPublicKey { input: String, reason: String },

    #[error("invalid threshold {threshold} for {participants} participants")]
    InvalidThreshold { threshold: u16, participants: usize },

    #[error("duplicate participant: {0}")]
    DuplicateParticipant(String),

    #[error("participant set is empty")]
    EmptyParticipants,

    #[error("public key {0} is not a participant of this session")]
    UnknownParticipant(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("session expired at {expired_at}, current time {current_time}")]
    SessionExpired { expired_at: u64, current_time: u64 },

    #[error("session is terminal in state {state}")]
    SessionTerminal { state: String },

    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    #[error("shared wallet not found: {0}")]
    WalletNotFound(String),

    #[error("signing session not found: {0}")]
    SessionNotFound(String),

    #[error("contact not found: {0}")]
    ContactNotFound(String),

    #[error("network mismatch: expected {expected}, got {actual}")]
    NetworkMismatch { expected: String, actual: String },

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("storage lock poisoned during {operation}")]
    StorageLockPoisoned { operation: String },

    #[error("RocksDB open error: {details}")]
    RocksDbOpenError { details: String },

    #[error("schema mismatch: stored={stored} current={current}")]
    SchemaMismatch { stored: u32, current: u32 },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("network error during {operation}: {details}")]
    NetworkError { operation: String, details: String },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("feature not implemented: {0}")]
    Unimplemented(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, TetherError>;

impl TetherError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TetherError::InvalidPublicKey { .. } => ErrorCode::InvalidPublicKey,
            TetherError::InvalidThreshold { .. } => ErrorCode::InvalidThreshold,
            TetherError::DuplicateParticipant(_) => ErrorCode::DuplicateParticipant,
            TetherError::EmptyParticipants => ErrorCode::EmptyParticipants,
            TetherError::UnknownParticipant(_) => ErrorCode::UnknownParticipant,
            TetherError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            TetherError::SessionExpired { .. } => ErrorCode::SessionExpired,
            TetherError::SessionTerminal { .. } => ErrorCode::SessionTerminal,
            TetherError::IdentityNotFound(_) => ErrorCode::IdentityNotFound,
            TetherError::WalletNotFound(_) => ErrorCode::WalletNotFound,
            TetherError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            TetherError::ContactNotFound(_) => ErrorCode::ContactNotFound,
            TetherError::NetworkMismatch { .. } => ErrorCode::NetworkMismatch,
            TetherError::InvalidNetwork(_) => ErrorCode::InvalidNetwork,
            TetherError::StorageError { .. } => ErrorCode::StorageError,
            TetherError::StorageLockPoisoned { .. } => ErrorCode::StorageLockPoisoned,
            TetherError::RocksDbOpenError { .. } => ErrorCode::RocksDbOpenError,
            TetherError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            TetherError::SerializationError { .. } => ErrorCode::SerializationError,
            TetherError::ConfigError(_) => ErrorCode::ConfigError,
            TetherError::NetworkError { .. } => ErrorCode::NetworkError,
            TetherError::ParseError(_) => ErrorCode::ParseError,
            TetherError::Unimplemented(_) => ErrorCode::Unimplemented,
            TetherError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), message: self.to_string() }
    }

    pub fn invalid_public_key(input: impl Into<String>, reason: impl Into<String>) -> Self {
        TetherError::InvalidPublicKey { input: input.into(), reason: reason.into() }
    }
}

impl From<hex::FromHexError> for TetherError {
    fn from(err: hex::FromHexError) -> Self {
        TetherError::ParseError(format!("hex decode error: {}", err))
    }
}

impl From<toml::de::Error> for TetherError {
    fn from(err: toml::de::Error) -> Self {
        TetherError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<rocksdb::Error> for TetherError {
    fn from(err: rocksdb::Error) -> Self {
        TetherError::StorageError { operation: "rocksdb".to_string(), details: err.to_string() }
    }
}

impl From<bincode::Error> for TetherError {
    fn from(err: bincode::Error) -> Self {
        TetherError::SerializationError { format: "bincode".to_string(), details: err.to_string() }
    }
}

impl From<io::Error> for TetherError {
    fn from(err: io::Error) -> Self {
        TetherError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<SecpError> for TetherError {
    fn from(err: SecpError) -> Self {
        TetherError::InvalidPublicKey { input: "<raw>".to_string(), reason: err.to_string() }
    }
}

#[macro_export]
macro_rules! storage_err {
    ($op:expr, $err:expr) => {
        $crate::foundation::TetherError::StorageError { operation: $op.into(), details: $err.to_string() }
    };
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured `TetherError` variants at the call site to preserve context.
