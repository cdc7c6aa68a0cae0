use crate::db::RepoError;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;

/// Why a request was refused
///
/// Closed set: callers map these onto status codes / UI messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    VenueClosed,
    VenuePaused,
    /// Tables are free, no queue needed
    VenueWalkIn,
    CapacityExceeded,
    WaitingTypeInactive,
    DuplicatePhone,
    InvalidPartySize,
    MissingContact,
    /// Operation not allowed from the entry's current status
    InvalidStatus,
    RecallLimitExceeded,
    RestoreWindowExpired,
    /// Auto-cancel raced with a staff action that refreshed or reset the call
    CallNotExpired,
}

impl RejectReason {
    pub fn error_code(self) -> ErrorCode {
        match self {
            Self::VenueClosed => ErrorCode::VenueClosed,
            Self::VenuePaused => ErrorCode::VenuePaused,
            Self::VenueWalkIn => ErrorCode::VenueWalkIn,
            Self::CapacityExceeded => ErrorCode::CapacityExceeded,
            Self::WaitingTypeInactive => ErrorCode::WaitingTypeInactive,
            Self::DuplicatePhone => ErrorCode::DuplicatePhone,
            Self::InvalidPartySize => ErrorCode::InvalidPartySize,
            Self::MissingContact => ErrorCode::MissingContact,
            Self::InvalidStatus | Self::CallNotExpired => ErrorCode::InvalidWaitingStatus,
            Self::RecallLimitExceeded => ErrorCode::RecallLimitExceeded,
            Self::RestoreWindowExpired => ErrorCode::RestoreWindowExpired,
        }
    }
}

/// A refused request: machine reason + human message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.reason, self.message)
    }
}

/// What a not-found refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Entry,
    WaitingType,
    Setting,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Entry => "Waiting entry",
            Resource::WaitingType => "Waiting type",
            Resource::Setting => "Waiting setting",
        })
    }
}

/// Engine errors
///
/// `Rejected` and `NotFound` are expected outcomes; `Store` is a fault.
#[derive(Debug, Error)]
pub enum WaitingError {
    #[error("Rejected: {0}")]
    Rejected(Rejection),

    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    #[error("Store error: {0}")]
    Store(#[from] RepoError),
}

impl WaitingError {
    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self::Rejected(Rejection::new(reason, message))
    }

    pub fn entry_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: Resource::Entry,
            id: id.into(),
        }
    }

    /// Rejection reason, if this is a rejection
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Rejected(r) => Some(r.reason),
            _ => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<Rejection> for WaitingError {
    fn from(r: Rejection) -> Self {
        Self::Rejected(r)
    }
}

pub type WaitingResult<T> = Result<T, WaitingError>;

impl From<WaitingError> for AppError {
    fn from(err: WaitingError) -> Self {
        match err {
            WaitingError::Rejected(r) => {
                AppError::with_message(r.reason.error_code(), r.message)
                    .with_detail("reason", serde_json::json!(r.reason))
            }
            WaitingError::NotFound { resource, id } => {
                let code = match resource {
                    Resource::Entry => ErrorCode::WaitingNotFound,
                    Resource::WaitingType => ErrorCode::WaitingTypeNotFound,
                    Resource::Setting => ErrorCode::WaitingSettingNotFound,
                };
                AppError::with_message(code, format!("{resource} not found"))
                    .with_detail("id", id)
            }
            WaitingError::Store(e) => {
                tracing::error!(error = %e, "Queue store error");
                match e {
                    RepoError::Conflict(msg) => {
                        AppError::with_message(ErrorCode::ConcurrentModification, msg)
                    }
                    RepoError::Duplicate(msg) => {
                        AppError::with_message(ErrorCode::AlreadyExists, msg)
                    }
                    RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
                    RepoError::Validation(msg) => AppError::validation(msg),
                    RepoError::Database(msg) => AppError::database(msg),
                }
            }
        }
    }
}
