//! Unified error codes for the waiting-list engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Waiting errors (queue rejections, lifecycle violations)
//! - 9xxx: System errors
//!
//! Every rejection the engine can return maps to exactly one code here, so the
//! surrounding HTTP layer can translate codes into status codes without
//! inspecting messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 40xx: Waiting lookup ====================
    /// Waiting entry not found
    WaitingNotFound = 4001,
    /// Waiting type not found
    WaitingTypeNotFound = 4002,
    /// Venue has no waiting setting
    WaitingSettingNotFound = 4003,

    // ==================== 41xx: Registration ====================
    /// Venue is not accepting registrations (closed)
    VenueClosed = 4101,
    /// Registration is temporarily paused
    VenuePaused = 4102,
    /// Venue is in walk-in mode, no queueing needed
    VenueWalkIn = 4103,
    /// Maximum waiting count reached
    CapacityExceeded = 4104,
    /// Waiting type is inactive
    WaitingTypeInactive = 4105,
    /// Phone already has an active entry today
    DuplicatePhone = 4106,
    /// Party size must be at least 1
    InvalidPartySize = 4107,
    /// Neither phone nor name was provided
    MissingContact = 4108,

    // ==================== 42xx: Lifecycle ====================
    /// Operation not allowed in the entry's current status
    InvalidWaitingStatus = 4201,
    /// Recall budget exhausted
    RecallLimitExceeded = 4202,
    /// Terminal entry is too old to restore
    RestoreWindowExpired = 4203,

    // ==================== 43xx: Settings ====================
    /// Waiting setting value out of range
    InvalidWaitingSetting = 4301,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Concurrent modification could not be resolved
    ConcurrentModification = 9003,
    /// Notification could not be enqueued
    NotificationFailed = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Waiting lookup
            ErrorCode::WaitingNotFound => "Waiting entry not found",
            ErrorCode::WaitingTypeNotFound => "Waiting type not found",
            ErrorCode::WaitingSettingNotFound => "Waiting setting not found",

            // Registration
            ErrorCode::VenueClosed => "Waiting registration is closed",
            ErrorCode::VenuePaused => "Waiting registration is paused",
            ErrorCode::VenueWalkIn => "Walk-in available, no waiting needed",
            ErrorCode::CapacityExceeded => "Maximum waiting count exceeded",
            ErrorCode::WaitingTypeInactive => "Waiting type is not available",
            ErrorCode::DuplicatePhone => "Phone number is already waiting",
            ErrorCode::InvalidPartySize => "Party size must be at least 1",
            ErrorCode::MissingContact => "Phone or name is required",

            // Lifecycle
            ErrorCode::InvalidWaitingStatus => "Operation not allowed in current status",
            ErrorCode::RecallLimitExceeded => "Maximum call count exceeded",
            ErrorCode::RestoreWindowExpired => "Entry is too old to restore",

            // Settings
            ErrorCode::InvalidWaitingSetting => "Invalid waiting setting",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConcurrentModification => "Concurrent modification, please retry",
            ErrorCode::NotificationFailed => "Notification could not be enqueued",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Waiting lookup
            4001 => Ok(ErrorCode::WaitingNotFound),
            4002 => Ok(ErrorCode::WaitingTypeNotFound),
            4003 => Ok(ErrorCode::WaitingSettingNotFound),

            // Registration
            4101 => Ok(ErrorCode::VenueClosed),
            4102 => Ok(ErrorCode::VenuePaused),
            4103 => Ok(ErrorCode::VenueWalkIn),
            4104 => Ok(ErrorCode::CapacityExceeded),
            4105 => Ok(ErrorCode::WaitingTypeInactive),
            4106 => Ok(ErrorCode::DuplicatePhone),
            4107 => Ok(ErrorCode::InvalidPartySize),
            4108 => Ok(ErrorCode::MissingContact),

            // Lifecycle
            4201 => Ok(ErrorCode::InvalidWaitingStatus),
            4202 => Ok(ErrorCode::RecallLimitExceeded),
            4203 => Ok(ErrorCode::RestoreWindowExpired),

            // Settings
            4301 => Ok(ErrorCode::InvalidWaitingSetting),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConcurrentModification),
            9101 => Ok(ErrorCode::NotificationFailed),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
