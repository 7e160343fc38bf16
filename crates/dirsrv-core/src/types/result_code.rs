//! LDAP result codes (RFC 4511 §4.1.9 plus the cancel extension codes).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result code reported to the client when an operation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Success,
    OperationsError,
    ProtocolError,
    TimeLimitExceeded,
    SizeLimitExceeded,
    CompareFalse,
    CompareTrue,
    AuthMethodNotSupported,
    StrongAuthRequired,
    Referral,
    AdminLimitExceeded,
    UnavailableCriticalExtension,
    ConfidentialityRequired,
    SaslBindInProgress,
    NoSuchAttribute,
    UndefinedAttributeType,
    InappropriateMatching,
    ConstraintViolation,
    AttributeOrValueExists,
    InvalidAttributeSyntax,
    NoSuchObject,
    AliasProblem,
    InvalidDnSyntax,
    AliasDereferencingProblem,
    InappropriateAuthentication,
    InvalidCredentials,
    InsufficientAccessRights,
    Busy,
    Unavailable,
    UnwillingToPerform,
    LoopDetect,
    NamingViolation,
    ObjectClassViolation,
    NotAllowedOnNonLeaf,
    NotAllowedOnRdn,
    EntryAlreadyExists,
    ObjectClassModsProhibited,
    AffectsMultipleDsas,
    Other,
    Canceled,
    NoSuchOperation,
    TooLate,
    CannotCancel,
}

impl ResultCode {
    /// Returns the numeric protocol value.
    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::OperationsError => 1,
            Self::ProtocolError => 2,
            Self::TimeLimitExceeded => 3,
            Self::SizeLimitExceeded => 4,
            Self::CompareFalse => 5,
            Self::CompareTrue => 6,
            Self::AuthMethodNotSupported => 7,
            Self::StrongAuthRequired => 8,
            Self::Referral => 10,
            Self::AdminLimitExceeded => 11,
            Self::UnavailableCriticalExtension => 12,
            Self::ConfidentialityRequired => 13,
            Self::SaslBindInProgress => 14,
            Self::NoSuchAttribute => 16,
            Self::UndefinedAttributeType => 17,
            Self::InappropriateMatching => 18,
            Self::ConstraintViolation => 19,
            Self::AttributeOrValueExists => 20,
            Self::InvalidAttributeSyntax => 21,
            Self::NoSuchObject => 32,
            Self::AliasProblem => 33,
            Self::InvalidDnSyntax => 34,
            Self::AliasDereferencingProblem => 36,
            Self::InappropriateAuthentication => 48,
            Self::InvalidCredentials => 49,
            Self::InsufficientAccessRights => 50,
            Self::Busy => 51,
            Self::Unavailable => 52,
            Self::UnwillingToPerform => 53,
            Self::LoopDetect => 54,
            Self::NamingViolation => 64,
            Self::ObjectClassViolation => 65,
            Self::NotAllowedOnNonLeaf => 66,
            Self::NotAllowedOnRdn => 67,
            Self::EntryAlreadyExists => 68,
            Self::ObjectClassModsProhibited => 69,
            Self::AffectsMultipleDsas => 71,
            Self::Other => 80,
            Self::Canceled => 118,
            Self::NoSuchOperation => 119,
            Self::TooLate => 120,
            Self::CannotCancel => 121,
        }
    }

    /// Looks up a result code by its numeric protocol value.
    pub fn from_code(code: i32) -> Option<Self> {
        const ALL: [ResultCode; 43] = [
            ResultCode::Success,
            ResultCode::OperationsError,
            ResultCode::ProtocolError,
            ResultCode::TimeLimitExceeded,
            ResultCode::SizeLimitExceeded,
            ResultCode::CompareFalse,
            ResultCode::CompareTrue,
            ResultCode::AuthMethodNotSupported,
            ResultCode::StrongAuthRequired,
            ResultCode::Referral,
            ResultCode::AdminLimitExceeded,
            ResultCode::UnavailableCriticalExtension,
            ResultCode::ConfidentialityRequired,
            ResultCode::SaslBindInProgress,
            ResultCode::NoSuchAttribute,
            ResultCode::UndefinedAttributeType,
            ResultCode::InappropriateMatching,
            ResultCode::ConstraintViolation,
            ResultCode::AttributeOrValueExists,
            ResultCode::InvalidAttributeSyntax,
            ResultCode::NoSuchObject,
            ResultCode::AliasProblem,
            ResultCode::InvalidDnSyntax,
            ResultCode::AliasDereferencingProblem,
            ResultCode::InappropriateAuthentication,
            ResultCode::InvalidCredentials,
            ResultCode::InsufficientAccessRights,
            ResultCode::Busy,
            ResultCode::Unavailable,
            ResultCode::UnwillingToPerform,
            ResultCode::LoopDetect,
            ResultCode::NamingViolation,
            ResultCode::ObjectClassViolation,
            ResultCode::NotAllowedOnNonLeaf,
            ResultCode::NotAllowedOnRdn,
            ResultCode::EntryAlreadyExists,
            ResultCode::ObjectClassModsProhibited,
            ResultCode::AffectsMultipleDsas,
            ResultCode::Other,
            ResultCode::Canceled,
            ResultCode::NoSuchOperation,
            ResultCode::TooLate,
            ResultCode::CannotCancel,
        ];
        ALL.into_iter().find(|rc| rc.code() == code)
    }

    /// Returns whether this code reports a successful operation.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
