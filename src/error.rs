use thiserror::Error;

use crate::models::Route;

#[derive(Error, Debug)]
pub enum WalkError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Request errors
    #[error("Invalid parameters")]
    InvalidParameters,

    #[error("Wrong secret")]
    WrongSecret,

    #[error("Login required")]
    Unauthorized,

    #[error("The event is not open yet")]
    EventNotOpen,

    // Team errors
    #[error("QR code error, team not found")]
    TeamNotFound,

    #[error("This team belongs to another route")]
    OtherRoute,

    #[error("This code is already bound to a team")]
    CodeAlreadyBound,

    #[error("Some members have not confirmed their status")]
    MembersUnconfirmed,

    #[error("Not enough members to start, cannot bind")]
    NotEnoughMembers,

    #[error("The team has not scanned at the start point")]
    StartNotScanned,

    #[error("The team has already finished, ask an administrator if in doubt")]
    TeamFinished,

    #[error("The team status is already confirmed, ask an administrator if in doubt")]
    StatusAlreadyConfirmed,

    #[error("This team walks the half route, let it continue")]
    HalfRouteContinue,

    #[error("This team walks the full route, let it continue")]
    FullRouteContinue,

    #[error("Checkpoint {point} is out of range for route {}", route.key())]
    PointOutOfRange { route: Route, point: i8 },

    #[error("Duplicate scan, please resubmit")]
    DuplicateScan,

    #[error("Scan error, please scan again")]
    ScanError,

    #[error("{name}'s team has already started, cannot regroup")]
    TeamAlreadyStarted { name: String },

    #[error("No members were scanned")]
    EmptyGroup,

    // Member errors
    #[error("Scan error, user not found, please check again")]
    UserNotFound,

    #[error("Failed to load team information")]
    TeamInfoUnavailable,

    #[error("Member has already finished the walk")]
    MemberFinished,

    // Registration errors
    #[error("Already registered, please log in")]
    AlreadyRegistered,

    #[error("Wrong account or password")]
    WrongCredentials,

    #[error("The identity service is closed at night, please try during the day")]
    IdentityServiceClosed,

    #[error("Account not activated, please activate it on the identity portal")]
    AccountNotActivated,

    #[error("System error, please try again later")]
    Upstream { message: String },

    // Admin errors
    #[error("Admin account '{account}' already exists")]
    DuplicateAccount { account: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl WalkError {
    /// Errors raised by authentication rather than business rules
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, WalkError::Unauthorized)
    }
}

impl From<std::io::Error> for WalkError {
    fn from(err: std::io::Error) -> Self {
        WalkError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WalkError {
    fn from(err: serde_json::Error) -> Self {
        WalkError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WalkError>;
