use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A required field was left empty.
    Validation(String),
    /// Bad credentials or an identity provider failure.
    Auth(String),
    DuplicateUsername(String),
    /// Generic store, blob or network failure.
    Io(String),
    /// No resolvable current user. Forces a logout.
    Session(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn io(msg: impl Into<String>) -> Self {
        ClientError::Io(msg.into())
    }

    pub fn is_session(&self) -> bool {
        matches!(self, ClientError::Session(_))
    }

    /// Text shown to the user in a notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg)
            | ClientError::Auth(msg)
            | ClientError::Io(msg)
            | ClientError::Session(msg) => msg.clone(),
            ClientError::DuplicateUsername(_) => "Username already exists!".to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            ClientError::Auth(msg) => write!(f, "Auth Error: {}", msg),
            ClientError::DuplicateUsername(name) => write!(f, "Username already exists: {}", name),
            ClientError::Io(msg) => write!(f, "IO Error: {}", msg),
            ClientError::Session(msg) => write!(f, "Session Error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

// Foreign failures inside backends surface as generic I/O errors
impl From<anyhow::Error> for ClientError {
    fn from(err: anyhow::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Io(format!("malformed document: {}", err))
    }
}
