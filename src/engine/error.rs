use crate::lottery::LotteryError;

#[derive(Debug)]
pub enum EngineError {
    ClubNotFound(String),
    RoomNotFound(String),
    AlreadyExists(String),
    /// Input rejected at the boundary before it reaches the store.
    Invalid(String),
    LimitExceeded(&'static str),
    RunInProgress,
    Lottery(LotteryError),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ClubNotFound(name) => write!(f, "club not found: {name}"),
            EngineError::RoomNotFound(name) => write!(f, "room not found: {name}"),
            EngineError::AlreadyExists(name) => write!(f, "already exists: {name}"),
            EngineError::Invalid(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::RunInProgress => write!(f, "a lottery run is already in progress"),
            EngineError::Lottery(e) => write!(f, "lottery rejected: {e}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Lottery(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LotteryError> for EngineError {
    fn from(e: LotteryError) -> Self {
        EngineError::Lottery(e)
    }
}
