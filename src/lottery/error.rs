#[derive(Debug, PartialEq, Eq)]
pub enum LotteryError {
    /// A reservation selection with an empty day label.
    MissingDay { club: String },
    TooManyPreferences {
        club: String,
        day: String,
        count: usize,
    },
    /// An active club that is not part of the credit cohort.
    UnknownClub(String),
}

impl std::fmt::Display for LotteryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotteryError::MissingDay { club } => {
                write!(f, "reservation from {club} has a selection without a day")
            }
            LotteryError::TooManyPreferences { club, day, count } => write!(
                f,
                "slot of {club} on {day} lists {count} preferences (max {})",
                crate::limits::MAX_PREFERENCES
            ),
            LotteryError::UnknownClub(name) => write!(f, "unknown club: {name}"),
        }
    }
}

impl std::error::Error for LotteryError {}
