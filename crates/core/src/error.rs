use std::fmt;

/// Problems detected before any submission is attempted. A run that fails
/// validation has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    InvalidPhone { digits: usize },
    StartHourOutOfRange { hour: u32 },
    NoTargets,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "applicant name must be non-empty"),
            Self::InvalidPhone { digits } => write!(
                f,
                "phone number must contain exactly 11 digits (got {digits})"
            ),
            Self::StartHourOutOfRange { hour } => {
                write!(f, "start hour must be between 6 and 22 (got {hour})")
            }
            Self::NoTargets => write!(f, "no reservation dates resolved"),
        }
    }
}

impl std::error::Error for ValidationError {}
