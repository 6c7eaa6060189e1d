use std::fmt;

/// Machine-readable error codes for operator and scheduler decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    StoreOpenFailed,
    MalformedEvent,
    MissingNaturalKey,
    InvalidSummary,
    StoreWriteFailed,
    QueueReadFailed,
    QueuePublishFailed,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::StoreOpenFailed => "E1002",
            Self::MalformedEvent => "E2001",
            Self::MissingNaturalKey => "E2002",
            Self::InvalidSummary => "E2003",
            Self::StoreWriteFailed => "E3001",
            Self::QueueReadFailed => "E4001",
            Self::QueuePublishFailed => "E4002",
            Self::LockContention => "E5001",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ovault.toml and retry."),
            Self::StoreOpenFailed => Some("Check the store path and its write permissions."),
            Self::MalformedEvent | Self::MissingNaturalKey => {
                Some("Fix the producer, or run with `malformed = \"skip\"` to pass over it.")
            }
            Self::InvalidSummary => None,
            Self::StoreWriteFailed => {
                Some("The event was rolled back and not published; rerun once the store is healthy.")
            }
            Self::QueueReadFailed => Some("Inspect the inbound topic at the committed offset."),
            Self::QueuePublishFailed => Some("Check the outbound topic is writable, then rerun."),
            Self::LockContention => Some("Retry after the other `ovault` run releases its lock."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
