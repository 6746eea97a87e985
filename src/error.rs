use thiserror::Error;

/// Why a raw history record cannot become a `StreamEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidEvent {
    #[error("record has no timestamp")]
    MissingTimestamp,
    #[error("record timestamp {0:?} is not RFC 3339")]
    UnparseableTimestamp(String),
    #[error("record has no play duration")]
    MissingDuration,
    #[error("record has negative play duration {0}ms")]
    NegativeDuration(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("invalid stream record: {0}")]
    InvalidEvent(#[from] InvalidEvent),
    #[error("streaming history is empty")]
    EmptyLog,
}
