//! Error types for the parsing layers.

use thiserror::Error;

/// A single record or event failed to decode.
///
/// These are contained to the one item that triggered them; the surrounding
/// batch keeps going and collects them for inspection.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unexpected shape for `{0}`")]
    UnexpectedShape(&'static str),

    #[error("event body has {0} lines, expected at least 6")]
    TruncatedBody(usize),

    #[error("line `{0}` has no `:` label separator")]
    UnlabeledLine(String),
}

/// A record that failed to parse, paired with where it came from
/// (the Notion page URL or the calendar event id).
#[derive(Debug)]
pub struct RecordFailure {
    pub source: String,
    pub error: ParseError,
}
