use thiserror::Error;

/// Errors surfaced at the library's API boundary.
///
/// Corruption discovered mid-decode does not propagate as an `Err` from
/// `decode_checked` callers who prefer the boolean-flag convention: see
/// `Image::ok`. `Error::CorruptStream` exists for `decode_checked`, which
/// wraps that same failure as a `Result`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;
