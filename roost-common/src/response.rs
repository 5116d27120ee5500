//! Success/error/payload envelope returned by every fetch operation.
//!
//! Operations never surface an `Err` or panic to their callers; they hand back a
//! [`Response`] and the caller branches on [`Response::success`] before touching
//! the payload. The constructors are the only way to build one, which keeps
//! `success` and `error.kind` in agreement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of outcomes an operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Success sentinel.
    NoError,
    /// A listing came back with an empty tweet container.
    NoTweetsFound,
    /// The requested tweet (or its timeline) does not exist.
    TweetNotFound,
    /// Fetch, decode or shape failure.
    FatalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoError => "no_error",
            ErrorKind::NoTweetsFound => "no_tweets_found",
            ErrorKind::TweetNotFound => "tweet_not_found",
            ErrorKind::FatalError => "fatal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error kind plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct ErrorInfo {
    kind: ErrorKind,
    message: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Typed result envelope.
///
/// ```
/// use roost_common::{ErrorKind, Response};
///
/// let ok = Response::ok(7u8);
/// assert!(ok.success());
/// assert_eq!(ok.error().kind(), ErrorKind::NoError);
/// assert_eq!(ok.into_result().unwrap(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawResponse<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct Response<T> {
    success: bool,
    error: ErrorInfo,
    data: T,
}

/// Wire shape of [`Response`], checked before it becomes one.
#[derive(Deserialize)]
struct RawResponse<T> {
    success: bool,
    error: ErrorInfo,
    data: T,
}

impl<T> TryFrom<RawResponse<T>> for Response<T> {
    type Error = String;

    fn try_from(raw: RawResponse<T>) -> Result<Self, Self::Error> {
        if raw.success != (raw.error.kind == ErrorKind::NoError) {
            return Err(format!(
                "inconsistent envelope: success={} with error kind {}",
                raw.success, raw.error.kind
            ));
        }
        Ok(Self {
            success: raw.success,
            error: raw.error,
            data: raw.data,
        })
    }
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: ErrorInfo::new(ErrorKind::NoError),
            data,
        }
    }

    /// Negative response carrying `data` as its (usually empty) payload.
    ///
    /// Passing [`ErrorKind::NoError`] here is a caller bug; it is recorded as a
    /// `FatalError` so the envelope stays consistent.
    pub fn fail(kind: ErrorKind, data: T) -> Self {
        Self::fail_with(ErrorInfo::new(kind), data)
    }

    pub fn fail_with(error: ErrorInfo, data: T) -> Self {
        let error = if error.kind == ErrorKind::NoError {
            ErrorInfo {
                kind: ErrorKind::FatalError,
                message: error.message,
            }
        } else {
            error
        };
        Self {
            success: false,
            error,
            data,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> &ErrorInfo {
        &self.error
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error)
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            success: self.success,
            error: self.error,
            data: f(self.data),
        }
    }
}

impl<T: Default> Response<T> {
    /// Negative response with a default payload and a diagnostic message.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::fail_with(
            ErrorInfo::with_message(ErrorKind::FatalError, message),
            T::default(),
        )
    }
}
