//! Wire types for the /run exchange
//!
//! A request carries the program text and an optional deadline; the reply
//! wraps the invocation outcome in a status envelope. Nothing here is
//! persisted; both shapes live for a single HTTP call.

use serde::Serialize;
use thiserror::Error;

/// Deadline applied when a request does not name one, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Rejections of the request body, surfaced to the client as HTTP 400
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    /// Body was not a JSON object carrying a textual `program` field
    #[error("Request must include 'program' field")]
    MissingProgram,
    /// `timeout` was present but not a positive integer
    #[error("Field 'timeout' must be a positive integer")]
    InvalidTimeout,
}

/// A validated run request
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Full test-program source, opaque to the service
    pub program: String,
    /// Wall-clock deadline for the invocation
    pub timeout_secs: u64,
}

impl RunRequest {
    /// Validate a raw request body against the wire contract.
    ///
    /// The body must decode to a JSON object with a textual `program` key.
    /// `timeout` is optional; when present it must be a positive integer,
    /// when absent or null the given default applies.
    pub fn parse(body: &[u8], default_timeout_secs: u64) -> Result<Self, RequestError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| RequestError::MissingProgram)?;

        let program = value
            .get("program")
            .and_then(serde_json::Value::as_str)
            .ok_or(RequestError::MissingProgram)?
            .to_string();

        let timeout_secs = match value.get("timeout") {
            None | Some(serde_json::Value::Null) => default_timeout_secs,
            Some(raw) => raw
                .as_u64()
                .filter(|&secs| secs > 0)
                .ok_or(RequestError::InvalidTimeout)?,
        };

        Ok(Self {
            program,
            timeout_secs,
        })
    }
}

/// Outcome of one conformance tool invocation
///
/// Non-zero exit with captured output is still `Completed`, so callers
/// can distinguish "test ran and reported failure" from "test could not run".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunResult {
    /// The tool ran to completion within the deadline
    Completed {
        success: bool,
        stdout: String,
        stderr: String,
        return_code: i32,
    },
    /// The tool did not exit before the deadline and was terminated
    TimedOut { success: bool, error: String },
    /// The tool could not be started or managed at the OS level
    LaunchFailure { success: bool, error: String },
}

impl RunResult {
    /// Normal completion; `success` is derived from the exit code
    pub fn completed(return_code: i32, stdout: String, stderr: String) -> Self {
        RunResult::Completed {
            success: return_code == 0,
            stdout,
            stderr,
            return_code,
        }
    }

    /// Deadline expiry; the message names the configured timeout
    pub fn timed_out(timeout_secs: u64) -> Self {
        RunResult::TimedOut {
            success: false,
            error: format!("Process timed out after {} seconds", timeout_secs),
        }
    }

    /// OS-level failure to start or observe the process
    pub fn launch_failure(cause: impl std::fmt::Display) -> Self {
        RunResult::LaunchFailure {
            success: false,
            error: format!("Failed to run conformance test: {}", cause),
        }
    }

    /// True iff the tool completed within the deadline with exit code zero
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Completed { success: true, .. })
    }
}

/// Envelope status: `success` iff the wrapped result succeeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Envelope returned for every invocation outcome (HTTP 200)
#[derive(Debug, Serialize)]
pub struct RunReply {
    pub status: ReplyStatus,
    pub result: RunResult,
}

impl RunReply {
    /// Wrap an invocation outcome, deriving the envelope status from it
    pub fn from_result(result: RunResult) -> Self {
        let status = if result.is_success() {
            ReplyStatus::Success
        } else {
            ReplyStatus::Error
        };
        Self { status, result }
    }
}

/// Envelope returned when the request is rejected or the service fails
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub status: ReplyStatus,
    pub message: String,
}
