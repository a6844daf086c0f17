// lib.rs - shared core of the contact directory client

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod capabilities;
pub mod chat;
pub mod config;
pub mod directory;
pub mod event;
pub mod model;
pub mod profile;
pub mod transcript;
pub mod view;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::{App, Model};
pub use capabilities::{Capabilities, Effect};
pub use config::ClientConfig;
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::{ChatMessage, Contact, ContactField, ContactId, ContactSummary, DirectoryPage};
pub use transcript::RawTranscript;
pub use view::ViewModel;

/// Sender label of locally typed chat lines.
pub const ME_LABEL: &str = "Me";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_PHOTO_FILE_NAME_LENGTH: usize = 255;
pub const PHOTO_CACHE_BUST_PARAM: &str = "updated_at";
pub const NOTIFICATION_DURATION_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    ValidationRejected,
    Transport,
    Timeout,
    Server,
    MalformedTranscript,
    InvalidState,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ValidationRejected => "VALIDATION_REJECTED",
            Self::Transport => "TRANSPORT_FAILURE",
            Self::Timeout => "TIMEOUT",
            Self::Server => "SERVER_ERROR",
            Self::MalformedTranscript => "MALFORMED_TRANSCRIPT",
            Self::InvalidState => "INVALID_STATE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure of a collaborator call or a locally rejected command.
///
/// `message` is what the user sees in the error notification; `internal_message`
/// only goes to logs.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationRejected, message)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Maps a non-success HTTP status to an error, keeping a short plain-text body
    /// as the user-facing message.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&str>) -> Self {
        let kind = match status {
            404 | 410 => ErrorKind::NotFound,
            400 | 409 | 422 => ErrorKind::ValidationRejected,
            408 | 504 => ErrorKind::Timeout,
            _ => ErrorKind::Server,
        };

        let message = body
            .map(str::trim)
            .filter(|b| !b.is_empty() && b.len() <= 200 && !b.starts_with('<'))
            .map_or_else(
                || format!("Request failed with status code {status}"),
                ToString::to_string,
            );

        Self::new(kind, message).with_internal(format!("http status {status}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;
