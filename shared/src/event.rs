use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::model::{Contact, ContactField, ContactId, DirectoryPage, RequestToken};
use crate::transcript::RawTranscript;
use crate::{AppError, NOTIFICATION_DURATION_MS};

/// Everything that can happen to the core: user commands from the presentation layer
/// and completions of requests issued through the capabilities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[default]
    Noop,

    Configured {
        config: ClientConfig,
    },

    // --- navigation ---
    Navigated {
        id: ContactId,
    },

    // --- profile ---
    ContactLoaded {
        token: RequestToken,
        result: Box<Result<Contact, AppError>>,
    },
    FieldEdited {
        field: ContactField,
        value: String,
    },
    SaveRequested,
    SaveAndCloseRequested,
    ContactSaved {
        id: ContactId,
        close: bool,
        result: Box<Result<(), AppError>>,
    },
    DeleteRequested,
    ContactDeleted {
        id: ContactId,
        result: Box<Result<(), AppError>>,
    },
    PhotoSelected {
        file_name: String,
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    PhotoUploadResponse {
        id: ContactId,
        result: Box<Result<(), AppError>>,
    },
    PhotoUploaded {
        id: ContactId,
        completed_at_ms: u64,
    },

    // --- directory ---
    /// `page_size` falls back to the configured default when absent.
    PageRequested {
        page_index: u32,
        #[serde(default)]
        page_size: Option<u32>,
    },
    PageLoaded {
        token: RequestToken,
        result: Box<Result<DirectoryPage, AppError>>,
    },

    // --- chat ---
    ChatToggled,
    ChatOpened,
    ChatClosed,
    CounterpartSelected {
        id: ContactId,
    },
    TranscriptLoaded {
        token: RequestToken,
        result: Box<Result<RawTranscript, AppError>>,
    },
    DraftChanged {
        text: String,
    },
    DraftSubmitted,
    MessageSubmitted {
        text: String,
    },
    ReplyReceived {
        epoch: u64,
        result: Box<Result<String, AppError>>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Configured { .. } => "configured",
            Self::Navigated { .. } => "navigated",
            Self::ContactLoaded { .. } => "contact_loaded",
            Self::FieldEdited { .. } => "field_edited",
            Self::SaveRequested => "save_requested",
            Self::SaveAndCloseRequested => "save_and_close_requested",
            Self::ContactSaved { .. } => "contact_saved",
            Self::DeleteRequested => "delete_requested",
            Self::ContactDeleted { .. } => "contact_deleted",
            Self::PhotoSelected { .. } => "photo_selected",
            Self::PhotoUploadResponse { .. } => "photo_upload_response",
            Self::PhotoUploaded { .. } => "photo_uploaded",
            Self::PageRequested { .. } => "page_requested",
            Self::PageLoaded { .. } => "page_loaded",
            Self::ChatToggled => "chat_toggled",
            Self::ChatOpened => "chat_opened",
            Self::ChatClosed => "chat_closed",
            Self::CounterpartSelected { .. } => "counterpart_selected",
            Self::TranscriptLoaded { .. } => "transcript_loaded",
            Self::DraftChanged { .. } => "draft_changed",
            Self::DraftSubmitted => "draft_submitted",
            Self::MessageSubmitted { .. } => "message_submitted",
            Self::ReplyReceived { .. } => "reply_received",
        }
    }

    /// True for events that complete a request issued through a capability.
    #[must_use]
    pub const fn is_completion(&self) -> bool {
        matches!(
            self,
            Self::ContactLoaded { .. }
                | Self::ContactSaved { .. }
                | Self::ContactDeleted { .. }
                | Self::PhotoUploadResponse { .. }
                | Self::PhotoUploaded { .. }
                | Self::PageLoaded { .. }
                | Self::TranscriptLoaded { .. }
                | Self::ReplyReceived { .. }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    ContactList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u64,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }

    #[must_use]
    pub fn error(error: &AppError) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: error.message.clone(),
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, NotificationKind::Error)
    }
}
