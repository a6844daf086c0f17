//! Chat session between the viewed contact and a counterpart.
//!
//! The session only knows participant ids. Display names are resolved by the caller
//! when a reply lands, so profile state is never duplicated here.

use tracing::{debug, info, warn};

use crate::model::{ChatMessage, ContactId, RequestToken, TokenIssuer};
use crate::transcript::{self, RawTranscript};
use crate::AppError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptRequest {
    pub token: RequestToken,
    pub local_id: ContactId,
    pub counterpart_id: ContactId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub epoch: u64,
    pub contact_id: ContactId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Replaced(usize),
    /// Nothing parseable came back; the previous transcript is kept.
    Empty,
    Failed(AppError),
    Stale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Appended,
    Empty,
    Failed(AppError),
    /// The reply belongs to a pairing that is no longer active.
    Discarded,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    local_id: Option<ContactId>,
    counterpart_id: Option<ContactId>,
    transcript: Vec<ChatMessage>,
    draft: String,
    is_open: bool,
    tokens: TokenIssuer,
    is_fetching: bool,
    // bumped whenever the participant pair changes
    epoch: u64,
    pending_replies: usize,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts over for a newly viewed contact: closed, no counterpart, empty
    /// transcript. Outstanding fetches and replies become stale.
    pub fn reset(&mut self, local_id: ContactId) {
        debug!(%local_id, "chat session reset");
        self.local_id = Some(local_id);
        self.counterpart_id = None;
        self.transcript.clear();
        self.draft.clear();
        self.is_open = false;
        self.is_fetching = false;
        self.pending_replies = 0;
        self.epoch += 1;
        self.tokens.invalidate();
    }

    /// Detaches the session from any contact, e.g. after the contact was deleted.
    pub fn clear(&mut self) {
        self.reset(ContactId::default());
        self.local_id = None;
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&ContactId> {
        self.local_id.as_ref()
    }

    /// The explicitly chosen counterpart, or the local contact in self-chat mode.
    #[must_use]
    pub fn counterpart(&self) -> Option<&ContactId> {
        self.counterpart_id.as_ref().or(self.local_id.as_ref())
    }

    #[must_use]
    pub fn is_self_chat(&self) -> bool {
        self.local_id.is_some() && self.counterpart() == self.local_id.as_ref()
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn transcript_token(&self) -> RequestToken {
        self.tokens.latest()
    }

    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    #[must_use]
    pub const fn pending_replies(&self) -> usize {
        self.pending_replies
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Opens the session and fetches the transcript. Already open sessions are
    /// left alone.
    pub fn open(&mut self) -> Result<Option<TranscriptRequest>, AppError> {
        if self.is_open {
            return Ok(None);
        }
        let request = self.request_transcript()?;
        self.is_open = true;
        info!(counterpart = %request.counterpart_id, "chat opened");
        Ok(Some(request))
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn toggle(&mut self) -> Result<Option<TranscriptRequest>, AppError> {
        if self.is_open {
            self.close();
            return Ok(None);
        }
        self.open()
    }

    /// Switches the counterpart. The previous transcript is discarded right away so
    /// messages of two pairings never mix.
    pub fn select_counterpart(&mut self, other: ContactId) -> Result<TranscriptRequest, AppError> {
        if self.local_id.is_none() {
            return Err(AppError::invalid_state("No contact selected"));
        }
        info!(counterpart = %other, "chat counterpart selected");
        self.counterpart_id = Some(other);
        self.transcript.clear();
        self.pending_replies = 0;
        self.epoch += 1;
        self.request_transcript()
    }

    fn request_transcript(&mut self) -> Result<TranscriptRequest, AppError> {
        let local_id = self
            .local_id
            .clone()
            .ok_or_else(|| AppError::invalid_state("No contact selected"))?;
        let counterpart_id = self.counterpart().cloned().unwrap_or_else(|| local_id.clone());

        let token = self.tokens.issue();
        debug!(%token, %local_id, %counterpart_id, "fetching conversation");
        self.is_fetching = true;
        Ok(TranscriptRequest {
            token,
            local_id,
            counterpart_id,
        })
    }

    pub fn apply_transcript(
        &mut self,
        token: RequestToken,
        result: Result<RawTranscript, AppError>,
    ) -> TranscriptOutcome {
        if !self.tokens.is_current(token) {
            debug!(%token, latest = %self.tokens.latest(), "discarding stale conversation");
            return TranscriptOutcome::Stale;
        }
        self.is_fetching = false;

        match result {
            Ok(raw) => {
                let messages = transcript::parse(Some(&raw));
                if messages.is_empty() {
                    debug!(kept = self.transcript.len(), "no conversation found");
                    return TranscriptOutcome::Empty;
                }
                let count = messages.len();
                self.transcript = messages;
                TranscriptOutcome::Replaced(count)
            }
            Err(e) => {
                warn!(%token, error = %e, code = e.code(), "conversation fetch failed");
                TranscriptOutcome::Failed(e)
            }
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Echoes `text` as a "Me" line, clears the draft and returns the message to
    /// dispatch. Blank text is ignored and leaves the draft as it was.
    pub fn send(&mut self, text: &str) -> Result<Option<SendRequest>, AppError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let contact_id = self
            .counterpart()
            .cloned()
            .ok_or_else(|| AppError::invalid_state("No contact selected"))?;

        self.transcript.push(ChatMessage::mine(text));
        self.draft.clear();
        self.pending_replies += 1;
        debug!(%contact_id, pending = self.pending_replies, "chat message dispatched");

        Ok(Some(SendRequest {
            epoch: self.epoch,
            contact_id,
            text: text.to_string(),
        }))
    }

    pub fn send_draft(&mut self) -> Result<Option<SendRequest>, AppError> {
        let text = self.draft.clone();
        self.send(&text)
    }

    /// Applies the backend's answer to a send. The optimistic "Me" line is never
    /// retracted, even when the send failed.
    pub fn apply_reply(&mut self, epoch: u64, display_name: &str, result: Result<String, AppError>) -> ReplyOutcome {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "discarding reply for a previous pairing");
            return ReplyOutcome::Discarded;
        }
        self.pending_replies = self.pending_replies.saturating_sub(1);

        match result {
            Ok(reply) if reply.is_empty() => ReplyOutcome::Empty,
            Ok(reply) => {
                self.transcript.push(ChatMessage::new(display_name, reply));
                ReplyOutcome::Appended
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "chat send failed");
                ReplyOutcome::Failed(e)
            }
        }
    }
}
