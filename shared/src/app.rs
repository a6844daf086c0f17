//! The interaction controller.
//!
//! `App::update` is the only place where events meet state. Network work goes out
//! through `caps.http()`; each request's completion event carries the token or
//! epoch handed out here, so late answers can be told apart from current ones.

use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, ContactApi};
use crate::chat::{ChatSession, ReplyOutcome, SendRequest, TranscriptOutcome, TranscriptRequest};
use crate::config::ClientConfig;
use crate::directory::{DirectoryPager, PageOutcome};
use crate::event::{Event, Notification, Route};
use crate::model::ContactId;
use crate::profile::{ContactProfileStore, DeleteOutcome, LoadOutcome};
use crate::view::ViewModel;
use crate::AppError;

const FALLBACK_COUNTERPART_NAME: &str = "Contact";

/// State owned by the core. Each component exclusively owns its slice; the
/// controller is the only writer.
#[derive(Debug, Default)]
pub struct Model {
    pub profile: ContactProfileStore,
    pub directory: DirectoryPager,
    pub chat: ChatSession,
    // only replaced by a validated `Event::Configured`
    config: ClientConfig,
}

impl Model {
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_completion() {
            debug!(event = event_name, "completion");
        } else {
            debug!(event = event_name, "user action");
        }

        if matches!(event, Event::Noop) {
            return;
        }
        Self::handle(event, model, caps);
        caps.render().render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model, &Self::counterpart_name(model))
    }
}

impl App {
    fn handle(event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::Noop => {}

            Event::Configured { config } => match config.validate() {
                Ok(()) => {
                    info!(api = %config.api_base_url, "client configured");
                    model.config = config;
                }
                Err(e) => Self::notify_error(model, caps, &e),
            },

            Event::Navigated { id } => {
                let Some(api) = Self::api(model, caps) else { return };
                if model.chat.local_id() != Some(&id) {
                    model.chat.reset(id.clone());
                }
                api.fetch_contact(caps.http(), model.profile.begin_load(id));
            }

            Event::ContactLoaded { token, result } => match model.profile.apply_loaded(token, *result) {
                LoadOutcome::Applied => Self::notify_success(model, caps, "Contact retrieved"),
                LoadOutcome::Failed(e) => Self::notify_error(model, caps, &e),
                LoadOutcome::Stale => {}
            },

            Event::FieldEdited { field, value } => {
                if let Err(e) = model.profile.edit(field, value) {
                    Self::notify_error(model, caps, &e);
                }
            }

            Event::SaveRequested => Self::begin_save(model, caps, false),
            Event::SaveAndCloseRequested => Self::begin_save(model, caps, true),

            Event::ContactSaved { id, close, result } => {
                let Some(api) = Self::api(model, caps) else { return };
                let still_active = model.profile.active_id() == Some(&id);
                match model.profile.finish_save(&id, *result, !close) {
                    Ok(_) if close => {
                        Self::notify_success(model, caps, "Contact Saved");
                        if still_active {
                            Self::back_to_list(caps);
                        } else {
                            caps.host().directory_changed();
                        }
                        Self::refresh_directory(model, caps, &api);
                    }
                    Ok(reload) => {
                        if let Some(request) = reload {
                            api.fetch_contact(caps.http(), request);
                        }
                        Self::notify_success(model, caps, "Contact Updated");
                    }
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            Event::DeleteRequested => {
                let Some(api) = Self::api(model, caps) else { return };
                match model.profile.begin_delete() {
                    Ok(id) => api.delete_contact(caps.http(), id),
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            Event::ContactDeleted { id, result } => {
                let Some(api) = Self::api(model, caps) else { return };
                match model.profile.finish_delete(&id, *result) {
                    Ok(outcome) => {
                        Self::notify_success(model, caps, "Contact Deleted");
                        if outcome == DeleteOutcome::ClearedActive {
                            model.chat.clear();
                            Self::back_to_list(caps);
                        } else {
                            caps.host().directory_changed();
                        }
                        Self::refresh_directory(model, caps, &api);
                    }
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            Event::PhotoSelected { file_name, bytes } => {
                let Some(api) = Self::api(model, caps) else { return };
                match model.profile.begin_photo_upload(&file_name, bytes) {
                    Ok(upload) => api.upload_photo(caps.http(), upload),
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            // the cache-busting stamp comes from the shell's clock
            Event::PhotoUploadResponse { id, result } => match *result {
                Ok(()) => caps
                    .host()
                    .now(move |completed_at_ms| Event::PhotoUploaded { id, completed_at_ms }),
                Err(e) => {
                    if let Err(e) = model.profile.finish_photo_upload(&id, Err(e), 0) {
                        Self::notify_error(model, caps, &e);
                    }
                }
            },

            Event::PhotoUploaded { id, completed_at_ms } => {
                match model.profile.finish_photo_upload(&id, Ok(()), completed_at_ms) {
                    Ok(_) => Self::notify_success(model, caps, "Photo updated"),
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            Event::PageRequested { page_index, page_size } => {
                let Some(api) = Self::api(model, caps) else { return };
                let page_size = page_size.unwrap_or(model.config.default_page_size);
                match model.directory.begin_fetch(page_index, page_size) {
                    Ok(request) => api.fetch_page(caps.http(), request),
                    Err(e) => Self::notify_error(model, caps, &e),
                }
            }

            Event::PageLoaded { token, result } => {
                if let PageOutcome::Failed(e) = model.directory.apply_page(token, *result) {
                    Self::notify_error(model, caps, &e);
                }
            }

            Event::ChatToggled => {
                let request = model.chat.toggle();
                Self::request_transcript(model, caps, request);
            }
            Event::ChatOpened => {
                let request = model.chat.open();
                Self::request_transcript(model, caps, request);
            }
            Event::ChatClosed => model.chat.close(),

            Event::CounterpartSelected { id } => {
                let request = model.chat.select_counterpart(id).map(Some);
                Self::request_transcript(model, caps, request);
            }

            Event::TranscriptLoaded { token, result } => match model.chat.apply_transcript(token, *result) {
                TranscriptOutcome::Failed(e) => Self::notify_error(model, caps, &e),
                TranscriptOutcome::Replaced(count) => info!(count, "conversation loaded"),
                TranscriptOutcome::Empty | TranscriptOutcome::Stale => {}
            },

            Event::DraftChanged { text } => model.chat.set_draft(text),
            Event::DraftSubmitted => {
                let request = model.chat.send_draft();
                Self::dispatch_send(model, caps, request);
            }
            Event::MessageSubmitted { text } => {
                let request = model.chat.send(&text);
                Self::dispatch_send(model, caps, request);
            }

            Event::ReplyReceived { epoch, result } => {
                let name = Self::counterpart_name(model);
                if let ReplyOutcome::Failed(e) = model.chat.apply_reply(epoch, &name, *result) {
                    Self::notify_error(model, caps, &e);
                }
            }
        }
    }

    fn api(model: &Model, caps: &Capabilities) -> Option<ContactApi> {
        match ContactApi::new(&model.config) {
            Ok(api) => Some(api),
            Err(e) => {
                warn!(error = %e, "no usable api base url");
                Self::notify_error(model, caps, &e);
                None
            }
        }
    }

    fn begin_save(model: &mut Model, caps: &Capabilities, close: bool) {
        let Some(api) = Self::api(model, caps) else { return };
        let contact = match model.profile.begin_save() {
            Ok(contact) => contact,
            Err(e) => {
                Self::notify_error(model, caps, &e);
                return;
            }
        };
        if let Err(e) = api.save_contact(caps.http(), &contact, close) {
            if let Err(e) = model.profile.finish_save(&contact.id, Err(e), false) {
                Self::notify_error(model, caps, &e);
            }
        }
    }

    /// Re-reads the page the picker last showed; nothing happens if it never fetched one.
    fn refresh_directory(model: &mut Model, caps: &Capabilities, api: &ContactApi) {
        if let Some(request) = model.directory.refresh() {
            api.fetch_page(caps.http(), request);
        }
    }

    fn request_transcript(model: &Model, caps: &Capabilities, result: Result<Option<TranscriptRequest>, AppError>) {
        match result {
            Ok(Some(request)) => {
                if let Some(api) = Self::api(model, caps) {
                    api.fetch_conversation(caps.http(), request);
                }
            }
            Ok(None) => {}
            Err(e) => Self::notify_error(model, caps, &e),
        }
    }

    fn dispatch_send(model: &Model, caps: &Capabilities, result: Result<Option<SendRequest>, AppError>) {
        match result {
            Ok(Some(request)) => {
                if let Some(api) = Self::api(model, caps) {
                    api.send_message(caps.http(), request);
                }
            }
            Ok(None) => {}
            Err(e) => Self::notify_error(model, caps, &e),
        }
    }

    fn notify_success(model: &Model, caps: &Capabilities, message: &str) {
        caps.host()
            .notify(Notification::success(message).with_duration(model.config.notification_duration_ms));
    }

    fn notify_error(model: &Model, caps: &Capabilities, error: &AppError) {
        caps.host()
            .notify(Notification::error(error).with_duration(model.config.notification_duration_ms));
    }

    fn back_to_list(caps: &Capabilities) {
        caps.host().directory_changed();
        caps.host().navigate(Route::ContactList);
    }

    /// Resolves the counterpart's display name from whichever component holds it:
    /// the profile store for self-chat, the directory page for a picked contact.
    fn counterpart_name(model: &Model) -> String {
        let Some(id) = model.chat.counterpart() else {
            return FALLBACK_COUNTERPART_NAME.to_string();
        };
        Self::display_name(model, id)
    }

    fn display_name(model: &Model, id: &ContactId) -> String {
        model
            .profile
            .display_name_of(id)
            .or_else(|| model.directory.find(id).map(|c| c.display_name()))
            .map_or_else(|| id.to_string(), ToString::to_string)
    }
}
