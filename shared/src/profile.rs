//! The profile store owns the one contact currently on screen.
//!
//! Every network operation is split in two: a `begin_*` call that validates and
//! returns the request to dispatch, and a `finish_*`/`apply_*` call that reconciles
//! the response. Loads are tagged with a [`RequestToken`] so only the most recently
//! issued one can replace state.

use tracing::{debug, info, warn};

use crate::model::{Contact, ContactField, ContactId, RequestToken, TokenIssuer};
use crate::{AppError, MAX_PHOTO_BYTES, MAX_PHOTO_FILE_NAME_LENGTH, PHOTO_CACHE_BUST_PARAM};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: RequestToken,
    pub id: ContactId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoUpload {
    pub id: ContactId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Failed(AppError),
    Stale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The deleted contact was the active one and has been cleared.
    ClearedActive,
    /// The user had already moved on to another contact.
    Elsewhere,
}

#[derive(Debug, Default)]
pub struct ContactProfileStore {
    active_id: Option<ContactId>,
    contact: Option<Contact>,
    load_tokens: TokenIssuer,
    is_loading: bool,
    saves_in_flight: usize,
    deleting: Option<ContactId>,
    uploads_in_flight: usize,
}

impl ContactProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the user navigated to. May differ from the displayed contact's id
    /// while its load is in flight or after it failed.
    #[must_use]
    pub fn active_id(&self) -> Option<&ContactId> {
        self.active_id.as_ref()
    }

    #[must_use]
    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    /// Token the next accepted load completion must carry.
    #[must_use]
    pub fn load_token(&self) -> RequestToken {
        self.load_tokens.latest()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub const fn is_saving(&self) -> bool {
        self.saves_in_flight > 0
    }

    #[must_use]
    pub const fn is_deleting(&self) -> bool {
        self.deleting.is_some()
    }

    #[must_use]
    pub const fn is_uploading_photo(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// Display name for `id` if it is the loaded contact.
    #[must_use]
    pub fn display_name_of(&self, id: &ContactId) -> Option<&str> {
        self.contact
            .as_ref()
            .filter(|c| &c.id == id)
            .map(Contact::display_name)
    }

    pub fn begin_load(&mut self, id: ContactId) -> LoadRequest {
        let token = self.load_tokens.issue();
        debug!(%token, %id, "loading contact");
        self.active_id = Some(id.clone());
        self.is_loading = true;
        LoadRequest { token, id }
    }

    pub fn apply_loaded(&mut self, token: RequestToken, result: Result<Contact, AppError>) -> LoadOutcome {
        if !self.load_tokens.is_current(token) {
            debug!(%token, latest = %self.load_tokens.latest(), "discarding stale contact response");
            return LoadOutcome::Stale;
        }
        self.is_loading = false;

        match result {
            Ok(mut contact) => {
                // Keep the navigated id authoritative if the backend omits it.
                if contact.id.is_empty() {
                    if let Some(id) = &self.active_id {
                        contact.id = id.clone();
                    }
                }
                info!(id = %contact.id, "contact loaded");
                self.contact = Some(contact);
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!(%token, error = %e, code = e.code(), "contact load failed");
                LoadOutcome::Failed(e)
            }
        }
    }

    pub fn edit(&mut self, field: ContactField, value: impl Into<String>) -> Result<(), AppError> {
        let contact = self
            .contact
            .as_mut()
            .ok_or_else(|| AppError::invalid_state("No contact loaded"))?;
        contact.set_field(field, value);
        Ok(())
    }

    /// Validates the edited contact and returns the snapshot to send.
    pub fn begin_save(&mut self) -> Result<Contact, AppError> {
        let contact = self
            .contact
            .as_ref()
            .ok_or_else(|| AppError::invalid_state("No contact loaded"))?;

        let missing = contact.missing_fields();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            return Err(AppError::validation(format!(
                "Required fields are empty: {}",
                names.join(", ")
            )));
        }

        self.saves_in_flight += 1;
        Ok(contact.clone())
    }

    /// On success, returns the reload to issue when `id` is still the active contact.
    pub fn finish_save(
        &mut self,
        id: &ContactId,
        result: Result<(), AppError>,
        reload: bool,
    ) -> Result<Option<LoadRequest>, AppError> {
        self.saves_in_flight = self.saves_in_flight.saturating_sub(1);

        if let Err(e) = result {
            warn!(%id, error = %e, code = e.code(), "contact save failed");
            return Err(e);
        }

        info!(%id, "contact saved");
        if reload && self.active_id.as_ref() == Some(id) {
            return Ok(Some(self.begin_load(id.clone())));
        }
        Ok(None)
    }

    pub fn begin_delete(&mut self) -> Result<ContactId, AppError> {
        if let Some(id) = &self.deleting {
            return Err(AppError::invalid_state(format!("Contact {id} is already being deleted")));
        }
        let id = self
            .active_id
            .clone()
            .ok_or_else(|| AppError::invalid_state("No contact selected"))?;
        self.deleting = Some(id.clone());
        Ok(id)
    }

    pub fn finish_delete(&mut self, id: &ContactId, result: Result<(), AppError>) -> Result<DeleteOutcome, AppError> {
        if self.deleting.as_ref() == Some(id) {
            self.deleting = None;
        }

        if let Err(e) = result {
            warn!(%id, error = %e, code = e.code(), "contact delete failed");
            return Err(e);
        }

        info!(%id, "contact deleted");
        if self.contact.as_ref().is_some_and(|c| &c.id == id) {
            self.contact = None;
        }

        if self.active_id.as_ref() == Some(id) {
            self.active_id = None;
            self.is_loading = false;
            self.load_tokens.invalidate();
            return Ok(DeleteOutcome::ClearedActive);
        }
        Ok(DeleteOutcome::Elsewhere)
    }

    pub fn begin_photo_upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<PhotoUpload, AppError> {
        let id = self
            .active_id
            .clone()
            .ok_or_else(|| AppError::invalid_state("No contact selected"))?;

        if file_name.trim().is_empty() {
            return Err(AppError::validation("Photo file name is missing"));
        }
        if file_name.len() > MAX_PHOTO_FILE_NAME_LENGTH {
            return Err(AppError::validation(format!(
                "Photo file name exceeds {MAX_PHOTO_FILE_NAME_LENGTH} bytes"
            )));
        }
        if bytes.is_empty() {
            return Err(AppError::validation("Photo file is empty"));
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(AppError::validation(format!(
                "Photo size {} MB exceeds maximum {} MB",
                bytes.len() / 1_000_000,
                MAX_PHOTO_BYTES / 1_000_000
            )));
        }

        self.uploads_in_flight += 1;
        Ok(PhotoUpload {
            id,
            file_name: file_name.to_string(),
            bytes,
        })
    }

    /// On success, cache-busts the photo URL of `id` if it is still displayed and
    /// returns the new URL.
    pub fn finish_photo_upload(
        &mut self,
        id: &ContactId,
        result: Result<(), AppError>,
        now_ms: u64,
    ) -> Result<Option<String>, AppError> {
        self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);

        if let Err(e) = result {
            warn!(%id, error = %e, code = e.code(), "photo upload failed");
            return Err(e);
        }

        let Some(contact) = self.contact.as_mut().filter(|c| &c.id == id) else {
            debug!(%id, "photo uploaded for a contact no longer displayed");
            return Ok(None);
        };

        contact.photo_url = cache_busted(&contact.photo_url, now_ms);
        info!(%id, url = %contact.photo_url, "photo updated");
        Ok(Some(contact.photo_url.clone()))
    }
}

/// Appends `updated_at=<stamp>` to `url`, replacing an earlier stamp. The new stamp
/// is strictly greater than the one it replaces so the URL always changes.
#[must_use]
pub fn cache_busted(url: &str, now_ms: u64) -> String {
    let (base, previous) = split_cache_bust(url);
    let stamp = previous.map_or(now_ms, |p| now_ms.max(p.saturating_add(1)));
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{PHOTO_CACHE_BUST_PARAM}={stamp}")
}

fn split_cache_bust(url: &str) -> (&str, Option<u64>) {
    for marker in ['?', '&'] {
        let needle = format!("{marker}{PHOTO_CACHE_BUST_PARAM}=");
        if let Some(at) = url.rfind(&needle) {
            let value = &url[at + needle.len()..];
            if let Ok(stamp) = value.parse::<u64>() {
                return (&url[..at], Some(stamp));
            }
        }
    }
    (url, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, name: &str) -> Contact {
        Contact {
            id: ContactId::from(id),
            name: name.into(),
            email: format!("{name}@example.com"),
            phone: "555-0100".into(),
            address: "1 Main St".into(),
            title: "Engineer".into(),
            status: "Active".into(),
            photo_url: format!("http://img/{id}.png"),
        }
    }

    fn loaded(id: &str, name: &str) -> ContactProfileStore {
        let mut store = ContactProfileStore::new();
        let req = store.begin_load(ContactId::from(id));
        assert_eq!(store.apply_loaded(req.token, Ok(contact(id, name))), LoadOutcome::Applied);
        store
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_later_request_wins_over_late_response() {
            let mut store = ContactProfileStore::new();
            let first = store.begin_load(ContactId::from("1"));
            let second = store.begin_load(ContactId::from("2"));

            assert_eq!(store.apply_loaded(second.token, Ok(contact("2", "Bo"))), LoadOutcome::Applied);
            assert_eq!(store.apply_loaded(first.token, Ok(contact("1", "Al"))), LoadOutcome::Stale);

            assert_eq!(store.contact().unwrap().id, ContactId::from("2"));
            assert_eq!(store.active_id(), Some(&ContactId::from("2")));
            assert!(!store.is_loading());
        }

        #[test]
        fn test_stale_response_does_not_clear_loading() {
            let mut store = ContactProfileStore::new();
            let first = store.begin_load(ContactId::from("1"));
            let _second = store.begin_load(ContactId::from("2"));
            assert_eq!(store.apply_loaded(first.token, Ok(contact("1", "Al"))), LoadOutcome::Stale);
            assert!(store.is_loading());
            assert!(store.contact().is_none());
        }

        #[test]
        fn test_failure_keeps_prior_contact() {
            let mut store = loaded("1", "Al");
            let req = store.begin_load(ContactId::from("1"));
            let outcome = store.apply_loaded(req.token, Err(AppError::transport("offline")));
            assert!(matches!(outcome, LoadOutcome::Failed(e) if e.message == "offline"));
            assert_eq!(store.contact().unwrap().name, "Al");
        }

        #[test]
        fn test_missing_id_in_response_uses_navigated_id() {
            let mut store = ContactProfileStore::new();
            let req = store.begin_load(ContactId::from("9"));
            let mut c = contact("", "Nine");
            c.id = ContactId::default();
            store.apply_loaded(req.token, Ok(c));
            assert_eq!(store.contact().unwrap().id, ContactId::from("9"));
        }
    }

    mod edit_tests {
        use super::*;

        #[test]
        fn test_edit_requires_loaded_contact() {
            let mut store = ContactProfileStore::new();
            let err = store.edit(ContactField::Name, "x").unwrap_err();
            assert_eq!(err.kind, crate::ErrorKind::InvalidState);
        }

        #[test]
        fn test_edit_touches_one_field() {
            let mut store = loaded("1", "Al");
            store.edit(ContactField::Title, "CTO").unwrap();
            let c = store.contact().unwrap();
            assert_eq!(c.title, "CTO");
            assert_eq!(c.name, "Al");
            assert_eq!(c.phone, "555-0100");
        }
    }

    mod save_tests {
        use super::*;

        #[test]
        fn test_save_success_reloads_active() {
            let mut store = loaded("1", "Al");
            let snapshot = store.begin_save().unwrap();
            assert!(store.is_saving());
            let reload = store.finish_save(&snapshot.id, Ok(()), true).unwrap().unwrap();
            assert_eq!(reload.id, ContactId::from("1"));
            assert!(!store.is_saving());
            assert!(store.is_loading());
        }

        #[test]
        fn test_save_without_reload() {
            let mut store = loaded("1", "Al");
            let snapshot = store.begin_save().unwrap();
            assert_eq!(store.finish_save(&snapshot.id, Ok(()), false).unwrap(), None);
        }

        #[test]
        fn test_save_failure_keeps_edits() {
            let mut store = loaded("1", "Al");
            store.edit(ContactField::Name, "Alan").unwrap();
            let snapshot = store.begin_save().unwrap();
            let err = store
                .finish_save(&snapshot.id, Err(AppError::validation("bad email")), true)
                .unwrap_err();
            assert_eq!(err.message, "bad email");
            assert_eq!(store.contact().unwrap().name, "Alan");
            assert!(!store.is_loading());
        }

        #[test]
        fn test_blank_required_field_is_rejected_locally() {
            let mut store = loaded("1", "Al");
            store.edit(ContactField::Email, "  ").unwrap();
            let err = store.begin_save().unwrap_err();
            assert_eq!(err.kind, crate::ErrorKind::ValidationRejected);
            assert!(err.message.contains("email"));
            assert!(!store.is_saving());
        }
    }

    mod delete_tests {
        use super::*;

        #[test]
        fn test_delete_clears_active_and_invalidates_loads() {
            let mut store = loaded("1", "Al");
            let pending = store.begin_load(ContactId::from("1"));
            let id = store.begin_delete().unwrap();
            assert_eq!(store.finish_delete(&id, Ok(())).unwrap(), DeleteOutcome::ClearedActive);
            assert!(store.active_id().is_none());
            assert!(store.contact().is_none());
            assert_eq!(store.apply_loaded(pending.token, Ok(contact("1", "Al"))), LoadOutcome::Stale);
            assert!(store.contact().is_none());
        }

        #[test]
        fn test_delete_failure_keeps_profile() {
            let mut store = loaded("1", "Al");
            let id = store.begin_delete().unwrap();
            assert!(store.finish_delete(&id, Err(AppError::transport("down"))).is_err());
            assert_eq!(store.contact().unwrap().id, ContactId::from("1"));
            assert!(!store.is_deleting());
        }

        #[test]
        fn test_second_delete_while_pending_is_rejected() {
            let mut store = loaded("1", "Al");
            store.begin_delete().unwrap();
            assert!(store.begin_delete().is_err());
        }

        #[test]
        fn test_delete_after_navigating_away() {
            let mut store = loaded("1", "Al");
            let id = store.begin_delete().unwrap();
            let req = store.begin_load(ContactId::from("2"));
            store.apply_loaded(req.token, Ok(contact("2", "Bo")));
            assert_eq!(store.finish_delete(&id, Ok(())).unwrap(), DeleteOutcome::Elsewhere);
            assert_eq!(store.active_id(), Some(&ContactId::from("2")));
        }
    }

    mod photo_tests {
        use super::*;

        #[test]
        fn test_upload_success_busts_cache() {
            let mut store = loaded("1", "Al");
            let upload = store.begin_photo_upload("me.png", vec![1, 2, 3]).unwrap();
            let url = store.finish_photo_upload(&upload.id, Ok(()), 1_700).unwrap().unwrap();
            assert_eq!(url, "http://img/1.png?updated_at=1700");
            assert_eq!(store.contact().unwrap().photo_url, url);
        }

        #[test]
        fn test_upload_failure_leaves_url_unchanged() {
            let mut store = loaded("1", "Al");
            let before = store.contact().unwrap().photo_url.clone();
            let upload = store.begin_photo_upload("me.png", vec![1]).unwrap();
            assert!(store
                .finish_photo_upload(&upload.id, Err(AppError::transport("reset")), 5)
                .is_err());
            assert_eq!(store.contact().unwrap().photo_url, before);
            assert!(!store.is_uploading_photo());
        }

        #[test]
        fn test_upload_validation() {
            let mut store = loaded("1", "Al");
            assert!(store.begin_photo_upload("", vec![1]).is_err());
            assert!(store.begin_photo_upload("a.png", Vec::new()).is_err());
            assert!(store
                .begin_photo_upload("a.png", vec![0; MAX_PHOTO_BYTES + 1])
                .is_err());
            assert!(!store.is_uploading_photo());
        }

        #[test]
        fn test_upload_for_contact_no_longer_shown() {
            let mut store = loaded("1", "Al");
            let upload = store.begin_photo_upload("me.png", vec![1]).unwrap();
            let req = store.begin_load(ContactId::from("2"));
            store.apply_loaded(req.token, Ok(contact("2", "Bo")));
            assert_eq!(store.finish_photo_upload(&upload.id, Ok(()), 9).unwrap(), None);
            assert_eq!(store.contact().unwrap().photo_url, "http://img/2.png");
        }
    }

    mod cache_bust_tests {
        use super::*;

        #[test]
        fn test_appends_with_right_separator() {
            assert_eq!(cache_busted("a.png", 5), "a.png?updated_at=5");
            assert_eq!(cache_busted("a.png?size=2", 5), "a.png?size=2&updated_at=5");
        }

        #[test]
        fn test_replaces_previous_stamp() {
            assert_eq!(cache_busted("a.png?updated_at=5", 9), "a.png?updated_at=9");
            assert_eq!(cache_busted("a.png?x=1&updated_at=5", 9), "a.png?x=1&updated_at=9");
        }

        #[test]
        fn test_stamp_always_moves_forward() {
            let first = cache_busted("a.png", 100);
            let second = cache_busted(&first, 100);
            assert_ne!(first, second);
            assert_eq!(second, "a.png?updated_at=101");
        }
    }
}
