use serde::{Deserialize, Serialize};

use crate::app::Model;
use crate::model::{ChatMessage, Contact, ContactId, ContactSummary};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub active_id: Option<ContactId>,
    pub contact: Option<Contact>,
    pub is_loading: bool,
    pub is_saving: bool,
    pub is_deleting: bool,
    pub is_uploading_photo: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryView {
    pub items: Vec<ContactSummary>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_available: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub is_loading: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageView {
    pub from: String,
    pub text: String,
    pub is_mine: bool,
}

impl From<&ChatMessage> for MessageView {
    fn from(m: &ChatMessage) -> Self {
        Self {
            from: m.from.clone(),
            text: m.text.clone(),
            is_mine: m.is_mine(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatView {
    pub is_open: bool,
    pub counterpart_id: Option<ContactId>,
    pub counterpart_name: String,
    pub is_self_chat: bool,
    pub messages: Vec<MessageView>,
    pub draft: String,
    pub can_send: bool,
    pub is_fetching: bool,
    pub pending_replies: usize,
}

/// Snapshot handed to the presentation layer after every update.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub profile: ProfileView,
    pub directory: DirectoryView,
    pub chat: ChatView,
}

impl ViewModel {
    pub(crate) fn build(model: &Model, counterpart_name: &str) -> Self {
        let profile = &model.profile;
        let chat = &model.chat;

        let directory = model.directory.page().map_or_else(
            || DirectoryView {
                is_loading: model.directory.is_loading(),
                ..DirectoryView::default()
            },
            |page| DirectoryView {
                items: page.items.clone(),
                page_index: page.page_index,
                page_size: page.page_size,
                total_available: page.total_available,
                total_pages: page.total_pages(),
                has_next: page.has_next(),
                has_previous: page.has_previous(),
                is_loading: model.directory.is_loading(),
            },
        );

        Self {
            profile: ProfileView {
                active_id: profile.active_id().cloned(),
                contact: profile.contact().cloned(),
                is_loading: profile.is_loading(),
                is_saving: profile.is_saving(),
                is_deleting: profile.is_deleting(),
                is_uploading_photo: profile.is_uploading_photo(),
            },
            directory,
            chat: ChatView {
                is_open: chat.is_open(),
                counterpart_id: chat.counterpart().cloned(),
                counterpart_name: counterpart_name.to_string(),
                is_self_chat: chat.is_self_chat(),
                messages: chat.transcript().iter().map(MessageView::from).collect(),
                draft: chat.draft().to_string(),
                can_send: chat.local_id().is_some() && !chat.draft().trim().is_empty(),
                is_fetching: chat.is_fetching(),
                pending_replies: chat.pending_replies(),
            },
        }
    }
}
