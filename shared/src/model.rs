use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

use crate::{AppError, ME_LABEL};

// --- Typed ID ---

/// Opaque contact identity. The backend may send it as a JSON string or number;
/// it is always kept and re-sent as a string.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for ContactId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ContactId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Text(s) => Self(s),
            Wire::Signed(n) => Self(n.to_string()),
            Wire::Unsigned(n) => Self(n.to_string()),
        })
    }
}

// --- Contact ---

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub title: String,
    pub status: String,
    pub photo_url: String,
}

impl Contact {
    #[must_use]
    pub fn field(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Address => &self.address,
            ContactField::Title => &self.title,
            ContactField::Status => &self.status,
        }
    }

    pub fn set_field(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Address => &mut self.address,
            ContactField::Title => &mut self.title,
            ContactField::Status => &mut self.status,
        };
        *slot = value.into();
    }

    /// Editable fields that are blank. Every field of the profile form is required.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<ContactField> {
        ContactField::ALL
            .into_iter()
            .filter(|f| self.field(*f).trim().is_empty())
            .collect()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Address,
    Title,
    Status,
}

impl ContactField {
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::Email,
        Self::Phone,
        Self::Address,
        Self::Title,
        Self::Status,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::Title => "title",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown contact field: {s}")))
    }
}

// --- Directory ---

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSummary {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub status: String,
    pub photo_url: String,
}

impl ContactSummary {
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

impl From<&Contact> for ContactSummary {
    fn from(c: &Contact) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            title: c.title.clone(),
            status: c.status.clone(),
            photo_url: c.photo_url.clone(),
        }
    }
}

/// One fetched page of the directory. Replaced wholesale on every fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPage {
    pub items: Vec<ContactSummary>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_available: u64,
}

impl DirectoryPage {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_available.div_ceil(u64::from(self.page_size))
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page_index) + 1 < self.total_pages()
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    #[must_use]
    pub fn find(&self, id: &ContactId) -> Option<&ContactSummary> {
        self.items.iter().find(|c| &c.id == id)
    }
}

// --- Chat ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            text: text.into(),
        }
    }

    /// A line typed locally.
    pub fn mine(text: impl Into<String>) -> Self {
        Self::new(ME_LABEL, text)
    }

    #[must_use]
    pub fn is_mine(&self) -> bool {
        self.from == ME_LABEL
    }
}

// --- Request sequencing ---

/// Tag carried by a request and echoed back by its completion event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing tokens for one resource. Only the most recently
/// issued token is current; anything older is a stale response.
#[derive(Clone, Debug, Default)]
pub struct TokenIssuer {
    last: u64,
}

impl TokenIssuer {
    pub fn issue(&mut self) -> RequestToken {
        self.last += 1;
        RequestToken(self.last)
    }

    /// Makes every outstanding token stale without starting a new request.
    pub fn invalidate(&mut self) {
        self.last += 1;
    }

    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.last
    }

    #[must_use]
    pub fn latest(&self) -> RequestToken {
        RequestToken(self.last)
    }
}
