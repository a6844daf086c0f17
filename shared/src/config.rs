use serde::{Deserialize, Serialize};
use url::Url;

use crate::{AppError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, NOTIFICATION_DURATION_MS};

pub const MAX_URL_LENGTH: usize = 2048;

/// A base URL that passed scheme, host and credential checks. Always ends with
/// `/` so endpoint paths can be joined onto it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidatedUrl {
    url: Url,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(Self::invalid(&url, "URL cannot be empty"));
        }
        if trimmed.len() > MAX_URL_LENGTH {
            return Err(Self::invalid(
                &url,
                &format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            ));
        }

        let mut parsed = Url::parse(trimmed).map_err(|e| Self::invalid(&url, &e.to_string()))?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Self::invalid(
                &url,
                &format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(Self::invalid(&url, "URL must have a host"));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(Self::invalid(&url, "credentials in URL are not allowed"));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Self::invalid(&url, "base URL cannot carry a query or fragment"));
        }

        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self { url: parsed })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Appends percent-encoded path segments, e.g. `["contacts", id]`.
    #[must_use]
    pub fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.url.clone();
        // http(s) URLs with a host always have a path to extend
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn invalid(url: &str, reason: &str) -> AppError {
        let shown: String = url.chars().take(100).collect();
        AppError::validation(format!("Invalid URL: {reason}"))
            .with_internal(format!("invalid url '{shown}': {reason}"))
    }
}

impl TryFrom<String> for ValidatedUrl {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ValidatedUrl> for String {
    fn from(value: ValidatedUrl) -> Self {
        value.url.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub default_page_size: u32,
    pub notification_duration_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            notification_duration_ms: NOTIFICATION_DURATION_MS,
        }
    }
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AppError::validation("Invalid client configuration").with_internal(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.base_url()?;
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(AppError::validation(format!(
                "default_page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.notification_duration_ms == 0 {
            return Err(AppError::validation("notification_duration_ms must be > 0"));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<ValidatedUrl, AppError> {
        ValidatedUrl::new(self.api_base_url.as_str())
    }
}
