use tracing::{debug, info, warn};

use crate::model::{ContactId, ContactSummary, DirectoryPage, RequestToken, TokenIssuer};
use crate::{AppError, MAX_PAGE_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub token: RequestToken,
    pub page_index: u32,
    pub page_size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Applied,
    Failed(AppError),
    Stale,
}

/// Holds the single directory page shown by the counterpart picker. Pages are
/// never accumulated; a failed fetch keeps the previous page on screen.
#[derive(Debug, Default)]
pub struct DirectoryPager {
    page: Option<DirectoryPage>,
    tokens: TokenIssuer,
    is_loading: bool,
    last_requested: Option<(u32, u32)>,
}

impl DirectoryPager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(&self) -> Option<&DirectoryPage> {
        self.page.as_ref()
    }

    #[must_use]
    pub fn page_token(&self) -> RequestToken {
        self.tokens.latest()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn find(&self, id: &ContactId) -> Option<&ContactSummary> {
        self.page.as_ref().and_then(|p| p.find(id))
    }

    pub fn begin_fetch(&mut self, page_index: u32, page_size: u32) -> Result<PageRequest, AppError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(AppError::validation(format!(
                "Page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let token = self.tokens.issue();
        debug!(%token, page_index, page_size, "fetching directory page");
        self.is_loading = true;
        self.last_requested = Some((page_index, page_size));
        Ok(PageRequest {
            token,
            page_index,
            page_size,
        })
    }

    /// Re-issues the last requested page, if any.
    pub fn refresh(&mut self) -> Option<PageRequest> {
        let (page_index, page_size) = self.last_requested?;
        self.begin_fetch(page_index, page_size).ok()
    }

    pub fn apply_page(&mut self, token: RequestToken, result: Result<DirectoryPage, AppError>) -> PageOutcome {
        if !self.tokens.is_current(token) {
            debug!(%token, latest = %self.tokens.latest(), "discarding stale directory page");
            return PageOutcome::Stale;
        }
        self.is_loading = false;

        match result {
            Ok(page) => {
                info!(
                    page_index = page.page_index,
                    items = page.items.len(),
                    total = page.total_available,
                    "directory page loaded"
                );
                self.page = Some(page);
                PageOutcome::Applied
            }
            Err(e) => {
                warn!(%token, error = %e, code = e.code(), "directory page failed");
                PageOutcome::Failed(e)
            }
        }
    }
}
