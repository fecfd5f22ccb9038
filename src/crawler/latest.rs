//! Incremental latest-walk controller
//!
//! A walk pages through a newest-first "latest updates" listing until it
//! sees a page whose oldest entry predates the cutoff. The page that reveals
//! the stop condition is still processed in full; only pagination stops.
//!
//! Entries with a missing or unparseable timestamp count as older than any
//! cutoff, so a page the walk cannot date ends it.

use crate::crawler::{CrawlContext, FetchRequest, Phase};
use chrono::NaiveDate;
use url::Url;

/// What an adapter reads off one listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestListing {
    /// Series updated on this page, in page order
    pub series: Vec<Url>,
    /// Update timestamp of each entry, `None` when unparseable
    pub stamps: Vec<Option<NaiveDate>>,
    /// Link to the next listing page, if the site shows one
    pub next_page: Option<Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Walking,
    Done,
}

/// State machine bounding one walk by its cutoff date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestWalk {
    until: NaiveDate,
    state: WalkState,
}

impl LatestWalk {
    pub fn new(until: NaiveDate) -> Self {
        Self {
            until,
            state: WalkState::Walking,
        }
    }

    pub fn until(&self) -> NaiveDate {
        self.until
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Feeds one listing page into the walk
    ///
    /// # Returns
    ///
    /// * `Some(FetchRequest)` - The next listing page, carrying the same cutoff
    /// * `None` - The walk is done
    pub fn advance(&mut self, stamps: &[Option<NaiveDate>], next_page: Option<Url>) -> Option<FetchRequest> {
        if self.state == WalkState::Done {
            return None;
        }

        let keep_going = match oldest_on_page(stamps) {
            Some(oldest) => oldest >= self.until,
            None => false,
        };

        match (keep_going, next_page) {
            (true, Some(url)) => {
                tracing::debug!("Latest-walk continues to {} (until {})", url, self.until);
                Some(FetchRequest::with_context(
                    url,
                    Phase::Latest,
                    CrawlContext::new().with_until(self.until),
                ))
            }
            _ => {
                tracing::debug!("Latest-walk done (until {})", self.until);
                self.state = WalkState::Done;
                None
            }
        }
    }
}

/// Oldest timestamp of a page, `None` if the page cannot be dated
pub fn oldest_on_page(stamps: &[Option<NaiveDate>]) -> Option<NaiveDate> {
    if stamps.is_empty() {
        return None;
    }

    stamps
        .iter()
        .copied()
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .min()
}
