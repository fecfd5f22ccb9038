//! Context carried from a fetch request to the callback parsing its response
//!
//! A `CrawlContext` is an immutable record: every follow-up request gets its
//! own copy, and partially built entities travel inside it behind `Arc`s so
//! copying stays cheap.

use crate::crawler::Phase;
use crate::model::{Issue, Manga};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

/// An adapter broke the extraction contract for one fetch branch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("context key '{key}' required by phase {phase} is missing")]
    MissingContext { key: &'static str, phase: Phase },

    #[error("request for {url} is outside the domains declared by site '{site}'")]
    OffDomain { url: String, site: String },
}

/// Key/value payload attached to a `FetchRequest`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlContext {
    manga: Option<Arc<Manga>>,
    issue: Option<Arc<Issue>>,
    number: Option<u32>,
    until: Option<NaiveDate>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy carrying the in-progress series
    pub fn with_manga(mut self, manga: impl Into<Arc<Manga>>) -> Self {
        self.manga = Some(manga.into());
        self
    }

    /// Returns a copy carrying the issue being enumerated
    pub fn with_issue(mut self, issue: impl Into<Arc<Issue>>) -> Self {
        self.issue = Some(issue.into());
        self
    }

    /// Returns a copy carrying a 1-based page number
    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    /// Returns a copy carrying the cutoff of a latest-walk
    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn manga(&self) -> Option<&Arc<Manga>> {
        self.manga.as_ref()
    }

    pub fn issue(&self) -> Option<&Arc<Issue>> {
        self.issue.as_ref()
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    pub fn require_manga(&self, phase: Phase) -> Result<&Arc<Manga>, ContractViolation> {
        self.manga
            .as_ref()
            .ok_or(ContractViolation::MissingContext { key: "manga", phase })
    }

    pub fn require_issue(&self, phase: Phase) -> Result<&Arc<Issue>, ContractViolation> {
        self.issue
            .as_ref()
            .ok_or(ContractViolation::MissingContext { key: "issue", phase })
    }

    pub fn require_number(&self, phase: Phase) -> Result<u32, ContractViolation> {
        self.number
            .ok_or(ContractViolation::MissingContext { key: "number", phase })
    }
}
