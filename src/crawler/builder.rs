//! Entity builder and validator
//!
//! Every entity passes through `EntityBuilder` before it leaves the engine:
//! - identity fields must be non-empty, otherwise the entity is dropped
//! - issue orders must be unique and decreasing, otherwise they are
//!   re-derived from list position
//! - issue pages are buffered per issue and released sorted, as a
//!   contiguous run starting at 1

use crate::model::{Entity, Genres, IssuePage, Manga};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// An entity (or part of one) rejected by the builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} at {url} has an empty {field}")]
    EmptyIdentity {
        kind: &'static str,
        field: &'static str,
        url: String,
    },

    #[error("issue {issue_url} is listed twice in {manga_url}")]
    DuplicateIssue { manga_url: String, issue_url: String },

    #[error("page {number} of {issue_url} follows missing page {missing}")]
    PageGap {
        issue_url: String,
        number: u32,
        missing: u32,
    },

    #[error("page {number} of {issue_url} arrived twice")]
    DuplicatePage { issue_url: String, number: u32 },
}

/// Entities ready to leave the engine, and what was rejected on the way
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub ready: Vec<Entity>,
    pub failures: Vec<ValidationError>,
}

impl BuildOutcome {
    fn merge(&mut self, other: BuildOutcome) {
        self.ready.extend(other.ready);
        self.failures.extend(other.failures);
    }
}

type IssueKey = (String, String);

#[derive(Debug, Default)]
struct PageBuffer {
    expected: usize,
    pages: BTreeMap<u32, IssuePage>,
    lost: BTreeSet<u32>,
}

impl PageBuffer {
    fn is_complete(&self) -> bool {
        self.pages.len() + self.lost.len() >= self.expected
    }

    /// Releases the contiguous run 1..k; later pages are gap failures
    fn flush(self, issue_url: &str) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        let mut next = 1;

        for (number, page) in self.pages {
            if number == next {
                outcome.ready.push(Entity::IssuePage(page));
                next += 1;
            } else {
                outcome.failures.push(ValidationError::PageGap {
                    issue_url: issue_url.to_string(),
                    number,
                    missing: next,
                });
            }
        }

        outcome
    }
}

/// Validates entities and reorders issue pages
#[derive(Debug, Default)]
pub struct EntityBuilder {
    buffers: HashMap<IssueKey, PageBuffer>,
}

impl EntityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates one parsed entity
    ///
    /// Issue pages of an issue announced with `expect_pages` are held back
    /// until the whole issue has arrived.
    pub fn build(&mut self, entity: Entity) -> BuildOutcome {
        match entity {
            Entity::Genres(genres) => BuildOutcome {
                ready: vec![Entity::Genres(validate_genres(genres))],
                failures: Vec::new(),
            },
            Entity::Manga(manga) => {
                let mut failures = Vec::new();
                let ready = match validate_manga(manga, &mut failures) {
                    Ok(manga) => vec![Entity::Manga(manga)],
                    Err(e) => {
                        failures.push(e);
                        Vec::new()
                    }
                };
                BuildOutcome { ready, failures }
            }
            Entity::IssuePage(page) => self.build_page(page),
        }
    }

    /// Announces that the issue fanned out into `count` page requests
    pub fn expect_pages(&mut self, manga_url: &str, issue_url: &str, count: usize) {
        if count == 0 {
            return;
        }

        let buffer = self
            .buffers
            .entry((manga_url.to_string(), issue_url.to_string()))
            .or_default();
        buffer.expected += count;
    }

    /// Records that page `number` of an issue will never arrive
    pub fn page_lost(&mut self, manga_url: &str, issue_url: &str, number: u32) -> BuildOutcome {
        let key = (manga_url.to_string(), issue_url.to_string());
        match self.buffers.get_mut(&key) {
            Some(buffer) => {
                buffer.lost.insert(number);
                self.flush_if_complete(key)
            }
            None => BuildOutcome::default(),
        }
    }

    /// Flushes every buffered issue, complete or not
    pub fn finish(&mut self) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        let mut keys: Vec<IssueKey> = self.buffers.keys().cloned().collect();
        keys.sort();

        for key in keys {
            if let Some(buffer) = self.buffers.remove(&key) {
                outcome.merge(buffer.flush(&key.1));
            }
        }

        outcome
    }

    /// Drops every buffered page, returning how many were dropped
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffers.values().map(|b| b.pages.len()).sum();
        self.buffers.clear();
        dropped
    }

    /// Number of issues whose pages are still being collected
    pub fn pending_issues(&self) -> usize {
        self.buffers.len()
    }

    fn build_page(&mut self, page: IssuePage) -> BuildOutcome {
        let key = page.issue_key();
        let number = page.number;

        if let Err(e) = validate_page(&page) {
            return match self.buffers.get_mut(&key) {
                Some(buffer) => {
                    buffer.lost.insert(number);
                    let mut outcome = self.flush_if_complete(key);
                    outcome.failures.push(e);
                    outcome
                }
                None => BuildOutcome {
                    ready: Vec::new(),
                    failures: vec![e],
                },
            };
        }

        let Some(buffer) = self.buffers.get_mut(&key) else {
            return BuildOutcome {
                ready: vec![Entity::IssuePage(page)],
                failures: Vec::new(),
            };
        };

        if buffer.pages.contains_key(&number) {
            return BuildOutcome {
                ready: Vec::new(),
                failures: vec![ValidationError::DuplicatePage {
                    issue_url: key.1,
                    number,
                }],
            };
        }

        buffer.lost.remove(&number);
        buffer.pages.insert(number, page);
        self.flush_if_complete(key)
    }

    fn flush_if_complete(&mut self, key: IssueKey) -> BuildOutcome {
        let complete = self.buffers.get(&key).is_some_and(PageBuffer::is_complete);
        if !complete {
            return BuildOutcome::default();
        }

        match self.buffers.remove(&key) {
            Some(buffer) => buffer.flush(&key.1),
            None => BuildOutcome::default(),
        }
    }
}

fn validate_genres(genres: Genres) -> Genres {
    let mut seen = HashSet::new();
    let names = genres
        .names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();
    Genres { names }
}

fn validate_page(page: &IssuePage) -> Result<(), ValidationError> {
    let empty = |field| ValidationError::EmptyIdentity {
        kind: "issue page",
        field,
        url: page.issue_url.clone(),
    };

    if page.manga_url.trim().is_empty() {
        return Err(empty("manga url"));
    }
    if page.issue_url.trim().is_empty() {
        return Err(empty("issue url"));
    }
    if page.number == 0 {
        return Err(empty("number"));
    }
    if page.image_url.trim().is_empty() {
        return Err(empty("image url"));
    }

    Ok(())
}

/// Validates a series and repairs its issue list
///
/// Issues without a URL and repeated issue URLs are dropped and reported in
/// `failures`; the series itself is rejected only for an empty url or name.
fn validate_manga(
    mut manga: Manga,
    failures: &mut Vec<ValidationError>,
) -> Result<Manga, ValidationError> {
    manga.url = manga.url.trim().to_string();
    manga.name = manga.name.trim().to_string();

    for (field, value) in [("url", &manga.url), ("name", &manga.name)] {
        if value.is_empty() {
            return Err(ValidationError::EmptyIdentity {
                kind: "manga",
                field,
                url: manga.url.clone(),
            });
        }
    }

    manga.alt_name = non_empty(manga.alt_name).collect();
    manga.genres = non_empty(manga.genres).collect();
    manga.author = non_empty(manga.author).collect();
    manga.artist = non_empty(manga.artist).collect();

    let mut seen = HashSet::new();
    let mut issues = Vec::with_capacity(manga.issues.len());
    for mut issue in std::mem::take(&mut manga.issues) {
        issue.url = issue.url.trim().to_string();
        if issue.url.is_empty() {
            failures.push(ValidationError::EmptyIdentity {
                kind: "issue",
                field: "url",
                url: manga.url.clone(),
            });
            continue;
        }
        if !seen.insert(issue.url.clone()) {
            failures.push(ValidationError::DuplicateIssue {
                manga_url: manga.url.clone(),
                issue_url: issue.url,
            });
            continue;
        }
        issue.manga_url = manga.url.clone();
        issues.push(issue);
    }

    let strictly_decreasing = issues.windows(2).all(|w| w[0].order > w[1].order);
    let positive = issues.last().map_or(true, |last| last.order >= 1);
    if !(strictly_decreasing && positive) {
        let total = issues.len() as u32;
        for (index, issue) in issues.iter_mut().enumerate() {
            issue.order = total - index as u32;
        }
    }

    manga.issues = issues;
    Ok(manga)
}

fn non_empty<C: IntoIterator<Item = String>>(values: C) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
