//! Series and issue records
//!
//! A `Manga` is identified by its `url`; its `issues` are owned by it and are
//! replaced wholesale whenever the series is re-crawled.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Direction in which the pages of a series are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReadingDirection {
    /// Left to right
    #[default]
    LR,
    /// Right to left
    RL,
}

impl ReadingDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LR => "LR",
            Self::RL => "RL",
        }
    }
}

impl fmt::Display for ReadingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a lower or a higher `rank` value means more popular
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RankOrder {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl RankOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for RankOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A series as described by its detail page
///
/// Absent fields take empty defaults: empty strings and collections,
/// `None` for `rank`, and the enum defaults for `reading_direction` and
/// `rank_order`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Manga {
    /// Natural identity of the series
    pub url: String,
    pub name: String,
    pub alt_name: BTreeSet<String>,
    pub author: Vec<String>,
    pub artist: Vec<String>,
    pub reading_direction: ReadingDirection,
    pub status: String,
    pub genres: BTreeSet<String>,
    pub rank: Option<u32>,
    pub rank_order: RankOrder,
    pub description: String,
    pub cover_image_url: String,
    /// Newest first, in the order the site lists them
    pub issues: Vec<Issue>,
}

impl Manga {
    /// Creates a partial series that only knows its URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A single chapter/volume of a series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Issue {
    /// Back-reference to the owning `Manga::url`
    pub manga_url: String,
    pub name: String,
    /// Loosely parsed from free text; `None` when no number is present
    pub number: Option<f64>,
    /// Position counted from the oldest issue (the oldest has order 1)
    pub order: u32,
    pub release: Option<NaiveDate>,
    pub language: String,
    /// Unique within the owning series
    pub url: String,
}

impl Issue {
    /// Creates an issue of `manga_url` located at `url`
    pub fn new(manga_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            manga_url: manga_url.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}
