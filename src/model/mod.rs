//! Structured records produced by a crawl
//!
//! # Components
//!
//! - `Genres`: the genre names a site offers
//! - `Manga` / `Issue`: a series and its ordered issue list
//! - `IssuePage`: one page image of an issue
//! - `Entity`: the tagged union handed to sinks

mod manga;
mod page;

pub use manga::{Issue, Manga, RankOrder, ReadingDirection};
pub use page::IssuePage;

use serde::{Deserialize, Serialize};

/// The genre names offered by one site
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Genres {
    pub names: Vec<String>,
}

/// A validated record leaving the crawler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Genres(Genres),
    Manga(Manga),
    IssuePage(IssuePage),
}

impl Entity {
    /// Short name of the entity kind, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Genres(_) => "genres",
            Self::Manga(_) => "manga",
            Self::IssuePage(_) => "issue_page",
        }
    }
}
