use crate::model::{Entity, Genres, IssuePage, Manga};
use crate::output::{EntitySink, SinkResult};
use std::collections::{BTreeMap, HashSet};

type PageKey = (String, String, u32);

/// In-memory catalog keyed by series URL
///
/// Re-crawling a series replaces it, issues included; pages of issues the
/// new listing no longer has are dropped with them.
#[derive(Debug, Default)]
pub struct MangaCatalog {
    genres: Option<Genres>,
    manga: BTreeMap<String, Manga>,
    pages: BTreeMap<PageKey, IssuePage>,
}

impl MangaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genres(&self) -> Option<&Genres> {
        self.genres.as_ref()
    }

    pub fn manga(&self, url: &str) -> Option<&Manga> {
        self.manga.get(url)
    }

    /// Number of distinct series
    pub fn len(&self) -> usize {
        self.manga.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manga.is_empty()
    }

    /// Pages of one issue, ordered by number
    pub fn pages(&self, manga_url: &str, issue_url: &str) -> Vec<&IssuePage> {
        self.pages
            .iter()
            .filter(|((m, i, _), _)| m == manga_url && i == issue_url)
            .map(|(_, page)| page)
            .collect()
    }

    fn upsert_manga(&mut self, manga: Manga) {
        let kept: HashSet<&str> = manga.issues.iter().map(|i| i.url.as_str()).collect();
        self.pages
            .retain(|(m, i, _), _| m != &manga.url || kept.contains(i.as_str()));

        if self.manga.contains_key(&manga.url) {
            tracing::debug!("Replacing {}", manga.url);
        }
        self.manga.insert(manga.url.clone(), manga);
    }
}

impl EntitySink for MangaCatalog {
    fn accept(&mut self, entity: &Entity) -> SinkResult<()> {
        match entity {
            Entity::Genres(genres) => self.genres = Some(genres.clone()),
            Entity::Manga(manga) => self.upsert_manga(manga.clone()),
            Entity::IssuePage(page) => {
                let key = (page.manga_url.clone(), page.issue_url.clone(), page.number);
                self.pages.insert(key, page.clone());
            }
        }
        Ok(())
    }
}
