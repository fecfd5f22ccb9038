use serde::{Deserialize, Serialize};

/// One page image of an issue
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssuePage {
    /// Back-reference to the owning `Manga::url`
    pub manga_url: String,
    /// Back-reference to the owning `Issue::url`
    pub issue_url: String,
    /// 1-based position within the issue
    pub number: u32,
    pub image_url: String,
}

impl IssuePage {
    /// Key of the issue this page belongs to
    pub fn issue_key(&self) -> (String, String) {
        (self.manga_url.clone(), self.issue_url.clone())
    }
}
