//! Quote records as read from the durable store

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anime {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeCharacter {
    pub id: i64,
    pub name: String,
    pub anime_id: i64,
}

/// A quote joined with its anime and character.
///
/// Both relations are required, so a row with a dangling reference can
/// never be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub id: i64,
    pub content: String,
    pub anime: Anime,
    pub anime_character: AnimeCharacter,
}

/// Public response shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedQuote {
    pub anime: String,
    pub character: String,
    pub content: String,
}

/// Optional case-insensitive name filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub anime: Option<String>,
    pub character: Option<String>,
}

impl QuoteFilter {
    pub fn by_anime(name: impl Into<String>) -> Self {
        Self {
            anime: Some(name.into()),
            character: None,
        }
    }

    pub fn by_character(name: impl Into<String>) -> Self {
        Self {
            anime: None,
            character: Some(name.into()),
        }
    }

    /// Unicode case-insensitive, like `LOWER(a) = LOWER(b)` in SQL
    pub fn matches(&self, record: &QuoteRecord) -> bool {
        let anime_ok = self
            .anime
            .as_deref()
            .is_none_or(|name| same_name(&record.anime.name, name));
        let character_ok = self
            .character
            .as_deref()
            .is_none_or(|name| same_name(&record.anime_character.name, name));

        anime_ok && character_ok
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 10;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}
