//! In-memory quote repository

use std::collections::BTreeMap;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::domain::quote::{
    Anime, AnimeCharacter, PageRequest, QuoteFilter, QuoteRecord, QuoteRepository,
};
use crate::domain::DomainError;

/// Un-joined quote row
#[derive(Debug, Clone)]
struct QuoteRow {
    id: i64,
    content: String,
    anime_id: i64,
    anime_character_id: i64,
}

/// Quotes held in memory with relational joins resolved on read.
///
/// Rows whose anime or character is missing are never returned.
#[derive(Debug, Default)]
pub struct InMemoryQuoteRepository {
    anime: BTreeMap<i64, Anime>,
    characters: BTreeMap<i64, AnimeCharacter>,
    quotes: BTreeMap<i64, QuoteRow>,
}

impl InMemoryQuoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anime(mut self, id: i64, name: impl Into<String>) -> Self {
        self.anime.insert(
            id,
            Anime {
                id,
                name: name.into(),
            },
        );
        self
    }

    pub fn with_character(mut self, id: i64, name: impl Into<String>, anime_id: i64) -> Self {
        self.characters.insert(
            id,
            AnimeCharacter {
                id,
                name: name.into(),
                anime_id,
            },
        );
        self
    }

    pub fn with_quote(
        mut self,
        id: i64,
        content: impl Into<String>,
        anime_id: i64,
        anime_character_id: i64,
    ) -> Self {
        self.quotes.insert(
            id,
            QuoteRow {
                id,
                content: content.into(),
                anime_id,
                anime_character_id,
            },
        );
        self
    }

    /// Small catalogue for local runs
    pub fn with_sample_data() -> Self {
        Self::new()
            .with_anime(1, "Naruto")
            .with_anime(2, "Fullmetal Alchemist: Brotherhood")
            .with_anime(3, "One Piece")
            .with_anime(4, "Cowboy Bebop")
            .with_character(1, "Itachi Uchiha", 1)
            .with_character(2, "Jiraiya", 1)
            .with_character(3, "Naruto Uzumaki", 1)
            .with_character(4, "Alphonse Elric", 2)
            .with_character(5, "Roy Mustang", 2)
            .with_character(6, "Monkey D. Luffy", 3)
            .with_character(7, "Spike Spiegel", 4)
            .with_quote(
                1,
                "People live their lives bound by what they accept as correct and true.",
                1,
                1,
            )
            .with_quote(
                2,
                "A place where someone still thinks about you is a place you can call home.",
                1,
                2,
            )
            .with_quote(
                3,
                "A lesson without pain is meaningless.",
                2,
                4,
            )
            .with_quote(
                4,
                "I'm not gonna run away, I never go back on my word! That's my nindo: my ninja way!",
                1,
                3,
            )
            .with_quote(
                5,
                "Humankind cannot gain anything without first giving something in return.",
                2,
                4,
            )
            .with_quote(
                6,
                "Surpass your limits. Right here. Right now.",
                2,
                5,
            )
            .with_quote(
                7,
                "Hard work is worthless for those that don't believe in themselves.",
                1,
                3,
            )
            .with_quote(
                8,
                "I don't want to conquer anything. I just think the guy with the most freedom in this whole ocean is the Pirate King!",
                3,
                6,
            )
            .with_quote(
                9,
                "Whatever happens, happens.",
                4,
                7,
            )
    }

    fn join(&self, row: &QuoteRow) -> Option<QuoteRecord> {
        let anime = self.anime.get(&row.anime_id)?;
        let anime_character = self.characters.get(&row.anime_character_id)?;

        Some(QuoteRecord {
            id: row.id,
            content: row.content.clone(),
            anime: anime.clone(),
            anime_character: anime_character.clone(),
        })
    }

    fn matching(&self, filter: &QuoteFilter) -> Vec<QuoteRecord> {
        self.quotes
            .values()
            .filter_map(|row| self.join(row))
            .filter(|record| filter.matches(record))
            .collect()
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn get(&self, id: i64) -> Result<Option<QuoteRecord>, DomainError> {
        Ok(self.quotes.get(&id).and_then(|row| self.join(row)))
    }

    async fn random(&self, filter: &QuoteFilter) -> Result<Option<QuoteRecord>, DomainError> {
        let candidates = self.matching(filter);

        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }

    async fn list(
        &self,
        filter: &QuoteFilter,
        page: PageRequest,
    ) -> Result<Vec<QuoteRecord>, DomainError> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
