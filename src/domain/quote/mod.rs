//! Quote domain

mod entity;
mod format;
mod repository;

pub use entity::{
    Anime, AnimeCharacter, FormattedQuote, PageRequest, QuoteFilter, QuoteRecord,
};
pub use format::format_quote;
pub use repository::QuoteRepository;

#[cfg(test)]
pub use repository::MockQuoteRepository;
