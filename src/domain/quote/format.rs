//! Response shaping for quote records

use super::entity::{FormattedQuote, QuoteRecord};

/// Flattens a joined record into the public shape; absent in, absent out.
pub fn format_quote(record: Option<&QuoteRecord>) -> Option<FormattedQuote> {
    record.map(FormattedQuote::from)
}

impl From<&QuoteRecord> for FormattedQuote {
    fn from(record: &QuoteRecord) -> Self {
        Self {
            anime: record.anime.name.clone(),
            character: record.anime_character.name.clone(),
            content: record.content.clone(),
        }
    }
}
