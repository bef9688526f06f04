//! Quote handlers, reached only after the request gate admits the request

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

use super::state::AppState;
use super::types::{ApiError, ValidatedQuery};
use crate::domain::gate::{Admission, ClientIdentity};
use crate::domain::quote::{FormattedQuote, QuoteFilter};

#[derive(Debug, Deserialize, Validate)]
pub struct NameQuery {
    #[validate(length(min = 1, max = 100, message = "length must be between 1 and 100"))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    #[validate(length(min = 1, max = 100, message = "length must be between 1 and 100"))]
    pub anime: Option<String>,
    #[validate(length(min = 1, max = 100, message = "length must be between 1 and 100"))]
    pub character: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub page: Option<u32>,
}

impl ListQuery {
    fn filter(&self) -> QuoteFilter {
        QuoteFilter {
            anime: self.anime.clone(),
            character: self.character.clone(),
        }
    }
}

pub fn create_quotes_router() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(list_quotes))
        .route("/quotes/random", get(random_quote))
        .route("/quotes/random/anime", get(random_quote_by_anime))
        .route("/quotes/random/character", get(random_quote_by_character))
        .route("/quotes/{id}", get(quote_by_id))
}

pub async fn random_quote(State(state): State<AppState>) -> Result<Json<FormattedQuote>, ApiError> {
    random_matching(&state, QuoteFilter::default()).await
}

pub async fn random_quote_by_anime(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<NameQuery>,
) -> Result<Json<FormattedQuote>, ApiError> {
    random_matching(&state, QuoteFilter::by_anime(query.name)).await
}

pub async fn random_quote_by_character(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<NameQuery>,
) -> Result<Json<FormattedQuote>, ApiError> {
    random_matching(&state, QuoteFilter::by_character(query.name)).await
}

/// Ids that do not fit an `i64` cannot exist, so they are a 404 too
pub async fn quote_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FormattedQuote>, ApiError> {
    let id: i64 = id.parse().map_err(|_| ApiError::quote_not_found())?;

    state
        .quote_service
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::quote_not_found)
}

/// An empty page is `[]`, not a 404
pub async fn list_quotes(
    State(state): State<AppState>,
    admission: Option<Extension<Admission>>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Json<Vec<FormattedQuote>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let quotes = state.quote_service.list(&query.filter(), page).await?;

    let client = admission.map(|Extension(a)| match a.identity {
        ClientIdentity::ApiKey { fingerprint, .. } => fingerprint,
        ClientIdentity::Anonymous { ip } => ip.to_string(),
    });
    debug!(page, count = quotes.len(), client = ?client, "Listed quotes");

    Ok(Json(quotes))
}

async fn random_matching(
    state: &AppState,
    filter: QuoteFilter,
) -> Result<Json<FormattedQuote>, ApiError> {
    state
        .quote_service
        .random(&filter)
        .await?
        .map(Json)
        .ok_or_else(ApiError::quote_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_query_bounds() {
        assert!(NameQuery { name: "Naruto".into() }.validate().is_ok());
        assert!(NameQuery { name: String::new() }.validate().is_err());
        assert!(NameQuery { name: "x".repeat(101) }.validate().is_err());
    }

    #[test]
    fn test_list_query_page_bounds() {
        let query = |page| ListQuery {
            page: Some(page),
            ..Default::default()
        };

        assert!(query(1).validate().is_ok());
        assert!(query(1000).validate().is_ok());
        assert!(query(0).validate().is_err());
        assert!(query(1001).validate().is_err());
        assert!(ListQuery::default().validate().is_ok());
    }

    #[test]
    fn test_list_query_filter() {
        let query = ListQuery {
            anime: Some("naruto".into()),
            ..Default::default()
        };

        assert_eq!(query.filter(), QuoteFilter::by_anime("naruto"));
    }
}
