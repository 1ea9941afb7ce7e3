use axum::{
    Json,
    extract::{Path, State},
};
use tracing::debug;

use cafe_types::api::{
    CafeListResponse, CafeResponse, CafeSummary, ChooseCafeResponse, RandomCafeResponse, SearchResponse,
};
use cafe_types::forms::{FormDefinition, FormSpec, SearchCafeForm};
use cafe_types::models::Cafe;

use crate::error::ApiError;
use crate::extractors::ValidatedForm;
use crate::routes::AppState;

const NO_CAFES: &str = "No cafes found.";

/// GET /: every café, read from the store on each request.
pub async fn list_cafes(State(state): State<AppState>) -> Result<Json<CafeListResponse>, ApiError> {
    let cafes: Vec<Cafe> = state
        .db(|db| db.list_cafes())
        .await?
        .into_iter()
        .map(Cafe::from)
        .collect();

    let message = cafes.is_empty().then(|| NO_CAFES.to_string());
    Ok(Json(CafeListResponse { cafes, message }))
}

/// GET /cafe/{cafe_id}
pub async fn get_cafe(
    State(state): State<AppState>,
    Path(cafe_id): Path<i64>,
) -> Result<Json<CafeResponse>, ApiError> {
    let cafe = state
        .db(move |db| db.get_cafe(cafe_id))
        .await?
        .ok_or_else(|| ApiError::cafe_not_found(cafe_id))?;

    Ok(Json(CafeResponse { cafe: cafe.into() }))
}

/// GET /random
pub async fn random_cafe(State(state): State<AppState>) -> Result<Json<RandomCafeResponse>, ApiError> {
    let cafe = state.db(|db| db.random_cafe()).await?.map(Cafe::from);
    if let Some(cafe) = &cafe {
        debug!("Random pick: {} (id {})", cafe.name, cafe.id);
    }

    let message = cafe.is_none().then(|| NO_CAFES.to_string());
    Ok(Json(RandomCafeResponse { cafe, message }))
}

pub async fn search_page() -> Json<FormSpec> {
    Json(SearchCafeForm::describe("/search"))
}

/// POST /search: exact match on location. No match is a normal, empty result.
pub async fn search_by_location(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<SearchCafeForm>,
) -> Result<Json<SearchResponse>, ApiError> {
    let location = form.loc;

    let lookup = location.clone();
    let cafes: Vec<Cafe> = state
        .db(move |db| db.get_cafes_by_location(&lookup))
        .await?
        .into_iter()
        .map(Cafe::from)
        .collect();
    debug!("Search for '{}' matched {} cafes", location, cafes.len());

    let message = cafes
        .is_empty()
        .then(|| format!("Sorry, we don't have cafes in that location: '{location}'."));
    Ok(Json(SearchResponse {
        location,
        cafes,
        message,
    }))
}

/// GET /choose-cafe: picker listing for the price editor.
pub async fn choose_cafe(State(state): State<AppState>) -> Result<Json<ChooseCafeResponse>, ApiError> {
    let cafes: Vec<CafeSummary> = state
        .db(|db| db.list_cafes())
        .await?
        .into_iter()
        .map(|row| CafeSummary::from(Cafe::from(row)))
        .collect();

    Ok(Json(ChooseCafeResponse { cafes }))
}
