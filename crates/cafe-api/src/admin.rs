//! Admin-only handlers. Every route here sits behind `require_admin`.

use axum::{
    Extension, Json,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
};
use tracing::info;

use cafe_db::models::NewCafe;
use cafe_types::api::{CafeMutationResponse, MessageResponse, UpdatePricePage};
use cafe_types::forms::{
    AddCafeForm, DeleteCafeForm, DeleteUserForm, FormDefinition, FormSpec, UpdateCafePriceForm,
};
use cafe_types::models::{Cafe, User};

use crate::error::ApiError;
use crate::extractors::ValidatedForm;
use crate::routes::AppState;

pub async fn add_cafe_page() -> Json<FormSpec> {
    Json(AddCafeForm::describe("/add"))
}

/// POST /add
pub async fn add_cafe(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    ValidatedForm(form): ValidatedForm<AddCafeForm>,
) -> Result<(StatusCode, Json<CafeMutationResponse>), ApiError> {
    let new_cafe = NewCafe {
        author_id: Some(admin.id),
        name: form.name,
        map_url: form.map_url,
        img_url: form.img_url,
        location: form.loc,
        seats: form.seats,
        has_toilet: form.toilet,
        has_wifi: form.wifi,
        has_sockets: form.sockets,
        can_take_calls: form.calls,
        coffee_price: form.coffee_price,
    };

    let inserted = state
        .db(move |db| {
            if db.get_cafe_by_name(&new_cafe.name)?.is_some() {
                return Ok(None);
            }
            let id = db.insert_cafe(&new_cafe)?;
            db.get_cafe(id)
        })
        .await;

    let cafe: Cafe = inserted
        .map_err(|e| e.or_conflict(ApiError::DuplicateName))?
        .ok_or(ApiError::DuplicateName)?
        .into();
    info!("{} added cafe {} (id {})", admin.username, cafe.name, cafe.id);

    Ok((
        StatusCode::CREATED,
        Json(CafeMutationResponse {
            message: format!(
                "The {} Cafe has been successfully added into the database.",
                cafe.name
            ),
            cafe,
        }),
    ))
}

/// GET /update-price/{cafe_id}
pub async fn update_price_page(
    State(state): State<AppState>,
    Path(cafe_id): Path<i64>,
) -> Result<Json<UpdatePricePage>, ApiError> {
    let cafe = state
        .db(move |db| db.get_cafe(cafe_id))
        .await?
        .ok_or_else(|| ApiError::cafe_not_found(cafe_id))?;

    Ok(Json(UpdatePricePage {
        cafe: cafe.into(),
        form: UpdateCafePriceForm::describe(format!("/update-price/{cafe_id}")),
    }))
}

/// POST or PATCH /update-price/{cafe_id}
///
/// The café is looked up before the body is read, so an unknown id is a 404
/// whatever the form holds.
pub async fn update_price(
    State(state): State<AppState>,
    Path(cafe_id): Path<i64>,
    Extension(admin): Extension<User>,
    request: Request,
) -> Result<Json<CafeMutationResponse>, ApiError> {
    if state.db(move |db| db.get_cafe(cafe_id)).await?.is_none() {
        return Err(ApiError::cafe_not_found(cafe_id));
    }

    let ValidatedForm(form) =
        ValidatedForm::<UpdateCafePriceForm>::from_request(request, &state).await?;
    let new_price = form.new_price;

    let price = new_price.clone();
    let cafe: Cafe = state
        .db(move |db| {
            if !db.update_coffee_price(cafe_id, &price)? {
                return Ok(None);
            }
            db.get_cafe(cafe_id)
        })
        .await?
        .ok_or_else(|| ApiError::cafe_not_found(cafe_id))?
        .into();
    info!("{} set coffee price of {} to {}", admin.username, cafe.name, new_price);

    Ok(Json(CafeMutationResponse {
        message: format!(
            "Coffee price successfully updated to {} for {}.",
            new_price, cafe.name
        ),
        cafe,
    }))
}

pub async fn delete_cafe_page() -> Json<FormSpec> {
    Json(DeleteCafeForm::describe("/delete-cafe"))
}

/// POST /delete-cafe
pub async fn delete_cafe(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    ValidatedForm(form): ValidatedForm<DeleteCafeForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    let cafe_id = form.id;

    let removed = state
        .db(move |db| {
            let Some(cafe) = db.get_cafe(cafe_id)? else {
                return Ok(None);
            };
            Ok(db.delete_cafe(cafe_id)?.then_some(cafe))
        })
        .await?
        .ok_or_else(|| ApiError::cafe_not_found(cafe_id))?;
    info!("{} deleted cafe {} (id {})", admin.username, removed.name, cafe_id);

    Ok(Json(MessageResponse::new(format!(
        "The {} cafe has been successfully deleted from the database.",
        removed.name
    ))))
}

pub async fn delete_user_page() -> Json<FormSpec> {
    Json(DeleteUserForm::describe("/delete-user"))
}

/// POST /delete-user: the user's cafés stay, with their author cleared.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<User>,
    ValidatedForm(form): ValidatedForm<DeleteUserForm>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = form.id;

    let removed = state
        .db(move |db| {
            let Some(user) = db.get_user_by_id(user_id)? else {
                return Ok(None);
            };
            Ok(db.delete_user(user_id)?.then_some(user))
        })
        .await?
        .ok_or_else(|| ApiError::user_not_found(user_id))?;
    info!("{} deleted user {} (id {})", admin.username, removed.username, user_id);

    Ok(Json(MessageResponse::new(format!(
        "The user {} has been successfully deleted from the database.",
        removed.username
    ))))
}
