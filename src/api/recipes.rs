use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};

use crate::api::events::{load_event_view, EVENT_NOT_FOUND};
use crate::api::{extract::AppJson, response::ApiError, AppState};
use crate::engine::reconstruct;
use crate::middleware::AuthUser;
use crate::models::recipe::{AddRecipe, RecipeView};
use crate::repositories::{EventRepository, RecipeRepository, StoreError};

pub async fn add_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    AppJson(payload): AppJson<AddRecipe>,
) -> Result<impl IntoResponse, ApiError> {
    let new_recipe = payload
        .into_new_recipe(event_id, &user.user_id)
        .map_err(ApiError::validation)?;

    let events = EventRepository::new(&state.pool);
    if events.find_owned(event_id, &user.user_id).await?.is_none() {
        warn!(
            "User {} tried to add a recipe to unknown event {}",
            user.user_id, event_id
        );
        return Err(ApiError::not_found(EVENT_NOT_FOUND));
    }

    let recipes = RecipeRepository::new(&state.pool);

    if let Some(meal_id) = &new_recipe.meal_id {
        if recipes.exists(event_id, meal_id).await? {
            return Err(StoreError::Conflict {
                event_id,
                meal_id: meal_id.clone(),
            }
            .into());
        }
    }

    let recipe = recipes.insert(&new_recipe).await?;

    info!(
        "Added recipe {} ({}) to event {}",
        recipe.id,
        recipe.meal_id.as_deref().unwrap_or("custom"),
        event_id
    );

    let view = load_event_view(&events, event_id, &user.user_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let events = EventRepository::new(&state.pool);
    if events.find_owned(event_id, &user.user_id).await?.is_none() {
        return Err(ApiError::not_found(EVENT_NOT_FOUND));
    }

    let recipes: Vec<RecipeView> = RecipeRepository::new(&state.pool)
        .list_for_event(event_id)
        .await?
        .iter()
        .map(reconstruct)
        .collect();

    Ok(Json(recipes))
}

pub async fn remove_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path((event_id, meal_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let events = EventRepository::new(&state.pool);
    if events.find_owned(event_id, &user.user_id).await?.is_none() {
        return Err(ApiError::not_found(EVENT_NOT_FOUND));
    }

    let recipes = RecipeRepository::new(&state.pool);
    let mut removed = recipes.delete_by_meal_id(event_id, &meal_id).await?;

    // Custom recipes have no external id; they are addressed by row id.
    if removed == 0 {
        if let Ok(recipe_id) = meal_id.parse::<i64>() {
            removed = recipes.delete_custom(event_id, recipe_id).await?;
        }
    }

    if removed == 0 {
        return Err(ApiError::not_found("Recipe not found in this event"));
    }

    info!("Removed recipe {} from event {}", meal_id, event_id);

    let view = load_event_view(&events, event_id, &user.user_id).await?;
    Ok(Json(view))
}
