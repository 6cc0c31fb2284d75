use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::api::{extract::AppJson, response::ApiError, AppState};
use crate::engine::reconstruct;
use crate::middleware::AuthUser;
use crate::models::event::{CreateEvent, EventView, EventWithRecipes, UpdateEvent};
use crate::repositories::EventRepository;

pub(crate) const EVENT_NOT_FOUND: &str = "Event not found";

pub(crate) fn render_event(loaded: EventWithRecipes) -> EventView {
    let recipes = loaded.recipes.iter().map(reconstruct).collect();
    EventView::new(loaded.event, recipes)
}

/// Reloads an event with its recipes after a write.
pub(crate) async fn load_event_view(
    repo: &EventRepository<'_>,
    event_id: i64,
    user_id: &str,
) -> Result<EventView, ApiError> {
    repo.find_with_recipes(event_id, user_id)
        .await?
        .map(render_event)
        .ok_or_else(|| ApiError::not_found(EVENT_NOT_FOUND))
}

pub async fn list_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let repo = EventRepository::new(&state.pool);
    let events: Vec<EventView> = repo
        .list_with_recipes(&user.user_id)
        .await?
        .into_iter()
        .map(render_event)
        .collect();

    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = EventRepository::new(&state.pool);
    let event = load_event_view(&repo, event_id, &user.user_id).await?;

    Ok(Json(event))
}

#[axum::debug_handler(state = AppState)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let new_event = payload.validate().map_err(ApiError::validation)?;

    let repo = EventRepository::new(&state.pool);
    let event = repo.create(&user.user_id, &new_event).await?;

    info!("Created event {} for user {}", event.id, user.user_id);

    Ok((StatusCode::CREATED, Json(EventView::new(event, Vec::new()))))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
    AppJson(payload): AppJson<UpdateEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = EventRepository::new(&state.pool);

    let mut event = repo
        .find_owned(event_id, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(EVENT_NOT_FOUND))?;

    payload.apply(&mut event).map_err(ApiError::validation)?;

    if repo.update(&event).await?.is_none() {
        return Err(ApiError::not_found(EVENT_NOT_FOUND));
    }

    info!("Updated event {}", event_id);

    let view = load_event_view(&repo, event_id, &user.user_id).await?;
    Ok(Json(view))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = EventRepository::new(&state.pool);

    if !repo.delete(event_id, &user.user_id).await? {
        return Err(ApiError::not_found(EVENT_NOT_FOUND));
    }

    info!("Deleted event {} and its recipes", event_id);

    Ok(StatusCode::NO_CONTENT)
}
