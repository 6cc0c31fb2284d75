pub mod events;
pub mod extract;
pub mod health;
pub mod recipes;
pub mod response;

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};
use sqlx::PgPool;

use crate::services::IdentityProvider;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn build_router(pool: PgPool, identity: Arc<dyn IdentityProvider>) -> Router {
    let state = AppState { pool, identity };

    Router::new()
        .route("/health", get(health::health_check))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/{id}/recipes",
            get(recipes::list_recipes).post(recipes::add_recipe),
        )
        .route(
            "/events/{id}/recipes/{meal_id}",
            delete(recipes::remove_recipe),
        )
        .with_state(state)
}
