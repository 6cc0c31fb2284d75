pub mod event_repository;
pub mod recipe_repository;

pub use event_repository::EventRepository;
pub use recipe_repository::RecipeRepository;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recipe {meal_id} is already attached to event {event_id}")]
    Conflict { event_id: i64, meal_id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
