use sqlx::PgPool;

use super::{StoreError, StoreResult};
use crate::models::recipe::{NewRecipe, RecipeRecord};

pub struct RecipeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RecipeRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, event_id: i64, meal_id: &str) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM event_recipes WHERE event_id = $1 AND meal_id = $2)",
        )
        .bind(event_id)
        .bind(meal_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Inserts a recipe. A unique violation on `(event_id, meal_id)` is
    /// reported as [`StoreError::Conflict`].
    pub async fn insert(&self, recipe: &NewRecipe) -> StoreResult<RecipeRecord> {
        let result = sqlx::query_as::<_, RecipeRecord>(
            "INSERT INTO event_recipes
             (event_id, user_id, meal_id, title, image_url, ingredients, instructions, is_custom,
              category, area, tags, youtube_url, source_url, meal_data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(recipe.event_id)
        .bind(&recipe.user_id)
        .bind(&recipe.meal_id)
        .bind(&recipe.title)
        .bind(&recipe.image_url)
        .bind(&recipe.ingredients)
        .bind(&recipe.instructions)
        .bind(recipe.is_custom)
        .bind(&recipe.category)
        .bind(&recipe.area)
        .bind(&recipe.tags)
        .bind(&recipe.youtube_url)
        .bind(&recipe.source_url)
        .bind(&recipe.meal_data)
        .fetch_one(self.pool)
        .await;

        match result {
            Ok(record) => Ok(record),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict {
                    event_id: recipe.event_id,
                    meal_id: recipe.meal_id.clone().unwrap_or_default(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_by_meal_id(&self, event_id: i64, meal_id: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM event_recipes WHERE event_id = $1 AND meal_id = $2")
            .bind(event_id)
            .bind(meal_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a custom recipe (one without an external id) by its row id.
    pub async fn delete_custom(&self, event_id: i64, recipe_id: i64) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM event_recipes WHERE event_id = $1 AND id = $2 AND meal_id IS NULL",
        )
        .bind(event_id)
        .bind(recipe_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_for_event(&self, event_id: i64) -> StoreResult<Vec<RecipeRecord>> {
        let recipes = sqlx::query_as::<_, RecipeRecord>(
            "SELECT * FROM event_recipes WHERE event_id = $1 ORDER BY id ASC",
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;

        Ok(recipes)
    }
}
