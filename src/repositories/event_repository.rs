use sqlx::PgPool;

use super::StoreResult;
use crate::models::event::{EventRecord, EventWithRecipes, NewEvent};

const EVENT_WITH_RECIPES: &str = r#"
    SELECT e.id, e.user_id, e.title, e.date, e.description, e.location, e.image_url, e.created_at,
           COALESCE(
               json_agg(r ORDER BY r.id) FILTER (WHERE r.id IS NOT NULL),
               '[]'::json
           ) AS recipes
    FROM events e
    LEFT JOIN event_recipes r ON r.event_id = e.id
"#;

pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, event: &NewEvent) -> StoreResult<EventRecord> {
        let record = sqlx::query_as::<_, EventRecord>(
            "INSERT INTO events (user_id, title, date, description, location, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(user_id)
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(record)
    }

    /// Returns the event only when `user_id` owns it.
    pub async fn find_owned(&self, event_id: i64, user_id: &str) -> StoreResult<Option<EventRecord>> {
        let event = sqlx::query_as::<_, EventRecord>(
            "SELECT * FROM events WHERE id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(event)
    }

    pub async fn list_with_recipes(&self, user_id: &str) -> StoreResult<Vec<EventWithRecipes>> {
        let query = format!(
            "{} WHERE e.user_id = $1 GROUP BY e.id ORDER BY e.date ASC, e.id ASC",
            EVENT_WITH_RECIPES
        );

        let events = sqlx::query_as::<_, EventWithRecipes>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(events)
    }

    pub async fn find_with_recipes(
        &self,
        event_id: i64,
        user_id: &str,
    ) -> StoreResult<Option<EventWithRecipes>> {
        let query = format!(
            "{} WHERE e.id = $1 AND e.user_id = $2 GROUP BY e.id",
            EVENT_WITH_RECIPES
        );

        let event = sqlx::query_as::<_, EventWithRecipes>(&query)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(event)
    }

    /// Writes every mutable column of an already-owned event.
    pub async fn update(&self, event: &EventRecord) -> StoreResult<Option<EventRecord>> {
        let updated = sqlx::query_as::<_, EventRecord>(
            "UPDATE events SET title = $1, date = $2, description = $3, location = $4, image_url = $5
             WHERE id = $6 AND user_id = $7
             RETURNING *",
        )
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(event.id)
        .bind(&event.user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(updated)
    }

    /// Deletes the event and its recipes. Returns `false` when the caller
    /// does not own an event with this id.
    pub async fn delete(&self, event_id: i64, user_id: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM event_recipes
             WHERE event_id = (SELECT id FROM events WHERE id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
