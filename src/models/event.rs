use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::recipe::{RecipeRecord, RecipeView};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An event together with its recipes, loaded in a single query.
#[derive(Debug, Clone, FromRow)]
pub struct EventWithRecipes {
    #[sqlx(flatten)]
    pub event: EventRecord,

    #[sqlx(json)]
    pub recipes: Vec<RecipeRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateEvent {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// Partial update. For the nullable fields an absent key leaves the value
/// alone and an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEvent {
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, alias = "imageUrl", deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

/// Event as returned to clients. `name` duplicates `title` for older clients.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: i64,
    pub title: String,
    pub name: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub recipes: Vec<RecipeView>,
}

impl CreateEvent {
    pub fn validate(self) -> Result<NewEvent, String> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "Event title is required".to_string())?;

        let date = self
            .date
            .ok_or_else(|| "Event date is required".to_string())?;

        Ok(NewEvent {
            title,
            date,
            description: self.description,
            location: self.location,
            image_url: self.image_url,
        })
    }
}

impl UpdateEvent {
    /// Applies the supplied fields on top of the stored event.
    pub fn apply(self, event: &mut EventRecord) -> Result<(), String> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err("Event title cannot be empty".to_string());
            }
            event.title = title.to_string();
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(image_url) = self.image_url {
            event.image_url = image_url;
        }

        Ok(())
    }
}

impl EventView {
    pub fn new(event: EventRecord, recipes: Vec<RecipeView>) -> Self {
        Self {
            id: event.id,
            name: event.title.clone(),
            title: event.title,
            date: event.date,
            description: event.description,
            location: event.location,
            image_url: event.image_url,
            created_at: event.created_at,
            recipes,
        }
    }
}
