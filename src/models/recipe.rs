use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::engine::ingredients::{derive_ingredients, text_field};

/// A row of `event_recipes`.
///
/// Also deserialized from the `json_agg` column of the event listing query,
/// which is why it derives `Deserialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeRecord {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub meal_id: Option<String>,
    pub title: String,
    pub image_url: Option<String>,
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub is_custom: Option<bool>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub tags: Option<String>,
    pub youtube_url: Option<String>,
    pub source_url: Option<String>,
    pub meal_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Recipe as returned to clients, keyed the way the catalog names its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    pub id: i64,

    #[serde(rename = "idMeal")]
    pub meal_id: Option<String>,

    #[serde(rename = "strMeal")]
    pub title: String,

    #[serde(rename = "strMealThumb")]
    pub image_url: Option<String>,

    #[serde(rename = "strCategory")]
    pub category: Option<String>,

    #[serde(rename = "strArea")]
    pub area: Option<String>,

    #[serde(rename = "strTags")]
    pub tags: Option<String>,

    #[serde(rename = "strYoutube")]
    pub youtube_url: Option<String>,

    #[serde(rename = "strSource")]
    pub source_url: Option<String>,

    #[serde(rename = "strInstructions")]
    pub instructions: Option<String>,

    pub ingredients: Option<String>,

    #[serde(rename = "isCustom")]
    pub is_custom: bool,

    /// `strIngredientN` / `strMeasureN` copied from the sidecar.
    #[serde(flatten)]
    pub ingredient_fields: BTreeMap<String, Value>,
}

/// Body of `POST /events/{id}/recipes`. Accepts snake_case keys as well as
/// the catalog's own field names so a catalog entry can be posted as is.
///
/// Catalog keys live in their own fields rather than serde aliases, so a body
/// carrying both `title` and `strMeal` is accepted; the snake_case value wins
/// when both are non-blank.
#[derive(Debug, Default, Deserialize)]
pub struct AddRecipe {
    #[serde(default, alias = "mealId", deserialize_with = "deserialize_external_id")]
    pub meal_id: Option<String>,

    #[serde(default, rename = "idMeal", deserialize_with = "deserialize_external_id")]
    pub id_meal: Option<String>,

    #[serde(default, alias = "name")]
    pub title: Option<String>,

    #[serde(default, rename = "strMeal")]
    pub str_meal: Option<String>,

    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,

    #[serde(default, rename = "strMealThumb")]
    pub str_meal_thumb: Option<String>,

    #[serde(default)]
    pub ingredients: Option<String>,

    #[serde(default)]
    pub instructions: Option<String>,

    #[serde(default, rename = "strInstructions")]
    pub str_instructions: Option<String>,

    #[serde(default, alias = "isCustom")]
    pub is_custom: Option<bool>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, rename = "strCategory")]
    pub str_category: Option<String>,

    #[serde(default)]
    pub area: Option<String>,

    #[serde(default, rename = "strArea")]
    pub str_area: Option<String>,

    #[serde(default)]
    pub tags: Option<String>,

    #[serde(default, rename = "strTags")]
    pub str_tags: Option<String>,

    #[serde(default, alias = "youtubeUrl")]
    pub youtube_url: Option<String>,

    #[serde(default, rename = "strYoutube")]
    pub str_youtube: Option<String>,

    #[serde(default, alias = "sourceUrl")]
    pub source_url: Option<String>,

    #[serde(default, rename = "strSource")]
    pub str_source: Option<String>,

    /// Verbatim catalog payload, persisted as the sidecar.
    #[serde(default, alias = "mealData")]
    pub meal_data: Option<Value>,
}

/// A validated recipe ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub event_id: i64,
    pub user_id: String,
    pub meal_id: Option<String>,
    pub title: String,
    pub image_url: Option<String>,
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub is_custom: bool,
    pub category: Option<String>,
    pub area: Option<String>,
    pub tags: Option<String>,
    pub youtube_url: Option<String>,
    pub source_url: Option<String>,
    pub meal_data: Option<String>,
}

fn deserialize_external_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "external recipe id must be a string or integer, got {}",
            other
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-blank of the snake_case value and its catalog-named twin.
fn first_non_blank(primary: Option<String>, catalog: Option<String>) -> Option<String> {
    non_blank(primary).or_else(|| non_blank(catalog))
}

impl AddRecipe {
    /// Validates the request and computes the stored columns.
    ///
    /// When a catalog payload is attached, blank columns are filled from it
    /// and the ingredients string is derived from its slots once, here.
    pub fn into_new_recipe(self, event_id: i64, user_id: &str) -> Result<NewRecipe, String> {
        let payload = self.meal_data.filter(|v| v.is_object());
        let from_payload = |key: &str| payload.as_ref().and_then(|p| text_field(p, key));

        let is_custom = self.is_custom.unwrap_or(false);

        let meal_id = first_non_blank(self.meal_id, self.id_meal).or_else(|| from_payload("idMeal"));
        if meal_id.is_none() && !is_custom {
            return Err("Recipe id is required".to_string());
        }

        let title = first_non_blank(self.title, self.str_meal)
            .or_else(|| from_payload("strMeal"))
            .ok_or_else(|| "Recipe title is required".to_string())?;

        let ingredients = payload
            .as_ref()
            .map(derive_ingredients)
            .filter(|s| !s.is_empty())
            .or_else(|| non_blank(self.ingredients));

        Ok(NewRecipe {
            event_id,
            user_id: user_id.to_string(),
            meal_id,
            title,
            image_url: first_non_blank(self.image_url, self.str_meal_thumb)
                .or_else(|| from_payload("strMealThumb")),
            ingredients,
            instructions: first_non_blank(self.instructions, self.str_instructions)
                .or_else(|| from_payload("strInstructions")),
            is_custom,
            category: first_non_blank(self.category, self.str_category)
                .or_else(|| from_payload("strCategory")),
            area: first_non_blank(self.area, self.str_area).or_else(|| from_payload("strArea")),
            tags: first_non_blank(self.tags, self.str_tags).or_else(|| from_payload("strTags")),
            youtube_url: first_non_blank(self.youtube_url, self.str_youtube)
                .or_else(|| from_payload("strYoutube")),
            source_url: first_non_blank(self.source_url, self.str_source)
                .or_else(|| from_payload("strSource")),
            meal_data: payload.map(|p| p.to_string()),
        })
    }
}
