use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::ingredients::{INGREDIENT_PREFIX, MEASURE_PREFIX};
use crate::models::{RecipeRecord, RecipeView};

pub const UNKNOWN: &str = "Unknown";

/// Result of reading the `meal_data` column.
#[derive(Debug, Clone, PartialEq)]
pub enum Sidecar {
    Absent,
    Malformed(String),
    Mapping(Map<String, Value>),
    /// Valid JSON that is not an object.
    Other(Value),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReconstructError {
    #[error("sidecar is {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("sidecar field '{0}' is not text")]
    NonTextField(String),
}

impl Sidecar {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Sidecar::Absent,
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Sidecar::Mapping(map),
            Ok(other) => Sidecar::Other(other),
            Err(err) => Sidecar::Malformed(err.to_string()),
        }
    }
}

/// Builds the client view of a stored recipe. Never fails: merge errors
/// fall back to a view built from the columns alone.
pub fn reconstruct(record: &RecipeRecord) -> RecipeView {
    let sidecar = Sidecar::parse(record.meal_data.as_deref());

    match merge(record, sidecar) {
        Ok(view) => view,
        Err(err) => {
            warn!(
                "Falling back to column-only view for recipe {}: {}",
                record.id, err
            );
            minimal_view(record)
        }
    }
}

pub fn merge(record: &RecipeRecord, sidecar: Sidecar) -> Result<RecipeView, ReconstructError> {
    let mut view = column_view(record);

    match sidecar {
        Sidecar::Absent => {}
        Sidecar::Malformed(reason) => {
            warn!(
                "Ignoring unparseable meal_data for recipe {}: {}",
                record.id, reason
            );
        }
        Sidecar::Other(value) => return Err(ReconstructError::NotAnObject(shape_of(&value))),
        Sidecar::Mapping(map) => {
            debug!("Merging meal_data for recipe {}", record.id);
            apply_sidecar(&mut view, &map)?;
        }
    }

    Ok(view)
}

fn apply_sidecar(view: &mut RecipeView, map: &Map<String, Value>) -> Result<(), ReconstructError> {
    for (key, field) in [
        ("strCategory", &mut view.category),
        ("strArea", &mut view.area),
    ] {
        if let Some(value) = truthy_text(map, key)? {
            if value != UNKNOWN {
                *field = Some(value);
            }
        }
    }

    for (key, field) in [
        ("strTags", &mut view.tags),
        ("strYoutube", &mut view.youtube_url),
        ("strSource", &mut view.source_url),
        ("strInstructions", &mut view.instructions),
    ] {
        if let Some(value) = truthy_text(map, key)? {
            *field = Some(value);
        }
    }

    for (key, value) in map {
        if (key.starts_with(INGREDIENT_PREFIX) || key.starts_with(MEASURE_PREFIX))
            && is_truthy(value)
        {
            view.ingredient_fields.insert(key.clone(), value.clone());
        }
    }

    Ok(())
}

fn column_view(record: &RecipeRecord) -> RecipeView {
    let or_unknown = |column: &Option<String>| {
        column
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string()
    };

    RecipeView {
        id: record.id,
        meal_id: record.meal_id.clone(),
        title: record.title.clone(),
        image_url: record.image_url.clone(),
        category: Some(or_unknown(&record.category)),
        area: Some(or_unknown(&record.area)),
        tags: Some(record.tags.clone().unwrap_or_default()),
        youtube_url: Some(record.youtube_url.clone().unwrap_or_default()),
        source_url: Some(record.source_url.clone().unwrap_or_default()),
        instructions: Some(record.instructions.clone().unwrap_or_default()),
        ingredients: record.ingredients.clone(),
        is_custom: record.is_custom.unwrap_or(false),
        ingredient_fields: BTreeMap::new(),
    }
}

fn minimal_view(record: &RecipeRecord) -> RecipeView {
    RecipeView {
        id: record.id,
        meal_id: record.meal_id.clone(),
        title: record.title.clone(),
        image_url: record.image_url.clone(),
        category: record.category.clone(),
        area: record.area.clone(),
        tags: record.tags.clone(),
        youtube_url: record.youtube_url.clone(),
        source_url: record.source_url.clone(),
        instructions: record.instructions.clone(),
        ingredients: record.ingredients.clone(),
        is_custom: record.is_custom.unwrap_or(false),
        ingredient_fields: BTreeMap::new(),
    }
}

/// JavaScript truthiness, which is what the stored catalog payloads were
/// written against.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_text(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ReconstructError> {
    match map.get(key) {
        Some(value) if is_truthy(value) => match value {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            _ => Err(ReconstructError::NonTextField(key.to_string())),
        },
        _ => Ok(None),
    }
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
