use serde_json::Value;

/// Number of ingredient/measure slots in a catalog payload.
pub const INGREDIENT_SLOTS: usize = 20;

pub const INGREDIENT_PREFIX: &str = "strIngredient";
pub const MEASURE_PREFIX: &str = "strMeasure";

/// Builds the display string stored alongside an imported recipe.
///
/// Scans `strIngredient1..=20` / `strMeasure1..=20`, skipping slots whose
/// ingredient is missing or blank, and joins `"measure ingredient"` pairs
/// with `", "`.
pub fn derive_ingredients(payload: &Value) -> String {
    let mut parts = Vec::new();

    for slot in 1..=INGREDIENT_SLOTS {
        let ingredient = match text_field(payload, &format!("{}{}", INGREDIENT_PREFIX, slot)) {
            Some(name) => name,
            None => continue,
        };
        let measure =
            text_field(payload, &format!("{}{}", MEASURE_PREFIX, slot)).unwrap_or_default();

        if measure.is_empty() {
            parts.push(ingredient);
        } else {
            parts.push(format!("{} {}", measure, ingredient));
        }
    }

    parts.join(", ")
}

/// Reads a payload key as trimmed, non-empty text. Numbers are rendered as
/// text; every other shape counts as absent.
pub fn text_field(payload: &Value, key: &str) -> Option<String> {
    let text = match payload.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
