//! Encoding of the `ingredients` mapping for table-backed stores, which keep
//! it as a JSON string column.

use crate::error::{Error, Result};
use crate::models::{Ingredients, RecipeIngredients};

pub fn encode_ingredients(ingredients: &Ingredients) -> Result<String> {
    Ok(serde_json::to_string(ingredients)?)
}

/// Strict decode, used when a single recipe is requested.
pub fn decode_ingredients(recipe_id: i64, stored: &str) -> Result<Ingredients> {
    serde_json::from_str(stored).map_err(|source| Error::CorruptIngredients { recipe_id, source })
}

/// Fail-soft decode for listings: a corrupt value is logged and handed back
/// undecoded instead of failing the whole listing.
#[must_use]
pub fn decode_ingredients_lenient(recipe_id: i64, stored: String) -> RecipeIngredients {
    match decode_ingredients(recipe_id, &stored) {
        Ok(map) => RecipeIngredients::Decoded(map),
        Err(e) => {
            tracing::warn!(recipe_id, error = %e, "returning undecoded ingredients");
            RecipeIngredients::Raw(stored)
        }
    }
}
