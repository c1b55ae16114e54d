use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The ingredient categories every catalog must provide and every
/// filter-options response reports.
pub const CATEGORIES: [&str; 4] = ["vegetables", "proteins", "carbs", "fats"];

pub const DRAFT_TITLE: &str = "Neues Rezept";
pub const DRAFT_INSTRUCTIONS: &str = "Zubereitung...";

/// Category name → chosen ingredient.
pub type Ingredients = BTreeMap<String, String>;

/// Category name → sorted distinct ingredient values.
pub type FilterOptions = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Coach,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Coach => "coach",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "coach" => Ok(Self::Coach),
            "admin" => Ok(Self::Admin),
            other => Err(Error::validation(format!(
                "Invalid role '{other}'. Must be one of: user, coach, admin"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

/// The `ingredients` field of a recipe as handed back to callers.
///
/// Listings keep a row whose stored text cannot be decoded and return it as
/// [`RecipeIngredients::Raw`]; every other path only ever produces
/// [`RecipeIngredients::Decoded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeIngredients {
    Decoded(Ingredients),
    Raw(String),
}

impl RecipeIngredients {
    #[must_use]
    pub fn decoded(&self) -> Option<&Ingredients> {
        match self {
            Self::Decoded(map) => Some(map),
            Self::Raw(_) => None,
        }
    }
}

impl Default for RecipeIngredients {
    fn default() -> Self {
        Self::Decoded(Ingredients::new())
    }
}

impl From<Ingredients> for RecipeIngredients {
    fn from(map: Ingredients) -> Self {
        Self::Decoded(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub ingredients: RecipeIngredients,
    #[serde(default)]
    pub instructions: String,
}

/// A save request as it arrives from a client. Every field is optional here;
/// each store decides what it requires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRecipe {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub ingredients: Option<Ingredients>,
    pub instructions: Option<String>,
}

/// A fully specified recipe ready for insertion into a table-backed store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub user_id: i64,
    pub title: String,
    pub ingredients: Ingredients,
    pub instructions: String,
}

impl SaveRecipe {
    /// Require every field, reporting all missing ones at once.
    pub fn validate(self) -> Result<NewRecipe> {
        let title = self.title.filter(|t| !t.trim().is_empty());

        let mut missing = Vec::new();
        if self.user_id.is_none() {
            missing.push("user_id");
        }
        if title.is_none() {
            missing.push("title");
        }
        if self.ingredients.is_none() {
            missing.push("ingredients");
        }
        if self.instructions.is_none() {
            missing.push("instructions");
        }

        match (self.user_id, title, self.ingredients, self.instructions) {
            (Some(user_id), Some(title), Some(ingredients), Some(instructions)) => Ok(NewRecipe {
                user_id,
                title,
                ingredients,
                instructions,
            }),
            _ => Err(Error::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// How a delete request identifies its recipe.
///
/// Titles repeat across owners, so the table-backed stores need
/// `user_id` alongside a title. The file store is single-tenant and ignores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeKey {
    Id(i64),
    Title {
        user_id: Option<i64>,
        title: String,
    },
}

impl RecipeKey {
    /// The owner of a title key, or a validation error naming what is missing.
    pub fn title_owner(user_id: Option<i64>) -> Result<i64> {
        user_id.ok_or_else(|| Error::validation("user_id is required to delete a recipe by title"))
    }
}

impl fmt::Display for RecipeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "recipe {id}"),
            Self::Title { title, .. } => write!(f, "recipe '{title}'"),
        }
    }
}

/// Accumulate the distinct values used per fixed category across `recipes`.
///
/// Every fixed category is present in the result, empty when unused.
/// Recipes whose ingredients could not be decoded contribute nothing.
#[must_use]
pub fn collect_filter_options<'a>(recipes: impl IntoIterator<Item = &'a Recipe>) -> FilterOptions {
    let mut sets: BTreeMap<&str, BTreeSet<&str>> =
        CATEGORIES.iter().map(|c| (*c, BTreeSet::new())).collect();

    for recipe in recipes {
        let Some(ingredients) = recipe.ingredients.decoded() else {
            continue;
        };
        for category in CATEGORIES {
            if let Some(value) = ingredients.get(category) {
                if let Some(set) = sets.get_mut(category) {
                    set.insert(value.as_str());
                }
            }
        }
    }

    sets.into_iter()
        .map(|(category, values)| {
            (
                category.to_string(),
                values.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}
