//! Storage contracts shared by every backend.
//!
//! The file-backed and SQLite backends live here; the hosted REST backend is
//! implemented by the CLI crate against the same traits.

mod file;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FilterOptions, Recipe, RecipeKey, Role, SaveRecipe, User, collect_filter_options};

pub use file::FileStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Persist `recipe` and return it with its store-assigned id.
    async fn save_recipe(&self, recipe: SaveRecipe) -> Result<Recipe>;

    /// Recipes owned by `user_id`. Rows with undecodable ingredients are
    /// returned with the raw stored text.
    async fn list_recipes(&self, user_id: i64) -> Result<Vec<Recipe>>;

    async fn list_all_recipes(&self) -> Result<Vec<Recipe>>;

    async fn get_recipe(&self, user_id: i64, recipe_id: i64) -> Result<Recipe>;

    /// Returns `false` when nothing matched `key`.
    async fn delete_recipe(&self, key: &RecipeKey) -> Result<bool>;

    /// Distinct ingredient values per category across the user's recipes.
    async fn filter_options(&self, user_id: i64) -> Result<FilterOptions> {
        let recipes = self.list_recipes(user_id).await?;
        Ok(collect_filter_options(&recipes))
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when `name` is taken.
    async fn register_user(&self, name: &str, role: Role) -> Result<User>;

    async fn get_user(&self, id: i64) -> Result<User>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Removes the user together with every recipe they own.
    async fn delete_user(&self, id: i64) -> Result<bool>;
}

/// A complete backend: recipes and users behind one handle.
pub trait Storage: RecipeStore + UserStore {
    /// A handle acting on behalf of the caller identified by `credential`.
    ///
    /// Local backends have no notion of a caller and return themselves.
    fn scoped(&self, credential: Option<&str>) -> Arc<dyn Storage>;
}
