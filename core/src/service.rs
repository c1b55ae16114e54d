use std::sync::Arc;

use crate::catalog::IngredientCatalog;
use crate::error::{Error, Result};
use crate::generator;
use crate::models::{FilterOptions, Recipe, RecipeKey, Role, SaveRecipe, User};
use crate::store::Storage;

/// Business logic on top of a [`Storage`] backend.
///
/// Cheap to build: the HTTP layer creates one per request from a storage
/// handle scoped to the caller.
pub struct RecipeService {
    catalog: Arc<IngredientCatalog>,
    storage: Arc<dyn Storage>,
}

impl RecipeService {
    pub fn new(catalog: Arc<IngredientCatalog>, storage: Arc<dyn Storage>) -> Self {
        Self { catalog, storage }
    }

    // --- Generation ---

    pub fn generate(&self) -> Recipe {
        generator::generate(&self.catalog, &mut rand::rng())
    }

    pub async fn generate_for_user(&self, user_id: i64) -> Result<Recipe> {
        self.storage.get_user(user_id).await?;
        let mut draft = self.generate();
        draft.user_id = Some(user_id);
        Ok(draft)
    }

    // --- Recipes ---

    pub async fn save(&self, recipe: SaveRecipe) -> Result<Recipe> {
        if let Some(ingredients) = &recipe.ingredients {
            if let Some(unknown) = ingredients.keys().find(|c| !self.catalog.contains(c)) {
                return Err(Error::Validation(format!(
                    "Unknown ingredient category '{unknown}'"
                )));
            }
        }
        let saved = self.storage.save_recipe(recipe).await?;
        tracing::info!(recipe_id = ?saved.id, title = %saved.title, "saved recipe");
        Ok(saved)
    }

    pub async fn recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        self.storage.list_recipes(user_id).await
    }

    pub async fn all_recipes(&self) -> Result<Vec<Recipe>> {
        self.storage.list_all_recipes().await
    }

    pub async fn recipe(&self, user_id: i64, recipe_id: i64) -> Result<Recipe> {
        self.storage.get_recipe(user_id, recipe_id).await
    }

    /// Fails with `NotFound` when nothing matched.
    pub async fn delete(&self, key: RecipeKey) -> Result<()> {
        if self.storage.delete_recipe(&key).await? {
            tracing::info!(%key, "deleted recipe");
            Ok(())
        } else {
            Err(Error::NotFound(key.to_string()))
        }
    }

    pub async fn filter_options(&self, user_id: i64) -> Result<FilterOptions> {
        self.storage.filter_options(user_id).await
    }

    // --- Users ---

    pub async fn register(&self, name: &str) -> Result<User> {
        self.add_user(name, Role::User).await
    }

    /// Insert a user with an explicit role. Used by the CLI to seed admins.
    pub async fn add_user(&self, name: &str, role: Role) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        let user = self.storage.register_user(name, role).await?;
        tracing::info!(user_id = user.id, %role, "registered user");
        Ok(user)
    }

    /// Register `new_coach` with the coach role on behalf of `caller`.
    ///
    /// `caller` is whatever name the client sent; nothing verifies that the
    /// request really comes from that user.
    pub async fn promote_to_coach(&self, caller: &str, new_coach: &str) -> Result<User> {
        let caller_user = self
            .storage
            .find_user_by_name(caller)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user '{caller}'")))?;
        if caller_user.role != Role::Admin {
            return Err(Error::Forbidden(format!(
                "User '{caller}' is not allowed to add coaches"
            )));
        }
        self.add_user(new_coach, Role::Coach).await
    }

    pub async fn user(&self, id: i64) -> Result<User> {
        self.storage.get_user(id).await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.storage.list_users().await
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        if self.storage.delete_user(id).await? {
            tracing::info!(user_id = id, "deleted user");
            Ok(())
        } else {
            Err(Error::NotFound(format!("user {id}")))
        }
    }
}
