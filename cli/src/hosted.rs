//! Storage backed by a hosted relational database exposed through a
//! PostgREST-style API (`/rest/v1/<table>?column=eq.value`).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use pantry_core::codec::{decode_ingredients, decode_ingredients_lenient, encode_ingredients};
use pantry_core::models::{Recipe, RecipeKey, Role, SaveRecipe, User};
use pantry_core::store::{RecipeStore, Storage, UserStore};
use pantry_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Every call carries the service `apikey` header plus an `Authorization`
/// bearer: the caller's own credential when the handle was scoped to one,
/// otherwise the service key.
#[derive(Clone)]
pub struct HostedStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    credential: Option<String>,
}

#[derive(Deserialize)]
struct RecipeRow {
    id: i64,
    user_id: i64,
    title: String,
    ingredients: String,
    instructions: String,
}

impl RecipeRow {
    fn into_recipe(self) -> Result<Recipe> {
        let ingredients = decode_ingredients(self.id, &self.ingredients)?;
        Ok(Recipe {
            id: Some(self.id),
            user_id: Some(self.user_id),
            title: self.title,
            ingredients: ingredients.into(),
            instructions: self.instructions,
        })
    }

    fn into_recipe_lenient(self) -> Recipe {
        Recipe {
            id: Some(self.id),
            user_id: Some(self.user_id),
            title: self.title,
            ingredients: decode_ingredients_lenient(self.id, self.ingredients),
            instructions: self.instructions,
        }
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl HostedStore {
    pub fn new(config: &HostedConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("pantry/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            credential: None,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let token = self.credential.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(builder: RequestBuilder) -> Result<(StatusCode, String)> {
        let resp = builder
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Upstream(format!("failed to read response: {e}")))?;
        Ok((status, body))
    }

    fn parse_rows<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Vec<T>> {
        if !status.is_success() {
            tracing::warn!(%status, body, "hosted store rejected request");
            return Err(Error::Upstream(format!("hosted store returned {status}")));
        }
        serde_json::from_str(body)
            .map_err(|e| Error::Upstream(format!("unparseable response body: {e}")))
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<Vec<T>> {
        let (status, body) = Self::send(builder).await?;
        Self::parse_rows(status, &body)
    }

    async fn fetch_recipe_rows(&self, filters: &[(&str, String)]) -> Result<Vec<RecipeRow>> {
        Self::fetch(
            self.request(Method::GET, "recipes")
                .query(&[("select", "*"), ("order", "id.asc")])
                .query(filters),
        )
        .await
    }
}

#[async_trait]
impl RecipeStore for HostedStore {
    async fn save_recipe(&self, recipe: SaveRecipe) -> Result<Recipe> {
        let new = recipe.validate()?;
        let body = serde_json::json!({
            "user_id": new.user_id,
            "title": new.title,
            "ingredients": encode_ingredients(&new.ingredients)?,
            "instructions": new.instructions,
        });
        let (status, text) = Self::send(
            self.request(Method::POST, "recipes")
                .header("Prefer", "return=representation")
                .json(&body),
        )
        .await?;
        // A foreign-key violation on user_id comes back as 409.
        if status == StatusCode::CONFLICT {
            return Err(Error::NotFound(format!("user {}", new.user_id)));
        }
        let row = Self::parse_rows::<RecipeRow>(status, &text)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream("insert returned no row".to_string()))?;
        row.into_recipe()
    }

    async fn list_recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        let rows = self.fetch_recipe_rows(&[("user_id", eq(user_id))]).await?;
        Ok(rows.into_iter().map(RecipeRow::into_recipe_lenient).collect())
    }

    async fn list_all_recipes(&self) -> Result<Vec<Recipe>> {
        let rows = self.fetch_recipe_rows(&[]).await?;
        Ok(rows.into_iter().map(RecipeRow::into_recipe_lenient).collect())
    }

    async fn get_recipe(&self, user_id: i64, recipe_id: i64) -> Result<Recipe> {
        self.fetch_recipe_rows(&[("id", eq(recipe_id)), ("user_id", eq(user_id))])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("recipe {recipe_id}")))?
            .into_recipe()
    }

    async fn delete_recipe(&self, key: &RecipeKey) -> Result<bool> {
        let filters = match key {
            RecipeKey::Id(id) => vec![("id", eq(id))],
            RecipeKey::Title { user_id, title } => vec![
                ("title", eq(title)),
                ("user_id", eq(RecipeKey::title_owner(*user_id)?)),
            ],
        };
        let deleted: Vec<serde_json::Value> = Self::fetch(
            self.request(Method::DELETE, "recipes")
                .header("Prefer", "return=representation")
                .query(&filters),
        )
        .await?;
        Ok(!deleted.is_empty())
    }
}

#[async_trait]
impl UserStore for HostedStore {
    async fn register_user(&self, name: &str, role: Role) -> Result<User> {
        if self.find_user_by_name(name).await?.is_some() {
            return Err(Error::Conflict(format!("User '{name}' already exists")));
        }
        let (status, text) = Self::send(
            self.request(Method::POST, "users")
                .header("Prefer", "return=representation")
                .json(&serde_json::json!({ "name": name, "role": role })),
        )
        .await?;
        if status == StatusCode::CONFLICT {
            return Err(Error::Conflict(format!("User '{name}' already exists")));
        }
        Self::parse_rows::<User>(status, &text)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Upstream("insert returned no row".to_string()))
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let users: Vec<User> = Self::fetch(
            self.request(Method::GET, "users")
                .query(&[("select", "*".to_string()), ("id", eq(id))]),
        )
        .await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let users: Vec<User> = Self::fetch(
            self.request(Method::GET, "users")
                .query(&[("select", "*".to_string()), ("name", eq(name))]),
        )
        .await?;
        Ok(users.into_iter().next())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Self::fetch(
            self.request(Method::GET, "users")
                .query(&[("select", "*"), ("order", "id.asc")]),
        )
        .await
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let deleted: Vec<serde_json::Value> = Self::fetch(
            self.request(Method::DELETE, "users")
                .header("Prefer", "return=representation")
                .query(&[("id", eq(id))]),
        )
        .await?;
        Ok(!deleted.is_empty())
    }
}

impl Storage for HostedStore {
    fn scoped(&self, credential: Option<&str>) -> Arc<dyn Storage> {
        let mut scoped = self.clone();
        scoped.credential = credential.map(str::to_string);
        Arc::new(scoped)
    }
}
