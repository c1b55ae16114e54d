use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::{RecipeStore, Storage, UserStore};
use crate::codec::decode_ingredients;
use crate::error::{Error, Result};
use crate::models::{Recipe, RecipeIngredients, RecipeKey, Role, SaveRecipe, User};

const RECIPES_FILE: &str = "recipes.json";
const USERS_FILE: &str = "users.json";
const IDS_FILE: &str = "ids.json";

/// Flat-file backend: one JSON array of recipes shared by every owner and a
/// sibling array of users.
///
/// Saving is upsert-by-title, so the title is the effective key. Reads do not
/// filter by owner. Every read-modify-write cycle holds the store lock, which
/// makes concurrent saves of one title collapse into a single recipe.
///
/// Ids are never reused: the last id handed out per document is kept in
/// `ids.json`, so deleting the newest recipe or user does not free its id.
#[derive(Clone)]
pub struct FileStore {
    recipes_path: PathBuf,
    users_path: PathBuf,
    ids_path: PathBuf,
    lock: Arc<Mutex<()>>,
}

/// Highest id issued so far for each document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IssuedIds {
    #[serde(default)]
    recipe: i64,
    #[serde(default)]
    user: i64,
}

#[derive(Clone, Copy)]
enum IdKind {
    Recipe,
    User,
}

fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&text)?)
}

/// Replace `path` atomically: a crash mid-write leaves the previous document.
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl FileStore {
    /// Store both documents inside `dir`, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        tracing::info!(dir = %dir.display(), "using file store");
        Ok(Self {
            recipes_path: dir.join(RECIPES_FILE),
            users_path: dir.join(USERS_FILE),
            ids_path: dir.join(IDS_FILE),
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_recipes(&self) -> Result<Vec<Recipe>> {
        read_document(&self.recipes_path)
    }

    fn load_users(&self) -> Result<Vec<User>> {
        read_document(&self.users_path)
    }

    /// Reserve the next id above both the recorded mark and every id still
    /// present, which also covers documents written before `ids.json` existed.
    fn next_id(&self, kind: IdKind, present: i64) -> Result<i64> {
        let mut issued: IssuedIds = read_document(&self.ids_path)?;
        let slot = match kind {
            IdKind::Recipe => &mut issued.recipe,
            IdKind::User => &mut issued.user,
        };
        let next = (*slot).max(present) + 1;
        *slot = next;
        write_document(&self.ids_path, &issued)?;
        Ok(next)
    }
}

#[async_trait]
impl RecipeStore for FileStore {
    async fn save_recipe(&self, recipe: SaveRecipe) -> Result<Recipe> {
        // Partial documents are accepted; only the title is needed as the key.
        let title = recipe
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::validation("Missing required fields: title"))?;

        let _guard = self.lock();
        let mut recipes = self.load_recipes()?;
        let present = recipes.iter().filter_map(|r| r.id).max().unwrap_or(0);
        let next_id = self.next_id(IdKind::Recipe, present)?;

        let before = recipes.len();
        recipes.retain(|r| r.title != title);
        if recipes.len() != before {
            tracing::debug!(%title, "replacing recipe with the same title");
        }

        let saved = Recipe {
            id: Some(next_id),
            user_id: recipe.user_id,
            title,
            ingredients: recipe.ingredients.unwrap_or_default().into(),
            instructions: recipe.instructions.unwrap_or_default(),
        };
        recipes.push(saved.clone());
        write_document(&self.recipes_path, &recipes)?;
        Ok(saved)
    }

    async fn list_recipes(&self, _user_id: i64) -> Result<Vec<Recipe>> {
        self.list_all_recipes().await
    }

    async fn list_all_recipes(&self) -> Result<Vec<Recipe>> {
        let _guard = self.lock();
        self.load_recipes()
    }

    async fn get_recipe(&self, _user_id: i64, recipe_id: i64) -> Result<Recipe> {
        let mut recipe = {
            let _guard = self.lock();
            self.load_recipes()?
                .into_iter()
                .find(|r| r.id == Some(recipe_id))
                .ok_or_else(|| Error::not_found(format!("recipe {recipe_id}")))?
        };
        // A string here is an encoded mapping written by an older client.
        if let RecipeIngredients::Raw(text) = &recipe.ingredients {
            recipe.ingredients = decode_ingredients(recipe_id, text)?.into();
        }
        Ok(recipe)
    }

    async fn delete_recipe(&self, key: &RecipeKey) -> Result<bool> {
        let _guard = self.lock();
        let mut recipes = self.load_recipes()?;
        let before = recipes.len();
        match key {
            RecipeKey::Id(id) => recipes.retain(|r| r.id != Some(*id)),
            RecipeKey::Title { title, .. } => recipes.retain(|r| &r.title != title),
        }
        if recipes.len() == before {
            return Ok(false);
        }
        write_document(&self.recipes_path, &recipes)?;
        Ok(true)
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn register_user(&self, name: &str, role: Role) -> Result<User> {
        let _guard = self.lock();
        let mut users = self.load_users()?;
        if users.iter().any(|u| u.name == name) {
            return Err(Error::Conflict(format!("User '{name}' already exists")));
        }
        let present = users.iter().map(|u| u.id).max().unwrap_or(0);
        let user = User {
            id: self.next_id(IdKind::User, present)?,
            name: name.to_string(),
            role,
        };
        users.push(user.clone());
        write_document(&self.users_path, &users)?;
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let _guard = self.lock();
        self.load_users()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let _guard = self.lock();
        Ok(self.load_users()?.into_iter().find(|u| u.name == name))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let _guard = self.lock();
        self.load_users()
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let _guard = self.lock();
        let mut users = self.load_users()?;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Ok(false);
        }
        let mut recipes = self.load_recipes()?;
        recipes.retain(|r| r.user_id != Some(id));
        write_document(&self.recipes_path, &recipes)?;
        write_document(&self.users_path, &users)?;
        Ok(true)
    }
}

impl Storage for FileStore {
    fn scoped(&self, _credential: Option<&str>) -> Arc<dyn Storage> {
        Arc::new(self.clone())
    }
}
