use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use super::{RecipeStore, Storage, UserStore};
use crate::codec::{decode_ingredients, decode_ingredients_lenient, encode_ingredients};
use crate::error::{Error, Result};
use crate::models::{Recipe, RecipeKey, Role, SaveRecipe, User};

/// Embedded relational backend. Recipes are rows scoped by `user_id` and
/// keep their ingredients as a JSON text column.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Columns: id, user_id, title, ingredients, instructions.
struct RecipeRow {
    id: i64,
    user_id: i64,
    title: String,
    ingredients: String,
    instructions: String,
}

impl RecipeRow {
    const COLUMNS: &'static str = "id, user_id, title, ingredients, instructions";

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            ingredients: row.get(3)?,
            instructions: row.get(4)?,
        })
    }

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

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error, extended_code: i32) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation && e.extended_code == extended_code
    )
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> Result<()> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    role TEXT NOT NULL DEFAULT 'user'
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    ingredients TEXT NOT NULL,
                    instructions TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_recipes(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Recipe>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RecipeRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(RecipeRow::into_recipe_lenient).collect())
    }
}

#[async_trait]
impl RecipeStore for SqliteStore {
    async fn save_recipe(&self, recipe: SaveRecipe) -> Result<Recipe> {
        let new = recipe.validate()?;
        let encoded = encode_ingredients(&new.ingredients)?;

        let id = {
            let conn = self.lock();
            conn.execute(
                "INSERT INTO recipes (user_id, title, ingredients, instructions)
                 VALUES (?1, ?2, ?3, ?4)",
                params![new.user_id, new.title, encoded, new.instructions],
            )
            .map_err(|e| {
                if is_constraint_violation(&e, rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                    Error::not_found(format!("user {}", new.user_id))
                } else {
                    e.into()
                }
            })?;
            conn.last_insert_rowid()
        };
        tracing::debug!(recipe_id = id, user_id = new.user_id, "inserted recipe");

        Ok(Recipe {
            id: Some(id),
            user_id: Some(new.user_id),
            title: new.title,
            ingredients: new.ingredients.into(),
            instructions: new.instructions,
        })
    }

    async fn list_recipes(&self, user_id: i64) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!(
                "SELECT {} FROM recipes WHERE user_id = ?1 ORDER BY id",
                RecipeRow::COLUMNS
            ),
            &[&user_id],
        )
    }

    async fn list_all_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_recipes(
            &format!("SELECT {} FROM recipes ORDER BY id", RecipeRow::COLUMNS),
            &[],
        )
    }

    async fn get_recipe(&self, user_id: i64, recipe_id: i64) -> Result<Recipe> {
        let row = {
            let conn = self.lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM recipes WHERE id = ?1 AND user_id = ?2",
                    RecipeRow::COLUMNS
                ),
                params![recipe_id, user_id],
                RecipeRow::from_row,
            )
            .optional()?
        };
        row.ok_or_else(|| Error::not_found(format!("recipe {recipe_id}")))?
            .into_recipe()
    }

    async fn delete_recipe(&self, key: &RecipeKey) -> Result<bool> {
        let conn = self.lock();
        let rows = match key {
            RecipeKey::Id(id) => conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])?,
            RecipeKey::Title { user_id, title } => {
                let owner = RecipeKey::title_owner(*user_id)?;
                conn.execute(
                    "DELETE FROM recipes WHERE title = ?1 AND user_id = ?2",
                    params![title, owner],
                )?
            }
        };
        Ok(rows > 0)
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn register_user(&self, name: &str, role: Role) -> Result<User> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (name, role) VALUES (?1, ?2)",
            params![name, role],
        )
        .map_err(|e| {
            if is_constraint_violation(&e, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
                Error::Conflict(format!("User '{name}' already exists"))
            } else {
                e.into()
            }
        })?;
        let id = conn.last_insert_rowid();
        tracing::debug!(user_id = id, %role, "registered user");
        Ok(User {
            id,
            name: name.to_string(),
            role,
        })
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.lock();
        conn.query_row(
            "SELECT id, name, role FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.lock();
        Ok(conn
            .query_row(
                "SELECT id, name, role FROM users WHERE name = ?1",
                params![name],
                user_from_row,
            )
            .optional()?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, name, role FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

impl Storage for SqliteStore {
    fn scoped(&self, _credential: Option<&str>) -> Arc<dyn Storage> {
        Arc::new(self.clone())
    }
}
