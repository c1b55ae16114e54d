use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pantry_core::models::{Recipe, RecipeIngredients, User};

/// Report a missing entity and exit with status 2, the same way for plain and
/// JSON output.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_user_table(users: &[User]) {
    #[derive(Tabled)]
    struct UserRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Role")]
        role: String,
    }

    let rows: Vec<UserRow> = users
        .iter()
        .map(|u| UserRow {
            id: u.id,
            name: truncate(&u.name, 30),
            role: u.role.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "User")]
        user: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id.map_or("-".into(), |id| id.to_string()),
            user: r.user_id.map_or("-".into(), |id| id.to_string()),
            title: truncate(&r.title, 30),
            ingredients: truncate(&ingredient_summary(&r.ingredients), 50),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// One line per category, `category: choice`.
pub(crate) fn print_recipe(recipe: &Recipe) {
    println!("{}", recipe.title);
    if let Some(id) = recipe.id {
        println!("  id: {id}");
    }
    if let Some(user_id) = recipe.user_id {
        println!("  user: {user_id}");
    }
    match &recipe.ingredients {
        RecipeIngredients::Decoded(map) => {
            for (category, choice) in map {
                println!("  {category}: {choice}");
            }
        }
        RecipeIngredients::Raw(raw) => println!("  ingredients (undecoded): {raw}"),
    }
    if !recipe.instructions.is_empty() {
        println!();
        println!("{}", recipe.instructions);
    }
}

fn ingredient_summary(ingredients: &RecipeIngredients) -> String {
    match ingredients {
        RecipeIngredients::Decoded(map) => map.values().cloned().collect::<Vec<_>>().join(", "),
        RecipeIngredients::Raw(_) => "(unreadable)".to_string(),
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
