use anyhow::Result;

use pantry_core::Error;
use pantry_core::models::RecipeKey;
use pantry_core::service::RecipeService;

use super::helpers::{exit_not_found, print_recipe, print_recipe_table};

pub(crate) async fn cmd_generate(
    service: &RecipeService,
    user_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let draft = match user_id {
        Some(id) => match service.generate_for_user(id).await {
            Ok(draft) => draft,
            Err(err @ Error::NotFound(_)) => exit_not_found(&err.to_string(), json),
            Err(err) => return Err(err.into()),
        },
        None => service.generate(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
    } else {
        print_recipe(&draft);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_list(
    service: &RecipeService,
    user_id: Option<i64>,
    json: bool,
) -> Result<()> {
    let recipes = match user_id {
        Some(id) => service.recipes(id).await?,
        None => service.all_recipes().await?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else if recipes.is_empty() {
        println!("No recipes saved.");
    } else {
        print_recipe_table(&recipes);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_show(
    service: &RecipeService,
    user_id: i64,
    recipe_id: i64,
    json: bool,
) -> Result<()> {
    let recipe = match service.recipe(user_id, recipe_id).await {
        Ok(recipe) => recipe,
        Err(err @ Error::NotFound(_)) => exit_not_found(&err.to_string(), json),
        Err(err) => return Err(err.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        print_recipe(&recipe);
    }
    Ok(())
}

pub(crate) async fn cmd_recipe_delete(
    service: &RecipeService,
    key: RecipeKey,
    json: bool,
) -> Result<()> {
    let label = key.to_string();
    match service.delete(key).await {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": label }));
            } else {
                println!("Deleted {label}");
            }
            Ok(())
        }
        Err(err @ Error::NotFound(_)) => exit_not_found(&err.to_string(), json),
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn cmd_filters(service: &RecipeService, user_id: i64, json: bool) -> Result<()> {
    let options = service.filter_options(user_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
    } else {
        for (category, values) in &options {
            let values = if values.is_empty() {
                "-".to_string()
            } else {
                values.join(", ")
            };
            println!("{category}: {values}");
        }
    }
    Ok(())
}
