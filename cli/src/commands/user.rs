use anyhow::Result;

use pantry_core::Error;
use pantry_core::models::Role;
use pantry_core::service::RecipeService;

use super::helpers::{exit_not_found, print_user_table};

pub(crate) async fn cmd_user_add(
    service: &RecipeService,
    name: &str,
    role: Role,
    json: bool,
) -> Result<()> {
    let user = service.add_user(name, role).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        let id = user.id;
        println!("Added {role} {} (id: {id})", user.name);
    }
    Ok(())
}

pub(crate) async fn cmd_user_list(service: &RecipeService, json: bool) -> Result<()> {
    let users = service.users().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        println!("No users yet. Add one with: pantry user add <name>");
    } else {
        print_user_table(&users);
    }
    Ok(())
}

pub(crate) async fn cmd_user_delete(service: &RecipeService, id: i64, json: bool) -> Result<()> {
    match service.delete_user(id).await {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("Deleted user {id} and their recipes");
            }
            Ok(())
        }
        Err(err @ Error::NotFound(_)) => exit_not_found(&err.to_string(), json),
        Err(err) => Err(err.into()),
    }
}
