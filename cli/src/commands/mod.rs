mod helpers;
mod recipe;
mod user;

pub(crate) use recipe::{
    cmd_filters, cmd_generate, cmd_recipe_delete, cmd_recipe_list, cmd_recipe_show,
};
pub(crate) use user::{cmd_user_add, cmd_user_delete, cmd_user_list};
