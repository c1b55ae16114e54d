use rand::Rng;
use rand::seq::IndexedRandom;

use crate::catalog::IngredientCatalog;
use crate::models::{DRAFT_INSTRUCTIONS, DRAFT_TITLE, Ingredients, Recipe};

/// Draw one ingredient per catalog category, uniformly at random.
///
/// The returned draft has no id and no owner and is not persisted.
pub fn generate<R: Rng + ?Sized>(catalog: &IngredientCatalog, rng: &mut R) -> Recipe {
    let mut ingredients = Ingredients::new();
    for category in catalog.categories() {
        let Ok(choices) = catalog.choices(category) else {
            continue;
        };
        // Catalog construction rejects empty categories, so a choice always exists.
        if let Some(choice) = choices.choose(rng) {
            ingredients.insert(category.to_string(), choice.clone());
        }
    }

    Recipe {
        id: None,
        user_id: None,
        title: DRAFT_TITLE.to_string(),
        ingredients: ingredients.into(),
        instructions: DRAFT_INSTRUCTIONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CATEGORIES;

    fn catalog() -> IngredientCatalog {
        IngredientCatalog::from_json(
            r#"{
                "vegetables": ["Spinach", "Carrots", "Broccoli", "Peppers"],
                "proteins": ["Chicken", "Tofu", "Beef", "Beans"],
                "carbs": ["Rice", "Pasta", "Quinoa", "Potatoes"],
                "fats": ["Olive oil", "Butter", "Avocado", "Nuts"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_every_choice_comes_from_its_category() {
        let catalog = catalog();
        let mut rng = rand::rng();
        for _ in 0..200 {
            let draft = generate(&catalog, &mut rng);
            let ingredients = draft.ingredients.decoded().unwrap();
            assert_eq!(ingredients.len(), CATEGORIES.len());
            for (category, value) in ingredients {
                assert!(
                    catalog.choices(category).unwrap().contains(value),
                    "{value} is not a {category}"
                );
            }
        }
    }

    #[test]
    fn test_draft_shape() {
        let draft = generate(&catalog(), &mut rand::rng());
        assert_eq!(draft.id, None);
        assert_eq!(draft.user_id, None);
        assert_eq!(draft.title, DRAFT_TITLE);
        assert_eq!(draft.instructions, DRAFT_INSTRUCTIONS);
    }

    #[test]
    fn test_single_choice_is_deterministic() {
        let catalog = IngredientCatalog::from_json(
            r#"{"vegetables": ["Kale"], "proteins": ["Eggs"], "carbs": ["Oats"], "fats": ["Ghee"]}"#,
        )
        .unwrap();
        let draft = generate(&catalog, &mut rand::rng());
        let ingredients = draft.ingredients.decoded().unwrap();
        assert_eq!(ingredients["vegetables"], "Kale");
        assert_eq!(ingredients["fats"], "Ghee");
    }

    #[test]
    fn test_all_choices_eventually_drawn() {
        let catalog = catalog();
        let mut rng = rand::rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let draft = generate(&catalog, &mut rng);
            seen.insert(draft.ingredients.decoded().unwrap()["carbs"].clone());
        }
        assert_eq!(seen.len(), 4);
    }
}
