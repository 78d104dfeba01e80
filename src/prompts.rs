use clap::ValueEnum;

use crate::catalog::Catalog;

/// Which system instruction a conversation starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AssistantVariant {
    /// Plain shopping assistant, no markers.
    General,
    /// Emits recipe markers the response parser can turn into cards.
    #[default]
    RecipeCards,
}

const GENERAL_INSTRUCTION: &str = "You are a friendly grocery shopping assistant for an online supermarket. \
Help customers plan meals, suggest recipes and answer questions about products. Keep answers short and practical.";

const RECIPE_CARDS_INSTRUCTION: &str = "You are a friendly grocery shopping assistant for an online supermarket. \
Help customers plan meals and suggest recipes. Keep answers short and practical.

When you recommend a recipe from the store's recipe collection, show it with a marker on its own line:
[RECIPE_CARD: <exact recipe title>]

When you invent a recipe that is not in the collection, include it as a single-line JSON object:
[RECIPE_DATA: {\"title\": \"...\", \"prepTime\": \"10m\", \"cookTime\": \"20m\", \"servings\": 4, \"difficulty\": 2, \"ingredients\": [\"...\"], \"method\": [\"...\"]}]

Never put markers inside code blocks. Write ingredient lines the way a shopper would search for them.";

pub fn system_instruction(variant: AssistantVariant, catalog: &Catalog) -> String {
    match variant {
        AssistantVariant::General => GENERAL_INSTRUCTION.to_string(),
        AssistantVariant::RecipeCards => {
            let mut instruction = RECIPE_CARDS_INSTRUCTION.to_string();
            if !catalog.recipes().is_empty() {
                instruction.push_str("\n\nRecipe collection:\n");
                for recipe in catalog.recipes() {
                    instruction.push_str(&format!("- {}\n", recipe.title));
                }
            }
            let in_stock: Vec<_> = catalog.products().iter().filter(|p| p.in_stock).collect();
            if !in_stock.is_empty() {
                instruction.push_str("\nProducts in stock:\n");
                for product in in_stock {
                    instruction.push_str(&format!("- {} (${})\n", product.name, product.price));
                }
            }
            instruction
        }
    }
}
