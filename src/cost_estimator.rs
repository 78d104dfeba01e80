use serde::Serialize;

use crate::catalog::{Price, Product, Recipe};
use crate::ingredient_matcher::IngredientMatcher;

/// Estimated cost of buying one unit of every matched ingredient.
///
/// Unmatched ingredients contribute nothing, so `total` is a lower bound
/// whenever `unmatched > 0`; display it with [`RecipeCost::is_partial`] in mind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecipeCost {
    pub total: Price,
    pub per_serve: Price,
    pub matched: usize,
    pub unmatched: usize,
}

impl RecipeCost {
    pub fn is_partial(&self) -> bool {
        self.unmatched > 0
    }
}

pub fn estimate_recipe_cost(recipe: &Recipe, catalog: &[Product]) -> RecipeCost {
    let matcher = IngredientMatcher::new(catalog);
    let mut total = Price::ZERO;
    let mut matched = 0;

    for ingredient in &recipe.ingredients {
        if let Some(product) = matcher.find_product(ingredient) {
            total += product.price;
            matched += 1;
        }
    }

    RecipeCost {
        total,
        per_serve: total.split(recipe.effective_servings()),
        matched,
        unmatched: recipe.ingredients.len() - matched,
    }
}
