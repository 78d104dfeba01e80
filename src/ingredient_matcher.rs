//! Maps free-text ingredient lines ("500g Chicken Breast Fillet, diced") to
//! catalog products.
//!
//! Matching is a fixed, ordered rule table. A generic substring fallback is
//! used only when no rule fires. It is a heuristic, not a scorer, and it has known blind spots
//! that are accepted as-is:
//!
//! - no stemming ("tomatoes" works only because it contains "tomato")
//! - no synonyms beyond the keywords listed in [`KEYWORD_RULES`]
//! - keywords match anywhere in the text, so "boiling water" fires the `oil` rule
//!
//! An unmatched ingredient is `None`, which callers show as "product not found".

use crate::catalog::Product;

/// One keyword rule. The rule fires when any keyword occurs in the lowercased
/// ingredient text. Each lookup pass then scans the catalog in order for the
/// first product whose name contains any of that pass's needles; later passes
/// run only when earlier ones find nothing.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub lookup_passes: &'static [&'static [&'static str]],
}

const fn rule(keywords: &'static [&'static str], lookup_passes: &'static [&'static [&'static str]]) -> KeywordRule {
    KeywordRule {
        keywords,
        lookup_passes,
    }
}

/// Evaluated top to bottom; order decides ties.
pub const KEYWORD_RULES: &[KeywordRule] = &[
    rule(&["chicken"], &[&["Chicken"]]),
    rule(&["pasta"], &[&["Pasta"]]),
    rule(&["peas"], &[&["Peas"]]),
    rule(&["lemon"], &[&["Lemon"]]),
    rule(&["cheese", "parmesan"], &[&["Parmesan", "Cheese"]]),
    rule(&["mint"], &[&["Mint"]]),
    rule(&["mince", "beef"], &[&["Mince"]]),
    rule(&["taco", "shell", "seasoning"], &[&["Taco"]]),
    rule(&["lettuce"], &[&["Lettuce"]]),
    rule(&["tofu"], &[&["Tofu"]]),
    rule(&["cornflour"], &[&["Cornflour"]]),
    rule(&["maple"], &[&["Maple"]]),
    rule(&["onion"], &[&["Onion"]]),
    rule(&["tomato"], &[&["Tomato"], &["Veg"]]),
    rule(&["oil"], &[&["Oil"]]),
    rule(&["ginger"], &[&["Ginger"]]),
    rule(&["soy"], &[&["Soy"]]),
    rule(&["honey"], &[&["Honey"]]),
    rule(&["veg"], &[&["Veg"]]),
];

impl KeywordRule {
    fn fires(&self, ingredient_lower: &str) -> bool {
        self.keywords.iter().any(|k| ingredient_lower.contains(k))
    }

    fn lookup<'a>(&self, catalog: &'a [Product]) -> Option<&'a Product> {
        self.lookup_passes.iter().find_map(|needles| {
            catalog
                .iter()
                .find(|p| needles.iter().any(|n| p.name.contains(n)))
        })
    }
}

/// Ingredient matcher over a borrowed product table.
#[derive(Debug, Clone, Copy)]
pub struct IngredientMatcher<'a> {
    catalog: &'a [Product],
    rules: &'static [KeywordRule],
}

impl<'a> IngredientMatcher<'a> {
    pub fn new(catalog: &'a [Product]) -> Self {
        Self::with_rules(catalog, KEYWORD_RULES)
    }

    pub fn with_rules(catalog: &'a [Product], rules: &'static [KeywordRule]) -> Self {
        Self { catalog, rules }
    }

    pub fn find_product(&self, ingredient: &str) -> Option<&'a Product> {
        let ingredient_lower = ingredient.to_lowercase();
        if ingredient_lower.trim().is_empty() {
            return None;
        }

        let mut fired = self.rules.iter().filter(|r| r.fires(&ingredient_lower)).peekable();
        if fired.peek().is_some() {
            return fired.find_map(|r| r.lookup(self.catalog));
        }

        self.catalog.iter().find(|p| {
            let name = p.name.to_lowercase();
            !name.is_empty() && ingredient_lower.contains(&name)
        })
    }
}

/// Convenience wrapper over [`IngredientMatcher::find_product`].
pub fn find_product_for_ingredient<'a>(ingredient: &str, catalog: &'a [Product]) -> Option<&'a Product> {
    IngredientMatcher::new(catalog).find_product(ingredient)
}
