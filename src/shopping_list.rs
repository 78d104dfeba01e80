//! The "shop this recipe" session: one line per recipe ingredient, each with
//! its matched product (if any), an adjustable quantity and a selection flag.
//! The session ends either by [`ShoppingList::checkout`] or by being dropped.

use serde::Serialize;

use crate::cart::CartSink;
use crate::catalog::{Price, Product, Recipe};
use crate::ingredient_matcher::IngredientMatcher;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedIngredientLine {
    pub ingredient_text: String,
    pub product: Option<Product>,
    pub quantity: u32,
    pub selected: bool,
}

impl MatchedIngredientLine {
    /// Price of this line if it will be bought.
    pub fn subtotal(&self) -> Option<Price> {
        match (&self.product, self.selected) {
            (Some(product), true) => Some(product.price.times(self.quantity)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    recipe_title: String,
    lines: Vec<MatchedIngredientLine>,
}

impl ShoppingList {
    /// Starts with every line selected at quantity 1.
    pub fn for_recipe(recipe: &Recipe, catalog: &[Product]) -> Self {
        let matcher = IngredientMatcher::new(catalog);
        let lines = recipe
            .ingredients
            .iter()
            .map(|ingredient| MatchedIngredientLine {
                ingredient_text: ingredient.clone(),
                product: matcher.find_product(ingredient).cloned(),
                quantity: 1,
                selected: true,
            })
            .collect();
        Self {
            recipe_title: recipe.title.clone(),
            lines,
        }
    }

    pub fn recipe_title(&self) -> &str {
        &self.recipe_title
    }

    pub fn lines(&self) -> &[MatchedIngredientLine] {
        &self.lines
    }

    /// Changes a line's quantity by `delta`. Returns false, leaving the line
    /// untouched, if the index is out of range or the result would drop below 1.
    pub fn adjust_quantity(&mut self, index: usize, delta: i32) -> bool {
        let Some(line) = self.lines.get_mut(index) else {
            return false;
        };
        match line.quantity.checked_add_signed(delta) {
            Some(quantity) if quantity >= 1 => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                line.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        match self.lines.get(index).map(|l| l.selected) {
            Some(selected) => self.set_selected(index, !selected),
            None => false,
        }
    }

    /// Sum of price × quantity over selected lines that have a product.
    pub fn total(&self) -> Price {
        self.lines.iter().filter_map(MatchedIngredientLine::subtotal).sum()
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &MatchedIngredientLine> {
        self.lines.iter().filter(|l| l.product.is_none())
    }

    /// Hands every selected, matched line to the cart and ends the session.
    pub fn checkout<C: CartSink + ?Sized>(self, cart: &mut C) -> Price {
        let total = self.total();
        let mut added = 0usize;
        for line in &self.lines {
            if let (Some(product), true) = (&line.product, line.selected) {
                cart.add_to_cart(product, line.quantity);
                added += 1;
            }
        }
        tracing::info!(recipe = %self.recipe_title, lines = added, total = %total, "Shopping list checked out");
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;

    fn product(id: &str, name: &str, cents: u64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price: Price::from_cents(cents),
            category: "Test".to_string(),
            in_stock: true,
            nutrition: None,
        }
    }

    fn fixture() -> (Recipe, Vec<Product>) {
        let recipe: Recipe = serde_json::from_str(
            r#"{
                "title": "Lemon chicken",
                "servings": 2,
                "ingredients": ["500g chicken breast", "1 Lemon", "Salt and pepper"]
            }"#,
        )
        .unwrap();
        let catalog = vec![
            product("p2", "Woolworths RSPCA Approved Chicken Breast Fillet 500g", 1100),
            product("p4", "Fresh Lemon", 95),
        ];
        (recipe, catalog)
    }

    #[test]
    fn test_new_list_selects_every_line_at_quantity_one() {
        let (recipe, catalog) = fixture();
        let list = ShoppingList::for_recipe(&recipe, &catalog);
        assert_eq!(list.lines().len(), 3);
        assert!(list.lines().iter().all(|l| l.selected && l.quantity == 1));
        assert_eq!(list.unmatched().count(), 1);
        assert_eq!(list.total(), Price::from_cents(1195));
    }

    #[test]
    fn test_quantity_never_drops_below_one() {
        let (recipe, catalog) = fixture();
        let mut list = ShoppingList::for_recipe(&recipe, &catalog);
        assert!(!list.adjust_quantity(0, -1));
        assert!(list.adjust_quantity(0, 2));
        assert!(!list.adjust_quantity(0, -5));
        assert_eq!(list.lines()[0].quantity, 3);
        assert!(!list.adjust_quantity(42, 1));
        assert_eq!(list.total(), Price::from_cents(3300 + 95));
    }

    #[test]
    fn test_deselected_lines_are_not_bought() {
        let (recipe, catalog) = fixture();
        let mut list = ShoppingList::for_recipe(&recipe, &catalog);
        assert!(list.toggle(1));
        assert_eq!(list.total(), Price::from_cents(1100));

        let mut cart = Cart::new();
        let charged = list.checkout(&mut cart);
        assert_eq!(charged, Price::from_cents(1100));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product.id, "p2");
    }

    #[test]
    fn test_checkout_passes_quantities_to_cart() {
        let (recipe, catalog) = fixture();
        let mut list = ShoppingList::for_recipe(&recipe, &catalog);
        list.adjust_quantity(1, 3);
        let mut cart = Cart::new();
        list.checkout(&mut cart);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Price::from_cents(1100 + 4 * 95));
    }
}
