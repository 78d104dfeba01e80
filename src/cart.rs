use serde::Serialize;

use crate::catalog::{Price, Product};

/// Receives products chosen through the "shop this recipe" flow.
pub trait CartSink {
    fn add_to_cart(&mut self, product: &Product, quantity: u32);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// In-memory cart. Adding a product already in the cart increases its quantity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

impl CartSink for Cart {
    fn add_to_cart(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine {
                product: product.clone(),
                quantity,
            }),
        }
        tracing::debug!(product_id = %product.id, quantity, "Added to cart");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, cents: u64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price: Price::from_cents(cents),
            category: "Test".to_string(),
            in_stock: true,
            nutrition: None,
        }
    }

    #[test]
    fn test_adding_same_product_merges_quantity() {
        let mut cart = Cart::new();
        let lemon = product("p4", 95);
        cart.add_to_cart(&lemon, 1);
        cart.add_to_cart(&product("p3", 220), 2);
        cart.add_to_cart(&lemon, 2);

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Price::from_cents(95 * 3 + 220 * 2));
    }

    #[test]
    fn test_zero_quantity_is_ignored() {
        let mut cart = Cart::new();
        cart.add_to_cart(&product("p1", 300), 0);
        assert!(cart.is_empty());
    }
}
