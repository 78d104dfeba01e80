use grocery_assistant::cart::Cart;
use grocery_assistant::catalog::Price;
use grocery_assistant::catalog_loader::builtin_catalog;
use grocery_assistant::cost_estimator::estimate_recipe_cost;
use grocery_assistant::response_parser::{parse_message, MarkerSegment};
use grocery_assistant::shopping_list::ShoppingList;
use std::borrow::Cow;

const REPLY: &str = "Two ideas for tonight:\n\
[RECIPE_CARD: high-protein chicken & smashed pea pasta]\n\
Or something new:\n\
[RECIPE_DATA: {\"title\": \"Lemon Chicken Traybake\", \"servings\": 2, \"ingredients\": [\"2 Chicken Breast Fillets\", \"1 Lemon\", \"Olive oil\"]}]\n\
Enjoy!";

#[test]
fn test_reply_to_cart() {
    let catalog = builtin_catalog().unwrap();
    let segments = parse_message(REPLY, catalog.recipes());

    assert_eq!(segments.len(), 5);
    assert_eq!(segments[0].as_text(), Some("Two ideas for tonight:\n"));
    assert!(matches!(segments[1], MarkerSegment::RecipeReference(Cow::Borrowed(_))));
    assert!(matches!(segments[3], MarkerSegment::RecipeReference(Cow::Owned(_))));
    assert_eq!(segments[4].as_text(), Some("\nEnjoy!"));

    let pasta = segments[1].as_recipe().unwrap();
    assert_eq!(pasta.title, "High-protein chicken & smashed pea pasta");

    // Olive oil and seasoning are not sold in the built-in store.
    let cost = estimate_recipe_cost(pasta, catalog.products());
    assert_eq!(cost.total, Price::from_cents(2665));
    assert_eq!(cost.per_serve, Price::from_cents(666));
    assert_eq!((cost.matched, cost.unmatched), (6, 2));
    assert!(cost.is_partial());

    let mut list = ShoppingList::for_recipe(pasta, catalog.products());
    assert_eq!(list.unmatched().count(), 2);
    assert!(list.adjust_quantity(1, 1));
    assert!(list.set_selected(3, false));

    let mut cart = Cart::new();
    let paid = list.checkout(&mut cart);
    assert_eq!(paid, Price::from_cents(2665 + 1100 - 95));
    assert_eq!(cart.total(), paid);
    assert_eq!(cart.lines().len(), 5);
    assert_eq!(cart.item_count(), 6);

    let traybake = segments[3].as_recipe().unwrap();
    assert!(traybake.is_dynamic());
    assert_eq!(traybake.effective_servings(), 2);

    // Chicken merges into the existing cart line; lemon is new.
    ShoppingList::for_recipe(traybake, catalog.products()).checkout(&mut cart);
    assert_eq!(cart.lines().len(), 6);
    let chicken = cart.lines().iter().find(|l| l.product.id == "p2").unwrap();
    assert_eq!(chicken.quantity, 3);
}

#[test]
fn test_builtin_tacos_cost_is_partial() {
    let catalog = builtin_catalog().unwrap();
    let tacos = catalog.recipe_by_title("EASY 15-MINUTE TACOS").unwrap();

    let cost = estimate_recipe_cost(tacos, catalog.products());

    // Only the cheese line has a product here.
    assert_eq!(cost.total, Price::from_cents(650));
    assert_eq!(cost.per_serve, Price::from_cents(163));
    assert_eq!((cost.matched, cost.unmatched), (1, 5));
}
