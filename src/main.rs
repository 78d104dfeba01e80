use anyhow::{anyhow, Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use grocery_assistant::api_connection::Provider;
use grocery_assistant::cart::Cart;
use grocery_assistant::catalog::{Catalog, Recipe};
use grocery_assistant::catalog_loader::load_catalog;
use grocery_assistant::chat_model::ChatModel;
use grocery_assistant::cli::{parse_args, Command};
use grocery_assistant::config::AssistantConfig;
use grocery_assistant::conversation::{Conversation, SendOutcome, APOLOGY_MESSAGE};
use grocery_assistant::cost_estimator::estimate_recipe_cost;
use grocery_assistant::prompts::{system_instruction, AssistantVariant};
use grocery_assistant::response_parser::parse_message;
use grocery_assistant::shopping_list::ShoppingList;
use grocery_assistant::survey::SurveyAnswers;

const DEFAULT_LOG_FILTER: &str = "grocery_assistant=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Replies stream to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli_args = parse_args();
    let catalog = load_catalog(cli_args.products.as_deref(), cli_args.recipes.as_deref())
        .context("Failed to load the storefront catalog")?;

    match cli_args.command.clone().unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&catalog, cli_args.variant, None).await?,
        Command::Plan { people, days, dietary } => {
            let answers = SurveyAnswers { people, days, dietary };
            run_chat(&catalog, cli_args.variant, Some(answers.opening_message())).await?
        }
        Command::Recipes => {
            for (idx, recipe) in catalog.recipes().iter().enumerate() {
                print_recipe_summary(idx + 1, recipe, &catalog);
            }
        }
        Command::Shop { title, skip, quantities } => {
            let recipe = catalog
                .recipe_by_title(&title)
                .ok_or_else(|| anyhow!("No recipe titled '{}' in the catalog", title))?;
            let mut cart = Cart::new();
            shop_recipe(recipe, &catalog, &skip, &quantities, &mut cart);
            print_cart(&cart);
        }
    }

    Ok(())
}

async fn run_chat(catalog: &Catalog, variant: AssistantVariant, opening: Option<String>) -> Result<()> {
    let config = AssistantConfig::from_env();
    tracing::info!(model = %config.model, ?variant, "Starting chat");
    let provider = Provider::openrouter(&config).context("Failed to create the model client")?;
    let conversation = Conversation::new(provider, system_instruction(variant, catalog));

    let mut cart = Cart::new();
    let mut shown: Vec<Recipe> = Vec::new();

    println!("What we cooking?? (/shop N, /cart, /new, /quit)");
    if let Some(opening) = opening {
        println!("> {}", opening);
        exchange(&conversation, &opening, catalog, &mut shown).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/cart" => print_cart(&cart),
            "/new" => {
                conversation.reset();
                shown.clear();
                println!("Started a new chat.");
            }
            command if command.starts_with("/shop") => {
                let choice = command.trim_start_matches("/shop").trim().parse::<usize>().ok();
                match choice.and_then(|n| n.checked_sub(1)).and_then(|i| shown.get(i)) {
                    Some(recipe) => shop_recipe(recipe, catalog, &[], &[], &mut cart),
                    None => println!("Pick one of the {} recipe(s) shown above, e.g. /shop 1", shown.len()),
                }
            }
            text => exchange(&conversation, text, catalog, &mut shown).await,
        }
    }

    Ok(())
}

/// Sends one turn, streaming the reply, then lists any recipes it contained.
async fn exchange<M: ChatModel>(conversation: &Conversation<M>, text: &str, catalog: &Catalog, shown: &mut Vec<Recipe>) {
    let result = conversation
        .send(text, |delta| {
            print!("{}", delta);
            std::io::stdout().flush().ok();
        })
        .await;
    println!();

    match result {
        Ok(SendOutcome::Completed { reply }) => {
            let recipes: Vec<Recipe> = parse_message(&reply, catalog.recipes())
                .iter()
                .filter_map(|segment| segment.as_recipe().cloned())
                .collect();
            if recipes.is_empty() {
                return;
            }
            println!();
            for (idx, recipe) in recipes.iter().enumerate() {
                print_recipe_summary(idx + 1, recipe, catalog);
            }
            println!("Type /shop N to shop one of these recipes.");
            *shown = recipes;
        }
        Ok(SendOutcome::Ignored(reason)) => tracing::debug!(?reason, "Nothing sent"),
        Err(_) => println!("{}", APOLOGY_MESSAGE),
    }
}

fn print_recipe_summary(position: usize, recipe: &Recipe, catalog: &Catalog) {
    let cost = estimate_recipe_cost(recipe, catalog.products());
    let source = if recipe.is_dynamic() { "new" } else { "catalog" };
    println!(
        "[{}] {} ({}) - serves {}, difficulty {}/4, prep {} cook {}",
        position,
        recipe.title,
        source,
        recipe.effective_servings(),
        recipe.difficulty.map_or_else(|| "?".to_string(), |d| d.to_string()),
        if recipe.prep_time.is_empty() { "?" } else { recipe.prep_time.as_str() },
        if recipe.cook_time.is_empty() { "?" } else { recipe.cook_time.as_str() },
    );
    print!("    est. ${} total, ${} per serve", cost.total, cost.per_serve);
    if cost.is_partial() {
        print!(" (at least; {} ingredient(s) not sold here)", cost.unmatched);
    }
    println!();
}

fn shop_recipe(recipe: &Recipe, catalog: &Catalog, skip: &[usize], quantities: &[(usize, u32)], cart: &mut Cart) {
    let mut list = ShoppingList::for_recipe(recipe, catalog.products());

    for &line in skip {
        if !line.checked_sub(1).is_some_and(|idx| list.set_selected(idx, false)) {
            tracing::warn!(line, "No such ingredient line to skip");
        }
    }
    for &(line, qty) in quantities {
        let delta = i32::try_from(qty).unwrap_or(i32::MAX) - 1;
        if !line.checked_sub(1).is_some_and(|idx| list.adjust_quantity(idx, delta)) {
            tracing::warn!(line, qty, "Could not set quantity");
        }
    }

    println!("Shop recipe: {} ({} ingredients)", list.recipe_title(), list.lines().len());
    for (idx, line) in list.lines().iter().enumerate() {
        let mark = if line.selected { "x" } else { " " };
        match &line.product {
            Some(product) => println!(
                "  [{}] {}. {} -> {} x{} @ ${}",
                mark,
                idx + 1,
                line.ingredient_text,
                product.name,
                line.quantity,
                product.price
            ),
            None => println!("  [ ] {}. {} -> product not found", idx + 1, line.ingredient_text),
        }
    }

    let total = list.checkout(cart);
    println!("Added items to cart! Total: ${}", total);
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    println!("Cart ({} items):", cart.item_count());
    for line in cart.lines() {
        println!("  {} x{} = ${}", line.product.name, line.quantity, line.subtotal());
    }
    println!("  Total: ${}", cart.total());
}
