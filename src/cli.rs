use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::prompts::AssistantVariant;
use crate::survey::{DAYS_OPTIONS, PEOPLE_OPTIONS};

#[derive(Parser, Debug)]
#[command(author, version, about = "Grocery shopping assistant with recipe cards", long_about = None)]
pub struct Cli {
    /// Product table (CSV). Defaults to the built-in storefront catalog.
    #[arg(long, global = true)]
    pub products: Option<PathBuf>,

    /// Recipe table (JSON array). Defaults to the built-in recipes.
    #[arg(long, global = true)]
    pub recipes: Option<PathBuf>,

    /// System instruction to start the conversation with
    #[arg(long, value_enum, default_value_t = AssistantVariant::RecipeCards, global = true)]
    pub variant: AssistantVariant,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Chat with the assistant (default)
    Chat,
    /// Answer the planning questions, send them, then keep chatting
    Plan {
        /// Household size
        #[arg(long, value_parser = PossibleValuesParser::new(PEOPLE_OPTIONS.iter().copied()))]
        people: Option<String>,
        /// How long to plan for
        #[arg(long, value_parser = PossibleValuesParser::new(DAYS_OPTIONS.iter().copied()))]
        days: Option<String>,
        #[arg(long, default_value = "")]
        dietary: String,
    },
    /// List catalog recipes with estimated costs
    Recipes,
    /// Build a shopping list for a catalog recipe and add it to a cart
    Shop {
        /// Recipe title (case-insensitive)
        title: String,
        /// 1-based ingredient line to leave out; repeatable
        #[arg(long = "skip")]
        skip: Vec<usize>,
        /// Quantity override as LINE=QTY (1-based line); repeatable
        #[arg(long = "qty", value_parser = parse_quantity_override)]
        quantities: Vec<(usize, u32)>,
    },
}

fn parse_quantity_override(s: &str) -> Result<(usize, u32), String> {
    let (line, qty) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LINE=QTY, got '{}'", s))?;
    let line: usize = line.trim().parse().map_err(|e| format!("invalid line '{}': {}", line, e))?;
    let qty: u32 = qty.trim().parse().map_err(|e| format!("invalid quantity '{}': {}", qty, e))?;
    if line == 0 || qty == 0 {
        return Err("line and quantity start at 1".to_string());
    }
    Ok((line, qty))
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
