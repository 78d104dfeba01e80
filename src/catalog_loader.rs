use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

use crate::catalog::{Catalog, NutritionFacts, Price, Product, Recipe};

const BUILTIN_PRODUCTS_CSV: &str = include_str!("../data/products.csv");
const BUILTIN_RECIPES_JSON: &str = include_str!("../data/recipes.json");

// Required columns
const ID_COL: &str = "id";
const NAME_COL: &str = "name";
const PRICE_COL: &str = "price";
const CATEGORY_COL: &str = "category";
const IN_STOCK_COL: &str = "in_stock";

// Optional per-100g nutrition columns
const KCAL_COL: &str = "kcal/100g";
const WATER_COL: &str = "Water (g/100g)";
const PROTEIN_COL: &str = "Protein (g/100g)";
const CARB_COL: &str = "Carbohydrate (g/100g)";
const FAT_COL: &str = "Fat (g/100g)";
const SUGARS_COL: &str = "Sugars (g/100g)";
const SAT_FAT_COL: &str = "FA saturated (g/100g)";
const SALT_COL: &str = "Salt (g/100g)";

fn parse_optional_f32(s: &str) -> Option<f32> {
    s.trim().parse::<f32>().ok()
}

fn parse_in_stock(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" | "" => Some(false),
        _ => None,
    }
}

/// The storefront catalog shipped with the binary.
pub fn builtin_catalog() -> Result<Catalog> {
    let products = load_products_from_reader(BUILTIN_PRODUCTS_CSV.as_bytes())
        .context("Built-in product table is invalid")?;
    let recipes = load_recipes_from_str(BUILTIN_RECIPES_JSON)
        .context("Built-in recipe table is invalid")?;
    Ok(Catalog::new(products, recipes)?)
}

/// Loads a catalog, falling back to the built-in table for any path not given.
pub fn load_catalog(products_path: Option<&Path>, recipes_path: Option<&Path>) -> Result<Catalog> {
    let products = match products_path {
        Some(path) => load_products(path)?,
        None => load_products_from_reader(BUILTIN_PRODUCTS_CSV.as_bytes())?,
    };
    let recipes = match recipes_path {
        Some(path) => load_recipes(path)?,
        None => load_recipes_from_str(BUILTIN_RECIPES_JSON)?,
    };
    let catalog = Catalog::new(products, recipes)?;
    tracing::info!(
        products = catalog.products().len(),
        recipes = catalog.recipes().len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

pub fn load_products(csv_path: &Path) -> Result<Vec<Product>> {
    if !csv_path.exists() {
        return Err(anyhow!("Product CSV file not found at: {:?}", csv_path));
    }
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open product CSV file at {:?}", csv_path))?;
    load_products_from_reader(file)
        .with_context(|| format!("Failed to load products from {:?}", csv_path))
}

pub fn load_products_from_reader<R: Read>(reader: R) -> Result<Vec<Product>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let required = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    };
    let optional = |name: &str| headers.iter().position(|h| h == name);

    let id_idx = required(ID_COL)?;
    let name_idx = required(NAME_COL)?;
    let price_idx = required(PRICE_COL)?;
    let category_idx = required(CATEGORY_COL)?;
    let in_stock_idx = required(IN_STOCK_COL)?;

    let kcal_idx = optional(KCAL_COL);
    let water_idx = optional(WATER_COL);
    let protein_idx = optional(PROTEIN_COL);
    let carb_idx = optional(CARB_COL);
    let fat_idx = optional(FAT_COL);
    let sugars_idx = optional(SUGARS_COL);
    let sat_fat_idx = optional(SAT_FAT_COL);
    let salt_idx = optional(SALT_COL);

    let mut products = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let nutrient = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_optional_f32);

        let id = field(id_idx).to_string();
        let name = field(name_idx).to_string();
        if id.is_empty() || name.is_empty() {
            tracing::debug!(row_index, "Skipping product row without id or name");
            continue;
        }

        let raw_price = field(price_idx);
        let price = raw_price
            .trim_start_matches('$')
            .parse::<f64>()
            .map_err(|e| anyhow!("Invalid price '{}' at row {}: {}", raw_price, row_index, e))
            .and_then(|p| Price::try_from(p).map_err(|e| anyhow!("Row {}: {}", row_index, e)))?;

        let in_stock = parse_in_stock(field(in_stock_idx))
            .ok_or_else(|| anyhow!("Invalid in_stock value '{}' at row {}", field(in_stock_idx), row_index))?;

        let nutrition = NutritionFacts {
            kcal: nutrient(kcal_idx),
            water_g: nutrient(water_idx),
            protein_g: nutrient(protein_idx),
            carbohydrate_g: nutrient(carb_idx),
            fat_g: nutrient(fat_idx),
            sugars_g: nutrient(sugars_idx),
            fa_saturated_g: nutrient(sat_fat_idx),
            salt_g: nutrient(salt_idx),
        };

        products.push(Product {
            id,
            name,
            price,
            category: field(category_idx).to_string(),
            in_stock,
            nutrition: (!nutrition.is_empty()).then_some(nutrition),
        });
    }

    Ok(products)
}

pub fn load_recipes(json_path: &Path) -> Result<Vec<Recipe>> {
    let content = std::fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read recipe file {:?}", json_path))?;
    load_recipes_from_str(&content).with_context(|| format!("Failed to load recipes from {:?}", json_path))
}

pub fn load_recipes_from_str(content: &str) -> Result<Vec<Recipe>> {
    let recipes: Vec<Recipe> = serde_json::from_str(content).context("Recipe table is not a valid JSON array of recipes")?;
    if let Some(untitled) = recipes.iter().position(|r| r.title.trim().is_empty()) {
        return Err(anyhow!("Recipe at index {} has an empty title", untitled));
    }
    Ok(recipes)
}
