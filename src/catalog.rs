//! Read-only product and recipe tables.
//!
//! The storefront supplies both tables once at startup. Nothing here mutates
//! after construction; the matcher, estimator and marker parser all borrow
//! from a [`Catalog`].

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Servings assumed when a recipe does not state a usable count.
pub const DEFAULT_SERVINGS: u32 = 4;

/// A non-negative amount of money held as whole cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price {
    cents: u64,
}

/// Largest price a catalog entry may carry: 1,000,000.00.
pub const MAX_PRICE: Price = Price::from_cents(100_000_000);

#[derive(Debug, Error, PartialEq)]
pub enum PriceError {
    #[error("price must be a finite, non-negative amount, got {0}")]
    Invalid(f64),
    #[error("price {0} is above the {max} limit", max = MAX_PRICE)]
    TooLarge(f64),
}

impl Price {
    pub const ZERO: Price = Price { cents: 0 };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    /// Multiplies by a line quantity, saturating at `u64::MAX` cents.
    pub const fn times(self, quantity: u32) -> Self {
        Self {
            cents: self.cents.saturating_mul(quantity as u64),
        }
    }

    /// Divides into `parts` shares, rounding half up to the nearest cent.
    /// A zero divisor yields zero.
    pub const fn split(self, parts: u32) -> Self {
        if parts == 0 {
            return Price::ZERO;
        }
        // The quotient never exceeds `cents`, so it fits back into u64.
        let parts = parts as u128;
        Self {
            cents: ((self.cents as u128 * 2 + parts) / (parts * 2)) as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl TryFrom<f64> for Price {
    type Error = PriceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < 0.0 {
            return Err(PriceError::Invalid(value));
        }
        if value > MAX_PRICE.as_f64() {
            return Err(PriceError::TooLarge(value));
        }
        Ok(Self {
            cents: (value * 100.0).round() as u64,
        })
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.as_f64()
    }
}

impl std::ops::Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Price {
    fn add_assign(&mut self, rhs: Price) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Self {
        iter.fold(Price::ZERO, |acc, p| acc + p)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Nutrient amounts for a fixed reference quantity (per 100 g or per serving).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NutritionFacts {
    pub kcal: Option<f32>,
    pub water_g: Option<f32>,
    pub protein_g: Option<f32>,
    pub carbohydrate_g: Option<f32>,
    pub fat_g: Option<f32>,
    pub sugars_g: Option<f32>,
    pub fa_saturated_g: Option<f32>,
    pub salt_g: Option<f32>,
}

impl NutritionFacts {
    pub fn is_empty(&self) -> bool {
        *self == NutritionFacts::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeNutrition {
    pub per_serving: NutritionFacts,
    #[serde(rename = "per100g")]
    pub per_100g: NutritionFacts,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Price,
    pub category: String,
    pub in_stock: bool,
    /// Per 100 g.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionFacts>,
}

/// A recipe from the catalog, or one the assistant generated on the fly.
///
/// Generated recipes arrive as `RECIPE_DATA` JSON, so deserialization is
/// lenient: everything but the title may be missing, and numeric fields
/// accept either numbers or numeric strings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub cook_time: String,
    #[serde(default, deserialize_with = "loose_u32")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_serve: Option<String>,
    /// 1 (easy) to 4 (hard).
    #[serde(default, deserialize_with = "loose_difficulty")]
    pub difficulty: Option<u8>,
    #[serde(default, deserialize_with = "loose_string", skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub method: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<RecipeNutrition>,
}

impl Recipe {
    /// Servings to divide costs by; never zero.
    pub fn effective_servings(&self) -> u32 {
        match self.servings {
            Some(n) if n > 0 => n,
            _ => DEFAULT_SERVINGS,
        }
    }

    /// True for recipes produced by the assistant rather than the catalog.
    pub fn is_dynamic(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n.to_string()),
        Some(NumberOrString::Text(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

fn loose_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
            .and_then(|digits| digits.parse().ok()),
        None => None,
    })
}

fn loose_difficulty<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_u32(deserializer)?.map(|d| d.clamp(1, 4) as u8))
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate product id '{0}'")]
    DuplicateProductId(String),
}

/// The storefront's product and recipe tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    recipes: Vec<Recipe>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, recipes: Vec<Recipe>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            if !seen.insert(product.id.as_str()) {
                return Err(CatalogError::DuplicateProductId(product.id.clone()));
            }
        }
        Ok(Self { products, recipes })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Case-insensitive exact title lookup.
    pub fn recipe_by_title(&self, title: &str) -> Option<&Recipe> {
        find_recipe_by_title(&self.recipes, title)
    }
}

pub fn find_recipe_by_title<'a>(recipes: &'a [Recipe], title: &str) -> Option<&'a Recipe> {
    let wanted = title.trim().to_lowercase();
    recipes.iter().find(|r| r.title.to_lowercase() == wanted)
}
