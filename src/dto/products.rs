use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub price: i64,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: i32,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_reorder_level() -> i32 {
    5
}

/// Partial update: only supplied fields are applied.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub reorder_level: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
