//! Restaurant, cuisine, category and dish models.
//!
//! Association fields (`Cuisines`, `Categories`, `Dishes`) are only serialised
//! when they were loaded.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cuisine {
    pub cuisine_id: i32,
    pub cuisine_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub dish_id: i32,
    pub dish_name: String,
    pub price: i32,
    pub sort_id: i32,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: i32,
    pub category_name: String,
    pub sort_id: i32,
    pub rest_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(rename = "Dishes", skip_serializing_if = "Option::is_none")]
    pub dishes: Option<Vec<Dish>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub rest_id: i32,
    pub rest_name: String,
    pub rest_image: String,
    pub description: Option<String>,
    pub open: bool,
    pub rating: Option<f32>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(rename = "Cuisines", skip_serializing_if = "Option::is_none")]
    pub cuisines: Option<Vec<Cuisine>>,
    #[sqlx(skip)]
    #[serde(rename = "Categories", skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}
