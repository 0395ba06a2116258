//! Menu categories and their dishes.

use std::collections::HashMap;

use sqlx::{PgConnection, PgExecutor};

use super::MenuError;
use crate::models::menu::{Category, Dish};
use crate::validation::menu::{CategoryCreate, CategoryPatch, NewCategory, NewDish};

const CATEGORY_COLUMNS: &str = "category_id, category_name, sort_id, rest_id, created_at, updated_at";
const DISH_COLUMNS: &str = "dish_id, dish_name, price, sort_id, category_id, created_at, updated_at";

/// Fill `dishes` on every category, ordered by `sort_id`.
async fn attach_dishes(conn: &mut PgConnection, categories: &mut [Category]) -> Result<(), MenuError> {
    if categories.is_empty() {
        return Ok(());
    }
    let ids: Vec<i32> = categories.iter().map(|c| c.category_id).collect();
    let dishes = sqlx::query_as::<_, Dish>(&format!(
        "SELECT {DISH_COLUMNS} FROM dishes WHERE category_id = ANY($1) ORDER BY sort_id, dish_id"
    ))
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    let mut grouped: HashMap<i32, Vec<Dish>> = HashMap::new();
    for dish in dishes {
        grouped.entry(dish.category_id).or_default().push(dish);
    }
    for category in categories.iter_mut() {
        category.dishes = Some(grouped.remove(&category.category_id).unwrap_or_default());
    }
    Ok(())
}

/// All categories, optionally only those of one restaurant, with dishes.
pub async fn list(conn: &mut PgConnection, rest_id: Option<i32>) -> Result<Vec<Category>, MenuError> {
    let mut categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE ($1::INT IS NULL OR rest_id = $1) ORDER BY rest_id, sort_id, category_id"
    ))
    .bind(rest_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_dishes(conn, &mut categories).await?;
    Ok(categories)
}

pub async fn find(conn: &mut PgConnection, category_id: i32) -> Result<Option<Category>, MenuError> {
    let category = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = $1"
    ))
    .bind(category_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(category) = category else {
        return Ok(None);
    };
    let mut one = [category];
    attach_dishes(conn, &mut one).await?;
    let [category] = one;
    Ok(Some(category))
}

/// Categories of each listed restaurant with dishes, keyed by `rest_id`.
pub async fn for_restaurants(
    conn: &mut PgConnection,
    rest_ids: &[i32],
) -> Result<HashMap<i32, Vec<Category>>, MenuError> {
    let mut categories = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE rest_id = ANY($1) ORDER BY sort_id, category_id"
    ))
    .bind(rest_ids)
    .fetch_all(&mut *conn)
    .await?;
    attach_dishes(conn, &mut categories).await?;

    let mut grouped: HashMap<i32, Vec<Category>> = HashMap::new();
    for category in categories {
        grouped.entry(category.rest_id).or_default().push(category);
    }
    Ok(grouped)
}

async fn insert_dishes(
    conn: &mut PgConnection,
    category_id: i32,
    dishes: &[NewDish],
) -> Result<Vec<Dish>, MenuError> {
    if dishes.is_empty() {
        return Ok(Vec::new());
    }
    let names: Vec<String> = dishes.iter().map(|d| d.dish_name.clone()).collect();
    let prices: Vec<i32> = dishes.iter().map(|d| d.price).collect();
    let sort_ids: Vec<i32> = dishes.iter().map(|d| d.sort_id).collect();
    let mut inserted = sqlx::query_as::<_, Dish>(&format!(
        "INSERT INTO dishes (dish_name, price, sort_id, category_id) \
         SELECT name, price, sort_id, $4 \
         FROM UNNEST($1::TEXT[], $2::INT[], $3::INT[]) AS t(name, price, sort_id) \
         RETURNING {DISH_COLUMNS}"
    ))
    .bind(&names)
    .bind(&prices)
    .bind(&sort_ids)
    .bind(category_id)
    .fetch_all(conn)
    .await?;
    inserted.sort_by_key(|d| (d.sort_id, d.dish_id));
    Ok(inserted)
}

async fn insert(
    conn: &mut PgConnection,
    rest_id: i32,
    new: &NewCategory,
) -> Result<Category, MenuError> {
    let mut category = sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (category_name, sort_id, rest_id) VALUES ($1, $2, $3) \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(&new.category_name)
    .bind(new.sort_id)
    .bind(rest_id)
    .fetch_one(&mut *conn)
    .await?;
    category.dishes = Some(insert_dishes(conn, category.category_id, &new.dishes).await?);
    Ok(category)
}

async fn restaurant_exists(conn: &mut PgConnection, rest_id: i32) -> Result<bool, MenuError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM restaurants WHERE rest_id = $1)")
            .bind(rest_id)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

/// Create a category and its dishes. Run inside a transaction.
pub async fn create(conn: &mut PgConnection, new: &CategoryCreate) -> Result<Category, MenuError> {
    if !restaurant_exists(&mut *conn, new.rest_id).await? {
        return Err(MenuError::Validation(format!(
            "Restaurant with id {} does not exist",
            new.rest_id
        )));
    }
    insert(conn, new.rest_id, &new.category).await
}

/// Drop every category of a restaurant and insert `categories` in their place.
pub async fn replace_for_restaurant(
    conn: &mut PgConnection,
    rest_id: i32,
    categories: &[NewCategory],
) -> Result<Vec<Category>, MenuError> {
    sqlx::query("DELETE FROM categories WHERE rest_id = $1")
        .bind(rest_id)
        .execute(&mut *conn)
        .await?;
    let mut created = Vec::with_capacity(categories.len());
    for category in categories {
        created.push(insert(&mut *conn, rest_id, category).await?);
    }
    created.sort_by_key(|c| (c.sort_id, c.category_id));
    Ok(created)
}

/// Apply a partial update. A `dishes` list replaces the existing dishes.
pub async fn update(
    conn: &mut PgConnection,
    category_id: i32,
    patch: &CategoryPatch,
) -> Result<Category, MenuError> {
    let mut category = sqlx::query_as::<_, Category>(&format!(
        "UPDATE categories SET \
             category_name = COALESCE($2, category_name), \
             sort_id = COALESCE($3, sort_id), \
             updated_at = now() \
         WHERE category_id = $1 RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(category_id)
    .bind(patch.category_name.as_deref())
    .bind(patch.sort_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| MenuError::NotFound(format!("Category with id {category_id} not found")))?;

    match &patch.dishes {
        Some(dishes) => {
            sqlx::query("DELETE FROM dishes WHERE category_id = $1")
                .bind(category_id)
                .execute(&mut *conn)
                .await?;
            category.dishes = Some(insert_dishes(conn, category_id, dishes).await?);
        }
        None => {
            let mut one = [category];
            attach_dishes(conn, &mut one).await?;
            [category] = one;
        }
    }
    Ok(category)
}

/// Delete a category and its dishes. Returns the number of categories removed.
pub async fn delete(executor: impl PgExecutor<'_>, category_id: i32) -> Result<u64, MenuError> {
    let result = sqlx::query("DELETE FROM categories WHERE category_id = $1")
        .bind(category_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
