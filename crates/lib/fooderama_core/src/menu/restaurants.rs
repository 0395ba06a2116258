//! Restaurants and their associations.

use std::collections::{BTreeSet, HashMap};

use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use tracing::debug;

use super::{MenuError, categories, cuisines};
use crate::models::menu::Restaurant;
use crate::validation::menu::{NewRestaurant, RestaurantFilter, RestaurantPatch};

const REST_COLUMNS: &str = "rest_id, rest_name, rest_image, description, open, rating, \
                            opening_time, closing_time, created_at, updated_at";

/// Sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    RestId,
    RestName,
    Open,
}

impl OrderBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "restId" => Some(OrderBy::RestId),
            "restName" => Some(OrderBy::RestName),
            "open" => Some(OrderBy::Open),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            OrderBy::RestId => "rest_id",
            OrderBy::RestName => "rest_name",
            OrderBy::Open => "open",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Associations to load alongside restaurants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Includes {
    pub cuisines: bool,
    /// Categories with their dishes.
    pub menu: bool,
}

impl Includes {
    /// `cuisines=true` and `menu=true`; any other value is ignored.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let flag = |key: &str| params.get(key).is_some_and(|v| v == "true");
        Self {
            cuisines: flag("cuisines"),
            menu: flag("menu"),
        }
    }
}

/// Options for [`list`], built from query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub includes: Includes,
    pub order: Option<(OrderBy, SortDirection)>,
    pub open: Option<bool>,
}

impl ListOptions {
    /// Unknown `orderby`, `sort` or `open` values are ignored. `sort` only
    /// applies together with a valid `orderby`.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let order = params
            .get("orderby")
            .and_then(|v| OrderBy::parse(v))
            .map(|column| {
                let direction = params
                    .get("sort")
                    .and_then(|v| SortDirection::parse(v))
                    .unwrap_or_default();
                (column, direction)
            });
        let open = match params.get("open").map(String::as_str) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };
        Self {
            includes: Includes::from_query(params),
            order,
            open,
        }
    }
}

async fn load_includes(
    conn: &mut PgConnection,
    restaurants: &mut [Restaurant],
    includes: Includes,
) -> Result<(), MenuError> {
    if restaurants.is_empty() {
        return Ok(());
    }
    let ids: Vec<i32> = restaurants.iter().map(|r| r.rest_id).collect();
    if includes.cuisines {
        let mut by_rest = cuisines::for_restaurants(&mut *conn, &ids).await?;
        for restaurant in restaurants.iter_mut() {
            restaurant.cuisines = Some(by_rest.remove(&restaurant.rest_id).unwrap_or_default());
        }
    }
    if includes.menu {
        let mut by_rest = categories::for_restaurants(&mut *conn, &ids).await?;
        for restaurant in restaurants.iter_mut() {
            restaurant.categories = Some(by_rest.remove(&restaurant.rest_id).unwrap_or_default());
        }
    }
    Ok(())
}

pub async fn list(conn: &mut PgConnection, options: ListOptions) -> Result<Vec<Restaurant>, MenuError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {REST_COLUMNS} FROM restaurants"));
    if let Some(open) = options.open {
        qb.push(" WHERE open = ").push_bind(open);
    }
    match options.order {
        Some((column, direction)) => {
            qb.push(format!(" ORDER BY {} {}, rest_id", column.column(), direction.keyword()));
        }
        None => {
            qb.push(" ORDER BY rest_id");
        }
    }
    let mut restaurants = qb.build_query_as::<Restaurant>().fetch_all(&mut *conn).await?;
    load_includes(conn, &mut restaurants, options.includes).await?;
    Ok(restaurants)
}

pub async fn find(
    conn: &mut PgConnection,
    rest_id: i32,
    includes: Includes,
) -> Result<Option<Restaurant>, MenuError> {
    let restaurant = sqlx::query_as::<_, Restaurant>(&format!(
        "SELECT {REST_COLUMNS} FROM restaurants WHERE rest_id = $1"
    ))
    .bind(rest_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(restaurant) = restaurant else {
        return Ok(None);
    };
    let mut one = [restaurant];
    load_includes(conn, &mut one, includes).await?;
    let [restaurant] = one;
    Ok(Some(restaurant))
}

/// Fail if any of `names` is already used by a restaurant other than `except`.
async fn ensure_names_free(
    conn: &mut PgConnection,
    names: &[String],
    except: Option<i32>,
) -> Result<(), MenuError> {
    let unique: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    if unique.len() != names.len() {
        return Err(MenuError::Validation("Restaurant names must be unique".into()));
    }
    let taken = sqlx::query_scalar::<_, String>(
        "SELECT rest_name FROM restaurants \
         WHERE rest_name = ANY($1) AND ($2::INT IS NULL OR rest_id <> $2) LIMIT 1",
    )
    .bind(names)
    .bind(except)
    .fetch_optional(conn)
    .await?;
    match taken {
        Some(name) => Err(MenuError::Validation(format!(
            "Restaurant name '{name}' is already taken"
        ))),
        None => Ok(()),
    }
}

async fn insert(
    conn: &mut PgConnection,
    new: &NewRestaurant,
    default_image: &str,
) -> Result<Restaurant, MenuError> {
    let attrs = &new.attributes;
    let restaurant = sqlx::query_as::<_, Restaurant>(&format!(
        "INSERT INTO restaurants \
             (rest_name, rest_image, description, open, rating, opening_time, closing_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {REST_COLUMNS}"
    ))
    .bind(&new.rest_name)
    .bind(attrs.rest_image.as_deref().unwrap_or(default_image))
    .bind(attrs.description.as_deref())
    .bind(attrs.open.unwrap_or(true))
    .bind(attrs.rating)
    .bind(attrs.opening_time)
    .bind(attrs.closing_time)
    .fetch_one(conn)
    .await?;
    Ok(restaurant)
}

/// Create one restaurant, linking it to `cuisine_ids` when given.
///
/// Every id must exist or nothing is linked. Run inside a transaction so the
/// restaurant row is discarded with the links.
pub async fn create(
    conn: &mut PgConnection,
    new: &NewRestaurant,
    cuisine_ids: Option<&[i32]>,
    default_image: &str,
) -> Result<Restaurant, MenuError> {
    ensure_names_free(&mut *conn, std::slice::from_ref(&new.rest_name), None).await?;
    let mut restaurant = insert(&mut *conn, new, default_image).await?;
    debug!(rest_id = restaurant.rest_id, "restaurant created");

    if let Some(ids) = cuisine_ids {
        cuisines::reconcile_restaurant_cuisines(&mut *conn, restaurant.rest_id, ids).await?;
        let mut one = [restaurant];
        load_includes(conn, &mut one, Includes { cuisines: true, menu: false }).await?;
        [restaurant] = one;
    }
    Ok(restaurant)
}

/// Insert several restaurants without associations.
pub async fn create_many(
    conn: &mut PgConnection,
    restaurants: &[NewRestaurant],
    default_image: &str,
) -> Result<Vec<Restaurant>, MenuError> {
    let names: Vec<String> = restaurants.iter().map(|r| r.rest_name.clone()).collect();
    ensure_names_free(&mut *conn, &names, None).await?;
    let mut created = Vec::with_capacity(restaurants.len());
    for new in restaurants {
        created.push(insert(&mut *conn, new, default_image).await?);
    }
    debug!(count = created.len(), "restaurants created");
    Ok(created)
}

/// Apply a partial update.
///
/// A `cuisine_ids` list replaces the cuisine set and a `categories` list
/// replaces the whole menu. Run inside a transaction.
pub async fn update(
    conn: &mut PgConnection,
    rest_id: i32,
    patch: &RestaurantPatch,
) -> Result<Restaurant, MenuError> {
    let exists = sqlx::query_scalar::<_, i32>(
        "SELECT rest_id FROM restaurants WHERE rest_id = $1 FOR UPDATE",
    )
    .bind(rest_id)
    .fetch_optional(&mut *conn)
    .await?;
    if exists.is_none() {
        return Err(MenuError::NotFound(format!(
            "Restaurant with id {rest_id} not found"
        )));
    }
    if let Some(name) = &patch.rest_name {
        ensure_names_free(&mut *conn, std::slice::from_ref(name), Some(rest_id)).await?;
    }

    let attrs = &patch.attributes;
    let mut restaurant = sqlx::query_as::<_, Restaurant>(&format!(
        "UPDATE restaurants SET \
             rest_name = COALESCE($2, rest_name), \
             rest_image = COALESCE($3, rest_image), \
             description = COALESCE($4, description), \
             open = COALESCE($5, open), \
             rating = COALESCE($6, rating), \
             opening_time = COALESCE($7, opening_time), \
             closing_time = COALESCE($8, closing_time), \
             updated_at = now() \
         WHERE rest_id = $1 RETURNING {REST_COLUMNS}"
    ))
    .bind(rest_id)
    .bind(patch.rest_name.as_deref())
    .bind(attrs.rest_image.as_deref())
    .bind(attrs.description.as_deref())
    .bind(attrs.open)
    .bind(attrs.rating)
    .bind(attrs.opening_time)
    .bind(attrs.closing_time)
    .fetch_one(&mut *conn)
    .await?;

    if let Some(ids) = &patch.cuisine_ids {
        cuisines::reconcile_restaurant_cuisines(&mut *conn, rest_id, ids).await?;
    }
    if let Some(new_categories) = &patch.categories {
        restaurant.categories =
            Some(categories::replace_for_restaurant(&mut *conn, rest_id, new_categories).await?);
    }
    if patch.cuisine_ids.is_some() || patch.categories.is_some() {
        let mut by_rest = cuisines::for_restaurants(&mut *conn, &[rest_id]).await?;
        restaurant.cuisines = Some(by_rest.remove(&rest_id).unwrap_or_default());
    }
    Ok(restaurant)
}

/// Delete one restaurant. Returns the number of rows removed.
pub async fn delete_by_id(executor: impl PgExecutor<'_>, rest_id: i32) -> Result<u64, MenuError> {
    let result = sqlx::query("DELETE FROM restaurants WHERE rest_id = $1")
        .bind(rest_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Delete every restaurant matching all set fields of `filter`.
pub async fn delete_where(
    executor: impl PgExecutor<'_>,
    filter: &RestaurantFilter,
) -> Result<u64, MenuError> {
    if filter.rest_id.is_none() && filter.rest_name.is_none() && filter.open.is_none() {
        return Err(MenuError::Validation("Delete filter is empty".into()));
    }
    let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM restaurants WHERE ");
    let mut conditions = qb.separated(" AND ");
    if let Some(rest_id) = filter.rest_id {
        conditions.push("rest_id = ").push_bind_unseparated(rest_id);
    }
    if let Some(name) = &filter.rest_name {
        conditions.push("rest_name = ").push_bind_unseparated(name.clone());
    }
    if let Some(open) = filter.open {
        conditions.push("open = ").push_bind_unseparated(open);
    }
    let result = qb.build().execute(executor).await?;
    Ok(result.rows_affected())
}
