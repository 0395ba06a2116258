//! Cuisines and restaurant-cuisine associations.

use std::collections::{BTreeSet, HashMap};

use sqlx::{PgConnection, PgExecutor};
use tracing::debug;

use super::MenuError;
use crate::models::menu::Cuisine;
use crate::validation::menu::NewCuisine;

const CUISINE_COLUMNS: &str = "cuisine_id, cuisine_name, created_at, updated_at";

pub async fn list(executor: impl PgExecutor<'_>) -> Result<Vec<Cuisine>, MenuError> {
    let rows = sqlx::query_as::<_, Cuisine>(&format!(
        "SELECT {CUISINE_COLUMNS} FROM cuisines ORDER BY cuisine_id"
    ))
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn find(
    executor: impl PgExecutor<'_>,
    cuisine_id: i32,
) -> Result<Option<Cuisine>, MenuError> {
    let row = sqlx::query_as::<_, Cuisine>(&format!(
        "SELECT {CUISINE_COLUMNS} FROM cuisines WHERE cuisine_id = $1"
    ))
    .bind(cuisine_id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

async fn name_taken(
    conn: &mut PgConnection,
    name: &str,
    except: Option<i32>,
) -> Result<bool, MenuError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM cuisines \
         WHERE cuisine_name = $1 AND ($2::INT IS NULL OR cuisine_id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

/// Insert a cuisine. Names are unique.
pub async fn create(conn: &mut PgConnection, new: &NewCuisine) -> Result<Cuisine, MenuError> {
    if name_taken(&mut *conn, &new.cuisine_name, None).await? {
        return Err(MenuError::Validation("Cuisine name must be unique".into()));
    }
    let row = sqlx::query_as::<_, Cuisine>(&format!(
        "INSERT INTO cuisines (cuisine_name) VALUES ($1) RETURNING {CUISINE_COLUMNS}"
    ))
    .bind(&new.cuisine_name)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Rename a cuisine.
pub async fn update(
    conn: &mut PgConnection,
    cuisine_id: i32,
    changes: &NewCuisine,
) -> Result<Cuisine, MenuError> {
    if name_taken(&mut *conn, &changes.cuisine_name, Some(cuisine_id)).await? {
        return Err(MenuError::Validation("Cuisine name must be unique".into()));
    }
    sqlx::query_as::<_, Cuisine>(&format!(
        "UPDATE cuisines SET cuisine_name = $2, updated_at = now() \
         WHERE cuisine_id = $1 RETURNING {CUISINE_COLUMNS}"
    ))
    .bind(cuisine_id)
    .bind(&changes.cuisine_name)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| MenuError::NotFound(format!("Cuisine with {cuisine_id} was not found")))
}

/// Delete a cuisine and its associations. Returns the number of rows removed.
pub async fn delete(executor: impl PgExecutor<'_>, cuisine_id: i32) -> Result<u64, MenuError> {
    let result = sqlx::query("DELETE FROM cuisines WHERE cuisine_id = $1")
        .bind(cuisine_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Changes that turn the current association set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_remove: Vec<i32>,
    pub to_add: Vec<i32>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Diff two id sets. Duplicates collapse; output is sorted.
pub fn plan_reconciliation(current: &[i32], desired: &[i32]) -> Reconciliation {
    let current: BTreeSet<i32> = current.iter().copied().collect();
    let desired: BTreeSet<i32> = desired.iter().copied().collect();
    Reconciliation {
        to_remove: current.difference(&desired).copied().collect(),
        to_add: desired.difference(&current).copied().collect(),
    }
}

/// Fail unless every id names an existing cuisine.
async fn ensure_exist(conn: &mut PgConnection, cuisine_ids: &[i32]) -> Result<(), MenuError> {
    let unique: BTreeSet<i32> = cuisine_ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }
    let ids: Vec<i32> = unique.iter().copied().collect();
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM cuisines WHERE cuisine_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_one(conn)
    .await?;
    if found as usize != ids.len() {
        return Err(MenuError::Validation(
            "All of the provided Cuisines do not exist in the database".into(),
        ));
    }
    Ok(())
}

async fn current_ids(conn: &mut PgConnection, rest_id: i32) -> Result<Vec<i32>, MenuError> {
    let ids = sqlx::query_scalar::<_, i32>(
        "SELECT cuisine_id FROM restaurant_cuisines WHERE rest_id = $1",
    )
    .bind(rest_id)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

/// Make the restaurant's cuisine set equal to `desired`.
///
/// All ids are checked before anything is written. Run inside a transaction
/// so a failure leaves the previous set intact.
pub async fn reconcile_restaurant_cuisines(
    conn: &mut PgConnection,
    rest_id: i32,
    desired: &[i32],
) -> Result<Reconciliation, MenuError> {
    ensure_exist(&mut *conn, desired).await?;
    let current = current_ids(&mut *conn, rest_id).await?;
    let plan = plan_reconciliation(&current, desired);
    debug!(rest_id, remove = ?plan.to_remove, add = ?plan.to_add, "reconciling cuisines");

    if !plan.to_remove.is_empty() {
        sqlx::query("DELETE FROM restaurant_cuisines WHERE rest_id = $1 AND cuisine_id = ANY($2)")
            .bind(rest_id)
            .bind(&plan.to_remove)
            .execute(&mut *conn)
            .await?;
    }
    if !plan.to_add.is_empty() {
        sqlx::query(
            "INSERT INTO restaurant_cuisines (rest_id, cuisine_id) \
             SELECT $1, cuisine_id FROM UNNEST($2::INT[]) AS t(cuisine_id)",
        )
        .bind(rest_id)
        .bind(&plan.to_add)
        .execute(&mut *conn)
        .await?;
    }
    Ok(plan)
}

#[derive(sqlx::FromRow)]
struct LinkedCuisine {
    rest_id: i32,
    #[sqlx(flatten)]
    cuisine: Cuisine,
}

/// Cuisines of each listed restaurant, keyed by `rest_id`.
pub async fn for_restaurants(
    executor: impl PgExecutor<'_>,
    rest_ids: &[i32],
) -> Result<HashMap<i32, Vec<Cuisine>>, MenuError> {
    let rows = sqlx::query_as::<_, LinkedCuisine>(
        "SELECT rc.rest_id, c.cuisine_id, c.cuisine_name, c.created_at, c.updated_at \
         FROM restaurant_cuisines rc JOIN cuisines c ON c.cuisine_id = rc.cuisine_id \
         WHERE rc.rest_id = ANY($1) ORDER BY c.cuisine_id",
    )
    .bind(rest_ids)
    .fetch_all(executor)
    .await?;

    let mut grouped: HashMap<i32, Vec<Cuisine>> = HashMap::new();
    for row in rows {
        grouped.entry(row.rest_id).or_default().push(row.cuisine);
    }
    Ok(grouped)
}
