//! Orders kept as rows of an SQLite `orders` table.
//!
//! Each operation is a single statement, so atomicity is whatever SQLite
//! gives one statement. Import is the only multi-statement path and runs in
//! a transaction.

use super::{OrderStore, StoreError, StoreResult};
use crate::models::order::{FileRef, Order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, Sqlite, SqlitePool,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr, sync::Arc};
use tracing::{debug, info};

const MIGRATION_SQL: &str = include_str!("../../../migrations/0001_init.sql");

const ORDER_COLUMNS: &str = "id, order_id, full_name, phone_number, print_type, \
     binding_color_type, copies, paper_size, print_side, selected_pages, color_pages, \
     bw_pages, special_instructions, files, order_date, status, total_cost, \
     created_at, updated_at";

/// Raw row shape; `files` is stored as JSON text.
#[derive(FromRow, Debug)]
struct OrderRow {
    id: String,
    order_id: String,
    full_name: String,
    phone_number: String,
    print_type: Option<String>,
    binding_color_type: Option<String>,
    copies: Option<i64>,
    paper_size: Option<String>,
    print_side: Option<String>,
    selected_pages: Option<String>,
    color_pages: Option<String>,
    bw_pages: Option<String>,
    special_instructions: Option<String>,
    files: String,
    order_date: String,
    status: String,
    total_cost: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let files: Vec<FileRef> = serde_json::from_str(&row.files)?;
        Ok(Order {
            id: row.id,
            order_id: row.order_id,
            full_name: row.full_name,
            phone_number: row.phone_number,
            print_type: row.print_type,
            binding_color_type: row.binding_color_type,
            copies: row.copies.and_then(|c| u32::try_from(c).ok()),
            paper_size: row.paper_size,
            print_side: row.print_side,
            selected_pages: row.selected_pages,
            color_pages: row.color_pages,
            bw_pages: row.bw_pages,
            special_instructions: row.special_instructions,
            files,
            order_date: row.order_date,
            status: row.status,
            total_cost: row.total_cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Open a pool for `database_url`, creating the database file and its parent
/// directory when missing.
pub async fn connect(database_url: &str) -> StoreResult<SqlitePool> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    debug!("Interpreted SQLite path => {}", db_path);

    if !db_path.starts_with(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created missing directory {:?}", parent);
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema. Statements are idempotent.
pub async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteOrderStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteOrderStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    fn insert_query(order: &Order, files: String) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            "INSERT INTO orders (
                id, order_id, full_name, phone_number, print_type, binding_color_type,
                copies, paper_size, print_side, selected_pages, color_pages, bw_pages,
                special_instructions, files, order_date, status, total_cost,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.order_id)
        .bind(&order.full_name)
        .bind(&order.phone_number)
        .bind(&order.print_type)
        .bind(&order.binding_color_type)
        .bind(order.copies.map(i64::from))
        .bind(&order.paper_size)
        .bind(&order.print_side)
        .bind(&order.selected_pages)
        .bind(&order.color_pages)
        .bind(&order.bw_pages)
        .bind(&order.special_instructions)
        .bind(files)
        .bind(&order.order_date)
        .bind(&order.status)
        .bind(order.total_cost)
        .bind(order.created_at)
        .bind(order.updated_at)
    }
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn create_order(&self, order: Order) -> StoreResult<Order> {
        let files = serde_json::to_string(&order.files)?;
        Self::insert_query(&order, files).execute(&*self.db).await?;
        Ok(order)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let rows: Vec<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY seq ASC"))
                .fetch_all(&*self.db)
                .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ? ORDER BY seq ASC LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(&*self.db)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = ?, updated_at = ?
             WHERE seq = (SELECT seq FROM orders WHERE order_id = ? ORDER BY seq ASC LIMIT 1)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(status)
        .bind(at)
        .bind(order_id)
        .fetch_optional(&*self.db)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn delete_all_orders(&self) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM orders").execute(&*self.db).await?;
        debug!("deleted {} order rows", result.rows_affected());
        Ok(())
    }

    async fn replace_all(&self, orders: Vec<Order>) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM orders").execute(&mut *tx).await?;
        for order in &orders {
            let files = serde_json::to_string(&order.files)?;
            Self::insert_query(order, files).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn check_ready(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}
