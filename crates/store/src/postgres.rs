use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Money, NewProduct, Order, OrderLine, OrderStatus, Product, ProductPatch};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    OrderId, ProductId, Result, StoreError,
    store::Store,
    unit_of_work::{Committed, UnitOfWork, WorkItem, validate_work},
};

const PRODUCT_COLUMNS: &str =
    "id, name, category, description, price_cents, stock_quantity, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, lines, status, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Each unit of work runs in its own database transaction. Stock decrements
/// are single guarded `UPDATE` statements, so concurrent reservations can
/// never drive stock below zero.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the schema.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let stock: i64 = row.try_get("stock_quantity")?;
        let stock_quantity = u32::try_from(stock).map_err(|_| {
            StoreError::CorruptRecord(format!("stock_quantity out of range: {stock}"))
        })?;

        let attrs = NewProduct {
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock_quantity,
        };

        Ok(Product::restore(
            ProductId::new(row.try_get::<String, _>("id")?),
            attrs,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<OrderLine> = serde_json::from_value(lines_json)?;
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::CorruptRecord(e.to_string()))?;

        Order::restore(
            OrderId::new(row.try_get::<String, _>("id")?),
            lines,
            status,
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        )
        .map_err(|e| StoreError::CorruptRecord(e.to_string()))
    }

    /// Applies one work item inside the caller's transaction.
    async fn apply(
        conn: &mut PgConnection,
        item: WorkItem,
        at: DateTime<Utc>,
        committed: &mut Committed,
    ) -> Result<()> {
        match item {
            WorkItem::DecrementStock {
                product_id,
                quantity,
            } => {
                // The guard and the write are one statement
                let row = sqlx::query(&format!(
                    "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = $3 \
                     WHERE id = $1 AND stock_quantity >= $2 RETURNING {PRODUCT_COLUMNS}"
                ))
                .bind(product_id.as_str())
                .bind(i64::from(quantity))
                .bind(at)
                .fetch_optional(&mut *conn)
                .await?;

                match row {
                    Some(row) => committed.record_product(Self::row_to_product(row)?),
                    None => {
                        let available: Option<i64> =
                            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                                .bind(product_id.as_str())
                                .fetch_optional(&mut *conn)
                                .await?;
                        return Err(match available {
                            None => StoreError::ProductNotFound(product_id),
                            Some(available) => StoreError::InsufficientStock {
                                product_id,
                                requested: quantity,
                                available: u32::try_from(available).unwrap_or(0),
                            },
                        });
                    }
                }
            }
            WorkItem::IncrementStock {
                product_id,
                quantity,
            } => {
                // Stock is read back as u32, so the column never grows past it
                let row = sqlx::query(&format!(
                    "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = $3 \
                     WHERE id = $1 AND stock_quantity + $2 <= $4 RETURNING {PRODUCT_COLUMNS}"
                ))
                .bind(product_id.as_str())
                .bind(i64::from(quantity))
                .bind(at)
                .bind(i64::from(u32::MAX))
                .fetch_optional(&mut *conn)
                .await?;

                match row {
                    Some(row) => committed.record_product(Self::row_to_product(row)?),
                    None => {
                        let available: Option<i64> =
                            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                                .bind(product_id.as_str())
                                .fetch_optional(&mut *conn)
                                .await?;
                        return Err(match available {
                            None => StoreError::ProductNotFound(product_id),
                            Some(available) => StoreError::StockOverflow {
                                product_id,
                                requested: quantity,
                                available: u32::try_from(available).unwrap_or(u32::MAX),
                            },
                        });
                    }
                }
            }
            WorkItem::InsertOrder(draft) => {
                let lines_json = serde_json::to_value(draft.lines())?;
                let total_cents = draft.total().cents();
                let order = draft.place(OrderId::generate(), at);

                sqlx::query(
                    r#"
                    INSERT INTO orders (id, lines, total_cents, status, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $5)
                    "#,
                )
                .bind(order.id().as_str())
                .bind(lines_json)
                .bind(total_cents)
                .bind(order.status().as_str())
                .bind(at)
                .execute(&mut *conn)
                .await?;

                committed.orders.push(order);
            }
            WorkItem::SetOrderStatus {
                order_id,
                expected,
                next,
            } => {
                let row = sqlx::query(&format!(
                    "UPDATE orders SET status = $3, updated_at = $4 \
                     WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
                ))
                .bind(order_id.as_str())
                .bind(expected.as_str())
                .bind(next.as_str())
                .bind(at)
                .fetch_optional(&mut *conn)
                .await?;

                match row {
                    Some(row) => committed.orders.push(Self::row_to_order(row)?),
                    None => {
                        let actual: Option<String> =
                            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                                .bind(order_id.as_str())
                                .fetch_optional(&mut *conn)
                                .await?;
                        let Some(actual) = actual else {
                            return Err(StoreError::OrderNotFound(order_id));
                        };
                        let actual = actual
                            .parse::<OrderStatus>()
                            .map_err(|e| StoreError::CorruptRecord(e.to_string()))?;
                        return Err(StoreError::StatusConflict {
                            order_id,
                            expected,
                            actual,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn create_product(&self, attrs: NewProduct) -> Result<Product> {
        let product = Product::create(ProductId::generate(), attrs, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, description, price_cents, stock_quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id().as_str())
        .bind(product.name())
        .bind(product.category())
        .bind(product.description())
        .bind(product.price().cents())
        .bind(i64::from(product.stock_quantity()))
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let current = row
            .map(Self::row_to_product)
            .transpose()?
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;

        let updated = current.patched(patch, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, category = $3, description = $4, price_cents = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(updated.name())
        .bind(updated.category())
        .bind(updated.description())
        .bind(updated.price().cents())
        .bind(updated.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: &ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        Ok(())
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn commit(&self, work: UnitOfWork) -> Result<Committed> {
        validate_work(&work).map_err(|e| StoreError::InvalidWork(e.message))?;

        let start = std::time::Instant::now();
        let at = Utc::now();
        let mut committed = Committed::default();

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        for item in work.into_items() {
            if let Err(e) = Self::apply(&mut tx, item, at, &mut committed).await {
                tx.rollback().await?;
                metrics::counter!("store_commit_rollbacks_total", "backend" => "postgres")
                    .increment(1);
                tracing::debug!(error = %e, "unit of work rolled back");
                return Err(e);
            }
        }

        tx.commit().await?;
        metrics::histogram!("store_commit_duration_seconds", "backend" => "postgres")
            .record(start.elapsed().as_secs_f64());
        Ok(committed)
    }
}
