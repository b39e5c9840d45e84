//! PostgreSQL-backed market store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{AddressId, ConsumerId, Money, OrderId, ProductId, VendorId, Week};

use crate::error::{Result, StoreError};
use crate::model::{CartLine, NewOrder, Order, OrderLine, Product};
use crate::status::OrderStatus;
use crate::store::MarketStore;

/// PostgreSQL market store.
///
/// The database is the synchronization point across concurrent requests:
/// stock decrements are conditional `UPDATE`s evaluated by Postgres itself,
/// never read-then-write pairs computed here.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            name: row.try_get("name")?,
            image_url: row.try_get("image_url")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")? as u32,
            active: row.try_get("active")?,
            week: Week::new(row.try_get("year")?, row.try_get::<i32, _>("week")? as u32),
            expires_on: row.try_get("expires_on")?,
        })
    }

    fn row_to_cart_line(row: &PgRow) -> Result<CartLine> {
        Ok(CartLine {
            consumer_id: ConsumerId::from_uuid(row.try_get::<Uuid, _>("consumer_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            added_at: row.try_get("added_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status =
            OrderStatus::parse(&status_str).ok_or(StoreError::UnknownStatus(status_str))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            number: row.try_get("number")?,
            consumer_id: ConsumerId::from_uuid(row.try_get::<Uuid, _>("consumer_id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            address_id: AddressId::from_uuid(row.try_get::<Uuid, _>("address_id")?),
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        })
    }
}

const ORDER_COLUMNS: &str = "id, number, consumer_id, vendor_id, total_cents, status, address_id, notes, created_at, updated_at";

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn put_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, vendor_id, name, image_url, price_cents, stock, active, week, year, expires_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                vendor_id = EXCLUDED.vendor_id,
                name = EXCLUDED.name,
                image_url = EXCLUDED.image_url,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                active = EXCLUDED.active,
                week = EXCLUDED.week,
                year = EXCLUDED.year,
                expires_on = EXCLUDED.expires_on,
                updated_at = now()
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.vendor_id.as_uuid())
        .bind(&product.name)
        .bind(&product.image_url)
        .bind(product.price.cents())
        .bind(product.stock as i32)
        .bind(product.active)
        .bind(product.week.week as i32)
        .bind(product.week.year)
        .bind(product.expires_on)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, vendor_id, name, image_url, price_cents, stock, active, week, year, expires_on FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn get_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        let row = sqlx::query(
            "SELECT consumer_id, product_id, quantity, unit_price_cents, added_at, updated_at FROM cart_lines WHERE consumer_id = $1 AND product_id = $2",
        )
        .bind(consumer_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_cart_line).transpose()
    }

    async fn upsert_cart_line(&self, line: CartLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (consumer_id, product_id, quantity, unit_price_cents, added_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (consumer_id, product_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                unit_price_cents = EXCLUDED.unit_price_cents,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(line.consumer_id.as_uuid())
        .bind(line.product_id.as_uuid())
        .bind(line.quantity as i32)
        .bind(line.unit_price.cents())
        .bind(line.added_at)
        .bind(line.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM cart_lines WHERE consumer_id = $1 AND product_id = $2")
                .bind(consumer_id.as_uuid())
                .bind(product_id.as_uuid())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, consumer_id: ConsumerId) -> Result<()> {
        sqlx::query("DELETE FROM cart_lines WHERE consumer_id = $1")
            .bind(consumer_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn cart_with_products(
        &self,
        consumer_id: ConsumerId,
    ) -> Result<Vec<(CartLine, Option<Product>)>> {
        let rows = sqlx::query(
            r#"
            SELECT c.consumer_id, c.product_id, c.quantity, c.unit_price_cents, c.added_at, c.updated_at,
                   p.id AS p_id, p.vendor_id, p.name, p.image_url, p.price_cents, p.stock,
                   p.active, p.week, p.year, p.expires_on
            FROM cart_lines c
            LEFT JOIN products p ON p.id = c.product_id
            WHERE c.consumer_id = $1
            ORDER BY c.added_at ASC
            "#,
        )
        .bind(consumer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let line = Self::row_to_cart_line(row)?;
                let product = match row.try_get::<Option<Uuid>, _>("p_id")? {
                    Some(id) => Some(Product {
                        id: ProductId::from_uuid(id),
                        vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
                        name: row.try_get("name")?,
                        image_url: row.try_get("image_url")?,
                        price: Money::from_cents(row.try_get("price_cents")?),
                        stock: row.try_get::<i32, _>("stock")? as u32,
                        active: row.try_get("active")?,
                        week: Week::new(
                            row.try_get("year")?,
                            row.try_get::<i32, _>("week")? as u32,
                        ),
                        expires_on: row.try_get("expires_on")?,
                    }),
                    None => None,
                };
                Ok((line, product))
            })
            .collect()
    }

    async fn delete_invalid_cart_lines(&self, consumer_id: ConsumerId) -> Result<Vec<ProductId>> {
        let today = Utc::now().date_naive();
        let week = Week::current();

        let rows = sqlx::query(
            r#"
            DELETE FROM cart_lines c
            USING products p
            WHERE c.consumer_id = $1
              AND p.id = c.product_id
              AND NOT (p.active AND p.week = $2 AND p.year = $3 AND p.expires_on >= $4)
            RETURNING c.product_id
            "#,
        )
        .bind(consumer_id.as_uuid())
        .bind(week.week as i32)
        .bind(week.year)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?)))
            .collect()
    }

    async fn commit_checkout(
        &self,
        consumer_id: ConsumerId,
        orders: Vec<NewOrder>,
    ) -> Result<Vec<Order>> {
        let mut tx = self.pool.begin().await?;
        let today = Utc::now().date_naive();
        let week = Week::current();

        let mut created = Vec::with_capacity(orders.len());
        for new_order in orders {
            let order_id = OrderId::new();
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO orders (id, number, consumer_id, vendor_id, total_cents, status, address_id, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {ORDER_COLUMNS}
                "#,
            ))
            .bind(order_id.as_uuid())
            .bind(&new_order.number)
            .bind(consumer_id.as_uuid())
            .bind(new_order.vendor_id.as_uuid())
            .bind(new_order.total().cents())
            .bind(OrderStatus::Pending.as_str())
            .bind(new_order.address_id.as_uuid())
            .bind(&new_order.notes)
            .fetch_one(&mut *tx)
            .await?;
            created.push(Self::row_to_order(&row)?);

            for line in &new_order.lines {
                sqlx::query(
                    r#"
                    INSERT INTO order_lines (order_id, product_id, product_name, unit_price_cents, quantity, subtotal_cents)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(order_id.as_uuid())
                .bind(line.product_id.as_uuid())
                .bind(&line.product_name)
                .bind(line.unit_price.cents())
                .bind(line.quantity as i32)
                .bind(line.subtotal().cents())
                .execute(&mut *tx)
                .await?;

                // The authoritative stock check: a conditional decrement
                // evaluated by Postgres under the row lock. Validity is
                // re-read here, not taken from the earlier advisory pass.
                let result = sqlx::query(
                    r#"
                    UPDATE products
                    SET stock = stock - $2, updated_at = now()
                    WHERE id = $1
                      AND stock >= $2
                      AND active AND week = $3 AND year = $4 AND expires_on >= $5
                    "#,
                )
                .bind(line.product_id.as_uuid())
                .bind(line.quantity as i32)
                .bind(week.week as i32)
                .bind(week.year)
                .bind(today)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    // Diagnose before the implicit rollback: invalid
                    // product or plain insufficient stock.
                    let product = sqlx::query(
                        "SELECT stock, active, week, year, expires_on FROM products WHERE id = $1",
                    )
                    .bind(line.product_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

                    return Err(match product {
                        None => StoreError::ProductUnavailable {
                            product_id: line.product_id,
                        },
                        Some(row) => {
                            let valid = row.try_get::<bool, _>("active")?
                                && row.try_get::<i32, _>("week")? as u32 == week.week
                                && row.try_get::<i32, _>("year")? == week.year
                                && row.try_get::<chrono::NaiveDate, _>("expires_on")? >= today;
                            if valid {
                                StoreError::StockConflict {
                                    product_id: line.product_id,
                                    requested: line.quantity,
                                    available: row.try_get::<i32, _>("stock")? as u32,
                                }
                            } else {
                                StoreError::ProductUnavailable {
                                    product_id: line.product_id,
                                }
                            }
                        }
                    });
                }
            }
        }

        // Cart clears inside the same transaction as the orders it became.
        sqlx::query("DELETE FROM cart_lines WHERE consumer_id = $1")
            .bind(consumer_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            "SELECT order_id, product_id, product_name, unit_price_cents, quantity, subtotal_cents FROM order_lines WHERE order_id = $1 ORDER BY product_name ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order_line).collect()
    }

    async fn orders_for_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE consumer_id = $1 ORDER BY created_at DESC",
        ))
        .bind(consumer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Row lock so concurrent transitions serialize on this order.
        let row = sqlx::query("SELECT status, notes FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        let status_str: String = row.try_get("status")?;
        let current =
            OrderStatus::parse(&status_str).ok_or(StoreError::UnknownStatus(status_str))?;
        if !current.can_transition_to(target) {
            return Err(StoreError::InvalidTransition {
                current,
                attempted: target,
            });
        }

        if target == OrderStatus::Cancelled {
            // Relative increment so it composes with concurrent vendor
            // edits; never an absolute set.
            sqlx::query(
                r#"
                UPDATE products AS p
                SET stock = p.stock + l.quantity, updated_at = now()
                FROM order_lines AS l
                WHERE l.order_id = $1 AND p.id = l.product_id
                "#,
            )
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        let notes = match note {
            Some(new) => match row.try_get::<Option<String>, _>("notes")? {
                Some(existing) => Some(format!("{existing}\n{new}")),
                None => Some(new),
            },
            None => row.try_get("notes")?,
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, notes = $3, updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#,
        ))
        .bind(id.as_uuid())
        .bind(target.as_str())
        .bind(&notes)
        .fetch_one(&mut *tx)
        .await?;

        let order = Self::row_to_order(&row)?;
        tx.commit().await?;
        Ok(order)
    }
}
