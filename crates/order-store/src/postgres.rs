//! PostgreSQL-backed store implementation.
//!
//! Every write unit runs in one SQL transaction; version guards are
//! `UPDATE … WHERE version = $expected` statements whose row count is
//! checked, so a lost race rolls the whole unit back as a
//! [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    CartId, LedgerEntryId, Money, OrderId, PaymentId, ProductId, RetailerId, WholesalerId,
};
use domain::{
    Cart, CartItem, EntryType, LedgerEntry, Order, OrderItem, OrderStatus, Payment, PaymentMode,
    PaymentState, PaymentStatus, Product, Wholesaler,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    CheckoutWrite, PaymentDecisionWrite, ProductStockWrite, Store, TransitionWrite,
};

/// PostgreSQL store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over an existing connection pool.
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
}

fn parse<T>(value: String) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(StoreError::Corrupt)
}

fn row_to_wholesaler(row: PgRow) -> Result<Wholesaler> {
    Ok(Wholesaler {
        id: WholesalerId::from_uuid(row.try_get::<Uuid, _>("id")?),
        business_name: row.try_get("business_name")?,
        order_sequence: row.try_get::<i32, _>("order_sequence")? as u32,
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        wholesaler_id: WholesalerId::from_uuid(row.try_get::<Uuid, _>("wholesaler_id")?),
        name: row.try_get("name")?,
        unit: row.try_get("unit")?,
        price: Money::from_paise(row.try_get("price_paise")?),
        mrp: Money::from_paise(row.try_get("mrp_paise")?),
        stock: row.try_get::<i32, _>("stock")? as u32,
        reserved_stock: row.try_get::<i32, _>("reserved_stock")? as u32,
        version: row.try_get::<i64, _>("version")? as u64,
    })
}

fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
    Ok(CartItem {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        price_at_time: Money::from_paise(row.try_get("price_at_time")?),
        mrp_at_time: Money::from_paise(row.try_get("mrp_at_time")?),
        stock_snapshot: row.try_get::<i32, _>("stock_snapshot")? as u32,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        unit: row.try_get("unit")?,
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        unit_price: Money::from_paise(row.try_get("unit_price")?),
        line_total: Money::from_paise(row.try_get("line_total")?),
    })
}

fn row_to_order(row: PgRow, items: Vec<OrderItem>) -> Result<Order> {
    Ok(Order::from_parts(
        OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        row.try_get("order_number")?,
        WholesalerId::from_uuid(row.try_get::<Uuid, _>("wholesaler_id")?),
        RetailerId::from_uuid(row.try_get::<Uuid, _>("retailer_id")?),
        parse::<OrderStatus>(row.try_get("status")?)?,
        parse::<PaymentStatus>(row.try_get("payment_status")?)?,
        items,
        Money::from_paise(row.try_get("subtotal")?),
        Money::from_paise(row.try_get("tax_amount")?),
        Money::from_paise(row.try_get("delivery_charge")?),
        Money::from_paise(row.try_get("total_amount")?),
        row.try_get("placed_at")?,
        row.try_get("accepted_at")?,
        row.try_get("dispatched_at")?,
        row.try_get("delivered_at")?,
        row.try_get("cancelled_at")?,
        row.try_get::<i64, _>("version")? as u64,
    ))
}

fn row_to_payment(row: PgRow) -> Result<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        wholesaler_id: WholesalerId::from_uuid(row.try_get::<Uuid, _>("wholesaler_id")?),
        retailer_id: RetailerId::from_uuid(row.try_get::<Uuid, _>("retailer_id")?),
        amount: Money::from_paise(row.try_get("amount")?),
        mode: parse::<PaymentMode>(row.try_get("mode")?)?,
        state: parse::<PaymentState>(row.try_get("state")?)?,
        reference: row.try_get("reference")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        confirmed_at: row.try_get("confirmed_at")?,
        rejected_at: row.try_get("rejected_at")?,
        confirmed_by: row
            .try_get::<Option<Uuid>, _>("confirmed_by")?
            .map(WholesalerId::from_uuid),
        version: row.try_get::<i64, _>("version")? as u64,
    })
}

fn row_to_ledger_entry(row: PgRow) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        wholesaler_id: WholesalerId::from_uuid(row.try_get::<Uuid, _>("wholesaler_id")?),
        retailer_id: RetailerId::from_uuid(row.try_get::<Uuid, _>("retailer_id")?),
        entry_type: parse::<EntryType>(row.try_get("entry_type")?)?,
        amount: Money::from_paise(row.try_get("amount")?),
        description: row.try_get("description")?,
        entry_date: row.try_get::<DateTime<Utc>, _>("entry_date")?,
    })
}

/// Applies version-guarded product updates inside a transaction.
async fn apply_product_writes(
    conn: &mut PgConnection,
    writes: &[ProductStockWrite],
) -> Result<()> {
    for w in writes {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = $1, reserved_stock = $2, version = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(w.product.stock as i32)
        .bind(w.product.reserved_stock as i32)
        .bind(w.product.version as i64)
        .bind(w.product.id.as_uuid())
        .bind(w.expected_version as i64)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict { entity: "product" });
        }
    }
    Ok(())
}

async fn insert_order_row(conn: &mut PgConnection, order: &Order) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (id, order_number, wholesaler_id, retailer_id,
                            status, payment_status, subtotal, tax_amount,
                            delivery_charge, total_amount, placed_at,
                            accepted_at, dispatched_at, delivered_at,
                            cancelled_at, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(order.id().as_uuid())
    .bind(order.order_number())
    .bind(order.wholesaler_id().as_uuid())
    .bind(order.retailer_id().as_uuid())
    .bind(order.status().as_str())
    .bind(order.payment_status().as_str())
    .bind(order.subtotal().paise())
    .bind(order.tax_amount().paise())
    .bind(order.delivery_charge().paise())
    .bind(order.total_amount().paise())
    .bind(order.placed_at())
    .bind(order.accepted_at())
    .bind(order.dispatched_at())
    .bind(order.delivered_at())
    .bind(order.cancelled_at())
    .bind(order.version() as i64)
    .execute(&mut *conn)
    .await?;

    for (position, item) in order.items().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, position, product_id, product_name,
                                     unit, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(position as i32)
        .bind(item.product_id.as_uuid())
        .bind(&item.product_name)
        .bind(&item.unit)
        .bind(item.quantity as i32)
        .bind(item.unit_price.paise())
        .bind(item.line_total.paise())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Guarded update of an order's mutable fields (status, payment status,
/// stage timestamps). Identity fields are never rewritten.
async fn update_order_row(
    conn: &mut PgConnection,
    order: &Order,
    expected_version: u64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = $1, payment_status = $2, accepted_at = $3,
            dispatched_at = $4, delivered_at = $5, cancelled_at = $6,
            version = $7
        WHERE id = $8 AND version = $9
        "#,
    )
    .bind(order.status().as_str())
    .bind(order.payment_status().as_str())
    .bind(order.accepted_at())
    .bind(order.dispatched_at())
    .bind(order.delivered_at())
    .bind(order.cancelled_at())
    .bind(order.version() as i64)
    .bind(order.id().as_uuid())
    .bind(expected_version as i64)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(StoreError::Conflict { entity: "order" });
    }
    Ok(())
}

async fn insert_ledger_row(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (id, wholesaler_id, retailer_id, entry_type,
                                    amount, description, entry_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.wholesaler_id.as_uuid())
    .bind(entry.retailer_id.as_uuid())
    .bind(entry.entry_type.as_str())
    .bind(entry.amount.paise())
    .bind(&entry.description)
    .bind(entry.entry_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_cart_items(conn: &mut PgConnection, cart: &Cart) -> Result<()> {
    for (position, item) in cart.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, position, product_id, quantity,
                                    price_at_time, mrp_at_time, stock_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(position as i32)
        .bind(item.product_id.as_uuid())
        .bind(item.quantity as i32)
        .bind(item.price_at_time.paise())
        .bind(item.mrp_at_time.paise())
        .bind(item.stock_snapshot as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn fetch_order_items(conn: &mut PgConnection, order_id: OrderId) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(row_to_order_item).collect()
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_wholesaler(&self, wholesaler: Wholesaler) -> Result<()> {
        sqlx::query(
            "INSERT INTO wholesalers (id, business_name, order_sequence) VALUES ($1, $2, $3)",
        )
        .bind(wholesaler.id.as_uuid())
        .bind(&wholesaler.business_name)
        .bind(wholesaler.order_sequence as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_wholesaler(&self, id: WholesalerId) -> Result<Option<Wholesaler>> {
        let row = sqlx::query("SELECT * FROM wholesalers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_wholesaler).transpose()
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, wholesaler_id, name, unit, price_paise,
                                  mrp_paise, stock, reserved_stock, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.wholesaler_id.as_uuid())
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.price.paise())
        .bind(product.mrp.paise())
        .bind(product.stock as i32)
        .bind(product.reserved_stock as i32)
        .bind(product.version as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_product).transpose()
    }

    async fn get_cart(
        &self,
        retailer_id: RetailerId,
        wholesaler_id: WholesalerId,
    ) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query(
            "SELECT * FROM carts WHERE retailer_id = $1 AND wholesaler_id = $2",
        )
        .bind(retailer_id.as_uuid())
        .bind(wholesaler_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let cart_id = CartId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let version = row.try_get::<i64, _>("version")? as u64;

        let item_rows =
            sqlx::query("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY position")
                .bind(cart_id.as_uuid())
                .fetch_all(&mut *conn)
                .await?;
        let items = item_rows
            .into_iter()
            .map(row_to_cart_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Cart {
            id: cart_id,
            retailer_id,
            wholesaler_id,
            items,
            version,
        }))
    }

    async fn save_cart(&self, cart: Cart, expected_version: Option<u64>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        match expected_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO carts (id, retailer_id, wholesaler_id, version)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(cart.id.as_uuid())
                .bind(cart.retailer_id.as_uuid())
                .bind(cart.wholesaler_id.as_uuid())
                .bind(cart.version as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("uq_cart_pair")
                    {
                        return StoreError::Conflict { entity: "cart" };
                    }
                    StoreError::Database(e)
                })?;
            }
            Some(expected) => {
                let result =
                    sqlx::query("UPDATE carts SET version = $1 WHERE id = $2 AND version = $3")
                        .bind(cart.version as i64)
                        .bind(cart.id.as_uuid())
                        .bind(expected as i64)
                        .execute(&mut *tx)
                        .await?;
                if result.rows_affected() != 1 {
                    return Err(StoreError::Conflict { entity: "cart" });
                }
                sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
                    .bind(cart.id.as_uuid())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        insert_cart_items(&mut *tx, &cart).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let items = fetch_order_items(&mut *conn, id).await?;
        Ok(Some(row_to_order(row, items)?))
    }

    async fn orders_for_wholesaler(
        &self,
        id: WholesalerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE wholesaler_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY placed_at DESC
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = fetch_order_items(&mut *conn, order_id).await?;
            orders.push(row_to_order(row, items)?);
        }
        Ok(orders)
    }

    async fn orders_for_retailer(
        &self,
        id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE retailer_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY placed_at DESC
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *conn)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            let items = fetch_order_items(&mut *conn, order_id).await?;
            orders.push(row_to_order(row, items)?);
        }
        Ok(orders)
    }

    async fn insert_payment(&self, payment: Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, wholesaler_id, retailer_id, amount,
                                  mode, state, reference, note, created_at,
                                  confirmed_at, rejected_at, confirmed_by, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.wholesaler_id.as_uuid())
        .bind(payment.retailer_id.as_uuid())
        .bind(payment.amount.paise())
        .bind(payment.mode.as_str())
        .bind(payment.state.as_str())
        .bind(&payment.reference)
        .bind(&payment.note)
        .bind(payment.created_at)
        .bind(payment.confirmed_at)
        .bind(payment.rejected_at)
        .bind(payment.confirmed_by.map(|id| id.as_uuid()))
        .bind(payment.version as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_payment).transpose()
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let rows =
            sqlx::query("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at")
                .bind(order_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(row_to_payment).collect()
    }

    async fn ledger_for_pair(
        &self,
        wholesaler_id: WholesalerId,
        retailer_id: RetailerId,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ledger_entries
            WHERE wholesaler_id = $1 AND retailer_id = $2
            ORDER BY entry_date DESC
            "#,
        )
        .bind(wholesaler_id.as_uuid())
        .bind(retailer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_ledger_entry).collect()
    }

    async fn ledger_for_wholesaler(
        &self,
        wholesaler_id: WholesalerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ledger_entries
            WHERE wholesaler_id = $1 AND ($2::text IS NULL OR entry_type = $2)
            ORDER BY entry_date DESC
            "#,
        )
        .bind(wholesaler_id.as_uuid())
        .bind(entry_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_ledger_entry).collect()
    }

    async fn ledger_for_retailer(
        &self,
        retailer_id: RetailerId,
        entry_type: Option<EntryType>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ledger_entries
            WHERE retailer_id = $1 AND ($2::text IS NULL OR entry_type = $2)
            ORDER BY entry_date DESC
            "#,
        )
        .bind(retailer_id.as_uuid())
        .bind(entry_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_ledger_entry).collect()
    }

    async fn commit_checkout(&self, write: CheckoutWrite) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE wholesalers SET order_sequence = $1
            WHERE id = $2 AND order_sequence = $3
            "#,
        )
        .bind(write.sequence.new_sequence as i32)
        .bind(write.sequence.wholesaler_id.as_uuid())
        .bind(write.sequence.expected_sequence as i32)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict {
                entity: "wholesaler sequence",
            });
        }

        apply_product_writes(&mut *tx, &write.products).await?;
        insert_order_row(&mut *tx, &write.order).await?;

        let result =
            sqlx::query("UPDATE carts SET version = $1 WHERE id = $2 AND version = $3")
                .bind(write.cart.cart.version as i64)
                .bind(write.cart.cart.id.as_uuid())
                .bind(write.cart.expected_version as i64)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict { entity: "cart" });
        }
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(write.cart.cart.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(order_number = %write.order.order_number(), "checkout committed");
        Ok(())
    }

    async fn commit_transition(&self, write: TransitionWrite) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        update_order_row(&mut *tx, &write.order, write.expected_order_version).await?;
        apply_product_writes(&mut *tx, &write.products).await?;
        if let Some(ref entry) = write.ledger_entry {
            insert_ledger_row(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        tracing::debug!(
            order_number = %write.order.order_number(),
            status = %write.order.status(),
            "transition committed"
        );
        Ok(())
    }

    async fn commit_payment_decision(&self, write: PaymentDecisionWrite) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let payment = &write.payment;
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET state = $1, note = $2, confirmed_at = $3, rejected_at = $4,
                confirmed_by = $5, version = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(payment.state.as_str())
        .bind(&payment.note)
        .bind(payment.confirmed_at)
        .bind(payment.rejected_at)
        .bind(payment.confirmed_by.map(|id| id.as_uuid()))
        .bind(payment.version as i64)
        .bind(payment.id.as_uuid())
        .bind(write.expected_payment_version as i64)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict { entity: "payment" });
        }

        if let Some(ref entry) = write.ledger_entry {
            insert_ledger_row(&mut *tx, entry).await?;
        }
        if let Some(ref order_write) = write.order {
            update_order_row(&mut *tx, &order_write.order, order_write.expected_order_version)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(state = %write.payment.state, "payment decision committed");
        Ok(())
    }
}
