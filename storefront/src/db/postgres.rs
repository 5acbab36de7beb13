//! PostgreSQL store

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    Cart, CartLine, Order, OrderLine, OrderStatus, PaymentMethod, PaymentResult, Product,
    ShippingAddress,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{BoxError, Store, UnitOfWork};

macro_rules! select_orders {
    ($tail:literal) => {
        concat!(
            "SELECT id, user_id, shipping_address, payment_method, items_price, tax_price, ",
            "shipping_price, total_price, status, is_paid, paid_at, payment_result, ",
            "gateway_order_id, delivered_at, created_at, updated_at FROM orders ",
            $tail
        )
    };
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    status: String,
    is_paid: bool,
    paid_at: Option<i64>,
    payment_result: Option<Json<PaymentResult>>,
    gateway_order_id: Option<String>,
    delivered_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, BoxError> {
        let status = OrderStatus::from_db(&self.status)
            .ok_or_else(|| format!("order {}: unknown status '{}'", self.id, self.status))?;
        let payment_method = PaymentMethod::parse(&self.payment_method).ok_or_else(|| {
            format!(
                "order {}: unknown payment method '{}'",
                self.id, self.payment_method
            )
        })?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            lines,
            shipping_address: self.shipping_address.0,
            payment_method,
            items_price: self.items_price,
            tax_price: self.tax_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
            status,
            is_paid: self.is_paid,
            paid_at: self.paid_at,
            payment_result: self.payment_result.map(|j| j.0),
            gateway_order_id: self.gateway_order_id,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_id: i64,
    product_id: i64,
    name: String,
    image: Option<String>,
    price: Decimal,
    quantity: i32,
}

/// Connection-pool backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, BoxError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_order(&self, order_id: i64) -> Result<Option<Order>, BoxError> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, order_id, false).await
    }

    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, BoxError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<OrderRow> =
            sqlx::query_as(select_orders!("WHERE user_id = $1 ORDER BY created_at DESC, id DESC"))
                .bind(user_id)
                .fetch_all(&mut *conn)
                .await?;
        attach_lines(&mut conn, rows).await
    }

    async fn find_cart(&self, user_id: i64) -> Result<Option<Cart>, BoxError> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, user_id, false).await
    }
}

/// One PostgreSQL transaction
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn load_cart(&mut self, user_id: i64) -> Result<Option<Cart>, BoxError> {
        load_cart(&mut self.tx, user_id, true).await
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO carts (user_id, updated_at) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(cart.user_id)
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(cart.user_id)
            .execute(&mut *self.tx)
            .await?;

        if !cart.lines.is_empty() {
            let user_ids: Vec<i64> = cart.lines.iter().map(|_| cart.user_id).collect();
            let line_nos: Vec<i32> = (0..cart.lines.len() as i32).collect();
            let product_ids: Vec<i64> = cart.lines.iter().map(|l| l.product_id).collect();
            let names: Vec<String> = cart.lines.iter().map(|l| l.name.clone()).collect();
            let images: Vec<Option<String>> = cart.lines.iter().map(|l| l.image.clone()).collect();
            let prices: Vec<Decimal> = cart.lines.iter().map(|l| l.price).collect();
            let quantities: Vec<i32> = cart.lines.iter().map(|l| l.quantity).collect();
            sqlx::query(
                r#"
                INSERT INTO cart_lines (user_id, line_no, product_id, name, image, price, quantity)
                SELECT * FROM UNNEST($1::bigint[], $2::integer[], $3::bigint[], $4::text[], $5::text[], $6::numeric[], $7::integer[])
                "#,
            )
            .bind(&user_ids)
            .bind(&line_nos)
            .bind(&product_ids)
            .bind(&names)
            .bind(&images)
            .bind(&prices)
            .bind(&quantities)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn delete_cart(&mut self, user_id: i64) -> Result<(), BoxError> {
        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError> {
        let product = sqlx::query_as(
            "SELECT id, name, image, price, count_in_stock, is_active FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn lock_product(&mut self, product_id: i64) -> Result<Option<Product>, BoxError> {
        let product = sqlx::query_as(
            "SELECT id, name, image, price, count_in_stock, is_active FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn decrement_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        now: i64,
    ) -> Result<Option<i32>, BoxError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE products
            SET count_in_stock = count_in_stock - $2, updated_at = $3
            WHERE id = $1 AND is_active AND count_in_stock >= $2
            RETURNING count_in_stock
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(remaining,)| remaining))
    }

    async fn increment_stock(
        &mut self,
        product_id: i64,
        quantity: i32,
        now: i64,
    ) -> Result<Option<i32>, BoxError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE products
            SET count_in_stock = count_in_stock + $2, updated_at = $3
            WHERE id = $1
            RETURNING count_in_stock
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(remaining,)| remaining))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, shipping_address, payment_method, items_price, tax_price,
                shipping_price, total_price, status, is_paid, paid_at, payment_result,
                gateway_order_id, delivered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_db())
        .bind(order.items_price)
        .bind(order.tax_price)
        .bind(order.shipping_price)
        .bind(order.total_price)
        .bind(order.status.as_db())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(Json))
        .bind(&order.gateway_order_id)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if !order.lines.is_empty() {
            let order_ids: Vec<i64> = order.lines.iter().map(|_| order.id).collect();
            let line_nos: Vec<i32> = (0..order.lines.len() as i32).collect();
            let product_ids: Vec<i64> = order.lines.iter().map(|l| l.product_id).collect();
            let names: Vec<String> = order.lines.iter().map(|l| l.name.clone()).collect();
            let images: Vec<Option<String>> =
                order.lines.iter().map(|l| l.image.clone()).collect();
            let prices: Vec<Decimal> = order.lines.iter().map(|l| l.price).collect();
            let quantities: Vec<i32> = order.lines.iter().map(|l| l.quantity).collect();
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, product_id, name, image, price, quantity)
                SELECT * FROM UNNEST($1::bigint[], $2::integer[], $3::bigint[], $4::text[], $5::text[], $6::numeric[], $7::integer[])
                "#,
            )
            .bind(&order_ids)
            .bind(&line_nos)
            .bind(&product_ids)
            .bind(&names)
            .bind(&images)
            .bind(&prices)
            .bind(&quantities)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>, BoxError> {
        load_order(&mut self.tx, order_id, true).await
    }

    async fn lock_order_by_gateway_id(
        &mut self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, BoxError> {
        let row: Option<OrderRow> =
            sqlx::query_as(select_orders!("WHERE gateway_order_id = $1 FOR UPDATE"))
                .bind(gateway_order_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(attach_lines(&mut self.tx, vec![row]).await?.pop())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), BoxError> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, is_paid = $3, paid_at = $4, payment_result = $5,
                delivered_at = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status.as_db())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(Json))
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn record_webhook_event(
        &mut self,
        event_id: &str,
        event_type: &str,
        now: i64,
    ) -> Result<bool, BoxError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), BoxError> {
        let uow = *self;
        uow.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), BoxError> {
        let uow = *self;
        uow.tx.rollback().await?;
        Ok(())
    }
}

// ── Shared row loaders ──

async fn load_order(
    conn: &mut PgConnection,
    order_id: i64,
    lock: bool,
) -> Result<Option<Order>, BoxError> {
    let query = if lock {
        select_orders!("WHERE id = $1 FOR UPDATE")
    } else {
        select_orders!("WHERE id = $1")
    };
    let row: Option<OrderRow> = sqlx::query_as(query)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(attach_lines(conn, vec![row]).await?.pop())
}

async fn attach_lines(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, BoxError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let line_rows: Vec<OrderLineRow> = sqlx::query_as(
        r#"
        SELECT order_id, product_id, name, image, price, quantity
        FROM order_lines
        WHERE order_id = ANY($1)
        ORDER BY order_id, line_no
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<i64, Vec<OrderLine>> = HashMap::new();
    for l in line_rows {
        by_order.entry(l.order_id).or_default().push(OrderLine {
            product_id: l.product_id,
            name: l.name,
            image: l.image,
            price: l.price,
            quantity: l.quantity,
        });
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect()
}

async fn load_cart(
    conn: &mut PgConnection,
    user_id: i64,
    lock: bool,
) -> Result<Option<Cart>, BoxError> {
    let query = if lock {
        "SELECT updated_at FROM carts WHERE user_id = $1 FOR UPDATE"
    } else {
        "SELECT updated_at FROM carts WHERE user_id = $1"
    };
    let header: Option<(i64,)> = sqlx::query_as(query)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some((updated_at,)) = header else {
        return Ok(None);
    };

    let lines: Vec<CartLine> = sqlx::query_as(
        "SELECT product_id, name, image, price, quantity FROM cart_lines WHERE user_id = $1 ORDER BY line_no",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Cart {
        user_id,
        lines,
        updated_at,
    }))
}
