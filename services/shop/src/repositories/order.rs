//! Order repository for database operations

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewOrder, Order, OrderStatus, OrderWithOwner};

fn order_from_row(row: &PgRow) -> sqlx::Result<Order> {
    let status: String = row.get("order_status");

    Ok(Order {
        order_id: row.get("order_id"),
        user_id: row.get("user_id"),
        order_info: row.get("order_info"),
        order_name: row.get("order_name"),
        order_status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        seen: row.get("seen"),
        created_at: row.get("created_at"),
    })
}

const ORDER_COLUMNS: &str =
    "order_id, user_id, order_info, order_name, order_status, seen, created_at";

/// Order repository
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order
    pub async fn create(&self, new_order: &NewOrder) -> sqlx::Result<Order> {
        info!(
            "Creating order {} for user {}",
            new_order.order_id, new_order.user_id
        );

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (order_id, user_id, order_info, order_name, order_status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(new_order.order_id)
        .bind(new_order.user_id)
        .bind(&new_order.order_info)
        .bind(&new_order.order_name)
        .bind(new_order.order_status.as_str())
        .fetch_one(&self.pool)
        .await?;

        order_from_row(&row)
    }

    /// Find an order by ID
    pub async fn find_by_id(&self, order_id: Uuid) -> sqlx::Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE order_id = $1
            "#
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    /// Update an order's status and seen flag
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        seen: bool,
    ) -> sqlx::Result<()> {
        info!("Order {} -> {}", order_id, status);

        sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2, seen = $3
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Force an order's status, leaving the seen flag untouched
    pub async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> sqlx::Result<()> {
        info!("Order {} -> {}", order_id, status);

        sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List a user's orders, newest first
    pub async fn list_by_user(&self, user_id: Uuid) -> sqlx::Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    /// List every order joined with its owner, for the admin view
    pub async fn list_all(&self) -> sqlx::Result<Vec<OrderWithOwner>> {
        let rows = sqlx::query(
            r#"
            SELECT orders.order_id, orders.user_id, orders.order_info, orders.order_name,
                   orders.order_status, orders.seen, orders.created_at,
                   users.login, users.email
            FROM orders
            LEFT JOIN users ON users.id = orders.user_id
            ORDER BY orders.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderWithOwner {
                    order: order_from_row(row)?,
                    login: row.get("login"),
                    email: row.get("email"),
                })
            })
            .collect()
    }
}
