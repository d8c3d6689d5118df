//! Inventory adapter over the catalog's products table
//!
//! The order flow only ever touches the `quantity` and `available` columns;
//! everything else about the catalog belongs to its own service.

use sqlx::PgPool;
use tracing::info;

use crate::models::OrderLineItem;

/// Inventory repository
#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    /// Create a new inventory repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Decrement stock for every line item of an order being assembled.
    ///
    /// Each product's quantity drops by the ordered amount and its
    /// availability flag is recomputed from the remainder. All items are
    /// written in one transaction so a failure mid-list leaves no
    /// half-applied decrement.
    pub async fn apply_line_items(&self, items: &[OrderLineItem]) -> sqlx::Result<()> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            let remaining = item.quantity - item.c_quantity;
            let available = remaining > 0;

            info!(
                "Product {}: quantity {} -> {}, available = {}",
                item.product_id, item.quantity, remaining, available
            );

            sqlx::query(
                r#"
                UPDATE products
                SET quantity = $2, available = $3
                WHERE product_id = $1
                "#,
            )
            .bind(item.product_id)
            .bind(remaining)
            .bind(available)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
