//! Shop service models

pub mod order;
pub mod token;
pub mod user;

// Re-export for convenience
pub use order::{NewOrder, Order, OrderLineItem, OrderStatus, OrderWithOwner};
pub use token::RefreshToken;
pub use user::{NewUser, User};
