//! Shop service repositories

pub mod inventory;
pub mod order;
pub mod token;
pub mod user;

// Re-export for convenience
pub use inventory::InventoryRepository;
pub use order::OrderRepository;
pub use token::TokenRepository;
pub use user::UserRepository;
