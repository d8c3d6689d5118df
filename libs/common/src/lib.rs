//! Common library for the Florea backend
//!
//! This crate provides shared functionality used across the Florea
//! services, including database connectivity and error handling.

pub mod database;
pub mod error;
