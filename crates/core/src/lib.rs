//! Cartwright Core - Shared types and pure commerce rules.
//!
//! This crate provides the pieces used by every Cartwright component:
//! - `storefront` - Authoritative cart, checkout and account services
//! - `client` - Optimistic cart replica
//! - `cli` - Migrations, catalog import and order administration
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP clients. Anything here can be called at any time
//! without side effects, which is what makes price resolution and stock
//! validation safe to re-run at every write.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, card numbers and statuses
//! - [`catalog`] - Products, variants and flash sales
//! - [`cart`] - Cart lines merged on product and variant
//! - [`pricing`] - Effective unit price resolution
//! - [`stock`] - Stock validation against inventory counts
//! - [`collection`] - Owned lists with exactly one default element
//! - [`api`] - JSON wire types shared by the storefront and its clients

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod collection;
pub mod pricing;
pub mod stock;
pub mod types;

pub use cart::{Cart, CartItem, LineKey};
pub use catalog::{FlashSale, Product, VariantGroup, VariantOption};
pub use collection::{CollectionError, DefaultCollection, DefaultFlag};
pub use pricing::{compare_at_price, flash_sale_active, resolve_price};
pub use stock::{StockCheck, StockRequest, StockShortfall};
pub use types::*;
