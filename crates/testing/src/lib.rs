//! Testing utilities for the storefront platform.
//!
//! Fixtures and builders for the domain entities, plus an in-memory
//! unit-of-work factory so persistence behavior can be exercised without a
//! database.
//!
//! # Examples
//!
//! ```
//! use storefront_testing::{builders::ProductBuilder, fixtures::memory_unit_of_work};
//!
//! let (store, uow) = memory_unit_of_work();
//! let product = ProductBuilder::new().with_name("Oud Royal").build();
//! ```

pub mod builders;
pub mod fixtures;

pub use builders::*;
pub use fixtures::*;

// Re-export testing dependencies for convenience
pub use fake;
pub use proptest;
