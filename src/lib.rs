//! Transactional batch order creation.
//!
//! Orders and their items are written through a [`storage::UnitOfWork`] in a
//! single transaction, and one `OrderCreated` event per order is handed to an
//! [`messaging::EventPublisher`] before the commit.

pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
