//! Bulk provisioning of Google Cloud service accounts.
//!
//! A single user account may hold a handful of projects and every project
//! may hold at most 100 service accounts. The [`ServiceAccountFactory`]
//! fills that envelope: it creates projects, enables the required APIs,
//! tops every project up to the account cap and exports one credential
//! key per account.

pub mod error;
pub mod factory;
pub mod http;
pub mod id;
pub mod keys;
pub mod model;
pub mod operation;
pub mod target;

#[cfg(test)]
mod testutil;

pub use error::Error;
pub use factory::{FactoryConfig, ServiceAccountFactory};
pub use target::TargetSelector;
