//! `portal-core` — shared domain primitives.
//!
//! Identifiers, the storage error model, and pagination types used by every
//! other crate in the workspace. No IO, no HTTP, no async.

pub mod error;
pub mod id;
pub mod page;

pub use error::{StoreError, StoreResult};
pub use id::{ProjectId, TaskId, UserId};
pub use page::{PageInfo, PageRequest};
