//! `mousedeck-core`: storefront domain building blocks.
//!
//! This crate contains **pure domain** types (no I/O): the catalog entities,
//! their validation rules, listing queries, the shopping cart and the wire
//! shape of push notifications shared by server and client.

pub mod cart;
pub mod category;
pub mod error;
pub mod id;
pub mod mouse;
pub mod push;
pub mod query;

pub use cart::{Cart, CartLine};
pub use category::{Category, CategoryPatch, NewCategory};
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, EntityId, MouseId, TempIdGenerator};
pub use mouse::{Mouse, MousePatch, NewMouse};
pub use push::{DeletedRef, PushMessage, PushMeta};
pub use query::{Listing, MouseFilter, Page, ListQuery, SortOrder, DEFAULT_PAGE_SIZE};
