//! Infrastructure layer: catalog persistence (in-memory and PostgreSQL).

pub mod db;
pub mod repository;
pub mod seed;

pub use repository::{
    CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository, RepositoryError,
    RepositoryResult,
};
