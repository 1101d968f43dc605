//! Folio Database Library
//!
//! Project aggregate persistence: the repository trait, its PostgreSQL and in-memory
//! implementations, connection pool setup, and migrations.

pub mod db;

pub use db::{
    create_pool, create_project_repository, run_migrations, InMemoryProjectRepository,
    PostgresProjectRepository, ProjectRepositoryTrait,
};
