//! Database repositories for data access layer
//!
//! Each repository persists one aggregate root together with its child rows.

pub mod memory;
pub mod pool;
pub mod project;

pub use memory::InMemoryProjectRepository;
pub use pool::{create_pool, run_migrations};
pub use project::{create_project_repository, PostgresProjectRepository, ProjectRepositoryTrait};
