pub mod types;
pub mod compensation;
pub mod repository;
pub mod memory;

pub use compensation::Rollback;
pub use memory::MemoryStore;
pub use repository::Repository;
