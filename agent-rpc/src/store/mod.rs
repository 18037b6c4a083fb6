//! `store` is the RocksDB backed record store
//!
//! Records are written through [`repository::Repository`], one per wallet, opened and cached
//! by [`wallets::Wallets`]
pub mod bucket;
pub mod builder;
pub mod repository;
pub mod wallets;

pub use builder::open_executor;
pub use repository::Repository;
pub use wallets::Wallets;
