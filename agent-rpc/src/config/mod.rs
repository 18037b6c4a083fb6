mod database;
pub use database::{Database, RocksDBCommon, RocksDBOptions, Wallet};

mod app;
pub use app::App;

mod transport;
pub use transport::{Transport, DEFAULT_CONTENT_TYPE};

mod agent;
pub use agent::Agent;

mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;
