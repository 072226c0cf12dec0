pub mod config;
pub mod db;
pub mod memory;

pub use config::SledConfig;
pub use db::{HashDB, SledDB, StoreError};
pub use memory::MemoryDB;
