mod memory;
mod rocks;
mod traits;

pub use memory::MemoryStorage;
pub use rocks::RocksStorage;
pub use traits::{Storage, StorageStats};
