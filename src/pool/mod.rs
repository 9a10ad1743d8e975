mod manager;

pub use manager::{acquire, PoolManager, PoolStatus};
