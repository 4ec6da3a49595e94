//! # Clinic Store
//!
//! 排队核心所依赖的存储协作方：键值树、原子比较交换与变更订阅。

pub mod memory;
pub mod store;
pub mod subscription;

pub use memory::MemoryStore;
pub use store::{join_path, path_segments, paths_overlap, QueueStore, WriteGuard};
pub use subscription::{Notification, SubscriberRegistry, Subscription};
