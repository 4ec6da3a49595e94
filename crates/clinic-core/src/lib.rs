//! # Clinic Core
//!
//! 排队系统的核心模块，提供患者记录数据结构、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{QueueError, Result};
pub use models::*;
