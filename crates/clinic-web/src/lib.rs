//! # 门诊排队 HTTP 接口
//!
//! 将排队引擎的各项操作以 JSON 形式对外提供，供挂号台、分诊台、诊室工作站和公共大屏调用

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use metrics::QueueMetrics;
pub use server::{router, WebServer};
pub use state::AppState;
