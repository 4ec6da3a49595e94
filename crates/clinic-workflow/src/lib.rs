//! # 门诊排队工作流模块
//!
//! 提供从取号到就诊结束的完整排队流程，包括：
//! - 取号器：并发安全的顺序号分配
//! - 诊室目录与占用快照：诊室能力表及实时忙闲、候诊人数
//! - 诊室推荐引擎：按科室与急诊标记推荐诊室
//! - 患者状态机与叫号策略：分诊、诊室、科室三个叫号入口共用一条选择规则
//! - 队列视图与公共大屏：纯推导的有序队列、叫号播报和统计
//! - 队列缓存：订阅驱动的本地快照

pub mod availability;
pub mod cache;
pub mod call_policy;
pub mod display;
pub mod engine;
pub mod projection;
pub mod records;
pub mod rooms;
pub mod routing;
pub mod state_machine;
pub mod token;

#[cfg(test)]
mod testing;

// 重新导出主要类型
pub use availability::{AvailabilitySnapshot, RoomLoad, RoomOccupant, RoomState};
pub use cache::{QueueCache, RecordSet};
pub use call_policy::{select_next, CallPolicy, CallScope, CallSite, Stage};
pub use display::{Announcement, DisplayBoard, QueueStats, RoomPanel, RoomStats};
pub use engine::{QueueEngine, Registration, RegistrationRequest, WorkflowConfig};
pub use projection::{project, QueueFilter, QueueOrder};
pub use rooms::{RoomCatalog, RoomSpec};
pub use routing::{
    Confidence, ExistingPatientRecommendation, RoomOption, RoomRecommendation, RoomRecommender,
};
pub use state_machine::{PatientEvent, PatientStateMachine};
pub use token::TokenIssuer;
