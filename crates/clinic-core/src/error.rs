//! 错误定义模块

use thiserror::Error;

/// 排队系统统一错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("取号失败: {0}")]
    Allocation(String),

    #[error("队列为空: {0}")]
    EmptyQueue(String),

    #[error("状态已过期: 记录 {token_id} 期望状态 {expected}, 实际为 {actual}")]
    StaleState {
        token_id: String,
        expected: String,
        actual: String,
    },

    #[error("诊室已被占用: {room} 正在接诊 {occupant}")]
    RoomConflict { room: String, occupant: String },

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("无效状态转换: 从 {from} 执行 {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("存储错误: {0}")]
    Store(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),
}

impl QueueError {
    /// 操作员可在调用处恢复的错误（重试或换一个操作）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QueueError::Allocation(_)
                | QueueError::EmptyQueue(_)
                | QueueError::StaleState { .. }
                | QueueError::RoomConflict { .. }
                | QueueError::NotFound(_)
                | QueueError::Validation(_)
                | QueueError::InvalidStateTransition { .. }
        )
    }

    /// 错误类别名，用于日志和指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::Allocation(_) => "allocation",
            QueueError::EmptyQueue(_) => "empty_queue",
            QueueError::StaleState { .. } => "stale_state",
            QueueError::RoomConflict { .. } => "room_conflict",
            QueueError::NotFound(_) => "not_found",
            QueueError::Validation(_) => "validation",
            QueueError::InvalidStateTransition { .. } => "invalid_transition",
            QueueError::Store(_) => "store",
            QueueError::Serialization(_) => "serialization",
            QueueError::Config(_) => "config",
        }
    }
}

/// 排队系统统一结果类型
pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(QueueError::EmptyQueue("triage".to_string()).is_recoverable());
        assert!(QueueError::RoomConflict {
            room: "Consultation room 1".to_string(),
            occupant: "T1".to_string(),
        }
        .is_recoverable());
        assert!(!QueueError::Store("disconnected".to_string()).is_recoverable());
        assert!(!QueueError::Config("empty catalog".to_string()).is_recoverable());
    }

    #[test]
    fn test_kind_labels() {
        let err = QueueError::StaleState {
            token_id: "T3".to_string(),
            expected: "waiting".to_string(),
            actual: "in-triage".to_string(),
        };
        assert_eq!(err.kind(), "stale_state");
        assert!(err.to_string().contains("T3"));
    }
}
