//! 存储协作方接口
//!
//! 排队核心只把存储视为一个键值树：按路径读写、带条件的合并更新、
//! 原子比较交换，以及按路径订阅变更。

use async_trait::async_trait;
use clinic_core::{QueueError, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::subscription::Subscription;

/// 条件写入的前置条件：目标文档中 `field` 的当前值必须等于 `expected`
#[derive(Debug, Clone, PartialEq)]
pub struct WriteGuard {
    pub field: String,
    pub expected: Value,
}

impl WriteGuard {
    pub fn new(field: &str, expected: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            expected: expected.into(),
        }
    }
}

/// 存储协作方
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// 读取路径上的时间点快照，不存在时返回 None
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// 整体写入路径
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// 合并写入指定字段，不触碰其它字段；字段值为 null 表示删除该字段
    ///
    /// 文档不存在时返回 `NotFound`，前置条件不满足时返回 `StaleState`。
    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        guard: Option<&WriteGuard>,
    ) -> Result<()>;

    /// 原子比较交换，`None` 表示不存在
    ///
    /// 当前值与 `expected` 相同才写入 `new` 并返回 true，否则不做任何修改并返回 false。
    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&Value>,
        new: Option<Value>,
    ) -> Result<bool>;

    /// 订阅路径，立即推送一次当前值，之后每次相关写入都推送完整值
    async fn subscribe(&self, path: &str) -> Result<Subscription>;

    /// 原子递增计数器并返回新值
    ///
    /// 读-改-写加乐观重试，最多尝试 `max_attempts` 次；失败时计数器保持不变。
    async fn increment(&self, key: &str, max_attempts: u32) -> Result<u64> {
        for attempt in 1..=max_attempts {
            let current = self.get(key).await?;
            let value = match &current {
                None => 0,
                Some(v) => v.as_u64().ok_or_else(|| {
                    QueueError::Store(format!("Counter {} holds a non-integer value", key))
                })?,
            };

            let next = value.checked_add(1).ok_or_else(|| {
                QueueError::Allocation(format!("Counter {} is exhausted", key))
            })?;
            if self
                .compare_and_swap(key, current.as_ref(), Some(Value::from(next)))
                .await?
            {
                return Ok(next);
            }

            debug!("Counter {} changed concurrently, retrying (attempt {})", key, attempt);
        }

        Err(QueueError::Allocation(format!(
            "Counter {} did not commit after {} attempts",
            key, max_attempts
        )))
    }
}

/// 将路径拆分为段，忽略多余的分隔符
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// 拼接路径
pub fn join_path(base: &str, child: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", base, child.trim_start_matches('/'))
    }
}

/// 两个路径是否存在祖先/后代关系（含相等）
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let a = path_segments(a);
    let b = path_segments(b);
    let shared = a.len().min(b.len());
    a[..shared] == b[..shared]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/patients//tokens/T1/"), vec!["patients", "tokens", "T1"]);
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("patients/tokens", "T3"), "patients/tokens/T3");
        assert_eq!(join_path("patients/tokens/", "/T3"), "patients/tokens/T3");
        assert_eq!(join_path("", "counter"), "counter");
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("patients/tokens", "patients/tokens/T1"));
        assert!(paths_overlap("patients/tokens/T1", "patients"));
        assert!(paths_overlap("counter", "counter"));
        assert!(!paths_overlap("patients/tokens", "rooms/occupancy"));
        assert!(!paths_overlap("patients/tokens", "patients/tokensX"));
    }
}
