//! 取号器
//!
//! 原子地分配下一个顺序号，并发调用方永远不会拿到同一个号码

use clinic_core::{QueueError, Result};
use clinic_store::QueueStore;
use std::sync::Arc;
use tracing::{info, warn};

/// 取号器
pub struct TokenIssuer {
    store: Arc<dyn QueueStore>,
    counter_key: String,
    max_attempts: u32,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn QueueStore>, counter_key: &str, max_attempts: u32) -> Self {
        Self {
            store,
            counter_key: counter_key.to_string(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// 分配下一个号码
    ///
    /// 重试耗尽或存储故障都报告为取号失败，计数器不会被部分修改。
    pub async fn next_token(&self) -> Result<u64> {
        match self.store.increment(&self.counter_key, self.max_attempts).await {
            Ok(number) => {
                info!("Allocated token number {}", number);
                Ok(number)
            }
            Err(QueueError::Allocation(message)) => {
                warn!("Token allocation failed: {}", message);
                Err(QueueError::Allocation(message))
            }
            Err(e) => {
                warn!("Token allocation failed on store error: {}", e);
                Err(QueueError::Allocation(format!(
                    "Counter {} unavailable: {}",
                    self.counter_key, e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clinic_store::{MemoryStore, Subscription, WriteGuard};
    use serde_json::{Map, Value};
    use std::collections::HashSet;

    /// 计数器上的比较交换永远失败，模拟持续冲突
    struct ContendedStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl QueueStore for ContendedStore {
        async fn get(&self, path: &str) -> Result<Option<Value>> {
            self.inner.get(path).await
        }

        async fn set(&self, path: &str, value: Value) -> Result<()> {
            self.inner.set(path, value).await
        }

        async fn update(
            &self,
            path: &str,
            fields: Map<String, Value>,
            guard: Option<&WriteGuard>,
        ) -> Result<()> {
            self.inner.update(path, fields, guard).await
        }

        async fn compare_and_swap(
            &self,
            _path: &str,
            _expected: Option<&Value>,
            _new: Option<Value>,
        ) -> Result<bool> {
            Ok(false)
        }

        async fn subscribe(&self, path: &str) -> Result<Subscription> {
            self.inner.subscribe(path).await
        }
    }

    #[tokio::test]
    async fn test_sequential_tokens() {
        let issuer = TokenIssuer::new(Arc::new(MemoryStore::new()), "counter", 5);
        assert_eq!(issuer.next_token().await.unwrap(), 1);
        assert_eq!(issuer.next_token().await.unwrap(), 2);
        assert_eq!(issuer.next_token().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_counter_untouched() {
        let store = Arc::new(ContendedStore {
            inner: MemoryStore::new(),
        });
        store.set("counter", Value::from(7u64)).await.unwrap();

        let issuer = TokenIssuer::new(store.clone(), "counter", 3);
        let err = issuer.next_token().await.unwrap_err();

        assert!(matches!(err, QueueError::Allocation(_)));
        assert_eq!(store.get("counter").await.unwrap(), Some(Value::from(7u64)));
    }

    #[tokio::test]
    async fn test_store_failure_reported_as_allocation() {
        let store = Arc::new(MemoryStore::new());
        store.set("counter", Value::from("broken")).await.unwrap();

        let issuer = TokenIssuer::new(store, "counter", 3);
        assert!(matches!(
            issuer.next_token().await,
            Err(QueueError::Allocation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tokens_are_unique_and_gap_free() {
        let issuer = Arc::new(TokenIssuer::new(Arc::new(MemoryStore::new()), "counter", 1_000));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let issuer = issuer.clone();
                tokio::spawn(async move { issuer.next_token().await })
            })
            .collect();

        let mut numbers = HashSet::new();
        for handle in handles {
            let number = handle.await.unwrap().unwrap();
            assert!(numbers.insert(number), "duplicate token {}", number);
        }

        assert_eq!(numbers, (1..=32).collect::<HashSet<u64>>());
    }
}
