//! 订阅管理

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::store::paths_overlap;

/// 推送给订阅者的变更
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub path: String,
    pub value: Option<Value>,
}

#[derive(Debug)]
struct Subscriber {
    path: String,
    sender: mpsc::UnboundedSender<Notification>,
}

/// 订阅者注册表，由存储实现持有
///
/// 使用同步锁，以便 `Subscription` 在 Drop 时注销自己。
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 注册订阅并立即推送当前值
    pub fn register(self: &Arc<Self>, path: &str, current: Option<Value>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        // 接收端此时必然存活
        let _ = sender.send(Notification {
            path: path.to_string(),
            value: current,
        });

        let mut subscribers = self.lock();
        subscribers.insert(
            id,
            Subscriber {
                path: path.to_string(),
                sender,
            },
        );
        debug!("Registered subscription {} on {}", id, path);

        Subscription {
            id,
            path: path.to_string(),
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    /// 向与写入路径相关的订阅者推送其路径上的完整值
    ///
    /// `read` 根据订阅路径读取当前值，调用方需在持有写锁时调用以保证推送顺序。
    pub fn notify<F>(&self, written_path: &str, read: F)
    where
        F: Fn(&str) -> Option<Value>,
    {
        let mut subscribers = self.lock();
        subscribers.retain(|id, subscriber| {
            if !paths_overlap(&subscriber.path, written_path) {
                return true;
            }
            let notification = Notification {
                path: subscriber.path.clone(),
                value: read(&subscriber.path),
            };
            let alive = subscriber.sender.send(notification).is_ok();
            if !alive {
                debug!("Dropping closed subscription {}", id);
            }
            alive
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: &Uuid) {
        if self.lock().remove(id).is_some() {
            debug!("Removed subscription {}", id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Subscriber>> {
        // 推送过程中不会 panic，锁中毒时沿用内部数据
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 订阅句柄，Drop 时自动取消订阅
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    path: String,
    receiver: mpsc::UnboundedReceiver<Notification>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 等待下一次变更，存储关闭后返回 None
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// 非阻塞地取出一条已到达的变更
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// 显式取消订阅
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_pushes_current_value() {
        let registry = SubscriberRegistry::new();
        let mut sub = registry.register("patients/tokens", Some(json!({"T1": {}})));

        let first = sub.recv().await.unwrap();
        assert_eq!(first.value, Some(json!({"T1": {}})));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_notify_only_overlapping_paths() {
        let registry = SubscriberRegistry::new();
        let mut tokens = registry.register("patients/tokens", None);
        let mut rooms = registry.register("rooms/occupancy", None);
        tokens.try_recv();
        rooms.try_recv();

        registry.notify("patients/tokens/T1", |path| Some(json!(path)));

        assert_eq!(tokens.try_recv().unwrap().value, Some(json!("patients/tokens")));
        assert!(rooms.try_recv().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = SubscriberRegistry::new();
        let sub = registry.register("counter", None);
        assert_eq!(registry.len(), 1);
        sub.unsubscribe();
        assert!(registry.is_empty());
    }
}
