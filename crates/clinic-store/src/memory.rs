//! 内存存储
//!
//! 以 JSON 文档树实现的参考存储，所有写操作在同一把写锁内完成，
//! 因而比较交换与条件更新都是原子的。

use async_trait::async_trait;
use clinic_core::{QueueError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{path_segments, QueueStore, WriteGuard};
use crate::subscription::{SubscriberRegistry, Subscription};

/// 内存存储
#[derive(Debug)]
pub struct MemoryStore {
    root: RwLock<Value>,
    registry: Arc<SubscriberRegistry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            registry: SubscriberRegistry::new(),
        }
    }

    /// 当前订阅数
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    fn write_and_notify(&self, root: &mut Value, path: &str, value: Option<Value>) -> Result<()> {
        write_at(root, path, value)?;
        let snapshot: &Value = root;
        self.registry
            .notify(path, |sub_path| read_at(snapshot, sub_path).cloned());
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let root = self.root.read().await;
        Ok(read_at(&root, path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let mut root = self.root.write().await;
        self.write_and_notify(&mut root, path, Some(value))
    }

    async fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
        guard: Option<&WriteGuard>,
    ) -> Result<()> {
        let mut root = self.root.write().await;

        let mut document = match read_at(&root, path) {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(QueueError::Store(format!("Path {} is not a document", path)));
            }
            None => return Err(QueueError::NotFound(format!("Document {} not found", path))),
        };

        if let Some(guard) = guard {
            let actual = document.get(&guard.field).cloned().unwrap_or(Value::Null);
            if actual != guard.expected {
                return Err(QueueError::StaleState {
                    token_id: path_segments(path).last().unwrap_or(&path).to_string(),
                    expected: render(&guard.expected),
                    actual: render(&actual),
                });
            }
        }

        for (key, value) in fields {
            if value.is_null() {
                document.remove(&key);
            } else {
                document.insert(key, value);
            }
        }

        self.write_and_notify(&mut root, path, Some(Value::Object(document)))
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&Value>,
        new: Option<Value>,
    ) -> Result<bool> {
        let mut root = self.root.write().await;

        if read_at(&root, path) != expected {
            debug!("Compare-and-swap on {} rejected", path);
            return Ok(false);
        }

        self.write_and_notify(&mut root, path, new)?;
        Ok(true)
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        // 持有读锁注册，保证首个推送与后续变更之间没有遗漏
        let root = self.root.read().await;
        Ok(self.registry.register(path, read_at(&root, path).cloned()))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "<absent>".to_string(),
        other => other.to_string(),
    }
}

fn read_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path_segments(path)
        .into_iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn write_at(root: &mut Value, path: &str, value: Option<Value>) -> Result<()> {
    let segments = path_segments(path);
    let Some((last, parents)) = segments.split_last() else {
        return Err(QueueError::Store("Cannot overwrite the store root".to_string()));
    };

    let mut node = root;
    for segment in parents {
        let map = node
            .as_object_mut()
            .ok_or_else(|| QueueError::Store(format!("Path {} crosses a leaf value", path)))?;
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let map = node
        .as_object_mut()
        .ok_or_else(|| QueueError::Store(format!("Path {} crosses a leaf value", path)))?;
    match value {
        Some(value) => {
            map.insert(last.to_string(), value);
        }
        None => {
            map.remove(*last);
        }
    }
    Ok(())
}
