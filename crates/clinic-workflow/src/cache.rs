//! 队列缓存
//!
//! 订阅号码表，每次通知整体替换本地记录集。
//! 各屏幕从缓存读取快照，不必每次访问存储。

use clinic_core::{PatientRecord, Result};
use clinic_store::QueueStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::projection::{project, QueueFilter};
use crate::records::decode_records;

pub type RecordSet = Arc<Vec<PatientRecord>>;

/// 队列缓存
pub struct QueueCache {
    receiver: watch::Receiver<RecordSet>,
    task: Option<JoinHandle<()>>,
}

impl QueueCache {
    /// 订阅号码表并启动刷新任务
    ///
    /// 返回时缓存已持有订阅推送的首个快照。
    pub async fn start(store: Arc<dyn QueueStore>, tokens_path: &str) -> Result<Self> {
        let mut subscription = store.subscribe(tokens_path).await?;

        let initial = match subscription.recv().await {
            Some(notification) => decode_records(notification.value)?,
            None => Vec::new(),
        };
        info!(
            "Queue cache started on {} with {} records",
            tokens_path,
            initial.len()
        );

        let (sender, receiver) = watch::channel(Arc::new(initial));
        let task = tokio::spawn(async move {
            while let Some(notification) = subscription.recv().await {
                match decode_records(notification.value) {
                    Ok(records) => {
                        debug!("Queue cache refreshed with {} records", records.len());
                        sender.send_replace(Arc::new(records));
                    }
                    Err(e) => warn!("Keeping previous queue snapshot: {}", e),
                }
            }
            debug!("Queue cache subscription closed");
        });

        Ok(Self {
            receiver,
            task: Some(task),
        })
    }

    /// 当前快照，不阻塞
    pub fn snapshot(&self) -> RecordSet {
        self.receiver.borrow().clone()
    }

    /// 监听快照变化
    pub fn watch(&self) -> watch::Receiver<RecordSet> {
        self.receiver.clone()
    }

    pub fn project(&self, filter: &QueueFilter) -> Vec<PatientRecord> {
        project(&self.snapshot(), filter)
    }

    /// 停止刷新并退订
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Queue cache stopped");
    }
}

impl Drop for QueueCache {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
