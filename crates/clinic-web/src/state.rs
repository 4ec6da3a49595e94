//! 共享应用状态

use clinic_core::{PatientRecord, QueueError, Result};
use clinic_workflow::{QueueCache, QueueEngine};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::metrics::QueueMetrics;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueueEngine>,
    /// 存在时只读视图从缓存读取
    pub cache: Option<Arc<QueueCache>>,
    pub metrics: QueueMetrics,
}

impl AppState {
    pub fn new(engine: Arc<QueueEngine>, metrics: QueueMetrics) -> Self {
        Self {
            engine,
            cache: None,
            metrics,
        }
    }

    pub fn with_cache(mut self, cache: Arc<QueueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 只读视图使用的记录集
    pub async fn records(&self) -> Result<Vec<PatientRecord>> {
        match &self.cache {
            Some(cache) => Ok(cache.snapshot().as_ref().clone()),
            None => self.engine.snapshot().await,
        }
    }

    /// 记录被拒绝的操作
    pub fn reject(&self, error: QueueError) -> ApiError {
        match &error {
            QueueError::EmptyQueue(_) => debug!("Nothing to call: {}", error),
            _ => warn!("Rejected request: {}", error),
        }
        self.metrics.record_rejection(error.kind());
        ApiError(error)
    }
}
