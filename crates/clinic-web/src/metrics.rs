//! Prometheus 指标

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// 排队指标，仅做简单计数
#[derive(Debug, Clone)]
pub struct QueueMetrics {
    registry: Registry,
    registrations_total: IntCounter,
    calls_total: IntCounterVec,
    completions_total: IntCounterVec,
    rejections_total: IntCounterVec,
}

impl QueueMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let registrations_total = IntCounter::with_opts(Opts::new(
            "clinic_registrations_total",
            "Total number of issued tokens",
        ))?;

        let calls_total = IntCounterVec::new(
            Opts::new("clinic_calls_total", "Total number of patients called"),
            &["stage"],
        )?;

        let completions_total = IntCounterVec::new(
            Opts::new("clinic_completions_total", "Total number of completed stages"),
            &["stage"],
        )?;

        let rejections_total = IntCounterVec::new(
            Opts::new("clinic_rejections_total", "Rejected operator actions by error kind"),
            &["kind"],
        )?;

        registry.register(Box::new(registrations_total.clone()))?;
        registry.register(Box::new(calls_total.clone()))?;
        registry.register(Box::new(completions_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            registry,
            registrations_total,
            calls_total,
            completions_total,
            rejections_total,
        })
    }

    pub fn record_registration(&self) {
        self.registrations_total.inc();
    }

    pub fn record_call(&self, stage: &str) {
        self.calls_total.with_label_values(&[stage]).inc();
    }

    pub fn record_completion(&self, stage: &str) {
        self.completions_total.with_label_values(&[stage]).inc();
    }

    pub fn record_rejection(&self, kind: &str) {
        self.rejections_total.with_label_values(&[kind]).inc();
    }

    /// 文本格式导出
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}
