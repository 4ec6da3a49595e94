//! 队列视图
//!
//! 从完整记录集纯推导各屏幕所需的有序、过滤后的队列，不修改任何记录

use clinic_core::{Department, PatientRecord, PatientStatus, Priority};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 排序方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// 紧急优先，其次先到先得
    #[default]
    Priority,
    /// 仅按登记时间
    Arrival,
}

/// 队列过滤器
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueueFilter {
    pub statuses: Option<Vec<PatientStatus>>,
    pub department: Option<Department>,
    pub room: Option<String>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub order: QueueOrder,
    pub limit: Option<usize>,
}

impl QueueFilter {
    /// 全部记录
    pub fn all() -> Self {
        Self::default()
    }

    /// 挂号台：全部记录按登记时间
    pub fn reception() -> Self {
        Self {
            order: QueueOrder::Arrival,
            ..Default::default()
        }
    }

    /// 分诊台：等待分诊，紧急优先
    pub fn triage() -> Self {
        Self::with_statuses(vec![PatientStatus::Waiting])
    }

    /// 诊室候诊队列
    pub fn room_queue(room: &str) -> Self {
        Self {
            room: Some(room.to_string()),
            ..Self::with_statuses(vec![PatientStatus::WaitingConsultation])
        }
    }

    /// 科室工作人员队列
    pub fn department_queue(department: Department) -> Self {
        Self {
            department: Some(department),
            ..Self::with_statuses(vec![PatientStatus::WaitingConsultation])
        }
    }

    /// 公共大屏的总队列：等待分诊与分诊中
    pub fn general_display() -> Self {
        Self::with_statuses(vec![PatientStatus::Waiting, PatientStatus::InTriage])
    }

    pub fn with_statuses(statuses: Vec<PatientStatus>) -> Self {
        Self {
            statuses: Some(statuses),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &PatientRecord) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&record.status) {
                return false;
            }
        }
        if let Some(department) = self.department {
            if record.department != department {
                return false;
            }
        }
        if let Some(room) = &self.room {
            if record.assigned_room.as_deref() != Some(room.as_str()) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if record.priority != priority {
                return false;
            }
        }
        true
    }
}

/// 紧急优先、先到先得、号码兜底
pub fn priority_order(a: &PatientRecord, b: &PatientRecord) -> Ordering {
    (a.priority, a.timestamp, a.number).cmp(&(b.priority, b.timestamp, b.number))
}

/// 登记时间、号码兜底
pub fn arrival_order(a: &PatientRecord, b: &PatientRecord) -> Ordering {
    (a.timestamp, a.number).cmp(&(b.timestamp, b.number))
}

/// 推导队列视图
///
/// 幂等且无副作用：同一输入总是得到同样的顺序。
pub fn project(records: &[PatientRecord], filter: &QueueFilter) -> Vec<PatientRecord> {
    let mut items: Vec<&PatientRecord> = records.iter().filter(|r| filter.matches(r)).collect();

    match filter.order {
        QueueOrder::Priority => items.sort_by(|a, b| priority_order(a, b)),
        QueueOrder::Arrival => items.sort_by(|a, b| arrival_order(a, b)),
    }

    let limit = filter.limit.unwrap_or(items.len());
    items.into_iter().take(limit).cloned().collect()
}
