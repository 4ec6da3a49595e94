//! 核心数据模型定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueueError;

/// 科室
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    General,      // 全科
    Consultation, // 专家门诊
    Emergency,    // 急诊
    Pediatrics,   // 儿科
    Orthopedics,  // 骨科
}

impl Department {
    pub fn all() -> [Department; 5] {
        [
            Department::General,
            Department::Consultation,
            Department::Emergency,
            Department::Pediatrics,
            Department::Orthopedics,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::General => "General",
            Department::Consultation => "Consultation",
            Department::Emergency => "Emergency",
            Department::Pediatrics => "Pediatrics",
            Department::Orthopedics => "Orthopedics",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::all()
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| QueueError::Validation(format!("Unknown department: {}", s)))
    }
}

/// 患者类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    #[default]
    New,       // 初诊
    Returning, // 复诊
    Followup,  // 预约随访
}

/// 患者状态
///
/// `waiting` 为唯一初始状态，`completed` 为终止状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PatientStatus {
    Waiting,             // 等待分诊
    InTriage,            // 分诊中
    WaitingConsultation, // 等待就诊
    #[serde(alias = "in-consultation")]
    InService, // 就诊中
    Completed, // 已完成
}

impl PatientStatus {
    pub fn all() -> [PatientStatus; 5] {
        [
            PatientStatus::Waiting,
            PatientStatus::InTriage,
            PatientStatus::WaitingConsultation,
            PatientStatus::InService,
            PatientStatus::Completed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Waiting => "waiting",
            PatientStatus::InTriage => "in-triage",
            PatientStatus::WaitingConsultation => "waiting-consultation",
            PatientStatus::InService => "in-service",
            PatientStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PatientStatus::Completed)
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 优先级，紧急排在普通之前
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    Normal,
}

impl Priority {
    /// 登记时确定优先级，之后不再变化
    pub fn at_registration(department: Department, is_emergency: bool) -> Self {
        if is_emergency || department == Department::Emergency {
            Priority::Urgent
        } else {
            Priority::Normal
        }
    }
}

/// 患者记录，每个号码一条
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: String,   // 号码标识，格式 T<number>
    pub number: u64,  // 顺序号
    pub name: String, // 显示姓名
    pub department: Department,
    #[serde(default)]
    pub patient_type: PatientType,
    pub status: PatientStatus,
    pub priority: Priority,
    pub timestamp: i64, // 登记时间 (epoch 毫秒)，FIFO 排序键
    #[serde(default)]
    pub called: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_room: Option<String>, // 接诊工作站，例如 dr1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_room: Option<String>, // 诊室短名，例如 Room 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_ended_at: Option<i64>,
    #[serde(default)]
    pub announcement_played: bool,
}

impl PatientRecord {
    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }

    /// 已叫号、正在就诊且尚未播报
    pub fn needs_announcement(&self) -> bool {
        self.called && self.status == PatientStatus::InService && !self.announcement_played
    }
}
