//! 患者状态机
//!
//! 管理患者从取号到就诊结束的状态转换

use clinic_core::{PatientStatus, QueueError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 患者状态转换事件（均由操作员触发）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PatientEvent {
    TriageCall,     // 分诊叫号
    TriageComplete, // 分诊完成
    RoomCall,       // 诊室叫号
    Complete,       // 就诊结束
}

impl fmt::Display for PatientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatientEvent::TriageCall => "triage-call",
            PatientEvent::TriageComplete => "triage-complete",
            PatientEvent::RoomCall => "room-call",
            PatientEvent::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// 患者状态机
#[derive(Debug, Clone)]
pub struct PatientStateMachine {
    transitions: HashMap<(PatientStatus, PatientEvent), PatientStatus>,
}

impl PatientStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert(
            (PatientStatus::Waiting, PatientEvent::TriageCall),
            PatientStatus::InTriage,
        );
        transitions.insert(
            (PatientStatus::InTriage, PatientEvent::TriageComplete),
            PatientStatus::WaitingConsultation,
        );
        transitions.insert(
            (PatientStatus::WaitingConsultation, PatientEvent::RoomCall),
            PatientStatus::InService,
        );
        transitions.insert(
            (PatientStatus::InService, PatientEvent::Complete),
            PatientStatus::Completed,
        );

        Self { transitions }
    }

    /// 登记后的初始状态
    pub fn initial_state() -> PatientStatus {
        PatientStatus::Waiting
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: PatientStatus, event: PatientEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: PatientStatus, event: PatientEvent) -> Result<PatientStatus> {
        self.transitions
            .get(&(from, event))
            .copied()
            .ok_or_else(|| QueueError::InvalidStateTransition {
                from: from.to_string(),
                event: event.to_string(),
            })
    }
}

impl Default for PatientStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
