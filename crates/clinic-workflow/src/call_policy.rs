//! 叫号策略
//!
//! 三个叫号入口（分诊、诊室、科室工作人员）共用同一条选择规则：
//! 紧急层非空时取其中登记最早者，否则取普通层登记最早者。
//! 入口之间的差异只体现在 `CallPolicy` 的配置值上。

use clinic_core::{Department, PatientRecord, PatientStatus, Priority};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::state_machine::PatientEvent;

/// 叫号阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Triage,
    Consultation,
}

/// 叫号入口
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "site", rename_all = "lowercase")]
pub enum CallSite {
    /// 分诊台：候诊池为全部 waiting 记录
    Triage,
    /// 医生诊室：优先本诊室，本诊室无人时放宽到全部诊室
    Room { room: String },
    /// 科室工作人员：限定科室，不放宽；接诊地点为 `room`
    Staff { department: Department, room: String },
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Triage => f.write_str("triage"),
            CallSite::Room { room } => f.write_str(room),
            CallSite::Staff { department, room } => write!(f, "{} staff at {}", department, room),
        }
    }
}

/// 候选范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallScope {
    Any,
    Room(String),
    Department(Department),
}

impl CallScope {
    pub fn matches(&self, record: &PatientRecord) -> bool {
        match self {
            CallScope::Any => true,
            CallScope::Room(room) => record.assigned_room.as_deref() == Some(room.as_str()),
            CallScope::Department(department) => record.department == *department,
        }
    }
}

/// 叫号策略配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    pub event: PatientEvent,
    pub source: PatientStatus,
    pub scope: CallScope,
    /// 范围内无候选时是否放宽到全部候选
    pub widen: bool,
    /// 接诊诊室（诊室阶段必有）
    pub room: Option<String>,
}

impl CallSite {
    pub fn stage(&self) -> Stage {
        match self {
            CallSite::Triage => Stage::Triage,
            CallSite::Room { .. } | CallSite::Staff { .. } => Stage::Consultation,
        }
    }

    /// 入口对应的固定策略
    pub fn policy(&self) -> CallPolicy {
        match self {
            CallSite::Triage => CallPolicy {
                event: PatientEvent::TriageCall,
                source: PatientStatus::Waiting,
                scope: CallScope::Any,
                widen: false,
                room: None,
            },
            CallSite::Room { room } => CallPolicy {
                event: PatientEvent::RoomCall,
                source: PatientStatus::WaitingConsultation,
                scope: CallScope::Room(room.clone()),
                widen: true,
                room: Some(room.clone()),
            },
            CallSite::Staff { department, room } => CallPolicy {
                event: PatientEvent::RoomCall,
                source: PatientStatus::WaitingConsultation,
                scope: CallScope::Department(*department),
                widen: false,
                room: Some(room.clone()),
            },
        }
    }
}

impl CallPolicy {
    /// 按策略从记录集中选出下一位患者，不修改任何记录
    pub fn select<'a>(&self, records: &'a [PatientRecord]) -> Option<&'a PatientRecord> {
        let pool: Vec<&PatientRecord> =
            records.iter().filter(|r| r.status == self.source).collect();

        let scoped: Vec<&PatientRecord> =
            pool.iter().copied().filter(|r| self.scope.matches(r)).collect();

        if let Some(chosen) = select_next(scoped.iter().copied()) {
            return Some(chosen);
        }

        if self.widen && !pool.is_empty() {
            debug!("No candidate in scope {:?}, widening to all rooms", self.scope);
            return select_next(pool.into_iter());
        }

        None
    }
}

/// 两层选择规则：紧急层最早者优先，否则全体最早者
///
/// 时间戳相同时号码小者优先，保证结果唯一。
pub fn select_next<'a, I>(candidates: I) -> Option<&'a PatientRecord>
where
    I: Iterator<Item = &'a PatientRecord>,
{
    let (urgent, normal): (Vec<&PatientRecord>, Vec<&PatientRecord>) =
        candidates.partition(|r| r.priority == Priority::Urgent);

    let oldest = |tier: Vec<&'a PatientRecord>| {
        tier.into_iter().min_by_key(|r| (r.timestamp, r.number))
    };

    oldest(urgent).or_else(|| oldest(normal))
}
