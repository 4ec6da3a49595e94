//! 诊室推荐引擎
//!
//! 根据科室、患者类型和是否急诊，结合当前诊室占用情况推荐诊室

use clinic_core::{Department, PatientRecord, PatientType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::{AvailabilitySnapshot, RoomState};
use crate::rooms::{RoomCatalog, RoomSpec};

/// 推荐可信度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// 新患者的诊室推荐
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecommendation {
    pub room: String,
    pub label: String,
    pub state: RoomState,
    pub confidence: Confidence,
    pub reason: String,
}

/// 候选诊室及理由
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomOption {
    pub room: String,
    pub reason: String,
}

/// 已登记患者的诊室推荐：首选加至多两个备选
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExistingPatientRecommendation {
    pub primary: RoomOption,
    pub alternatives: Vec<RoomOption>,
}

const MAX_ALTERNATIVES: usize = 2;

/// 诊室推荐引擎
///
/// 对同一份记录快照是纯函数，不读写存储。
#[derive(Debug, Clone)]
pub struct RoomRecommender<'a> {
    catalog: &'a RoomCatalog,
    availability: AvailabilitySnapshot,
}

impl<'a> RoomRecommender<'a> {
    /// 从记录快照创建推荐引擎
    pub fn new(catalog: &'a RoomCatalog, records: &[PatientRecord]) -> Self {
        Self {
            catalog,
            availability: AvailabilitySnapshot::derive(catalog, records),
        }
    }

    /// 为新患者推荐诊室，按顺序匹配第一条规则
    pub fn recommend_for_new_patient(
        &self,
        department: Department,
        patient_type: PatientType,
        is_emergency: bool,
    ) -> RoomRecommendation {
        debug!(
            "Recommending room for {} ({:?}, emergency: {})",
            department, patient_type, is_emergency
        );

        // 1. 急诊优先急诊指定诊室
        if is_emergency || department == Department::Emergency {
            let emergency_room = self.catalog.emergency_room();
            if self.availability.is_free(&emergency_room.id) {
                return self.recommendation(
                    emergency_room,
                    Confidence::High,
                    format!("Emergency cases are prioritized for {}", emergency_room.label),
                );
            }
            return self.recommendation(
                self.catalog.default_room(),
                Confidence::Medium,
                format!(
                    "Primary emergency room {} is not available",
                    emergency_room.label
                ),
            );
        }

        // 2. 可接诊该科室的诊室：空闲优先，候诊少者优先
        let compatible = self.availability.rank(self.catalog.compatible_with(department));
        if let Some(best) = compatible.first() {
            let free = self.availability.is_free(&best.id);
            return self.recommendation(
                best,
                if free { Confidence::High } else { Confidence::Medium },
                format!(
                    "Based on {} specialization and {}",
                    department,
                    if free { "availability" } else { "queue length" }
                ),
            );
        }

        // 3./4. 无可接诊诊室：在全部诊室中挑选
        let ranked = self.availability.rank(self.catalog.rooms().iter().collect());
        let best = ranked.first().copied().unwrap_or_else(|| self.catalog.default_room());
        if self.availability.is_free(&best.id) {
            self.recommendation(
                best,
                Confidence::Medium,
                "Based on current availability and queue length".to_string(),
            )
        } else {
            self.recommendation(
                best,
                Confidence::Low,
                "Based on current queue lengths as all rooms are busy".to_string(),
            )
        }
    }

    /// 为已登记患者（分诊时）推荐诊室
    pub fn recommend_for_existing_patient(
        &self,
        record: &PatientRecord,
    ) -> ExistingPatientRecommendation {
        let department = record.department;
        let compatible = self.availability.rank(self.catalog.compatible_with(department));

        let assigned = record
            .assigned_room
            .as_deref()
            .and_then(|room| self.catalog.get(room));

        let mut alternatives: Vec<RoomOption> = Vec::new();
        let mut primary = match (assigned, compatible.first()) {
            (Some(room), _) => option(room, "Originally assigned room".to_string()),
            (None, Some(best)) => option(best, format!("Best match for {} department", department)),
            (None, None) => option(
                self.catalog.default_room(),
                "Default assignment based on availability".to_string(),
            ),
        };

        // 存在更优的可接诊诊室时提升为首选，原分配降为备选
        if let Some(best) = compatible.first() {
            if best.id != primary.room && self.availability.is_better(&best.id, &primary.room) {
                let reason = format!(
                    "Better match for {} with {}",
                    department,
                    if self.availability.is_free(&best.id) {
                        "immediate availability"
                    } else {
                        "shorter queue"
                    }
                );
                let demoted = std::mem::replace(&mut primary, option(best, reason));
                alternatives.push(demoted);
            }
        }

        let offer = |alternatives: &mut Vec<RoomOption>, room: &str, reason: String| {
            if room != primary.room && !alternatives.iter().any(|alt| alt.room == room) {
                alternatives.push(RoomOption {
                    room: room.to_string(),
                    reason,
                });
            }
        };

        for room in &compatible {
            offer(
                &mut alternatives,
                &room.id,
                format!("Good match for {} department", department),
            );
        }

        for load in self.availability.loads().iter().filter(|l| l.is_free()) {
            offer(
                &mut alternatives,
                &load.room,
                "Currently available with no wait".to_string(),
            );
        }

        let mut by_queue: Vec<_> = self.availability.loads().iter().collect();
        by_queue.sort_by_key(|l| l.waiting);
        for load in by_queue {
            offer(
                &mut alternatives,
                &load.room,
                format!("Short queue ({} patients waiting)", load.waiting),
            );
        }

        alternatives.truncate(MAX_ALTERNATIVES);

        debug!(
            "Recommendation for {}: {} (+{} alternatives)",
            record.id,
            primary.room,
            alternatives.len()
        );

        ExistingPatientRecommendation {
            primary,
            alternatives,
        }
    }

    fn recommendation(
        &self,
        room: &RoomSpec,
        confidence: Confidence,
        reason: String,
    ) -> RoomRecommendation {
        RoomRecommendation {
            room: room.id.clone(),
            label: room.label.clone(),
            state: if self.availability.is_free(&room.id) {
                RoomState::Available
            } else {
                RoomState::Busy
            },
            confidence,
            reason,
        }
    }
}

fn option(room: &RoomSpec, reason: String) -> RoomOption {
    RoomOption {
        room: room.id.clone(),
        reason,
    }
}
