//! 公共大屏与统计
//!
//! 大屏按诊室分组展示候诊与正在就诊的患者，并列出待播报的叫号

use clinic_core::{Department, PatientRecord, PatientStatus, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::availability::{AvailabilitySnapshot, RoomOccupant, RoomState};
use crate::projection::{project, QueueFilter};
use crate::rooms::RoomCatalog;

/// 单个诊室面板
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPanel {
    pub room: String,
    pub label: String,
    pub state: RoomState,
    pub current: Option<RoomOccupant>,
    pub waiting: Vec<PatientRecord>,
    pub features: Vec<String>,
}

/// 待播报的叫号
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub token_id: String,
    pub number: u64,
    pub name: String,
    pub room: Option<String>,
    pub text: String,
}

impl Announcement {
    pub fn for_record(record: &PatientRecord) -> Self {
        let room = record.assigned_room.clone();
        let direction = match &room {
            Some(room) => format!(" to {}", room),
            None => " to the consultation area".to_string(),
        };

        Self {
            token_id: record.id.clone(),
            number: record.number,
            name: record.name.clone(),
            text: format!(
                "{}, token number {}, please proceed{}",
                record.name, record.number, direction
            ),
            room,
        }
    }
}

/// 公共大屏
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBoard {
    pub now_serving: Vec<PatientRecord>,
    pub rooms: Vec<RoomPanel>,
    pub general: Vec<PatientRecord>,
    pub announcements: Vec<Announcement>,
}

impl DisplayBoard {
    pub fn build(catalog: &RoomCatalog, records: &[PatientRecord]) -> Self {
        let availability = AvailabilitySnapshot::derive(catalog, records);

        let rooms = catalog
            .rooms()
            .iter()
            .map(|room| {
                let load = availability.load(&room.id);
                RoomPanel {
                    room: room.id.clone(),
                    label: room.label.clone(),
                    state: load.map(|l| l.state).unwrap_or(RoomState::Available),
                    current: load.and_then(|l| l.occupant.clone()),
                    waiting: project(records, &QueueFilter::room_queue(&room.id)),
                    features: room.features.clone(),
                }
            })
            .collect();

        // 按叫号先后排列
        let mut now_serving: Vec<PatientRecord> = records
            .iter()
            .filter(|r| r.status == PatientStatus::InService)
            .cloned()
            .collect();
        now_serving.sort_by_key(|r| (r.consultation_started_at, r.number));

        let announcements = now_serving
            .iter()
            .filter(|r| r.needs_announcement())
            .map(Announcement::for_record)
            .collect();

        Self {
            now_serving,
            rooms,
            general: project(records, &QueueFilter::general_display()),
            announcements,
        }
    }
}

/// 单个诊室计数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub room: String,
    pub patients_served: usize,
    pub waiting: usize,
    pub in_use: bool,
}

/// 简单计数统计
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_department: BTreeMap<Department, usize>,
    pub urgent: usize,
    pub normal: usize,
    pub rooms: Vec<RoomStats>,
}

impl QueueStats {
    pub fn collect(catalog: &RoomCatalog, records: &[PatientRecord]) -> Self {
        let availability = AvailabilitySnapshot::derive(catalog, records);

        let mut stats = QueueStats {
            total: records.len(),
            ..Default::default()
        };

        for status in PatientStatus::all() {
            stats.by_status.insert(status.to_string(), 0);
        }

        for record in records {
            *stats.by_status.entry(record.status.to_string()).or_insert(0) += 1;
            *stats.by_department.entry(record.department).or_insert(0) += 1;
            match record.priority {
                Priority::Urgent => stats.urgent += 1,
                Priority::Normal => stats.normal += 1,
            }
        }

        stats.rooms = availability
            .loads()
            .iter()
            .map(|load| RoomStats {
                room: load.room.clone(),
                patients_served: records
                    .iter()
                    .filter(|r| {
                        r.status == PatientStatus::Completed
                            && r.assigned_room.as_deref() == Some(load.room.as_str())
                    })
                    .count(),
                waiting: load.waiting,
                in_use: !load.is_free(),
            })
            .collect();

        stats
    }
}
