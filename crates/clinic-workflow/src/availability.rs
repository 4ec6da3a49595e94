//! 诊室占用快照
//!
//! 从当前全部患者记录推导每个诊室的空闲/占用状态与候诊人数

use clinic_core::{PatientRecord, PatientStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::rooms::{RoomCatalog, RoomSpec};

/// 诊室状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Available,
    Busy,
}

/// 正在诊室内就诊的患者
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomOccupant {
    pub token_id: String,
    pub name: String,
}

/// 单个诊室的负载
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomLoad {
    pub room: String,
    pub state: RoomState,
    pub waiting: usize,
    pub occupant: Option<RoomOccupant>,
}

impl RoomLoad {
    pub fn is_free(&self) -> bool {
        self.state == RoomState::Available
    }
}

/// 诊室占用快照，按目录顺序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    loads: Vec<RoomLoad>,
}

impl AvailabilitySnapshot {
    /// 从记录集推导快照
    ///
    /// 占用 = 存在该诊室的 in-service 记录；候诊 = 分配到该诊室的 waiting-consultation 记录数。
    pub fn derive(catalog: &RoomCatalog, records: &[PatientRecord]) -> Self {
        let mut loads: Vec<RoomLoad> = catalog
            .rooms()
            .iter()
            .map(|room| RoomLoad {
                room: room.id.clone(),
                state: RoomState::Available,
                waiting: 0,
                occupant: None,
            })
            .collect();

        for record in records {
            let Some(room) = serving_room(catalog, record) else {
                continue;
            };
            let Some(load) = loads.iter_mut().find(|l| l.room == room) else {
                continue;
            };

            match record.status {
                PatientStatus::InService => {
                    load.state = RoomState::Busy;
                    load.occupant = Some(RoomOccupant {
                        token_id: record.id.clone(),
                        name: record.name.clone(),
                    });
                }
                PatientStatus::WaitingConsultation => load.waiting += 1,
                _ => {}
            }
        }

        Self { loads }
    }

    pub fn loads(&self) -> &[RoomLoad] {
        &self.loads
    }

    pub fn load(&self, room: &str) -> Option<&RoomLoad> {
        self.loads.iter().find(|l| l.room == room)
    }

    /// 目录外的诊室视为不可用
    pub fn is_free(&self, room: &str) -> bool {
        self.load(room).map(RoomLoad::is_free).unwrap_or(false)
    }

    pub fn waiting(&self, room: &str) -> usize {
        self.load(room).map(|l| l.waiting).unwrap_or(0)
    }

    /// 排名比较：空闲优先，其次候诊人数少者优先
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let key = |room: &str| (!self.is_free(room), self.waiting(room));
        key(a).cmp(&key(b))
    }

    /// `a` 是否严格优于 `b`
    pub fn is_better(&self, a: &str, b: &str) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// 对诊室排名，同等条件下保持目录顺序
    pub fn rank<'a>(&self, mut rooms: Vec<&'a RoomSpec>) -> Vec<&'a RoomSpec> {
        rooms.sort_by(|a, b| self.compare(&a.id, &b.id));
        rooms
    }
}

/// 记录所在（或排队）的诊室
///
/// 优先使用 assignedRoom；缺失时根据接诊工作站反查。
pub fn serving_room<'a>(catalog: &'a RoomCatalog, record: &PatientRecord) -> Option<&'a str> {
    if let Some(room) = record.assigned_room.as_deref().and_then(|id| catalog.get(id)) {
        return Some(room.id.as_str());
    }
    record
        .doctor_room
        .as_deref()
        .and_then(|station| catalog.by_station(station))
        .map(|room| room.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_empty_records_all_free() {
        let catalog = RoomCatalog::standard();
        let snapshot = AvailabilitySnapshot::derive(&catalog, &[]);
        assert_eq!(snapshot.loads().len(), 4);
        assert!(snapshot.loads().iter().all(|l| l.is_free() && l.waiting == 0));
    }

    #[test]
    fn test_busy_and_waiting_counts() {
        let catalog = RoomCatalog::standard();
        let mut serving = record(1, PatientStatus::InService, 10);
        serving.assigned_room = Some("Consultation room 2".to_string());
        let mut waiting_a = record(2, PatientStatus::WaitingConsultation, 20);
        waiting_a.assigned_room = Some("Consultation room 2".to_string());
        let mut waiting_b = record(3, PatientStatus::WaitingConsultation, 30);
        waiting_b.assigned_room = Some("Consultation room 4".to_string());
        let mut queued = record(4, PatientStatus::Waiting, 40);
        queued.assigned_room = Some("Consultation room 4".to_string());

        let snapshot =
            AvailabilitySnapshot::derive(&catalog, &[serving, waiting_a, waiting_b, queued]);

        assert!(!snapshot.is_free("Consultation room 2"));
        assert_eq!(snapshot.waiting("Consultation room 2"), 1);
        assert_eq!(
            snapshot.load("Consultation room 2").unwrap().occupant.as_ref().unwrap().token_id,
            "T1"
        );
        assert_eq!(snapshot.waiting("Consultation room 4"), 1);
        assert!(snapshot.is_free("Consultation room 4"));
        assert!(!snapshot.is_free("Consultation room 9"));
    }

    #[test]
    fn test_station_fallback() {
        let catalog = RoomCatalog::standard();
        let mut serving = record(1, PatientStatus::InService, 10);
        serving.assigned_room = None;
        serving.doctor_room = Some("dr3".to_string());

        let snapshot = AvailabilitySnapshot::derive(&catalog, &[serving]);
        assert!(!snapshot.is_free("Consultation room 3"));
    }

    #[test]
    fn test_rank_free_then_shortest_queue() {
        let catalog = RoomCatalog::standard();
        let mut busy = record(1, PatientStatus::InService, 10);
        busy.assigned_room = Some("Consultation room 1".to_string());
        let mut waiting = record(2, PatientStatus::WaitingConsultation, 20);
        waiting.assigned_room = Some("Consultation room 2".to_string());

        let snapshot = AvailabilitySnapshot::derive(&catalog, &[busy, waiting]);
        let ranked: Vec<&str> = snapshot
            .rank(catalog.rooms().iter().collect())
            .iter()
            .map(|r| r.id.as_str())
            .collect();

        assert_eq!(
            ranked,
            vec![
                "Consultation room 3",
                "Consultation room 4",
                "Consultation room 2",
                "Consultation room 1"
            ]
        );
        assert!(snapshot.is_better("Consultation room 3", "Consultation room 2"));
        assert!(!snapshot.is_better("Consultation room 3", "Consultation room 4"));
    }
}
