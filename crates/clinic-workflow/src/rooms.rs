//! 诊室目录
//!
//! 静态诊室表，每个诊室带有可接诊科室集合

use clinic_core::{Department, QueueError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 诊室定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSpec {
    pub id: String,      // 诊室名，同时作为 assignedRoom 的取值
    pub station: String, // 医生工作站，绑定为 doctorRoom
    pub label: String,   // 诊室短名，绑定为 currentRoom
    pub compatible_with: Vec<Department>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub emergency: bool, // 急诊指定诊室
    #[serde(default)]
    pub default: bool, // 兜底诊室
}

impl RoomSpec {
    pub fn serves(&self, department: Department) -> bool {
        self.compatible_with.contains(&department)
    }
}

/// 诊室目录
#[derive(Debug, Clone)]
pub struct RoomCatalog {
    rooms: Vec<RoomSpec>,
    emergency: usize,
    default: usize,
}

impl RoomCatalog {
    /// 从诊室表创建目录，校验失败返回配置错误
    pub fn new(rooms: Vec<RoomSpec>) -> Result<Self> {
        if rooms.is_empty() {
            return Err(QueueError::Config("Room catalog is empty".to_string()));
        }

        let mut ids = HashSet::new();
        let mut stations = HashSet::new();
        for room in &rooms {
            if !ids.insert(room.id.as_str()) {
                return Err(QueueError::Config(format!("Duplicate room id: {}", room.id)));
            }
            if !stations.insert(room.station.as_str()) {
                return Err(QueueError::Config(format!("Duplicate station: {}", room.station)));
            }
        }

        let emergency = single_flagged(&rooms, |r| r.emergency, "emergency")?;
        let default = single_flagged(&rooms, |r| r.default, "default")?;

        Ok(Self {
            rooms,
            emergency,
            default,
        })
    }

    /// 诊所的四间标准诊室
    pub fn standard() -> Self {
        let room = |n: u32, compatible_with: Vec<Department>, features: &[&str]| RoomSpec {
            id: format!("Consultation room {}", n),
            station: format!("dr{}", n),
            label: format!("Room {}", n),
            compatible_with,
            features: features.iter().map(|f| f.to_string()).collect(),
            emergency: false,
            default: false,
        };

        let mut rooms = vec![
            room(1, vec![Department::General, Department::Orthopedics], &["Basic equipment"]),
            room(
                2,
                vec![Department::General, Department::Consultation],
                &["Advanced diagnostic equipment"],
            ),
            room(
                3,
                vec![Department::Emergency, Department::Consultation],
                &["Emergency equipment", "Trauma supplies"],
            ),
            room(
                4,
                vec![Department::Pediatrics, Department::Orthopedics],
                &["Child-friendly environment", "Orthopedic tools"],
            ),
        ];
        rooms[0].default = true;
        rooms[2].emergency = true;

        Self {
            rooms,
            emergency: 2,
            default: 0,
        }
    }

    pub fn rooms(&self) -> &[RoomSpec] {
        &self.rooms
    }

    pub fn get(&self, room_id: &str) -> Option<&RoomSpec> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.get(room_id).is_some()
    }

    /// 按工作站查找诊室
    pub fn by_station(&self, station: &str) -> Option<&RoomSpec> {
        self.rooms.iter().find(|r| r.station == station)
    }

    /// 校验诊室属于目录
    pub fn require(&self, room_id: &str) -> Result<&RoomSpec> {
        self.get(room_id)
            .ok_or_else(|| QueueError::Validation(format!("Unknown room: {}", room_id)))
    }

    pub fn emergency_room(&self) -> &RoomSpec {
        &self.rooms[self.emergency]
    }

    pub fn default_room(&self) -> &RoomSpec {
        &self.rooms[self.default]
    }

    /// 可接诊该科室的诊室，保持目录顺序
    pub fn compatible_with(&self, department: Department) -> Vec<&RoomSpec> {
        self.rooms.iter().filter(|r| r.serves(department)).collect()
    }
}

impl Default for RoomCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn single_flagged<F>(rooms: &[RoomSpec], flag: F, what: &str) -> Result<usize>
where
    F: Fn(&RoomSpec) -> bool,
{
    let flagged: Vec<usize> = rooms
        .iter()
        .enumerate()
        .filter(|(_, r)| flag(r))
        .map(|(i, _)| i)
        .collect();

    match flagged.as_slice() {
        [index] => Ok(*index),
        [] => Err(QueueError::Config(format!("No {} room designated", what))),
        _ => Err(QueueError::Config(format!("More than one {} room designated", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let catalog = RoomCatalog::standard();
        assert_eq!(catalog.rooms().len(), 4);
        assert_eq!(catalog.emergency_room().id, "Consultation room 3");
        assert_eq!(catalog.default_room().id, "Consultation room 1");
        assert_eq!(catalog.by_station("dr4").unwrap().label, "Room 4");

        let ortho: Vec<&str> = catalog
            .compatible_with(Department::Orthopedics)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ortho, vec!["Consultation room 1", "Consultation room 4"]);
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let rooms = RoomCatalog::standard().rooms().to_vec();
        assert!(RoomCatalog::new(rooms).is_ok());
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(RoomCatalog::new(Vec::new()).is_err());

        let mut rooms = RoomCatalog::standard().rooms().to_vec();
        rooms[1].emergency = true;
        assert!(matches!(RoomCatalog::new(rooms), Err(QueueError::Config(_))));

        let mut rooms = RoomCatalog::standard().rooms().to_vec();
        rooms[3].id = rooms[0].id.clone();
        assert!(RoomCatalog::new(rooms).is_err());

        let mut rooms = RoomCatalog::standard().rooms().to_vec();
        rooms[0].default = false;
        assert!(RoomCatalog::new(rooms).is_err());
    }

    #[test]
    fn test_require_unknown_room() {
        let catalog = RoomCatalog::standard();
        assert!(catalog.require("Consultation room 2").is_ok());
        assert!(matches!(
            catalog.require("Consultation room 9"),
            Err(QueueError::Validation(_))
        ));
    }
}
