//! 单元测试用的记录构造

use clinic_core::{
    utils::format_token_id, Department, PatientRecord, PatientStatus, PatientType, Priority,
};

/// 普通优先级的全科记录
pub fn record(number: u64, status: PatientStatus, timestamp: i64) -> PatientRecord {
    PatientRecord {
        id: format_token_id(number),
        number,
        name: format!("Patient {}", number),
        department: Department::General,
        patient_type: PatientType::New,
        status,
        priority: Priority::Normal,
        timestamp,
        called: false,
        assigned_room: None,
        doctor_room: None,
        current_room: None,
        consultation_started_at: None,
        consultation_ended_at: None,
        announcement_played: false,
    }
}

/// 紧急优先级记录
pub fn urgent(number: u64, status: PatientStatus, timestamp: i64) -> PatientRecord {
    PatientRecord {
        priority: Priority::Urgent,
        ..record(number, status, timestamp)
    }
}
