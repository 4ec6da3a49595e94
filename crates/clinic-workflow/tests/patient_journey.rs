//! 患者完整流程集成测试

use clinic_core::{Department, PatientRecord, PatientStatus, PatientType, Priority, QueueError};
use clinic_store::{MemoryStore, QueueStore};
use clinic_workflow::{
    CallSite, Confidence, QueueEngine, QueueFilter, RegistrationRequest, RoomCatalog, RoomState,
    Stage, WorkflowConfig,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

const ROOM1: &str = "Consultation room 1";
const ROOM2: &str = "Consultation room 2";
const ROOM3: &str = "Consultation room 3";

fn setup() -> (Arc<MemoryStore>, Arc<QueueEngine>) {
    let store = Arc::new(MemoryStore::new());
    let engine = QueueEngine::new(store.clone(), RoomCatalog::standard(), WorkflowConfig::default());
    (store, Arc::new(engine))
}

fn request(name: &str, department: Department, is_emergency: bool) -> RegistrationRequest {
    RegistrationRequest {
        name: name.to_string(),
        department,
        patient_type: PatientType::New,
        is_emergency,
    }
}

fn room_site(room: &str) -> CallSite {
    CallSite::Room {
        room: room.to_string(),
    }
}

/// 直接写入一条指定时间戳的记录
async fn seed(store: &MemoryStore, record: &PatientRecord) {
    store
        .set(
            &format!("patients/tokens/{}", record.id),
            serde_json::to_value(record).unwrap(),
        )
        .await
        .unwrap();
}

fn seeded(number: u64, priority: Priority, status: PatientStatus, timestamp: i64) -> PatientRecord {
    PatientRecord {
        id: format!("T{}", number),
        number,
        name: format!("Seeded {}", number),
        department: Department::General,
        patient_type: PatientType::New,
        status,
        priority,
        timestamp,
        called: false,
        assigned_room: Some(ROOM1.to_string()),
        doctor_room: None,
        current_room: None,
        consultation_started_at: None,
        consultation_ended_at: None,
        announcement_played: false,
    }
}

#[tokio::test]
async fn emergency_registration_goes_to_emergency_room() {
    let (_, engine) = setup();

    let registration = engine
        .register_patient(request("Alice", Department::Emergency, false))
        .await
        .unwrap();

    assert_eq!(registration.token_id, "T1");
    assert_eq!(registration.number, 1);
    assert_eq!(registration.assigned_room, ROOM3);
    assert_eq!(registration.recommendation.confidence, Confidence::High);
    assert_eq!(registration.recommendation.state, RoomState::Available);

    let record = engine.find("T1").await.unwrap();
    assert_eq!(record.status, PatientStatus::Waiting);
    assert_eq!(record.priority, Priority::Urgent);
}

#[tokio::test]
async fn full_patient_journey() {
    let (store, engine) = setup();

    let registration = engine
        .register_patient(request("Bruno", Department::General, false))
        .await
        .unwrap();
    let token = registration.token_id;

    let reception = engine.project(&QueueFilter::reception()).await.unwrap();
    assert_eq!(reception.len(), 1);

    let triaged = engine.call_next(&CallSite::Triage).await.unwrap();
    assert_eq!(triaged.status, PatientStatus::InTriage);

    let waiting = engine.complete_current(Stage::Triage, &token).await.unwrap();
    assert_eq!(waiting.status, PatientStatus::WaitingConsultation);
    assert_eq!(
        engine.project(&QueueFilter::room_queue(ROOM1)).await.unwrap().len(),
        1
    );

    let serving = engine.call_next(&room_site(ROOM1)).await.unwrap();
    assert_eq!(serving.status, PatientStatus::InService);

    let board = engine.display_board().await.unwrap();
    assert_eq!(board.now_serving.len(), 1);
    assert_eq!(
        board.announcements[0].text,
        "Bruno, token number 1, please proceed to Consultation room 1"
    );

    let done = engine.complete_current(Stage::Consultation, &token).await.unwrap();
    assert_eq!(done.status, PatientStatus::Completed);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.by_status["completed"], 1);
    let room1 = stats.rooms.iter().find(|r| r.room == ROOM1).unwrap();
    assert_eq!(room1.patients_served, 1);
    assert!(!room1.in_use);

    assert_eq!(
        store.get("rooms/occupancy/Consultation room 1").await.unwrap(),
        None
    );

    // 已完成的记录不能再被叫号或完成
    assert!(matches!(
        engine.complete_current(Stage::Consultation, &token).await,
        Err(QueueError::InvalidStateTransition { .. })
    ));
}

#[tokio::test]
async fn urgent_patient_called_before_older_normal_patient() {
    let (store, engine) = setup();
    seed(&store, &seeded(1, Priority::Normal, PatientStatus::Waiting, 50)).await;
    seed(&store, &seeded(2, Priority::Urgent, PatientStatus::Waiting, 100)).await;

    let first = engine.call_next(&CallSite::Triage).await.unwrap();
    assert_eq!(first.id, "T2");

    let second = engine.call_next(&CallSite::Triage).await.unwrap();
    assert_eq!(second.id, "T1");

    assert!(matches!(
        engine.call_next(&CallSite::Triage).await,
        Err(QueueError::EmptyQueue(_))
    ));
}

#[tokio::test]
async fn empty_pool_leaves_records_unchanged() {
    let (store, engine) = setup();
    seed(&store, &seeded(1, Priority::Normal, PatientStatus::Waiting, 10)).await;

    let before = engine.snapshot().await.unwrap();
    let err = engine.call_next(&room_site(ROOM2)).await.unwrap_err();
    assert!(matches!(err, QueueError::EmptyQueue(_)));
    assert_eq!(engine.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn two_stations_race_for_the_same_candidate() {
    let (store, engine) = setup();
    seed(
        &store,
        &seeded(1, Priority::Normal, PatientStatus::WaitingConsultation, 10),
    )
    .await;

    // 两个工作站基于同一份缓存快照行动
    let snapshot = engine.snapshot().await.unwrap();
    let first = engine.call_next_in(&snapshot, &room_site(ROOM1)).await;
    let second = engine.call_next_in(&snapshot, &room_site(ROOM2)).await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(QueueError::StaleState { .. })));

    let record = engine.find("T1").await.unwrap();
    assert_eq!(record.status, PatientStatus::InService);
    assert_eq!(record.assigned_room.as_deref(), Some(ROOM1));
    assert_eq!(
        store.get("rooms/occupancy/Consultation room 2").await.unwrap(),
        None
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_room_calls_never_double_book() {
    let (store, engine) = setup();
    for number in 1..=6 {
        seed(
            &store,
            &seeded(number, Priority::Normal, PatientStatus::WaitingConsultation, number as i64),
        )
        .await;
    }

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.call_next(&room_site(ROOM1)).await })
        })
        .collect();

    let mut served = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => served += 1,
            Err(QueueError::RoomConflict { .. }) | Err(QueueError::StaleState { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(served, 1);

    let in_room = engine
        .project(&QueueFilter::with_statuses(vec![PatientStatus::InService]))
        .await
        .unwrap();
    assert_eq!(in_room.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_tokens() {
    let store = Arc::new(MemoryStore::new());
    let config = WorkflowConfig {
        max_allocation_attempts: 100,
        ..WorkflowConfig::default()
    };
    let engine = Arc::new(QueueEngine::new(store.clone(), RoomCatalog::standard(), config));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .register_patient(request(&format!("Walk-in {}", i), Department::General, false))
                    .await
            })
        })
        .collect();

    let mut tokens = HashSet::new();
    for handle in handles {
        let registration = handle.await.unwrap().unwrap();
        assert!(tokens.insert(registration.token_id));
    }

    assert_eq!(engine.snapshot().await.unwrap().len(), 20);
    assert_eq!(store.get("counter").await.unwrap(), Some(json!(20)));
}

#[tokio::test]
async fn staff_call_stays_within_department() {
    let (store, engine) = setup();
    let mut pediatric = seeded(1, Priority::Normal, PatientStatus::WaitingConsultation, 10);
    pediatric.department = Department::Pediatrics;
    seed(&store, &pediatric).await;

    let orthopedics = CallSite::Staff {
        department: Department::Orthopedics,
        room: "Consultation room 4".to_string(),
    };
    assert!(matches!(
        engine.call_next(&orthopedics).await,
        Err(QueueError::EmptyQueue(_))
    ));

    let pediatrics = CallSite::Staff {
        department: Department::Pediatrics,
        room: "Consultation room 4".to_string(),
    };
    let called = engine.call_next(&pediatrics).await.unwrap();
    assert_eq!(called.assigned_room.as_deref(), Some("Consultation room 4"));
    assert_eq!(called.doctor_room.as_deref(), Some("dr4"));
}
