//! 排队工作流引擎
//!
//! 协调取号器、诊室推荐、叫号策略和状态机。
//! 所有状态写入都带状态守卫，诊室占用通过比较交换独占。

use crate::{
    availability::{serving_room, AvailabilitySnapshot},
    call_policy::{CallSite, Stage},
    display::{DisplayBoard, QueueStats},
    projection::{project, QueueFilter},
    records::decode_records,
    rooms::{RoomCatalog, RoomSpec},
    routing::{ExistingPatientRecommendation, RoomRecommendation, RoomRecommender},
    state_machine::{PatientEvent, PatientStateMachine},
    token::TokenIssuer,
};
use clinic_core::{
    utils::{format_token_id, now_millis, parse_token_id},
    Department, PatientRecord, PatientStatus, PatientType, Priority, QueueError, Result,
};
use clinic_store::{join_path, QueueStore, WriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 工作流配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// 计数器比较交换的最大尝试次数
    pub max_allocation_attempts: u32,
    pub counter_key: String,
    pub tokens_path: String,
    pub occupancy_path: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_allocation_attempts: 5,
            counter_key: "counter".to_string(),
            tokens_path: "patients/tokens".to_string(),
            occupancy_path: "rooms/occupancy".to_string(),
        }
    }
}

/// 挂号请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub name: String,
    pub department: Department,
    #[serde(default)]
    pub patient_type: PatientType,
    #[serde(default)]
    pub is_emergency: bool,
}

/// 挂号结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub token_id: String,
    pub number: u64,
    pub assigned_room: String,
    pub recommendation: RoomRecommendation,
}

/// 排队工作流引擎
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    catalog: RoomCatalog,
    state_machine: PatientStateMachine,
    issuer: TokenIssuer,
    config: WorkflowConfig,
}

impl QueueEngine {
    /// 创建新的排队引擎
    pub fn new(store: Arc<dyn QueueStore>, catalog: RoomCatalog, config: WorkflowConfig) -> Self {
        let issuer = TokenIssuer::new(
            store.clone(),
            &config.counter_key,
            config.max_allocation_attempts,
        );
        Self {
            store,
            catalog,
            state_machine: PatientStateMachine::new(),
            issuer,
            config,
        }
    }

    pub fn catalog(&self) -> &RoomCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn QueueStore> {
        self.store.clone()
    }

    /// 号码标识格式不合法时视为不存在
    fn token_path(&self, token_id: &str) -> Result<String> {
        match parse_token_id(token_id) {
            Some(_) => Ok(join_path(&self.config.tokens_path, token_id)),
            None => Err(QueueError::NotFound(format!("Token {}", token_id))),
        }
    }

    fn occupancy_path(&self, room_id: &str) -> String {
        join_path(&self.config.occupancy_path, room_id)
    }

    /// 读取当前完整记录集
    pub async fn snapshot(&self) -> Result<Vec<PatientRecord>> {
        decode_records(self.store.get(&self.config.tokens_path).await?)
    }

    /// 按号码读取单条记录
    pub async fn find(&self, token_id: &str) -> Result<PatientRecord> {
        match self.store.get(&self.token_path(token_id)?).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(QueueError::NotFound(format!("Token {}", token_id))),
        }
    }

    /// 挂号：分配号码、推荐诊室并写入 waiting 记录
    pub async fn register_patient(&self, request: RegistrationRequest) -> Result<Registration> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(QueueError::Validation("Patient name is required".to_string()));
        }

        let number = self.issuer.next_token().await?;
        let token_id = format_token_id(number);

        let records = self.snapshot().await?;
        let recommender = RoomRecommender::new(&self.catalog, &records);
        let recommendation = recommender.recommend_for_new_patient(
            request.department,
            request.patient_type,
            request.is_emergency,
        );

        let record = PatientRecord {
            id: token_id.clone(),
            number,
            name: name.to_string(),
            department: request.department,
            patient_type: request.patient_type,
            status: PatientStateMachine::initial_state(),
            priority: Priority::at_registration(request.department, request.is_emergency),
            timestamp: now_millis(),
            called: false,
            assigned_room: Some(recommendation.room.clone()),
            doctor_room: None,
            current_room: None,
            consultation_started_at: None,
            consultation_ended_at: None,
            announcement_played: false,
        };

        let created = self
            .store
            .compare_and_swap(
                &self.token_path(&token_id)?,
                None,
                Some(serde_json::to_value(&record)?),
            )
            .await?;
        if !created {
            warn!("Token {} already has a record, counter is behind the queue", token_id);
            return Err(QueueError::Allocation(format!(
                "Token {} was already issued",
                token_id
            )));
        }

        info!(
            "Registered {} ({}, {:?}) -> {}",
            token_id, record.department, record.priority, recommendation.room
        );

        Ok(Registration {
            token_id,
            number,
            assigned_room: recommendation.room.clone(),
            recommendation,
        })
    }

    /// 在最新记录集上叫下一位
    pub async fn call_next(&self, site: &CallSite) -> Result<PatientRecord> {
        let records = self.snapshot().await?;
        self.call_next_in(&records, site).await
    }

    /// 在调用方持有的快照上叫下一位
    ///
    /// 快照过期时由状态守卫拒绝写入，返回 `StaleState`。
    pub async fn call_next_in(
        &self,
        records: &[PatientRecord],
        site: &CallSite,
    ) -> Result<PatientRecord> {
        let policy = site.policy();
        let room = match &policy.room {
            Some(room_id) => Some(self.catalog.require(room_id)?),
            None => None,
        };

        let candidate = policy.select(records).ok_or_else(|| {
            QueueError::EmptyQueue(format!("No {} patient for {}", policy.source, site))
        })?;
        let target = self.state_machine.transition(candidate.status, policy.event)?;
        debug!("Selected {} at {} ({:?})", candidate.id, site, candidate.priority);

        let mut called = candidate.clone();
        called.status = target;
        called.called = true;

        let Some(room) = room else {
            self.guarded_update(
                &candidate.id,
                policy.source,
                patch(json!({ "status": target.as_str(), "called": true })),
            )
            .await?;
            info!("Called {} to {}", candidate.id, site);
            return Ok(called);
        };

        if let Some(occupant) = AvailabilitySnapshot::derive(&self.catalog, records)
            .load(&room.id)
            .and_then(|load| load.occupant.clone())
        {
            warn!("{} is still serving {}", room.id, occupant.token_id);
            return Err(QueueError::RoomConflict {
                room: room.id.clone(),
                occupant: occupant.token_id,
            });
        }

        let acquired = self.claim_room(room, &candidate.id).await?;

        let started = now_millis();
        let fields = patch(json!({
            "status": target.as_str(),
            "called": true,
            "assignedRoom": room.id,
            "doctorRoom": room.station,
            "currentRoom": room.label,
            "consultationStartedAt": started,
            "announcementPlayed": false,
        }));
        if let Err(e) = self.guarded_update(&candidate.id, policy.source, fields).await {
            if acquired {
                self.release_room(&room.id, &candidate.id).await;
            }
            return Err(e);
        }

        called.assigned_room = Some(room.id.clone());
        called.doctor_room = Some(room.station.clone());
        called.current_room = Some(room.label.clone());
        called.consultation_started_at = Some(started);
        called.announcement_played = false;

        info!("Called {} into {} via {}", candidate.id, room.id, site);
        Ok(called)
    }

    /// 结束当前阶段
    pub async fn complete_current(&self, stage: Stage, token_id: &str) -> Result<PatientRecord> {
        match stage {
            Stage::Triage => self.complete_triage(token_id, None).await,
            Stage::Consultation => self.complete_consultation(token_id).await,
        }
    }

    /// 分诊完成并确认诊室
    ///
    /// 未指定诊室时沿用 assignedRoom，缺失则取推荐首选。
    pub async fn complete_triage(
        &self,
        token_id: &str,
        room: Option<&str>,
    ) -> Result<PatientRecord> {
        let mut record = self.find(token_id).await?;
        let target = self
            .state_machine
            .transition(record.status, PatientEvent::TriageComplete)?;

        let room = match room {
            Some(room_id) => self.catalog.require(room_id)?.id.clone(),
            None => match record
                .assigned_room
                .as_deref()
                .filter(|room_id| self.catalog.contains(room_id))
            {
                Some(room_id) => room_id.to_string(),
                None => {
                    let records = self.snapshot().await?;
                    RoomRecommender::new(&self.catalog, &records)
                        .recommend_for_existing_patient(&record)
                        .primary
                        .room
                }
            },
        };

        self.guarded_update(
            token_id,
            record.status,
            patch(json!({ "status": target.as_str(), "assignedRoom": room })),
        )
        .await?;

        info!("Triage complete for {}, waiting for {}", token_id, room);
        record.status = target;
        record.assigned_room = Some(room);
        Ok(record)
    }

    async fn complete_consultation(&self, token_id: &str) -> Result<PatientRecord> {
        let mut record = self.find(token_id).await?;
        let target = self.state_machine.transition(record.status, PatientEvent::Complete)?;

        let ended = now_millis();
        self.guarded_update(
            token_id,
            record.status,
            patch(json!({ "status": target.as_str(), "consultationEndedAt": ended })),
        )
        .await?;

        if let Some(room_id) = serving_room(&self.catalog, &record) {
            self.release_room(room_id, token_id).await;
        }

        info!("Consultation complete for {}", token_id);
        record.status = target;
        record.consultation_ended_at = Some(ended);
        Ok(record)
    }

    /// 改派诊室
    pub async fn reassign_room(&self, token_id: &str, room: &str) -> Result<PatientRecord> {
        let room = self.catalog.require(room)?;
        let mut record = self.find(token_id).await?;

        if !matches!(
            record.status,
            PatientStatus::Waiting | PatientStatus::InTriage | PatientStatus::WaitingConsultation
        ) {
            return Err(QueueError::InvalidStateTransition {
                from: record.status.to_string(),
                event: "reassign-room".to_string(),
            });
        }

        self.guarded_update(
            token_id,
            record.status,
            patch(json!({ "assignedRoom": room.id })),
        )
        .await?;

        info!("Reassigned {} to {}", token_id, room.id);
        record.assigned_room = Some(room.id.clone());
        Ok(record)
    }

    /// 标记叫号已播报
    pub async fn mark_announced(&self, token_id: &str) -> Result<()> {
        self.store
            .update(
                &self.token_path(token_id)?,
                patch(json!({ "announcementPlayed": true })),
                None,
            )
            .await?;
        debug!("Announcement played for {}", token_id);
        Ok(())
    }

    pub async fn recommend_for_new_patient(
        &self,
        department: Department,
        patient_type: PatientType,
        is_emergency: bool,
    ) -> Result<RoomRecommendation> {
        let records = self.snapshot().await?;
        Ok(RoomRecommender::new(&self.catalog, &records).recommend_for_new_patient(
            department,
            patient_type,
            is_emergency,
        ))
    }

    pub async fn recommend_for_existing_patient(
        &self,
        token_id: &str,
    ) -> Result<ExistingPatientRecommendation> {
        let records = self.snapshot().await?;
        let record = records
            .iter()
            .find(|r| r.id == token_id)
            .ok_or_else(|| QueueError::NotFound(format!("Token {}", token_id)))?;
        Ok(RoomRecommender::new(&self.catalog, &records).recommend_for_existing_patient(record))
    }

    pub async fn project(&self, filter: &QueueFilter) -> Result<Vec<PatientRecord>> {
        Ok(project(&self.snapshot().await?, filter))
    }

    pub async fn display_board(&self) -> Result<DisplayBoard> {
        Ok(DisplayBoard::build(&self.catalog, &self.snapshot().await?))
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        Ok(QueueStats::collect(&self.catalog, &self.snapshot().await?))
    }

    async fn guarded_update(
        &self,
        token_id: &str,
        expected: PatientStatus,
        fields: Map<String, Value>,
    ) -> Result<()> {
        let guard = WriteGuard::new("status", expected.as_str());
        let result = self
            .store
            .update(&self.token_path(token_id)?, fields, Some(&guard))
            .await;
        if let Err(QueueError::StaleState { expected, actual, .. }) = &result {
            warn!(
                "Rejected stale write on {}: expected {}, found {}",
                token_id, expected, actual
            );
        }
        result
    }

    /// 独占诊室
    ///
    /// 占用标记遗留（占用者已离开该诊室）时接管。标记已属于被叫患者时直接沿用。
    /// 返回值表示标记是否由本次调用取得；沿用的标记失败时不得释放。
    async fn claim_room(&self, room: &RoomSpec, token_id: &str) -> Result<bool> {
        let path = self.occupancy_path(&room.id);
        let claimant = Value::from(token_id);

        if self.store.compare_and_swap(&path, None, Some(claimant.clone())).await? {
            debug!("{} claimed {}", token_id, room.id);
            return Ok(true);
        }

        let current = self.store.get(&path).await?;
        let occupant = current.as_ref().and_then(Value::as_str).map(str::to_string);

        if occupant.as_deref() == Some(token_id) {
            debug!("{} already holds {}", token_id, room.id);
            return Ok(false);
        }

        let reclaimable = match &occupant {
            Some(occupant_id) => !self.holds_room(occupant_id, &room.id).await?,
            None => true,
        };
        if reclaimable
            && self
                .store
                .compare_and_swap(&path, current.as_ref(), Some(claimant))
                .await?
        {
            warn!(
                "{} took over {} from stale claim {:?}",
                token_id, room.id, occupant
            );
            return Ok(true);
        }

        warn!("{} is occupied, {} cannot be called in", room.id, token_id);
        Err(QueueError::RoomConflict {
            room: room.id.clone(),
            occupant: occupant.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// 占用者是否可能仍持有诊室
    ///
    /// 已完成、记录不存在或在其他诊室就诊的占用者视为遗留标记；
    /// 尚在候诊状态的占用者可能正处于叫号途中，仍视为持有。
    async fn holds_room(&self, token_id: &str, room_id: &str) -> Result<bool> {
        match self.find(token_id).await {
            Ok(record) => Ok(match record.status {
                PatientStatus::Completed => false,
                PatientStatus::InService => serving_room(&self.catalog, &record) == Some(room_id),
                _ => true,
            }),
            Err(QueueError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn release_room(&self, room_id: &str, token_id: &str) {
        let path = self.occupancy_path(room_id);
        let claimant = Value::from(token_id);
        match self.store.compare_and_swap(&path, Some(&claimant), None).await {
            Ok(true) => debug!("{} released {}", token_id, room_id),
            Ok(false) => debug!("{} held no claim on {}", token_id, room_id),
            Err(e) => warn!("Failed to release {} for {}: {}", room_id, token_id, e),
        }
    }
}

fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
