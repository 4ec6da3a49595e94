//! HTTP处理器

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use clinic_core::{Department, PatientRecord, PatientStatus, PatientType, Priority, QueueError};
use clinic_workflow::{
    project, CallSite, DisplayBoard, QueueFilter, QueueOrder, QueueStats, RegistrationRequest,
    RoomRecommender, Stage,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Clinic Queue API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 指标导出
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// 挂号
pub async fn register_patient(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<impl IntoResponse> {
    let registration = state
        .engine
        .register_patient(request)
        .await
        .map_err(|e| state.reject(e))?;
    state.metrics.record_registration();
    info!("Issued {} via API", registration.token_id);

    Ok((StatusCode::CREATED, Json(registration)))
}

/// 查询单条记录
pub async fn get_patient(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> ApiResult<Json<PatientRecord>> {
    let record = state.engine.find(&token_id).await.map_err(|e| state.reject(e))?;
    Ok(Json(record))
}

/// 队列查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueQueryParams {
    /// 逗号分隔的状态列表
    pub status: Option<String>,
    pub department: Option<String>,
    pub room: Option<String>,
    pub priority: Option<Priority>,
    pub order: Option<QueueOrder>,
    pub limit: Option<usize>,
}

impl QueueQueryParams {
    pub fn into_filter(self) -> clinic_core::Result<QueueFilter> {
        let statuses = match self.status {
            Some(list) => Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(parse_status)
                    .collect::<clinic_core::Result<Vec<_>>>()?,
            ),
            None => None,
        };
        let department = self.department.as_deref().map(str::parse::<Department>).transpose()?;

        Ok(QueueFilter {
            statuses,
            department,
            room: self.room,
            priority: self.priority,
            order: self.order.unwrap_or_default(),
            limit: self.limit,
        })
    }
}

fn parse_status(value: &str) -> clinic_core::Result<PatientStatus> {
    serde_json::from_value(Value::String(value.to_string()))
        .map_err(|_| QueueError::Validation(format!("Unknown status: {}", value)))
}

/// 自定义队列视图
pub async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<QueueQueryParams>,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    let filter = params.into_filter().map_err(|e| state.reject(e))?;
    view(&state, &filter).await
}

/// 挂号台视图
pub async fn reception_queue(State(state): State<AppState>) -> ApiResult<Json<Vec<PatientRecord>>> {
    view(&state, &QueueFilter::reception()).await
}

/// 分诊台视图
pub async fn triage_queue(State(state): State<AppState>) -> ApiResult<Json<Vec<PatientRecord>>> {
    view(&state, &QueueFilter::triage()).await
}

/// 诊室候诊视图
pub async fn room_queue(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    state.engine.catalog().require(&room).map_err(|e| state.reject(e))?;
    view(&state, &QueueFilter::room_queue(&room)).await
}

/// 科室工作人员视图
pub async fn department_queue(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> ApiResult<Json<Vec<PatientRecord>>> {
    let department = department.parse::<Department>().map_err(|e| state.reject(e))?;
    view(&state, &QueueFilter::department_queue(department)).await
}

/// 公共大屏总队列
pub async fn general_queue(State(state): State<AppState>) -> ApiResult<Json<Vec<PatientRecord>>> {
    view(&state, &QueueFilter::general_display()).await
}

async fn view(state: &AppState, filter: &QueueFilter) -> ApiResult<Json<Vec<PatientRecord>>> {
    let records = state.records().await.map_err(|e| state.reject(e))?;
    Ok(Json(project(&records, filter)))
}

/// 公共大屏
pub async fn display_board(State(state): State<AppState>) -> ApiResult<Json<DisplayBoard>> {
    let records = state.records().await.map_err(|e| state.reject(e))?;
    Ok(Json(DisplayBoard::build(state.engine.catalog(), &records)))
}

/// 统计
pub async fn queue_stats(State(state): State<AppState>) -> ApiResult<Json<QueueStats>> {
    let records = state.records().await.map_err(|e| state.reject(e))?;
    Ok(Json(QueueStats::collect(state.engine.catalog(), &records)))
}

/// 诊室目录
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.catalog().rooms().to_vec())
}

/// 叫下一位
pub async fn call_next(
    State(state): State<AppState>,
    Json(site): Json<CallSite>,
) -> ApiResult<Json<PatientRecord>> {
    let record = state.engine.call_next(&site).await.map_err(|e| state.reject(e))?;
    state.metrics.record_call(stage_label(site.stage()));
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub stage: Stage,
    /// 分诊完成时可指定诊室
    pub room: Option<String>,
}

/// 结束当前阶段
pub async fn complete(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<Json<PatientRecord>> {
    let result = match (request.stage, request.room.as_deref()) {
        (Stage::Triage, Some(room)) => state.engine.complete_triage(&token_id, Some(room)).await,
        (Stage::Consultation, Some(_)) => Err(QueueError::Validation(
            "A room can only be chosen when completing triage".to_string(),
        )),
        (stage, None) => state.engine.complete_current(stage, &token_id).await,
    };
    let record = result.map_err(|e| state.reject(e))?;
    state.metrics.record_completion(stage_label(request.stage));
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub room: String,
}

/// 改派诊室
pub async fn reassign_room(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    Json(request): Json<ReassignRequest>,
) -> ApiResult<Json<PatientRecord>> {
    let record = state
        .engine
        .reassign_room(&token_id, &request.room)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(record))
}

/// 标记已播报
pub async fn mark_announced(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .mark_announced(&token_id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    pub department: String,
    #[serde(default)]
    pub patient_type: PatientType,
    #[serde(default)]
    pub is_emergency: bool,
}

/// 新患者诊室推荐
pub async fn recommend_new(
    State(state): State<AppState>,
    Query(params): Query<RecommendationParams>,
) -> ApiResult<impl IntoResponse> {
    let department = params.department.parse::<Department>().map_err(|e| state.reject(e))?;
    let records = state.records().await.map_err(|e| state.reject(e))?;
    let recommendation = RoomRecommender::new(state.engine.catalog(), &records)
        .recommend_for_new_patient(department, params.patient_type, params.is_emergency);
    Ok(Json(recommendation))
}

/// 已登记患者诊室推荐
pub async fn recommend_existing(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let recommendation = state
        .engine
        .recommend_for_existing_patient(&token_id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(recommendation))
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Triage => "triage",
        Stage::Consultation => "consultation",
    }
}
