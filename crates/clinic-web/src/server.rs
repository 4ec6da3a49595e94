//! Web服务器

use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    api_root, call_next, complete, department_queue, display_board, general_queue, get_patient,
    health, list_patients, list_rooms, mark_announced, metrics, queue_stats, reassign_room,
    reception_queue, recommend_existing, recommend_new, register_patient, room_queue,
    triage_queue,
};
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            app: router(state),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start web server: {}", e))?;

        Ok(())
    }
}

/// 完整路由
pub fn router(state: AppState) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查与指标
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // API路由
        .nest("/api/v1", api_routes())
        .with_state(state)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .route("/patients", get(list_patients).post(register_patient))
        .route("/patients/:token_id", get(get_patient))
        .route("/patients/:token_id/complete", post(complete))
        .route("/patients/:token_id/room", put(reassign_room))
        .route("/patients/:token_id/announced", post(mark_announced))
        .route("/patients/:token_id/recommendation", get(recommend_existing))
        .route("/calls", post(call_next))
        .route("/recommendations", get(recommend_new))
        .route("/queues/reception", get(reception_queue))
        .route("/queues/triage", get(triage_queue))
        .route("/queues/general", get(general_queue))
        .route("/queues/rooms/:room", get(room_queue))
        .route("/queues/departments/:department", get(department_queue))
        .route("/rooms", get(list_rooms))
        .route("/display", get(display_board))
        .route("/stats", get(queue_stats))
}
