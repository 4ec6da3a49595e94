//! 排队流程演示程序
//!
//! 展示取号、诊室推荐、分诊叫号、诊室叫号、大屏播报和统计的完整流程

use clinic_queue::model::{Department, PatientType};
use clinic_queue::store::MemoryStore;
use clinic_queue::workflow::{
    CallSite, QueueCache, QueueEngine, QueueFilter, RegistrationRequest, RoomCatalog, Stage,
    WorkflowConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("🏥 门诊排队流程演示\n");

    let store = Arc::new(MemoryStore::new());
    let engine =
        QueueEngine::new(store.clone(), RoomCatalog::standard(), WorkflowConfig::default());
    let cache = QueueCache::start(store, &engine.config().tokens_path).await?;
    info!("Demo engine ready with {} rooms", engine.catalog().rooms().len());

    // 1. 挂号
    let arrivals = [
        ("Alice", Department::Emergency, false),
        ("Bob", Department::Pediatrics, false),
        ("Carol", Department::General, false),
        ("Dan", Department::Orthopedics, true),
    ];
    for (name, department, is_emergency) in arrivals {
        let registration = engine
            .register_patient(RegistrationRequest {
                name: name.to_string(),
                department,
                patient_type: PatientType::New,
                is_emergency,
            })
            .await?;
        println!(
            "🎫 {} 取号 {} -> {} ({:?}: {})",
            name,
            registration.token_id,
            registration.assigned_room,
            registration.recommendation.confidence,
            registration.recommendation.reason
        );
    }

    // 2. 分诊：紧急患者优先
    println!("\n🩺 分诊");
    loop {
        match engine.call_next(&CallSite::Triage).await {
            Ok(record) => {
                println!("   叫号 {} {} ({:?})", record.id, record.name, record.priority);
                let done = engine.complete_current(Stage::Triage, &record.id).await?;
                println!(
                    "   分诊完成，候诊于 {}",
                    done.assigned_room.as_deref().unwrap_or("-")
                );
            }
            Err(e) if e.is_recoverable() => {
                info!("Triage pool drained: {}", e);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // 3. 各诊室叫号
    println!("\n🚪 诊室叫号");
    for room in engine.catalog().rooms() {
        let site = CallSite::Room {
            room: room.id.clone(),
        };
        match engine.call_next(&site).await {
            Ok(record) => println!("   {} 接诊 {} {}", room.label, record.id, record.name),
            Err(e) => warn!("{} could not call a patient: {}", room.label, e),
        }
    }

    // 4. 大屏与播报
    let board = engine.display_board().await?;
    println!("\n📺 公共大屏");
    for panel in &board.rooms {
        println!(
            "   {} [{:?}] 当前: {} 候诊: {}",
            panel.label,
            panel.state,
            panel
                .current
                .as_ref()
                .map(|c| c.name.as_str())
                .unwrap_or("-"),
            panel.waiting.len()
        );
    }
    for announcement in &board.announcements {
        println!("   🔊 {}", announcement.text);
        engine.mark_announced(&announcement.token_id).await?;
    }

    // 5. 就诊结束
    for record in &board.now_serving {
        engine.complete_current(Stage::Consultation, &record.id).await?;
    }

    // 6. 统计
    let stats = engine.stats().await?;
    println!("\n📊 统计");
    println!("   总数: {}", stats.total);
    for (status, count) in &stats.by_status {
        println!("   {}: {}", status, count);
    }
    for room in &stats.rooms {
        println!("   {} 已接诊 {} 候诊 {}", room.room, room.patients_served, room.waiting);
    }

    println!(
        "\n📋 缓存中的挂号台视图: {} 条",
        cache.project(&QueueFilter::reception()).len()
    );
    cache.shutdown().await;

    println!("\n✅ 演示完成！");
    Ok(())
}
