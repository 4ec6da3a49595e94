//! 门诊分诊排队系统
//!
//! 汇总各子模块，便于演示程序统一引用

pub use clinic_core as model;
pub use clinic_store as store;
pub use clinic_workflow as workflow;
