//! 记录集编解码

use clinic_core::{PatientRecord, Result};
use serde_json::Value;

/// 将存储中的号码表解码为按号码排序的记录集
///
/// 任意一条记录无法解码都视为错误，不会静默跳过。
pub fn decode_records(value: Option<Value>) -> Result<Vec<PatientRecord>> {
    let Some(Value::Object(map)) = value else {
        return Ok(Vec::new());
    };

    let mut records = map
        .into_iter()
        .map(|(_, doc)| serde_json::from_value::<PatientRecord>(doc))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    records.sort_by_key(|r| r.number);
    Ok(records)
}
