//! 错误响应

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use clinic_core::QueueError;
use serde_json::json;

/// HTTP 层错误，包装引擎错误
#[derive(Debug)]
pub struct ApiError(pub QueueError);

impl From<QueueError> for ApiError {
    fn from(error: QueueError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            QueueError::EmptyQueue(_) | QueueError::NotFound(_) => StatusCode::NOT_FOUND,
            QueueError::StaleState { .. } | QueueError::RoomConflict { .. } => StatusCode::CONFLICT,
            QueueError::Validation(_) | QueueError::InvalidStateTransition { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            QueueError::Allocation(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueueError::Store(_) | QueueError::Serialization(_) | QueueError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 队列为空是提示而不是故障
        let body = if matches!(self.0, QueueError::EmptyQueue(_)) {
            json!({
                "error": false,
                "notice": self.0.to_string(),
                "kind": self.0.kind(),
                "status": status.as_u16()
            })
        } else {
            json!({
                "error": true,
                "message": self.0.to_string(),
                "kind": self.0.kind(),
                "recoverable": self.0.is_recoverable(),
                "status": status.as_u16()
            })
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (QueueError::EmptyQueue("x".into()), StatusCode::NOT_FOUND),
            (QueueError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                QueueError::RoomConflict {
                    room: "r".into(),
                    occupant: "T1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                QueueError::StaleState {
                    token_id: "T1".into(),
                    expected: "waiting".into(),
                    actual: "in-triage".into(),
                },
                StatusCode::CONFLICT,
            ),
            (QueueError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (QueueError::Allocation("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (QueueError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError(error).status(), status);
        }
    }
}
