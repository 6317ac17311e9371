//! 공통 에러 타입
//!
//! Rowgate 전체에서 사용되는 에러 타입을 정의합니다.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Rowgate 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Policy Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("policy config error: {message}")]
    PolicyConfig { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Rewrite Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("invalid layers parameter: {message}")]
    InvalidLayers { message: String },

    #[error("invalid layerDefs parameter: {message}")]
    InvalidLayerDefs { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // IO/Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP 상태 코드로 변환
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::InvalidLayers { .. } | Error::InvalidLayerDefs { .. } | Error::Json(_) => 400,

            // 500 Internal Server Error
            Error::PolicyConfig { .. } => 500,
        }
    }

    /// 에러 코드 (클라이언트용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::PolicyConfig { .. } => "POLICY_CONFIG_ERROR",
            Error::InvalidLayers { .. } => "INVALID_LAYERS",
            Error::InvalidLayerDefs { .. } => "INVALID_LAYER_DEFS",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
