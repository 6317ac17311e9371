//! 다운스트림 피처 엔진 클라이언트
//!
//! Gate는 엔진을 불투명한 서비스로 취급합니다. 연산 실행과 필터 구문
//! 검사 두 가지만 호출하며, 응답 본문은 해석 없이 그대로 되돌려줍니다.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// 엔진 응답
///
/// 불투명 바이트와 콘텐츠 타입. 생성된 뒤에는 변경 없이 호출자에게
/// 전달됩니다.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// 엔진 호출 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 엔진이 구조화된 오류를 반환함
    #[error("engine fault: {message}")]
    Fault { message: String },

    /// 전송 실패
    #[error("engine transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl EngineError {
    /// 호출자에게 보여줄 메시지
    pub fn caller_message(&self) -> String {
        match self {
            EngineError::Fault { message } => message.clone(),
            EngineError::Transport(e) => format!("engine request failed: {e}"),
        }
    }
}

/// 다운스트림 피처 엔진
///
/// 라우터가 테스트에서 엔진을 대체할 수 있도록 trait으로 분리되어
/// 있습니다.
#[async_trait]
pub trait FeatureEngine: Send + Sync {
    /// 연산 실행
    async fn execute(
        &self,
        resource: &str,
        operation: &str,
        params: &HashMap<String, String>,
    ) -> Result<EngineResponse, EngineError>;

    /// 필터 구문 검사 (`validateSQL`)
    ///
    /// 파싱된 JSON 본문을 그대로 반환합니다. 해석은
    /// [`interpret_validation`]이 담당합니다.
    async fn validate_filter(&self, resource: &str, filter: &str)
        -> Result<Value, EngineError>;
}

/// HTTP 피처 엔진 클라이언트
pub struct HttpFeatureEngine {
    base_url: String,
    http: reqwest::Client,
}

impl HttpFeatureEngine {
    /// 새 클라이언트 생성
    pub fn new(base_url: String) -> reqwest::Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder().build()?,
        })
    }

    fn operation_url(&self, resource: &str, operation: &str) -> String {
        if operation.is_empty() {
            format!("{}/{}", self.base_url, resource)
        } else {
            format!("{}/{}/{}", self.base_url, resource, operation)
        }
    }
}

#[async_trait]
impl FeatureEngine for HttpFeatureEngine {
    async fn execute(
        &self,
        resource: &str,
        operation: &str,
        params: &HashMap<String, String>,
    ) -> Result<EngineResponse, EngineError> {
        let response = self
            .http
            .post(self.operation_url(resource, operation))
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Fault {
                message: if message.is_empty() {
                    format!("engine returned status {status}")
                } else {
                    message
                },
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response.bytes().await?.to_vec();

        Ok(EngineResponse { body, content_type })
    }

    async fn validate_filter(
        &self,
        resource: &str,
        filter: &str,
    ) -> Result<Value, EngineError> {
        let form = [("sqlType", "where"), ("sql", filter), ("f", "json")];
        let response = self
            .http
            .post(format!("{}/{}/validateSQL", self.base_url, resource))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Fault {
                message: if message.is_empty() {
                    format!("engine returned status {status}")
                } else {
                    message
                },
            });
        }

        Ok(response.json().await?)
    }
}

/// validateSQL 응답 해석
///
/// `isValidSQL` 필드가 bool로 존재하면 그 값을 따르고, 없거나 형태가
/// 다르면 유효한 것으로 취급합니다. 구문 확인 불능에 한정된 의도적
/// fail-open이며, 그룹 해석 실패는 이 경로를 타지 않습니다 (해석 실패는
/// 항상 전체 거부).
pub fn interpret_validation(body: &Value) -> bool {
    body.get("isValidSQL").and_then(Value::as_bool).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interpret_validation_respects_field() {
        assert!(interpret_validation(&json!({ "isValidSQL": true })));
        assert!(!interpret_validation(&json!({ "isValidSQL": false })));
    }

    #[test]
    fn test_interpret_validation_fails_open_on_absent_field() {
        // 확인 불능은 유효로 취급 (구문 검사는 advisory)
        assert!(interpret_validation(&json!({})));
        assert!(interpret_validation(&json!({ "isValidSQL": "yes" })));
        assert!(interpret_validation(&json!({ "somethingElse": false })));
    }

    #[test]
    fn test_operation_url() {
        let engine = HttpFeatureEngine::new("http://engine/rest/services/".to_string()).unwrap();
        assert_eq!(
            engine.operation_url("Parcels/MapServer", "query"),
            "http://engine/rest/services/Parcels/MapServer/query"
        );
        assert_eq!(
            engine.operation_url("Parcels/MapServer", ""),
            "http://engine/rest/services/Parcels/MapServer"
        );
    }
}
