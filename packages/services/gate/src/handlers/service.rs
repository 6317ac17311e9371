//! 가로채기 라우터
//!
//! Gate의 핵심 엔드포인트입니다. 연산 이름에 따라 거부/재작성/통과를
//! 결정하고, 재작성된 요청을 다운스트림 엔진으로 전달합니다.
//!
//! - `find`: 거부 (레이어 전반의 자유 텍스트 검색은 행 필터로 안전하게
//!   제한할 수 없음)
//! - `query`: 그룹 해석 → 필터 생성 → 구문 검증 → `where` 병합 → 전달
//! - `export`: 그룹 해석 → 필터 생성 → `layerDefs` 병합 → 전달
//! - 그 외: 무변경 전달

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Form,
};
use serde_json::json;

use rg_core::{build_row_filter, RowFilter};
use rg_sql::{rewrite_export, rewrite_query};

use crate::engine::{interpret_validation, EngineError, EngineResponse};
use crate::error::{GateError, Result};
use crate::groups::RequestContext;
use crate::state::AppState;

/// 가로채기 대상 연산 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Query,
    Export,
    Find,
    Other,
}

impl OperationKind {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "query" => OperationKind::Query,
            "export" => OperationKind::Export,
            "find" => OperationKind::Find,
            _ => OperationKind::Other,
        }
    }
}

/// 연산 핸들러
pub async fn handle_operation(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Form(mut params): Form<HashMap<String, String>>,
) -> Result<Response> {
    let (resource, operation) = split_resource_operation(&path);
    if resource.is_empty() {
        return Err(GateError::BadRequest {
            message: "empty resource name".to_string(),
        });
    }
    tracing::debug!(resource, operation, "request start");

    match OperationKind::from_name(operation) {
        OperationKind::Find => {
            tracing::debug!(resource, "find operation rejected");
            return Ok(rejection_response());
        }
        OperationKind::Query => {
            let filter = resolve_row_filter(&state, &headers, &params).await;

            match state.engine.validate_filter(resource, filter.as_str()).await {
                Ok(body) => {
                    let valid = interpret_validation(&body);
                    tracing::debug!(valid, "row filter validated");
                    if valid {
                        rewrite_query(&mut params, &filter);
                        tracing::debug!(final_where = %params["where"], "where clause rewritten");
                    }
                }
                // 검증 호출 자체가 실패하면 다운스트림 장애로 처리
                Err(e) => return Ok(fault_response(e)),
            }
        }
        OperationKind::Export => {
            let filter = resolve_row_filter(&state, &headers, &params).await;
            rewrite_export(&mut params, &filter)?;
            tracing::debug!(layer_defs = %params["layerDefs"], "layerDefs rewritten");
        }
        OperationKind::Other => {}
    }

    match state.engine.execute(resource, operation, &params).await {
        Ok(response) => Ok(engine_response(response)),
        Err(e) => Ok(fault_response(e)),
    }
}

/// 그룹 해석 후 행 필터 생성
///
/// 해석과 필터 생성은 요청마다 새로 수행됩니다. 같은 연결이라도 호출자가
/// 다를 수 있으므로 캐시하지 않습니다.
async fn resolve_row_filter(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> RowFilter {
    let ctx = RequestContext::from_request(headers, params);
    let resolution = state.resolver.resolve(&ctx).await;
    let filter = build_row_filter(&resolution, &state.policy);
    tracing::debug!(filter = %filter, "row filter built");
    filter
}

/// 리소스 경로와 연산 이름 분리
///
/// 마지막 경로 조각이 연산 이름입니다 (조각이 하나뿐이면 연산 없음).
fn split_resource_operation(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((resource, operation)) => (resource, operation),
        None => (path, ""),
    }
}

/// 허용되지 않는 연산에 대한 거부 응답
fn rejection_response() -> Response {
    let body = json!({
        "error": {
            "code": 403,
            "message": "Operation not allowed.",
            "details": ["The find operation is blocked by row level access control."]
        }
    });

    (
        [(header::CONTENT_TYPE, "text/plain;charset=utf-8")],
        body.to_string(),
    )
        .into_response()
}

/// 다운스트림 장애를 평문 에러 응답으로 변환
fn fault_response(error: EngineError) -> Response {
    tracing::error!("downstream fault: {error}");
    (
        [(header::CONTENT_TYPE, "text/plain;charset=utf-8")],
        error.caller_message(),
    )
        .into_response()
}

/// 엔진 응답을 무변경 전달
fn engine_response(response: EngineResponse) -> Response {
    ([(header::CONTENT_TYPE, response.content_type)], response.body).into_response()
}
