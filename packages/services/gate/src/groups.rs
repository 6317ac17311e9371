//! 호출자 그룹 해석
//!
//! 요청마다 호출자의 그룹 멤버십을 한 번 해석합니다.
//!
//! - 로컬 모드: 신뢰된 앞단이 주입한 그룹 헤더를 레지스트리로 사용
//! - 연합 모드: 소유 시스템 포털에 토큰을 전달하여 그룹을 조회
//!
//! 모든 실패 경로는 [`GroupResolution::Unknown`]으로 끝납니다. 기본
//! 허용으로 끝나는 경로는 없습니다.

use std::collections::HashMap;
use std::time::Duration;

use axum::http::HeaderMap;
use serde_json::Value;

use rg_core::{GroupResolution, GroupSet};

/// 요청 컨텍스트
///
/// 그룹 해석에 필요한 호출자 정보입니다. 전역 조회가 아니라 요청에서
/// 명시적으로 추출되어 파라미터로 전달됩니다.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Bearer 토큰 (연합 모드용)
    pub token: Option<String>,

    /// 세션 주체 이름 (`issuer::account` 형태 가능)
    pub principal: Option<String>,

    /// 앞단이 주입한 로컬 그룹 목록 (헤더 없음 = None)
    pub local_groups: Option<Vec<String>>,
}

impl RequestContext {
    /// 헤더와 파라미터 문서에서 컨텍스트 추출
    ///
    /// 토큰 우선순위: `Authorization: Bearer ...` → `token` 파라미터
    pub fn from_request(headers: &HeaderMap, params: &HashMap<String, String>) -> Self {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .or_else(|| params.get("token").cloned())
            .filter(|t| !t.is_empty());

        let principal = headers
            .get("x-user-principal")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let local_groups = headers
            .get("x-user-groups")
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect::<Vec<_>>()
            });

        Self {
            token,
            principal,
            local_groups,
        }
    }
}

/// `issuer::account` 형태의 주체 이름에서 계정 부분 추출
fn normalize_account(principal: &str) -> &str {
    principal.rsplit("::").next().unwrap_or(principal)
}

/// 포털 클라이언트
struct PortalClient {
    base_url: String,
    http: reqwest::Client,
}

/// 그룹 해석기
///
/// 포털이 설정되어 있으면 연합 모드, 없으면 로컬 모드로 동작합니다.
pub struct GroupResolver {
    portal: Option<PortalClient>,
}

impl GroupResolver {
    /// 로컬 모드 해석기 생성
    pub fn local() -> Self {
        Self { portal: None }
    }

    /// 연합 모드 해석기 생성
    ///
    /// 포털 호출에는 타임아웃이 걸리며 인증서 검증은 정상적으로
    /// 수행됩니다.
    pub fn federated(base_url: String, timeout_secs: u64) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            portal: Some(PortalClient {
                base_url: base_url.trim_end_matches('/').to_string(),
                http,
            }),
        })
    }

    /// 호출자의 그룹 집합 해석
    ///
    /// 실패 시 재시도하지 않습니다. 만료된 토큰은 요청을 거부 결과로
    /// 끝내야지 반복 호출로 이어져서는 안 됩니다.
    pub async fn resolve(&self, ctx: &RequestContext) -> GroupResolution {
        match &self.portal {
            Some(portal) => Self::resolve_federated(portal, ctx).await,
            None => Self::resolve_local(ctx),
        }
    }

    /// 로컬 레지스트리(헤더)에서 그룹 해석
    ///
    /// 헤더가 있으면 비어 있어도 Known(그룹 0개)입니다. 헤더 자체가
    /// 없으면 Unknown입니다.
    fn resolve_local(ctx: &RequestContext) -> GroupResolution {
        match &ctx.local_groups {
            Some(groups) => GroupResolution::Known(groups.iter().cloned().collect()),
            None => {
                tracing::debug!("no group registry entry for caller");
                GroupResolution::Unknown
            }
        }
    }

    /// 포털에서 그룹 해석
    async fn resolve_federated(portal: &PortalClient, ctx: &RequestContext) -> GroupResolution {
        let Some(token) = &ctx.token else {
            tracing::warn!("federated group lookup skipped: no token on request");
            return GroupResolution::Unknown;
        };
        let Some(principal) = &ctx.principal else {
            tracing::warn!("federated group lookup skipped: no session principal");
            return GroupResolution::Unknown;
        };

        let account = normalize_account(principal);
        let url = format!("{}/sharing/rest/community/users/{}", portal.base_url, account);
        let form = [("token", token.as_str()), ("f", "pjson")];

        let response = match portal.http.post(&url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("portal request failed: {e}");
                return GroupResolution::Unknown;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("portal returned status {}", response.status());
            return GroupResolution::Unknown;
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("portal response body unreadable: {e}");
                return GroupResolution::Unknown;
            }
        };

        match parse_group_response(&body) {
            Some(groups) => GroupResolution::Known(groups),
            None => {
                tracing::warn!(account, "portal response carried no usable group list");
                GroupResolution::Unknown
            }
        }
    }
}

/// 포털 사용자 응답에서 그룹 집합 추출
///
/// `error` 키가 있거나 `groups` 배열 형태가 아니면 해석 실패(None)입니다.
/// 항목 하나라도 `id`가 없으면 부분 집합을 만들지 않고 전체를 실패로
/// 처리합니다.
fn parse_group_response(body: &Value) -> Option<GroupSet> {
    if body.get("error").is_some() {
        return None;
    }

    let entries = body.get("groups")?.as_array()?;

    let mut groups = GroupSet::new();
    for entry in entries {
        let id = entry.get("id").and_then(Value::as_str)?;
        groups.insert(id);
    }

    Some(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_normalize_account() {
        assert_eq!(normalize_account("PORTAL::jsmith"), "jsmith");
        assert_eq!(normalize_account("jsmith"), "jsmith");
        assert_eq!(normalize_account("a::b::jsmith"), "jsmith");
    }

    #[test]
    fn test_context_token_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        let params = HashMap::from([("token".to_string(), "param-token".to_string())]);

        let ctx = RequestContext::from_request(&headers, &params);
        assert_eq!(ctx.token.as_deref(), Some("abc123"));

        // Authorization 헤더가 없으면 token 파라미터 사용
        let ctx = RequestContext::from_request(&HeaderMap::new(), &params);
        assert_eq!(ctx.token.as_deref(), Some("param-token"));
    }

    #[test]
    fn test_context_group_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-groups", HeaderValue::from_static("editors, viewers"));
        let ctx = RequestContext::from_request(&headers, &HashMap::new());
        assert_eq!(
            ctx.local_groups,
            Some(vec!["editors".to_string(), "viewers".to_string()])
        );

        // 헤더가 있지만 빈 값 → 빈 목록 (None 아님)
        let mut headers = HeaderMap::new();
        headers.insert("x-user-groups", HeaderValue::from_static(""));
        let ctx = RequestContext::from_request(&headers, &HashMap::new());
        assert_eq!(ctx.local_groups, Some(vec![]));

        let ctx = RequestContext::from_request(&HeaderMap::new(), &HashMap::new());
        assert_eq!(ctx.local_groups, None);
    }

    #[test]
    fn test_local_resolution_states() {
        let with_groups = RequestContext {
            local_groups: Some(vec!["editors".to_string()]),
            ..Default::default()
        };
        let empty = RequestContext {
            local_groups: Some(vec![]),
            ..Default::default()
        };
        let missing = RequestContext::default();

        let resolution = GroupResolver::resolve_local(&with_groups);
        assert!(resolution.groups().unwrap().contains("editors"));

        let resolution = GroupResolver::resolve_local(&empty);
        assert!(resolution.groups().unwrap().is_empty());

        assert!(GroupResolver::resolve_local(&missing).is_unknown());
    }

    #[test]
    fn test_parse_group_response() {
        let body = json!({
            "groups": [
                { "id": "grp_a", "title": "Group A" },
                { "id": "grp_b" }
            ]
        });
        let groups = parse_group_response(&body).unwrap();
        let ids: Vec<&str> = groups.iter().collect();
        assert_eq!(ids, vec!["grp_a", "grp_b"]);
    }

    #[test]
    fn test_parse_group_response_error_key_fails() {
        // error 키가 있으면 부분 집합 없이 전체 실패
        let body = json!({
            "error": { "code": 498, "message": "Invalid token." },
            "groups": [{ "id": "grp_a" }]
        });
        assert!(parse_group_response(&body).is_none());
    }

    #[test]
    fn test_parse_group_response_malformed_shapes_fail() {
        assert!(parse_group_response(&json!({})).is_none());
        assert!(parse_group_response(&json!({ "groups": "nope" })).is_none());
        assert!(parse_group_response(&json!({ "groups": [{ "title": "no id" }] })).is_none());
    }

    #[test]
    fn test_parse_group_response_empty_groups_is_known() {
        // 그룹이 없는 사용자도 확인된 상태 (Unknown 아님)
        let groups = parse_group_response(&json!({ "groups": [] })).unwrap();
        assert!(groups.is_empty());
    }
}
