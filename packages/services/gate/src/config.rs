//! Gate 설정

use std::env;

/// Gate 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트
    pub port: u16,

    /// 다운스트림 피처 엔진 URL
    pub engine_url: String,

    /// 행의 소유 그룹을 담는 컬럼 이름
    pub group_attribute_field: String,

    /// 전체 데이터 접근을 허용하는 특권 그룹 ID 목록
    pub privileged_groups: Vec<String>,

    /// 추가 제한을 거는 컬럼 이름 (빈 값 = 비활성)
    pub restricted_column: Option<String>,

    /// 연합 신원 포털 URL (설정 시 연합 모드)
    pub owning_system_url: Option<String>,

    /// 포털 호출 타임아웃 (초)
    pub portal_timeout_secs: u64,
}

impl Config {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: env::var("RG_GATE_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,

            engine_url: env::var("RG_ENGINE_URL")
                .unwrap_or_else(|_| "http://localhost:6080/rest/services".to_string())
                .trim_end_matches('/')
                .to_string(),

            group_attribute_field: env::var("RG_GROUP_FIELD").unwrap_or_default(),

            privileged_groups: env::var("RG_PRIVILEGED_GROUPS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),

            restricted_column: env::var("RG_RESTRICTED_COLUMN")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            owning_system_url: env::var("RG_OWNING_SYSTEM_URL")
                .ok()
                .map(|s| s.trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),

            portal_timeout_secs: env::var("RG_PORTAL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }
}
