//! Gate 앱 상태

use std::sync::Arc;

use rg_core::AccessPolicy;

use crate::config::Config;
use crate::engine::{FeatureEngine, HttpFeatureEngine};
use crate::groups::GroupResolver;

/// 앱 상태
///
/// 모든 핸들러에서 공유하는 상태입니다. 기동 후에는 전부 읽기 전용이므로
/// 잠금 없이 동시 요청이 공유합니다.
pub struct AppState {
    /// 설정
    pub config: Config,

    /// 접근 제어 정책 (기동 시 확정, 이후 불변)
    pub policy: AccessPolicy,

    /// 그룹 해석기
    pub resolver: GroupResolver,

    /// 다운스트림 엔진 클라이언트
    pub engine: Arc<dyn FeatureEngine>,
}

impl AppState {
    /// 새 상태 생성
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let policy = AccessPolicy::new(
            config.group_attribute_field.clone(),
            config.privileged_groups.iter().cloned(),
            config.restricted_column.clone(),
        )?;

        let resolver = match &config.owning_system_url {
            Some(url) => GroupResolver::federated(url.clone(), config.portal_timeout_secs)?,
            None => GroupResolver::local(),
        };

        let engine: Arc<dyn FeatureEngine> =
            Arc::new(HttpFeatureEngine::new(config.engine_url.clone())?);

        Ok(Self {
            config: config.clone(),
            policy,
            resolver,
            engine,
        })
    }
}
