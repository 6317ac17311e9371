//! 행 필터 식 빌더
//!
//! 그룹 해석 결과와 정책을 받아 SQL WHERE 절에 삽입할 행 필터 식을
//! 생성합니다. 인가 보장의 핵심이므로 단일 함수로 격리되어 있습니다.
//!
//! # 정책 의미
//!
//! 1. 해석 실패(Unknown) → `1=0` (전체 거부)
//! 2. 특권 그룹 포함 → `1=1` (전체 허용)
//! 3. 그룹 있음 → 그룹별 equality의 OR 결합 (+ 선택적 제한 컬럼 절)
//! 4. 그룹 없음(확인됨) → `1=0`
//!
//! 그룹 ID 리터럴은 이스케이프 없이 그대로 삽입됩니다. 그룹 ID는 신원
//! 소스가 이미 검증한 토큰으로 취급한다는 제약이며, 주입 안전성을
//! 보장하는 것은 아닙니다.

use std::fmt;

use crate::groups::GroupResolution;
use crate::policy::AccessPolicy;

/// 전체 거부 필터
pub const DENY_ALL: &str = "1=0";

/// 전체 허용 필터
pub const ALLOW_ALL: &str = "1=1";

/// 행 필터 식
///
/// 요청마다 새로 생성되며 요청 간에 캐시되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter(String);

impl RowFilter {
    /// 전체 거부 필터 생성
    pub fn deny_all() -> Self {
        Self(DENY_ALL.to_string())
    }

    /// 전체 허용 필터 생성
    pub fn allow_all() -> Self {
        Self(ALLOW_ALL.to_string())
    }

    /// 필터 식 문자열
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 전체 거부 여부
    pub fn is_deny_all(&self) -> bool {
        self.0 == DENY_ALL
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 그룹 해석 결과 → 행 필터 식
///
/// 항상 성공하는 순수 계산입니다. 우선순위는 모듈 문서의 정책 의미를
/// 따릅니다.
pub fn build_row_filter(resolution: &GroupResolution, policy: &AccessPolicy) -> RowFilter {
    let groups = match resolution {
        GroupResolution::Unknown => return RowFilter::deny_all(),
        GroupResolution::Known(groups) => groups,
    };

    if groups.iter().any(|g| policy.is_privileged(g)) {
        return RowFilter::allow_all();
    }

    if groups.is_empty() {
        return RowFilter::deny_all();
    }

    let clauses: Vec<String> = groups
        .iter()
        .map(|g| format!("{}='{}'", policy.group_attribute_field, g))
        .collect();
    let mut filter = format!("({})", clauses.join(" OR "));

    if let Some(col) = &policy.restricted_column {
        filter.push_str(&format!(" AND ({col} = 0 OR {col} IS NULL)"));
    }

    RowFilter(filter)
}
