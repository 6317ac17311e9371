//! 행 수준 접근 제어 정책
//!
//! 프로세스 기동 시 한 번 로드되어 모든 요청이 공유하는 불변 정책입니다.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 행 수준 접근 제어 정책
///
/// 기동 시 외부 설정에서 생성된 뒤 읽기 전용으로 공유됩니다.
/// 요청 처리 중에는 절대 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// 행의 소유 그룹을 담는 컬럼 이름
    pub group_attribute_field: String,

    /// 전체 데이터 접근을 허용하는 특권 그룹 ID 집합
    #[serde(default)]
    pub privileged_groups: HashSet<String>,

    /// 추가 제한을 거는 컬럼 이름 (None = 비활성)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_column: Option<String>,
}

impl AccessPolicy {
    /// 새 정책 생성
    ///
    /// 빈 `restricted_column`은 `None`으로 정규화됩니다.
    pub fn new(
        group_attribute_field: impl Into<String>,
        privileged_groups: impl IntoIterator<Item = String>,
        restricted_column: Option<String>,
    ) -> Result<Self> {
        let group_attribute_field = group_attribute_field.into();
        if group_attribute_field.trim().is_empty() {
            return Err(Error::PolicyConfig {
                message: "group attribute field must not be empty".to_string(),
            });
        }

        let restricted_column = restricted_column.filter(|c| !c.trim().is_empty());

        Ok(Self {
            group_attribute_field,
            privileged_groups: privileged_groups.into_iter().collect(),
            restricted_column,
        })
    }

    /// 특권 그룹 여부 확인
    pub fn is_privileged(&self, group: &str) -> bool {
        self.privileged_groups.contains(group)
    }

    /// 제한 컬럼 활성화 여부
    pub fn has_restricted_column(&self) -> bool {
        self.restricted_column.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_policy() {
        let policy = AccessPolicy::new(
            "OWNER_GRP",
            vec!["admins".to_string()],
            Some("RESTRICTED".to_string()),
        )
        .unwrap();

        assert_eq!(policy.group_attribute_field, "OWNER_GRP");
        assert!(policy.is_privileged("admins"));
        assert!(!policy.is_privileged("editors"));
        assert!(policy.has_restricted_column());
    }

    #[test]
    fn test_empty_group_field_rejected() {
        let result = AccessPolicy::new("  ", vec![], None);
        assert!(matches!(result, Err(Error::PolicyConfig { .. })));
    }

    #[test]
    fn test_empty_restricted_column_normalized() {
        // 빈 문자열 설정은 비활성으로 취급
        let policy = AccessPolicy::new("GRP", vec![], Some("".to_string())).unwrap();
        assert!(!policy.has_restricted_column());

        let policy = AccessPolicy::new("GRP", vec![], None).unwrap();
        assert!(!policy.has_restricted_column());
    }
}
