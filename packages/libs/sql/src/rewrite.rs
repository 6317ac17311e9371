//! 요청 재작성
//!
//! 행 필터 식을 연산별 파라미터 문서에 병합합니다.
//!
//! - `query`: 단일 `where` 파라미터에 AND 병합
//! - `export`: 보이는 레이어마다 `layerDefs` 맵에 병합
//!
//! 재작성은 멱등이 아닙니다. 같은 요청을 두 번 재작성하면 필터가 두 번
//! 덧붙습니다 (호출마다 append).

use std::collections::HashMap;

use serde_json::Value;

use rg_core::error::{Error, Result};
use rg_core::filter::RowFilter;

/// 기존 where 절과 행 필터 병합
///
/// 기존 절이 있으면 `{existing} AND {filter}`, 없거나 비어 있으면 필터만
/// 반환합니다.
pub fn merge_where(existing: Option<&str>, filter: &str) -> String {
    match existing {
        Some(current) if !current.is_empty() => format!("{current} AND {filter}"),
        _ => filter.to_string(),
    }
}

/// query 요청의 `where` 파라미터 재작성
pub fn rewrite_query(params: &mut HashMap<String, String>, filter: &RowFilter) {
    let merged = merge_where(params.get("where").map(|s| s.as_str()), filter.as_str());
    params.insert("where".to_string(), merged);
}

/// `layers` 파라미터에서 보이는 레이어 ID 목록 추출
///
/// 형식: `"<prefix>:<id>,<id>,..."` (예: `"show:0,1,2"`).
/// 형식이 맞지 않거나 ID가 하나도 없으면 에러입니다. 필터를 적용할 수
/// 없는 export 요청은 통과시키지 않습니다.
pub fn visible_layers(layers: &str) -> Result<Vec<String>> {
    let Some((_, ids)) = layers.split_once(':') else {
        return Err(Error::InvalidLayers {
            message: format!("expected \"<prefix>:<id>,...\", got \"{layers}\""),
        });
    };

    let ids: Vec<String> = ids
        .split(',')
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(Error::InvalidLayers {
            message: "no layer ids present".to_string(),
        });
    }

    Ok(ids)
}

/// export 요청의 `layerDefs` 파라미터 재작성
///
/// 보이는 레이어마다 행 필터를 적용하고, 해당 레이어에 기존 필터가 있으면
/// 행 필터 뒤에 AND로 덧붙입니다. 보이지 않는 레이어의 기존 정의는 그대로
/// 유지됩니다.
pub fn rewrite_export(params: &mut HashMap<String, String>, filter: &RowFilter) -> Result<()> {
    let layers = params.get("layers").map(|s| s.as_str()).unwrap_or("");
    let visible = visible_layers(layers)?;

    let mut defs = parse_layer_defs(params.get("layerDefs").map(|s| s.as_str()))?;

    for layer_id in visible {
        let merged = match defs.get(&layer_id) {
            Some(existing) if !existing.is_empty() => {
                format!("{} AND {}", filter.as_str(), existing)
            }
            _ => filter.as_str().to_string(),
        };
        defs.insert(layer_id, merged);
    }

    params.insert("layerDefs".to_string(), serde_json::to_string(&defs)?);
    Ok(())
}

/// `layerDefs` JSON 객체 파싱 (layerId → 필터 문자열)
fn parse_layer_defs(raw: Option<&str>) -> Result<HashMap<String, String>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(HashMap::new());
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| Error::InvalidLayerDefs {
        message: e.to_string(),
    })?;

    let Value::Object(map) = value else {
        return Err(Error::InvalidLayerDefs {
            message: "expected a JSON object".to_string(),
        });
    };

    let mut defs = HashMap::new();
    for (layer_id, def) in map {
        let Value::String(def) = def else {
            return Err(Error::InvalidLayerDefs {
                message: format!("filter for layer \"{layer_id}\" is not a string"),
            });
        };
        defs.insert(layer_id, def);
    }

    Ok(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_core::groups::GroupResolution;
    use rg_core::policy::AccessPolicy;
    use rg_core::{build_row_filter, RowFilter};

    fn editors_filter() -> RowFilter {
        let policy = AccessPolicy::new("owner_grp", vec![], None).unwrap();
        let resolution = GroupResolution::Known(vec!["editors".to_string()].into_iter().collect());
        build_row_filter(&resolution, &policy)
    }

    #[test]
    fn test_merge_where() {
        assert_eq!(
            merge_where(Some("STATUS=1"), "(owner_grp='editors')"),
            "STATUS=1 AND (owner_grp='editors')"
        );
        assert_eq!(merge_where(None, "1=0"), "1=0");
        assert_eq!(merge_where(Some(""), "1=0"), "1=0");
    }

    #[test]
    fn test_rewrite_query_with_existing_where() {
        let mut params = HashMap::from([("where".to_string(), "STATUS=1".to_string())]);
        rewrite_query(&mut params, &editors_filter());

        assert_eq!(params["where"], "STATUS=1 AND (owner_grp='editors')");
    }

    #[test]
    fn test_rewrite_query_without_where() {
        let mut params = HashMap::new();
        rewrite_query(&mut params, &editors_filter());

        assert_eq!(params["where"], "(owner_grp='editors')");
    }

    #[test]
    fn test_rewrite_query_appends_each_call() {
        // 멱등이 아님: 두 번 재작성하면 두 번 붙는다
        let mut params = HashMap::from([("where".to_string(), "STATUS=1".to_string())]);
        rewrite_query(&mut params, &editors_filter());
        rewrite_query(&mut params, &editors_filter());

        assert_eq!(
            params["where"],
            "STATUS=1 AND (owner_grp='editors') AND (owner_grp='editors')"
        );
    }

    #[test]
    fn test_visible_layers() {
        assert_eq!(visible_layers("show:0,1,2").unwrap(), vec!["0", "1", "2"]);
        assert_eq!(visible_layers("show: 3 , 4 ").unwrap(), vec!["3", "4"]);
    }

    #[test]
    fn test_visible_layers_rejects_bad_formats() {
        assert!(visible_layers("").is_err());
        assert!(visible_layers("show").is_err());
        assert!(visible_layers("show:").is_err());
        assert!(visible_layers("show: , ").is_err());
    }

    #[test]
    fn test_rewrite_export_merges_each_visible_layer() {
        let mut params = HashMap::from([
            ("layers".to_string(), "show:0,1,2".to_string()),
            ("layerDefs".to_string(), r#"{"1":"TYPE='A'"}"#.to_string()),
        ]);
        rewrite_export(&mut params, &editors_filter()).unwrap();

        let defs: HashMap<String, String> = serde_json::from_str(&params["layerDefs"]).unwrap();
        assert_eq!(defs["0"], "(owner_grp='editors')");
        assert_eq!(defs["1"], "(owner_grp='editors') AND TYPE='A'");
        assert_eq!(defs["2"], "(owner_grp='editors')");
    }

    #[test]
    fn test_rewrite_export_keeps_hidden_layer_defs() {
        let mut params = HashMap::from([
            ("layers".to_string(), "show:0".to_string()),
            ("layerDefs".to_string(), r#"{"9":"TYPE='B'"}"#.to_string()),
        ]);
        rewrite_export(&mut params, &editors_filter()).unwrap();

        let defs: HashMap<String, String> = serde_json::from_str(&params["layerDefs"]).unwrap();
        assert_eq!(defs["0"], "(owner_grp='editors')");
        assert_eq!(defs["9"], "TYPE='B'");
    }

    #[test]
    fn test_rewrite_export_without_layers_fails() {
        let mut params = HashMap::new();
        let result = rewrite_export(&mut params, &editors_filter());
        assert!(matches!(result, Err(Error::InvalidLayers { .. })));
    }

    #[test]
    fn test_rewrite_export_with_bad_layer_defs_fails() {
        let mut params = HashMap::from([
            ("layers".to_string(), "show:0".to_string()),
            ("layerDefs".to_string(), "not json".to_string()),
        ]);
        let result = rewrite_export(&mut params, &editors_filter());
        assert!(matches!(result, Err(Error::InvalidLayerDefs { .. })));

        let mut params = HashMap::from([
            ("layers".to_string(), "show:0".to_string()),
            ("layerDefs".to_string(), r#"{"0":5}"#.to_string()),
        ]);
        let result = rewrite_export(&mut params, &editors_filter());
        assert!(matches!(result, Err(Error::InvalidLayerDefs { .. })));
    }
}
