//! rg-sql: 요청 필터 병합 라이브러리
//!
//! 행 필터 식을 연산별 요청 문서에 안전하게 병합합니다.
//!
//! # 모듈 구조
//!
//! - `rewrite`: query `where` 병합 및 export `layerDefs` 병합

pub mod rewrite;

pub use rewrite::{merge_where, rewrite_export, rewrite_query, visible_layers};
