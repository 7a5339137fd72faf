use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum_typed_multipart::TypedMultipart;
use log::info;
use tokio::task::block_in_place;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::metrics;
use crate::utils::parse_fingerprint;

/// 搜索与上传图片最相似的图片
#[utoipa::path(
    post,
    path = "/search",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "无法解码图片", body = ErrorResponse),
        (status = 404, description = "索引为空", body = ErrorResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    TypedMultipart(data): TypedMultipart<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    info!("正在搜索上传图片，大小 {} 字节", data.file.len());

    let result = block_in_place(|| state.lookup.find_similar(&data.file))?;

    Ok(Json(SearchResponse::new(result, start.elapsed())))
}

/// 搜索与给定指纹最接近的图片
#[utoipa::path(
    get,
    path = "/search/{hash}",
    params(("hash" = String, Path, description = "十六进制指纹")),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "无效的指纹", body = ErrorResponse),
        (status = 404, description = "索引为空", body = ErrorResponse),
    )
)]
pub async fn search_hash_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    let fingerprint = parse_fingerprint(&hash)?;
    let result = state.lookup.find_by_fingerprint(fingerprint)?;

    Ok(Json(SearchResponse::new(result, start.elapsed())))
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics", responses((status = 200, body = String)))]
pub async fn metrics_handler() -> Result<String> {
    Ok(metrics::encode_text()?)
}
