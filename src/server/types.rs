use std::time::Duration;

use axum::body::Bytes;
use axum_typed_multipart::TryFromMultipart;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::lookup::Match;

/// 搜索请求参数
#[derive(TryFromMultipart)]
pub struct SearchRequest {
    pub file: Bytes,
}

/// 搜索表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchForm {
    /// 上传的 PNG 或 JPEG 图片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 搜索响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    /// 最相似图片的标识符
    pub identifier: String,
    /// 最相似图片的指纹，小写十六进制
    pub fingerprint: String,
    /// 按索引度量方式计算的距离
    pub distance: u64,
    /// 与查询指纹相差的位数
    pub hamming: u32,
    /// 搜索耗时，单位为毫秒
    pub time: u64,
}

impl SearchResponse {
    pub fn new(result: Match, elapsed: Duration) -> Self {
        Self {
            identifier: result.identifier,
            fingerprint: format!("{:x}", result.fingerprint),
            distance: result.distance,
            hamming: result.hamming,
            time: elapsed.as_millis() as u64,
        }
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
