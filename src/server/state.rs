use std::sync::Arc;

use crate::lookup::LookupService;

/// 应用状态
pub struct AppState {
    /// 启动时构建的只读索引，所有请求共享
    pub lookup: LookupService,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(lookup: LookupService) -> Arc<Self> {
        Arc::new(AppState { lookup })
    }
}
