use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{FingerprintOptions, SearchOptions};
use crate::lookup::LookupService;
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub fingerprint: FingerprintOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:8081")]
    pub addr: String,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        // 索引在开始接受请求之前构建完成，之后不再修改
        let store = opts.conf_dir.store();
        let service = block_in_place(|| {
            LookupService::open(&store, self.fingerprint.fingerprinter(), self.search.metric)
        })
        .context("无法加载指纹存储")?;
        if service.index().is_empty() {
            warn!("索引为空，所有搜索都不会有结果");
        }

        // 创建应用
        let state = server::AppState::new(service);
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
