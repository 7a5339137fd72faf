use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{FingerprintOptions, Opts};

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    #[command(flatten)]
    pub fingerprint: FingerprintOptions,
    /// 图片路径，输出格式与存储文件相同
    #[arg(required = true)]
    pub images: Vec<PathBuf>,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let fingerprinter = self.fingerprint.fingerprinter();
        for image in &self.images {
            let fingerprint = block_in_place(|| fingerprinter.fingerprint_file(image))
                .with_context(|| format!("计算指纹失败: {}", image.display()))?;
            println!("{} {:x}", image.display(), fingerprint);
        }
        Ok(())
    }
}
