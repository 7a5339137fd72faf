use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{FingerprintOptions, Opts, SearchOptions};
use crate::lookup::{LookupService, Match};
use crate::utils::parse_fingerprint;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub fingerprint: FingerprintOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的图片路径
    #[arg(required_unless_present = "hash")]
    pub image: Option<PathBuf>,
    /// 直接使用十六进制指纹搜索
    #[arg(long, value_name = "HEX", conflicts_with = "image")]
    pub hash: Option<String>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = opts.conf_dir.store();
        let service = block_in_place(|| {
            LookupService::open(&store, self.fingerprint.fingerprinter(), self.search.metric)
        })?;

        let result = match (&self.image, &self.hash) {
            (_, Some(hash)) => service.find_by_fingerprint(parse_fingerprint(hash)?)?,
            (Some(image), None) => {
                let data = tokio::fs::read(image)
                    .await
                    .with_context(|| format!("读取图片失败: {}", image.display()))?;
                block_in_place(|| service.find_similar(&data))?
            }
            (None, None) => anyhow::bail!("需要指定图片路径或者 --hash"),
        };

        print_result(&result, self.output_format)
    }
}

fn print_result(result: &Match, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            println!("{}\t{}", result.distance, result.identifier);
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
