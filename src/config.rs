use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::fingerprint::{FingerprintMode, Fingerprinter};
use crate::index::Metric;
use crate::store::FingerprintStore;

static CONF_DIR: LazyLock<String> = LazyLock::new(|| match ProjectDirs::from("", "", "imfind") {
    Some(proj_dirs) => proj_dirs.config_dir().to_string_lossy().to_string(),
    None => ".".to_string(),
});

fn default_config_dir() -> &'static str {
    CONF_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct FingerprintOptions {
    /// 对感知哈希再做一次 simhash，添加和搜索时必须保持一致
    #[arg(long)]
    pub simhash: bool,
}

impl FingerprintOptions {
    pub fn mode(&self) -> FingerprintMode {
        match self.simhash {
            true => FingerprintMode::Simhash,
            false => FingerprintMode::Perceptual,
        }
    }

    pub fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::new(self.mode())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 距离度量方式，numeric 为指纹的数值差，hamming 为不同的位数
    #[arg(long, value_enum, default_value_t = Metric::Numeric)]
    pub metric: Metric,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imfind", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imfind 配置文件目录
    #[arg(short, long, env = "IMFIND_CONF_DIR", default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 计算图片指纹并追加到存储文件
    Add(AddCommand),
    /// 搜索最相似的图片
    Search(SearchCommand),
    /// 显示图片的指纹
    Show(ShowCommand),
    /// 启动 HTTP 搜索服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回指纹存储文件的路径
    pub fn store_file(&self) -> PathBuf {
        self.path.join("image_hashes.txt")
    }

    pub fn store(&self) -> FingerprintStore {
        FingerprintStore::new(self.store_file())
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
