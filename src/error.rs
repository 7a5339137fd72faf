use std::path::PathBuf;

/// 核心模块的错误类型
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 输入不是受支持的图片，或者图片已损坏
    #[error("无法解码图片: {0}")]
    Decode(#[from] image::ImageError),
    /// 存储文件读写失败
    #[error("读写 {} 失败: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 索引中没有任何记录
    #[error("索引为空，没有可供比较的图片")]
    EmptyIndex,
    /// 无法解析的十六进制指纹
    #[error("无效的指纹: {0}")]
    InvalidFingerprint(String),
    /// 标识符为空或包含空白字符，无法写入存储文件
    #[error("无效的标识符: {0:?}")]
    InvalidIdentifier(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
