//! 指纹存储文件
//!
//! 每行一条记录，格式为 `<标识符> <小写十六进制指纹>`。文件只追加，不会被重写。

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::parse_hex;

/// 一条指纹记录
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FingerprintRecord {
    /// 图片路径或其他不含空白字符的标识
    pub identifier: String,
    pub fingerprint: u64,
}

impl FingerprintRecord {
    pub fn new(identifier: impl Into<String>, fingerprint: u64) -> Self {
        Self { identifier: identifier.into(), fingerprint }
    }

    /// 解析存储文件中的一行，格式不正确时返回 None
    fn parse_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let identifier = tokens.next()?;
        let fingerprint = parse_hex(tokens.next()?)?;
        Some(Self::new(identifier, fingerprint))
    }
}

/// 标识符是否可以写入存储文件
pub fn is_valid_identifier(identifier: &str) -> bool {
    !identifier.is_empty() && !identifier.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone)]
pub struct FingerprintStore {
    path: PathBuf,
}

impl FingerprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一批记录，返回前会 flush
    ///
    /// 写入失败时，已经写入的行不会回滚。
    pub fn append(&self, records: &[FingerprintRecord]) -> Result<()> {
        if let Some(record) = records.iter().find(|r| !is_valid_identifier(&r.identifier)) {
            return Err(Error::InvalidIdentifier(record.identifier.clone()));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            writeln!(writer, "{} {:x}", record.identifier, record.fingerprint)
                .map_err(|e| Error::io(&self.path, e))?;
        }
        writer.flush().map_err(|e| Error::io(&self.path, e))?;

        debug!("追加 {} 条记录到 {}", records.len(), self.path.display());
        Ok(())
    }

    /// 读取全部记录，无法解析的行会被跳过
    pub fn load_all(&self) -> Result<Vec<FingerprintRecord>> {
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;

        let mut records = vec![];
        let mut skipped = 0;
        // 标识符来自文件路径，不一定是合法的 UTF-8，按字节读取
        for (lineno, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line.map_err(|e| Error::io(&self.path, e))?;
            let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
            match std::str::from_utf8(line).ok().and_then(FingerprintRecord::parse_line) {
                Some(record) => records.push(record),
                None => {
                    debug!("跳过第 {} 行: {:?}", lineno + 1, String::from_utf8_lossy(line));
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("{} 中有 {} 行无法解析，已跳过", self.path.display(), skipped);
        }

        Ok(records)
    }
}
