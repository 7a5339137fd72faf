use std::path::Path;

use indicatif::ProgressStyle;
use regex::Regex;

use crate::error::{Error, Result};

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .expect("invalid progress bar template")
        .progress_chars("#>-")
}

/// 将逗号分隔的后缀列表转换为忽略大小写的正则表达式，如 `jpg,png` => `(?i)^(jpg|png)$`
pub fn suffix_regex(suffix: &str) -> Result<Regex, regex::Error> {
    let suffixes = suffix.split(',').map(|s| regex::escape(s.trim())).collect::<Vec<_>>();
    Regex::new(&format!("(?i)^({})$", suffixes.join("|")))
}

/// 文件后缀名是否匹配
pub fn match_suffix(re_suf: &Regex, path: impl AsRef<Path>) -> bool {
    path.as_ref().extension().is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()))
}

/// 解析十六进制指纹，允许带 `0x` 前缀，可以省略前导零
pub fn parse_fingerprint(s: &str) -> Result<u64> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    parse_hex(digits).ok_or_else(|| Error::InvalidFingerprint(s.to_string()))
}

/// 只接受十六进制数字，`from_str_radix` 允许的 `+` 号不算
pub fn parse_hex(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
