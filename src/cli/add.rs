use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressIterator};
use log::{debug, info};
use rayon::prelude::*;
use regex::Regex;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::task::block_in_place;
use tokio_tar::Archive;
use walkdir::WalkDir;

use crate::cli::SubCommandExtend;
use crate::config::{FingerprintOptions, Opts};
use crate::fingerprint::Fingerprinter;
use crate::store::{FingerprintRecord, FingerprintStore, is_valid_identifier};
use crate::utils::{match_suffix, pb_style, suffix_regex};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub fingerprint: FingerprintOptions,
    /// 图片所在目录，也支持扫描 tar 归档文件
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png")]
    pub suffix: String,
    /// 不使用完整文件路径作为标识符，而是使用正则表达式提取出 name 分组
    /// 例：`/path/to/image/(?<name>[0-9]+).jpg`
    #[arg(short, long, verbatim_doc_comment)]
    pub regex: Option<String>,
    /// 每批追加到存储文件的记录数量
    #[arg(short, long, value_name = "SIZE", default_value_t = 10000)]
    pub batch_size: usize,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let re_suf = suffix_regex(&self.suffix)?;
        let re_name = self.regex.as_deref().map(Regex::new).transpose()?;

        let pb = ProgressBar::no_length().with_style(pb_style());
        let mut ingest = Ingest {
            store: opts.conf_dir.store(),
            fingerprinter: self.fingerprint.fingerprinter(),
            re_name,
            batch_size: self.batch_size.max(1),
            pending: vec![],
            pb: pb.clone(),
            added: 0,
            skipped: 0,
        };

        if self.path.is_file() {
            add_tar_file(&self.path, &re_suf, &mut ingest).await?;
        } else {
            block_in_place(|| add_directory(&self.path, &re_suf, &mut ingest))?;
        }
        ingest.flush()?;

        pb.finish_with_message(format!(
            "图片添加完成，新增 {} 条记录，跳过 {} 张图片",
            ingest.added, ingest.skipped
        ));
        info!("指纹已写入 {}", ingest.store.path().display());

        Ok(())
    }
}

/// 计算指纹并分批追加到存储文件
struct Ingest {
    store: FingerprintStore,
    fingerprinter: Fingerprinter,
    re_name: Option<Regex>,
    batch_size: usize,
    pending: Vec<FingerprintRecord>,
    pb: ProgressBar,
    added: usize,
    skipped: usize,
}

impl Ingest {
    /// 并行计算一组图片的指纹，失败的图片会被跳过
    fn process<T: Sync>(
        &mut self,
        items: &[(String, T)],
        hash: impl Fn(&T) -> crate::Result<u64> + Send + Sync,
    ) -> Result<()> {
        let pb = &self.pb;
        let results = items
            .par_iter()
            .map(|(entry, item)| {
                let result = hash(item);
                pb.inc(1);
                (entry, result)
            })
            .collect::<Vec<_>>();

        for (entry, result) in results {
            match result {
                Ok(fingerprint) => match self.identifier(entry) {
                    Some(identifier) => {
                        self.pending.push(FingerprintRecord::new(identifier, fingerprint))
                    }
                    None => self.skipped += 1,
                },
                Err(e) => {
                    debug!("计算指纹失败: {}: {:?}", entry, e);
                    pb.println(format!("计算指纹失败: {}: {}", entry, e));
                    self.skipped += 1;
                }
            }
        }

        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn identifier(&self, entry: &str) -> Option<String> {
        let name = match &self.re_name {
            Some(re) => match re.captures(entry).and_then(|c| c.name("name")) {
                Some(name) => name.as_str(),
                None => {
                    self.pb.println(format!("提取图片名失败: {}", entry));
                    return None;
                }
            },
            None => entry,
        };
        if !is_valid_identifier(name) {
            self.pb.println(format!("标识符不能包含空白字符: {}", name));
            return None;
        }
        Some(name.to_string())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.store.append(&self.pending)?;
        self.added += self.pending.len();
        self.pb.set_message(format!("已写入 {} 条记录", self.added));
        self.pending.clear();
        Ok(())
    }
}

fn add_directory(path: &Path, re_suf: &Regex, ingest: &mut Ingest) -> Result<()> {
    info!("开始扫描目录: {}", path.display());
    let pb = ProgressBar::no_length().with_style(pb_style());
    let entries = WalkDir::new(path)
        .into_iter()
        .progress_with(pb)
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            (path.is_file() && match_suffix(re_suf, path))
                .then(|| (path.to_string_lossy().to_string(), path.to_path_buf()))
        })
        .collect::<Vec<_>>();
    info!("扫描完成，共 {} 张图片", entries.len());

    ingest.pb.set_length(entries.len() as u64);

    let fingerprinter = ingest.fingerprinter;
    for chunk in entries.chunks(ingest.batch_size) {
        ingest.process(chunk, |path| fingerprinter.fingerprint_file(path))?;
    }
    Ok(())
}

async fn add_tar_file(path: &Path, re_suf: &Regex, ingest: &mut Ingest) -> Result<()> {
    info!("开始扫描归档文件: {}", path.display());
    let file = File::open(path).await?;
    let mut archive = Archive::new(file);
    let mut entries = archive.entries()?;

    let fingerprinter = ingest.fingerprinter;
    let chunk_size = num_cpus::get() * 4;
    let mut chunk = Vec::with_capacity(chunk_size);

    while let Some(entry) = entries.next().await {
        let mut entry = entry?;
        // 跳过目录
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?;
        if !match_suffix(re_suf, &path) {
            continue;
        }
        let path = path.to_string_lossy().to_string();

        let mut data = Vec::with_capacity(entry.header().size()? as usize);
        entry.read_to_end(&mut data).await?;
        chunk.push((path, data));

        if chunk.len() >= chunk_size {
            ingest.pb.inc_length(chunk.len() as u64);
            block_in_place(|| ingest.process(&chunk, |data| fingerprinter.fingerprint(data)))?;
            chunk.clear();
        }
    }

    if !chunk.is_empty() {
        ingest.pb.inc_length(chunk.len() as u64);
        block_in_place(|| ingest.process(&chunk, |data| fingerprinter.fingerprint(data)))?;
    }
    Ok(())
}
