use std::fs::File;
use std::time::Instant;

use clap::Parser;
use imfind::index::hamming;
use imfind::utils::{match_suffix, pb_style, suffix_regex};
use imfind::{FingerprintRecord, Fingerprinter, Metric, SimilarityIndex};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator};
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

/// 比较数值距离和汉明距离两种度量方式的搜索结果
///
/// 扫描到的图片按路径排序后分成两半，前一半建立索引，后一半作为查询。
#[derive(Parser)]
pub struct Args {
    /// 包含图片的目录路径
    path: Vec<String>,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,png")]
    suffix: String,
    /// 最多扫描的图片数量
    #[arg(short, long, default_value_t = 10000)]
    limit: usize,
    /// 将结果不一致的查询保存到文件
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Serialize)]
struct Disagreement<'a> {
    query: &'a str,
    numeric: &'a str,
    numeric_bits: u32,
    hamming: &'a str,
    hamming_bits: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let re_suf = suffix_regex(&args.suffix)?;

    let mut images = args
        .path
        .iter()
        .flat_map(|path| {
            info!("开始扫描目录: {}", path);
            let pb = ProgressBar::no_length().with_style(pb_style());
            WalkDir::new(path).into_iter().progress_with(pb).filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                (path.is_file() && match_suffix(&re_suf, path))
                    .then(|| path.to_string_lossy().to_string())
            })
        })
        .take(args.limit)
        .collect::<Vec<_>>();
    images.sort();
    info!("扫描完成，共 {} 张图片", images.len());

    info!("计算图片指纹……");
    let fingerprinter = Fingerprinter::default();
    let records = images
        .into_par_iter()
        .progress_with_style(pb_style())
        .filter_map(|image| {
            let fingerprint = fingerprinter.fingerprint_file(&image).ok()?;
            Some(FingerprintRecord::new(image, fingerprint))
        })
        .collect::<Vec<_>>();

    if records.len() < 2 {
        anyhow::bail!("至少需要两张可以解码的图片");
    }
    let (indexed, queries) = records.split_at(records.len() / 2);

    let numeric = SimilarityIndex::build(indexed.to_vec(), Metric::Numeric);
    let exact = SimilarityIndex::build(indexed.to_vec(), Metric::Hamming);

    let now = Instant::now();
    let mut disagreements = vec![];
    let mut numeric_bits = 0u64;
    let mut hamming_bits = 0u64;
    for query in queries {
        let (Some(a), Some(b)) =
            (numeric.nearest_one(query.fingerprint), exact.nearest_one(query.fingerprint))
        else {
            continue;
        };
        let bits_a = hamming(query.fingerprint, a.record.fingerprint);
        let bits_b = hamming(query.fingerprint, b.record.fingerprint);
        numeric_bits += bits_a as u64;
        hamming_bits += bits_b as u64;
        if bits_a != bits_b {
            disagreements.push(Disagreement {
                query: &query.identifier,
                numeric: &a.record.identifier,
                numeric_bits: bits_a,
                hamming: &b.record.identifier,
                hamming_bits: bits_b,
            });
        }
    }
    info!("查询完成，耗时 {:?}", now.elapsed());

    let total = queries.len() as f64;
    info!(
        "索引 {} 张，查询 {} 张，结果一致率 {:.2}%",
        indexed.len(),
        queries.len(),
        100. * (total - disagreements.len() as f64) / total
    );
    info!(
        "平均相差位数：numeric {:.2}，hamming {:.2}",
        numeric_bits as f64 / total,
        hamming_bits as f64 / total
    );

    if let Some(output) = args.output {
        let mut file = File::create(output)?;
        serde_json::to_writer_pretty(&mut file, &disagreements)?;
    }
    Ok(())
}
