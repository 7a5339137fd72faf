use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprinter;
use crate::index::{Metric, SimilarityIndex, hamming};
use crate::metrics;
use crate::store::FingerprintStore;

/// 一次查询的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// 最相似图片的标识符
    pub identifier: String,
    /// 最相似图片的指纹
    pub fingerprint: u64,
    /// 按索引度量方式计算的距离
    pub distance: u64,
    /// 与查询指纹相差的位数，与度量方式无关
    pub hamming: u32,
}

/// 以图搜图服务，持有构建完成的只读索引
#[derive(Debug)]
pub struct LookupService {
    fingerprinter: Fingerprinter,
    index: SimilarityIndex,
}

impl LookupService {
    pub fn new(fingerprinter: Fingerprinter, index: SimilarityIndex) -> Self {
        Self { fingerprinter, index }
    }

    /// 读取存储文件中的全部记录并构建索引
    pub fn open(
        store: &FingerprintStore,
        fingerprinter: Fingerprinter,
        metric: Metric,
    ) -> Result<Self> {
        info!("加载指纹: {}", store.path().display());
        let start = Instant::now();
        let records = store.load_all()?;
        let index = SimilarityIndex::build(records, metric);
        info!(
            "索引构建完成，共 {} 条记录，树高 {}，耗时 {:.2}s",
            index.len(),
            index.depth(),
            start.elapsed().as_secs_f32()
        );
        Ok(Self::new(fingerprinter, index))
    }

    pub fn fingerprinter(&self) -> &Fingerprinter {
        &self.fingerprinter
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// 计算图片指纹，并返回索引中最相似的图片
    pub fn find_similar(&self, data: &[u8]) -> Result<Match> {
        let start = Instant::now();
        let result = self.fingerprinter.fingerprint(data).and_then(|fp| self.nearest(fp));
        metrics::observe_lookup(&result, start.elapsed().as_secs_f64());
        result
    }

    /// 返回索引中与给定指纹最接近的图片
    pub fn find_by_fingerprint(&self, fingerprint: u64) -> Result<Match> {
        let start = Instant::now();
        let result = self.nearest(fingerprint);
        metrics::observe_lookup(&result, start.elapsed().as_secs_f64());
        result
    }

    fn nearest(&self, fingerprint: u64) -> Result<Match> {
        let neighbor = self.index.nearest_one(fingerprint).ok_or(Error::EmptyIndex)?;
        let bits = hamming(fingerprint, neighbor.record.fingerprint);
        debug!(
            "{:x} 的最近邻为 {} ({:x})，距离 {}，相差 {} 位",
            fingerprint,
            neighbor.record.identifier,
            neighbor.record.fingerprint,
            neighbor.distance,
            bits
        );
        Ok(Match {
            identifier: neighbor.record.identifier.clone(),
            fingerprint: neighbor.record.fingerprint,
            distance: neighbor.distance,
            hamming: bits,
        })
    }
}
