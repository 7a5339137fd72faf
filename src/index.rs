//! 相似度索引
//!
//! 默认把 64 位指纹当作一个普通整数，建立一维的二叉划分树，按数值差 `|a - b|` 查找最近邻。
//! 数值距离并不等价于汉明距离：高位不同的两个指纹数值上相距很远，只有低位不同的指纹则显得很近。
//! 需要按位比较时可以改用 [`Metric::Hamming`]，它会逐条扫描全部记录。

use std::collections::VecDeque;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::store::FingerprintRecord;

/// 距离度量方式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// 指纹整数之间的数值差，使用二叉划分树搜索
    #[default]
    Numeric,
    /// 不同的位数，暴力扫描
    Hamming,
}

impl Metric {
    pub fn distance(self, a: u64, b: u64) -> u64 {
        match self {
            Metric::Numeric => a.abs_diff(b),
            Metric::Hamming => hamming(a, b) as u64,
        }
    }
}

#[inline(always)]
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// 最近邻查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor<'a> {
    pub record: &'a FingerprintRecord,
    pub distance: u64,
}

#[derive(Debug)]
struct Node {
    record: FingerprintRecord,
    left: Option<usize>,
    right: Option<usize>,
}

/// 构建完成后只读，可以在多个线程间共享查询
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    /// 按插入顺序保存的节点，第一个节点为根节点
    nodes: Vec<Node>,
    metric: Metric,
}

impl SimilarityIndex {
    pub fn new(metric: Metric) -> Self {
        Self { nodes: vec![], metric }
    }

    /// 使用全部记录构建索引
    ///
    /// 记录先按指纹排序，再按中位数优先的顺序逐个插入，保证树是平衡的。
    pub fn build(records: impl IntoIterator<Item = FingerprintRecord>, metric: Metric) -> Self {
        let mut records = records.into_iter().collect::<Vec<_>>();
        records.sort_by_key(|r| r.fingerprint);

        let mut index = Self::new(metric);
        index.nodes.reserve(records.len());

        let mut slots = records.into_iter().map(Some).collect::<Vec<_>>();
        let mut ranges = VecDeque::from([(0, slots.len())]);
        while let Some((lo, hi)) = ranges.pop_front() {
            if lo >= hi {
                continue;
            }
            let mid = lo + (hi - lo) / 2;
            if let Some(record) = slots[mid].take() {
                index.insert(record);
            }
            ranges.push_back((lo, mid));
            ranges.push_back((mid + 1, hi));
        }

        index
    }

    /// 插入一条记录，小于当前节点的放左侧，其余放右侧
    pub fn insert(&mut self, record: FingerprintRecord) {
        let id = self.nodes.len();
        let fingerprint = record.fingerprint;
        self.nodes.push(Node { record, left: None, right: None });
        if id == 0 {
            return;
        }

        let mut cur = 0;
        loop {
            let node = &mut self.nodes[cur];
            let slot = if fingerprint < node.record.fingerprint {
                &mut node.left
            } else {
                &mut node.right
            };
            match *slot {
                Some(next) => cur = next,
                None => {
                    *slot = Some(id);
                    return;
                }
            }
        }
    }

    /// 查找距离最近的一条记录，索引为空时返回 None
    ///
    /// 距离相同时返回搜索过程中最先访问到的记录。数值度量下，先沿查询值所在的一侧走到叶子，
    /// 再回溯另一侧；汉明度量下为插入顺序最早的记录。
    pub fn nearest_one(&self, query: u64) -> Option<Neighbor<'_>> {
        let (id, distance) = match self.metric {
            Metric::Numeric => self.nearest_numeric(query)?,
            Metric::Hamming => self.nearest_hamming(query)?,
        };
        Some(Neighbor { record: &self.nodes[id].record, distance })
    }

    fn nearest_numeric(&self, query: u64) -> Option<(usize, u64)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<(usize, u64)> = None;
        // (节点, 子树中任意记录到查询值距离的下界)
        let mut stack = vec![(0, 0)];
        while let Some((id, bound)) = stack.pop() {
            if best.is_some_and(|(_, d)| bound >= d) {
                continue;
            }

            let node = &self.nodes[id];
            let fingerprint = node.record.fingerprint;
            let distance = fingerprint.abs_diff(query);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((id, distance));
            }

            let (near, far) = if query < fingerprint {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };
            // 后入栈的先访问
            if let Some(far) = far {
                stack.push((far, distance));
            }
            if let Some(near) = near {
                stack.push((near, bound));
            }
        }

        best
    }

    fn nearest_hamming(&self, query: u64) -> Option<(usize, u64)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(id, node)| (id, hamming(node.record.fingerprint, query) as u64))
            .min_by_key(|&(_, d)| d)
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &FingerprintRecord> {
        self.nodes.iter().map(|node| &node.record)
    }

    /// 树的高度，空树为 0
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0, 1)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = &self.nodes[id];
            stack.extend(node.left.into_iter().chain(node.right).map(|child| (child, depth + 1)));
        }
        max_depth
    }
}
