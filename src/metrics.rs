use std::sync::LazyLock;

use prometheus::{
    Histogram, IntCounterVec, TextEncoder, register_histogram, register_int_counter_vec,
};

use crate::error::{Error, Result};
use crate::lookup::Match;

static METRIC_LOOKUP_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("im_lookup_count", "count of the lookups by result", &["result"])
        .unwrap()
});

static METRIC_LOOKUP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!("im_lookup_duration", "duration of the per-image lookup in seconds")
        .unwrap()
});

static METRIC_LOOKUP_HAMMING_BITS: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "im_lookup_hamming_bits",
        "differing bits between the query and the matched fingerprint",
        (0..=64).step_by(4).map(|x| x as f64).collect()
    )
    .unwrap()
});

/// 记录一次查询的结果和耗时
pub fn observe_lookup(result: &Result<Match>, duration: f64) {
    let label = match result {
        Ok(_) => "match",
        Err(Error::EmptyIndex) => "empty",
        Err(Error::Decode(_)) => "decode_error",
        Err(_) => "error",
    };
    METRIC_LOOKUP_COUNT.with_label_values(&[label]).inc();
    METRIC_LOOKUP_DURATION.observe(duration);
    if let Ok(m) = result {
        METRIC_LOOKUP_HAMMING_BITS.observe(m.hamming as f64);
    }
}

/// 以文本格式导出所有已注册的指标
pub fn encode_text() -> prometheus::Result<String> {
    TextEncoder::new().encode_to_string(&prometheus::gather())
}
