//! 图片指纹
//!
//! 指纹为 64 位感知哈希：图片缩放后做 DCT，取左上角 8x8 的低频系数，
//! 大于中位数的位置为 1。轻微缩放、重新压缩后的图片得到的指纹相同或接近。
//!
//! 阈值不能用均值：直流分量远大于其他系数，会让几乎所有位都为 0。

use std::path::Path;

use clap::ValueEnum;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 指纹计算方式
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerprintMode {
    /// 直接使用感知哈希
    #[default]
    Perceptual,
    /// 将感知哈希的小端字节作为唯一特征再做一次 simhash，兼容旧版本生成的存储文件
    Simhash,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    mode: FingerprintMode,
}

impl Fingerprinter {
    pub fn new(mode: FingerprintMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FingerprintMode {
        self.mode
    }

    /// 从 PNG/JPEG 编码的字节计算指纹
    pub fn fingerprint(&self, data: &[u8]) -> Result<u64> {
        let image = image::load_from_memory(data)?;
        Ok(self.fingerprint_image(&image))
    }

    /// 读取图片文件并计算指纹
    pub fn fingerprint_file(&self, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        self.fingerprint(&data)
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> u64 {
        let hash = perceptual_hash(image);
        match self.mode {
            FingerprintMode::Perceptual => hash,
            FingerprintMode::Simhash => simhash(hash),
        }
    }
}

/// 计算 64 位感知哈希，哈希字节按大端序组成整数
pub fn perceptual_hash(image: &DynamicImage) -> u64 {
    let hasher =
        HasherConfig::new().hash_size(8, 8).hash_alg(HashAlg::Median).preproc_dct().to_hasher();
    hasher.hash_image(image).as_bytes().iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// 只有一个特征的 simhash
///
/// 每一位的权重都是 ±1，结果与特征本身的 FNV-1 哈希完全相同。
pub fn simhash(hash: u64) -> u64 {
    fnv1_64(&hash.to_le_bytes())
}

fn fnv1_64(data: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    data.iter().fold(OFFSET_BASIS, |hash, &b| hash.wrapping_mul(PRIME) ^ b as u64)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};
    use rand::prelude::*;

    use super::*;

    /// 生成一张随机噪点图片，相同的 seed 得到相同的图片
    pub(crate) fn noise_image(seed: u64) -> DynamicImage {
        let mut rng = StdRng::seed_from_u64(seed);
        let img = RgbImage::from_fn(64, 64, |_, _| Rgb([rng.random(), rng.random(), rng.random()]));
        DynamicImage::ImageRgb8(img)
    }

    pub(crate) fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = vec![];
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn test_deterministic() {
        let data = encode(&noise_image(1), ImageFormat::Png);
        let fp = Fingerprinter::default();
        assert_eq!(fp.fingerprint(&data).unwrap(), fp.fingerprint(&data).unwrap());
    }

    #[test]
    fn test_same_pixels_same_fingerprint() {
        // 相同像素分别编码两次，指纹只取决于解码后的内容
        let png1 = encode(&noise_image(7), ImageFormat::Png);
        let png2 = encode(&noise_image(7), ImageFormat::Png);
        let fp = Fingerprinter::default();
        assert_eq!(fp.fingerprint(&png1).unwrap(), fp.fingerprint(&png2).unwrap());
        assert_eq!(fp.fingerprint(&png1).unwrap(), perceptual_hash(&noise_image(7)));
    }

    #[test]
    fn test_jpeg_input() {
        let data = encode(&noise_image(3), ImageFormat::Jpeg);
        let fp = Fingerprinter::default();
        assert_eq!(fp.fingerprint(&data).unwrap(), fp.fingerprint(&data).unwrap());
    }

    #[test]
    fn test_different_images() {
        let fp = Fingerprinter::default();
        let a = fp.fingerprint(&encode(&noise_image(1), ImageFormat::Png)).unwrap();
        let b = fp.fingerprint(&encode(&noise_image(2), ImageFormat::Png)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_structurally_different_images() {
        let h_gradient = RgbImage::from_fn(64, 64, |x, _| Rgb([(x * 4) as u8; 3]));
        let v_gradient = RgbImage::from_fn(64, 64, |_, y| Rgb([(y * 4) as u8; 3]));
        let checkerboard = RgbImage::from_fn(64, 64, |x, y| match (x / 8 + y / 8) % 2 {
            0 => Rgb([0; 3]),
            _ => Rgb([255; 3]),
        });
        let images = [
            DynamicImage::ImageRgb8(h_gradient),
            DynamicImage::ImageRgb8(v_gradient),
            DynamicImage::ImageRgb8(checkerboard),
            noise_image(1),
            noise_image(2),
            noise_image(3),
        ];

        let fp = Fingerprinter::default();
        let hashes = images
            .iter()
            .map(|img| fp.fingerprint(&encode(img, ImageFormat::Png)).unwrap())
            .collect::<Vec<_>>();
        for i in 0..hashes.len() {
            for j in i + 1..hashes.len() {
                assert_ne!(hashes[i], hashes[j], "{} vs {}", i, j);
            }
        }
    }

    #[test]
    fn test_decode_error() {
        let fp = Fingerprinter::default();
        assert!(matches!(fp.fingerprint(&[]), Err(Error::Decode(_))));
        assert!(matches!(fp.fingerprint(b"definitely not an image"), Err(Error::Decode(_))));

        // 截断的 PNG
        let data = encode(&noise_image(1), ImageFormat::Png);
        assert!(matches!(fp.fingerprint(&data[..20]), Err(Error::Decode(_))));
    }

    #[test]
    fn test_missing_file() {
        let fp = Fingerprinter::default();
        assert!(matches!(fp.fingerprint_file("/nonexistent/image.png"), Err(Error::Io { .. })));
    }

    #[test]
    fn test_simhash_mode() {
        let data = encode(&noise_image(5), ImageFormat::Png);
        let phash = Fingerprinter::new(FingerprintMode::Perceptual).fingerprint(&data).unwrap();
        let shash = Fingerprinter::new(FingerprintMode::Simhash).fingerprint(&data).unwrap();
        assert_eq!(shash, fnv1_64(&phash.to_le_bytes()));
    }

    #[test]
    fn test_fnv1_64() {
        assert_eq!(fnv1_64(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1_64(b"a"), 0xaf63bd4c8601b7be);
    }
}
