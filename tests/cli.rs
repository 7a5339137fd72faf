use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

macro_rules! cmd {
    ($cmd:expr, $($args:expr),*) => {{
        {
            let mut cmd = Command::new($cmd);
            $(cmd.arg($args);)*
            cmd.assert()
        }
    }};
}

/// 在 `dir/images` 下生成若干张随机噪声图片
fn dataset(dir: &Path, count: u64) -> Result<Vec<PathBuf>> {
    let images = dir.join("images");
    std::fs::create_dir_all(&images)?;
    let mut paths = vec![];
    for seed in 0..count {
        let mut rng = StdRng::seed_from_u64(seed);
        let img = RgbImage::from_fn(64, 64, |_, _| Rgb(rng.random()));
        let path = images.join(format!("{}.png", seed));
        img.save(&path)?;
        paths.push(path);
    }
    // 不匹配后缀的文件会被忽略
    std::fs::write(images.join("readme.txt"), "not an image")?;
    Ok(paths)
}

#[test]
fn add_and_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    let images = dataset(temp_dir.path(), 8)?;

    cargo_run!("imfind", "-c", &conf_dir, "add", temp_dir.path().join("images")).success();

    let store = std::fs::read_to_string(conf_dir.join("image_hashes.txt"))?;
    assert_eq!(store.lines().count(), images.len());
    assert!(!store.contains("readme.txt"));

    for image in &images {
        cargo_run!("imfind", "-c", &conf_dir, "search", image)
            .success()
            .stdout(predicate::str::starts_with("0\t"))
            .stdout(predicate::str::contains(image.to_str().unwrap()));
    }

    Ok(())
}

#[test]
fn add_twice_appends() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    let images = dataset(temp_dir.path(), 3)?;

    cargo_run!("imfind", "-c", &conf_dir, "add", temp_dir.path().join("images")).success();
    cargo_run!("imfind", "-c", &conf_dir, "add", temp_dir.path().join("images")).success();

    let store = std::fs::read_to_string(conf_dir.join("image_hashes.txt"))?;
    assert_eq!(store.lines().count(), images.len() * 2);

    Ok(())
}

#[test]
fn add_tar() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    let tar_path = temp_dir.path().join("images.tar");
    let images = dataset(temp_dir.path(), 4)?;

    cmd!("tar", "cf", &tar_path, "-C", temp_dir.path(), "images").success();

    cargo_run!("imfind", "-c", &conf_dir, "add", &tar_path).success();

    cargo_run!("imfind", "-c", &conf_dir, "search", &images[2])
        .success()
        .stdout(predicate::str::contains("images/2.png"));

    Ok(())
}

#[test]
fn add_with_regex() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    let images = dataset(temp_dir.path(), 4)?;

    cargo_run!(
        "imfind",
        "-c",
        &conf_dir,
        "add",
        temp_dir.path().join("images"),
        "-r",
        r"(?<name>[0-9]+)\.png$"
    )
    .success();

    cargo_run!("imfind", "-c", &conf_dir, "search", &images[1])
        .success()
        .stdout(predicate::eq("0\t1\n"));

    Ok(())
}

#[test]
fn search_hash() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    std::fs::create_dir_all(&conf_dir)?;
    std::fs::write(
        conf_dir.join("image_hashes.txt"),
        "a.jpg f0f0f0f0f0f0f0f\nb.jpg ff00ff00ff00ff00\nthis line is broken\n",
    )?;

    cargo_run!("imfind", "-c", &conf_dir, "search", "--hash", "0f0f0f0f0f0f0f00")
        .success()
        .stdout(predicate::eq("15\ta.jpg\n"));

    cargo_run!(
        "imfind",
        "-c",
        &conf_dir,
        "search",
        "--hash",
        "ff00ff00ff00ff01",
        "--output-format",
        "json"
    )
    .success()
    .stdout(predicate::str::contains(r#""identifier": "b.jpg""#))
    .stdout(predicate::str::contains(r#""hamming": 1"#));

    cargo_run!("imfind", "-c", &conf_dir, "search", "--hash", "xyz").failure();

    Ok(())
}

#[test]
fn search_without_store() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let images = dataset(temp_dir.path(), 1)?;

    cargo_run!("imfind", "-c", temp_dir.path().join("conf"), "search", &images[0])
        .failure()
        .stderr(predicate::str::contains("image_hashes.txt"));

    Ok(())
}

#[test]
fn show() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let images = dataset(temp_dir.path(), 2)?;
    let fingerprinter = imfind::Fingerprinter::default();

    for image in &images {
        let fingerprint = fingerprinter.fingerprint_file(image)?;
        let expected = format!("{} {:x}\n", image.display(), fingerprint);
        cargo_run!("imfind", "show", image).success().stdout(predicate::eq(expected));
    }

    cargo_run!("imfind", "show", temp_dir.path().join("images/readme.txt")).failure();

    Ok(())
}

#[rstest]
#[case::numeric(&[], &["--metric", "numeric"])]
#[case::hamming(&[], &["--metric", "hamming"])]
#[case::simhash(&["--simhash"], &["--simhash"])]
#[case::simhash_hamming(&["--simhash"], &["--simhash", "--metric", "hamming"])]
fn search_options(#[case] add_args: &[&str], #[case] search_args: &[&str]) -> Result<()> {
    let temp_dir = TempDir::new()?;
    let conf_dir = temp_dir.path().join("conf");
    let images = dataset(temp_dir.path(), 6)?;

    Command::cargo_bin("imfind")?
        .arg("-c")
        .arg(&conf_dir)
        .arg("add")
        .arg(temp_dir.path().join("images"))
        .args(add_args)
        .assert()
        .success();

    for image in &images {
        Command::cargo_bin("imfind")?
            .arg("-c")
            .arg(&conf_dir)
            .arg("search")
            .arg(image)
            .args(search_args)
            .assert()
            .success()
            .stdout(predicate::str::contains(image.to_str().unwrap()));
    }

    Ok(())
}
