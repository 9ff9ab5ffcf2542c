// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/input/read_image_folder.rs - 图像目录输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use super::read_image_file::load_wound_image;
use crate::{
  FromUrl, FromUrlWithScheme,
  input::{WoundImage, sample_name},
  url_to_path,
};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const DEFAULT_MASK_SUFFIX: &str = "_mask";

#[derive(Error, Debug)]
pub enum ImageFolderInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("不是目录: {0}")]
  NotADirectory(PathBuf),
}

/// 按文件名顺序遍历目录中的照片
///
/// 文件名主干以掩码后缀结尾的文件被跳过，`folder:///dir?mask_suffix=_seg`
/// 可修改后缀。读取失败的文件记录错误后跳过。
pub struct ImageFolderInput {
  paths: std::vec::IntoIter<PathBuf>,
}

impl FromUrlWithScheme for ImageFolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageFolderInput {
  type Error = ImageFolderInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFolderInputError::SchemeMismatch);
    }

    let suffix = url
      .query_pairs()
      .find(|(k, _)| k == "mask_suffix")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_MASK_SUFFIX.to_string());

    Self::open(url_to_path(url), &suffix)
  }
}

impl ImageFolderInput {
  pub fn open<P: AsRef<Path>>(directory: P, mask_suffix: &str) -> Result<Self, ImageFolderInputError> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
      return Err(ImageFolderInputError::NotADirectory(directory.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if is_photo(&path, mask_suffix) {
        paths.push(path);
      }
    }
    paths.sort();

    info!("目录 {} 中共 {} 张照片", directory.display(), paths.len());
    Ok(Self {
      paths: paths.into_iter(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.paths.len()
  }
}

fn is_photo(path: &Path, mask_suffix: &str) -> bool {
  if !path.is_file() {
    return false;
  }
  let known = path
    .extension()
    .map(|e| e.to_string_lossy().to_ascii_lowercase())
    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
  known && (mask_suffix.is_empty() || !sample_name(path).ends_with(mask_suffix))
}

impl Iterator for ImageFolderInput {
  type Item = WoundImage;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.paths.by_ref() {
      match load_wound_image(&path) {
        Ok(sample) => return Some(sample),
        Err(e) => error!("跳过无法读取的图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GrayImage, Luma, Rgb, RgbImage};

  #[test]
  fn sorted_and_skips_masks() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.png", "a.png", "c.jpg"] {
      RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])).save(dir.path().join(name)).unwrap();
    }
    GrayImage::from_pixel(3, 3, Luma([255]))
      .save(dir.path().join("a_mask.png"))
      .unwrap();
    GrayImage::from_pixel(3, 3, Luma([255]))
      .save(dir.path().join("b_deepskin_mask.png"))
      .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    std::fs::write(dir.path().join("broken.png"), "not a png").unwrap();

    let input = ImageFolderInput::open(dir.path(), DEFAULT_MASK_SUFFIX).unwrap();
    assert_eq!(input.remaining(), 4);
    let names: Vec<String> = input.map(|s| s.name).collect();
    assert_eq!(names, ["a", "b", "c"]);
  }

  #[test]
  fn custom_suffix_from_url() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::new(2, 2).save(dir.path().join("x.png")).unwrap();
    RgbImage::new(2, 2).save(dir.path().join("x_seg.png")).unwrap();
    RgbImage::new(2, 2).save(dir.path().join("x_mask.png")).unwrap();

    let url = Url::parse(&format!("folder://{}?mask_suffix=_seg", dir.path().display())).unwrap();
    let names: Vec<String> = ImageFolderInput::from_url(&url).unwrap().map(|s| s.name).collect();
    assert_eq!(names, ["x", "x_mask"]);
  }

  #[test]
  fn file_is_not_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    RgbImage::new(2, 2).save(&path).unwrap();
    assert!(matches!(
      ImageFolderInput::open(&path, DEFAULT_MASK_SUFFIX),
      Err(ImageFolderInputError::NotADirectory(_))
    ));
  }
}
