// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/model/mask_file.rs - 从掩码文件读取分割结果
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

use image::{ColorType, ImageReader};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{WoundImage, sample_name},
  mask::SemanticMask,
  model::Segmenter,
  url_to_path,
};

const DEFAULT_SUFFIX: &str = "_mask";
const MASK_EXTENSION: &str = "png";

#[derive(Error, Debug)]
pub enum MaskFileSegmenterError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误 {0}: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("掩码图像错误 {0}: {1}")]
  ImageError(PathBuf, image::ImageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskSource {
  /// 所有照片共用一个掩码文件
  Fixed(PathBuf),
  /// 照片旁的 `<主干><后缀>.png`
  Companion { suffix: String },
}

/// 读取事先生成的分割掩码
///
/// RGB 掩码按 R = 背景、G = 身体、B = 伤口拆分；单通道掩码视为只有伤口。
#[derive(Debug, Clone)]
pub struct MaskFileSegmenter {
  source: MaskSource,
}

impl FromUrlWithScheme for MaskFileSegmenter {
  const SCHEME: &'static str = "mask";
}

impl FromUrl for MaskFileSegmenter {
  type Error = MaskFileSegmenterError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(MaskFileSegmenterError::SchemeMismatch);
    }

    let suffix = url
      .query_pairs()
      .find(|(k, _)| k == "suffix")
      .map(|(_, v)| v.into_owned());

    let source = match suffix {
      Some(suffix) => MaskSource::Companion { suffix },
      None if url.path().is_empty() || url.path() == "/" => MaskSource::Companion {
        suffix: DEFAULT_SUFFIX.to_string(),
      },
      None => MaskSource::Fixed(url_to_path(url)),
    };
    Ok(Self::new(source))
  }
}

impl Default for MaskFileSegmenter {
  fn default() -> Self {
    Self::new(MaskSource::Companion {
      suffix: DEFAULT_SUFFIX.to_string(),
    })
  }
}

impl MaskFileSegmenter {
  pub fn new(source: MaskSource) -> Self {
    Self { source }
  }

  pub fn source(&self) -> &MaskSource {
    &self.source
  }

  /// 照片对应的掩码路径
  pub fn mask_path(&self, photo: &Path) -> PathBuf {
    match &self.source {
      MaskSource::Fixed(path) => path.clone(),
      MaskSource::Companion { suffix } => {
        let file = format!("{}{}.{}", sample_name(photo), suffix, MASK_EXTENSION);
        photo.with_file_name(file)
      }
    }
  }
}

pub fn load_semantic_mask(path: &Path) -> Result<SemanticMask, MaskFileSegmenterError> {
  let image = ImageReader::open(path)
    .map_err(|e| MaskFileSegmenterError::IoError(path.to_path_buf(), e))?
    .decode()
    .map_err(|e| MaskFileSegmenterError::ImageError(path.to_path_buf(), e))?;

  let mask = match image.color() {
    ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
      SemanticMask::from_wound(image.into_luma8())
    }
    _ => SemanticMask::from_rgb_image(&image.into_rgb8()),
  };
  debug!("读取掩码 {}: {:?}", path.display(), mask.dimensions());
  Ok(mask)
}

impl Segmenter for MaskFileSegmenter {
  type Error = MaskFileSegmenterError;

  fn segment(&self, input: &WoundImage) -> Result<SemanticMask, Self::Error> {
    load_semantic_mask(&self.mask_path(&input.path))
  }
}
