// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/output/save_image_file.rs - 保存可视化图像文件
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::WoundImage,
  output::{Evaluation, Render, overlay::Overlay},
  url_to_path,
};

/// 路径中的该占位符替换为样本名
const NAME_PLACEHOLDER: &str = "{name}";

pub struct SaveImageFileOutput {
  path: PathBuf,
  overlay: Overlay,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: url_to_path(uri),
      overlay: Overlay::default(),
    })
  }
}

impl SaveImageFileOutput {
  pub fn target(&self, sample: &WoundImage) -> PathBuf {
    let path = self.path.to_string_lossy();
    if path.contains(NAME_PLACEHOLDER) {
      PathBuf::from(path.replace(NAME_PLACEHOLDER, &sample.name))
    } else {
      self.path.clone()
    }
  }
}

impl Render<WoundImage, Evaluation> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, sample: &WoundImage, result: &Evaluation) -> Result<(), Self::Error> {
    let path = self.target(sample);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let image = self.overlay.draw(&sample.image, &result.assessment);
    image.save(&path)?;

    info!("保存可视化图像到文件: {}", path.display());
    Ok(())
  }

  fn per_sample_target(&self) -> bool {
    self.path.to_string_lossy().contains(NAME_PLACEHOLDER)
  }
}
