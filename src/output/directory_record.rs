// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicU32, Ordering},
};

use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  features::FeatureVector,
  input::WoundImage,
  output::{Evaluation, Render, overlay::Overlay},
  url_to_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 每个样本写入的 JSON 记录
#[derive(Debug, Serialize)]
pub struct SampleRecord<'a> {
  pub name: &'a str,
  pub source: String,
  pub score: f64,
  pub wound_score: f64,
  pub periwound_score: f64,
  pub bias: f64,
  pub wound_pixels: usize,
  pub periwound_pixels: usize,
  pub wound_features: &'a FeatureVector,
  pub periwound_features: &'a FeatureVector,
}

impl<'a> SampleRecord<'a> {
  pub fn new(sample: &'a WoundImage, result: &'a Evaluation) -> Self {
    let assessment = &result.assessment;
    Self {
      name: &sample.name,
      source: sample.path.display().to_string(),
      score: assessment.score,
      wound_score: assessment.wound_score,
      periwound_score: assessment.periwound_score,
      bias: assessment.bias,
      wound_pixels: assessment.wound_pixels,
      periwound_pixels: assessment.periwound_pixels,
      wound_features: &assessment.wound_features,
      periwound_features: &assessment.periwound_features,
    }
  }
}

/// 按日期分目录保存可视化图像、语义掩码与 JSON 记录
///
/// `folder:///dir?record=json` 时只写 JSON 记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  overlay: Overlay,
  counter: AtomicU32,
  json_only: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let json_only = uri
      .query_pairs()
      .any(|(k, v)| k == "record" && v == "json");

    Ok(DirectoryRecordOutput {
      directory: url_to_path(uri),
      overlay: Overlay::default(),
      counter: AtomicU32::new(0),
      json_only,
    })
  }
}

impl DirectoryRecordOutput {
  fn record_id(&self) -> u32 {
    self.counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  /// `dir/YYYY/MM/DD/HH-MM-SS-XXXX-<样本名>`，不含扩展名
  fn record_stem(&self, sample: &WoundImage) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}-{}",
      now.format("%H-%M-%S"),
      self.record_id(),
      sample.name
    )))
  }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
  let mut name = stem.as_os_str().to_owned();
  name.push(suffix);
  PathBuf::from(name)
}

impl Render<WoundImage, Evaluation> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, sample: &WoundImage, result: &Evaluation) -> Result<(), Self::Error> {
    let stem = self.record_stem(sample)?;

    if !self.json_only {
      self
        .overlay
        .draw(&sample.image, &result.assessment)
        .save(with_suffix(&stem, ".png"))?;
      result.mask.to_rgb_image().save(with_suffix(&stem, "_mask.png"))?;
    }

    let record = SampleRecord::new(sample, result);
    let json_path = with_suffix(&stem, ".json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&record)?)?;
    debug!("写入记录 {}", json_path.display());
    info!("{}: PWAT {:.4}", sample.name, result.assessment.score);

    Ok(())
  }
}
