// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/features.rs - 区域图像特征
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

use image::{GrayImage, RgbImage};
use serde::{Serialize, Serializer, ser::SerializeMap};
use tracing::{debug, warn};

use crate::error::PwatError;

mod color;
mod haralick;
mod redness;

pub use self::color::{ColorSpace, channel_stats, rgb_to_hsv, rgb_to_lab};
pub use self::haralick::{HARALICK_FEATURES, MIN_TEXTURE_PIXELS, haralick};
pub use self::redness::{AMPARO_EMPTY, PARK_EMPTY, PARK_EPSILON, amparo_redness, park_redness};

pub const WOUND_PREFIX: &str = "w_";
pub const PERIWOUND_PREFIX: &str = "p_";

/// 每个区域的特征名（不含前缀），按输出顺序排列
pub const BASE_FEATURE_NAMES: [&str; 33] = [
  "haralick0",
  "haralick1",
  "haralick2",
  "haralick3",
  "haralick4",
  "haralick5",
  "haralick6",
  "haralick7",
  "haralick8",
  "haralick9",
  "haralick10",
  "haralick11",
  "haralick12",
  "avgR",
  "avgG",
  "avgB",
  "stdR",
  "stdG",
  "stdB",
  "avgH",
  "avgS",
  "avgV",
  "stdH",
  "stdS",
  "stdV",
  "avgL",
  "avga",
  "avgb",
  "stdL",
  "stda",
  "stdb",
  "park",
  "amparo",
];

/// 全部 66 个特征名（伤口在前，周边在后）
pub fn canonical_feature_names() -> Vec<String> {
  [WOUND_PREFIX, PERIWOUND_PREFIX]
    .iter()
    .flat_map(|prefix| BASE_FEATURE_NAMES.iter().map(move |name| format!("{prefix}{name}")))
    .collect()
}

/// 保持插入顺序的特征表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
  entries: Vec<(String, f64)>,
}

impl FeatureVector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
    }
  }

  /// 插入特征，已存在的键覆盖原值
  pub fn insert(&mut self, key: impl Into<String>, value: f64) {
    let key = key.into();
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<f64> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| *v)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self.entries.iter().map(|(k, v)| (k.as_str(), *v))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
    self.entries.iter().map(|(_, v)| *v)
  }

  /// 对每个值应用同一变换，键保持不变
  pub fn map_values<F: FnMut(&str, f64) -> f64>(&self, mut f: F) -> Self {
    Self {
      entries: self
        .entries
        .iter()
        .map(|(k, v)| (k.clone(), f(k, *v)))
        .collect(),
    }
  }
}

impl FromIterator<(String, f64)> for FeatureVector {
  fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
    let mut features = FeatureVector::new();
    for (k, v) in iter {
      features.insert(k, v);
    }
    features
  }
}

impl IntoIterator for FeatureVector {
  type Item = (String, f64);
  type IntoIter = std::vec::IntoIter<(String, f64)>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

impl Serialize for FeatureVector {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (k, v) in self.entries.iter() {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

/// 提取区域内的 33 个特征，键名为 `prefix` + 基础特征名
///
/// 区域为空时仍返回完整特征：颜色统计为 0，纹理为全 0，
/// 红度指标取固定哨兵值。
pub fn extract_features(
  image: &RgbImage,
  region: &GrayImage,
  prefix: &str,
) -> Result<FeatureVector, PwatError> {
  PwatError::check_shape(image.dimensions(), region.dimensions())?;

  let mut values: Vec<f64> = Vec::with_capacity(BASE_FEATURE_NAMES.len());

  values.extend(haralick(image, region));

  for space in [ColorSpace::Rgb, ColorSpace::Hsv, ColorSpace::Lab] {
    let (avg, std) = channel_stats(image, region, space);
    values.extend(avg);
    values.extend(std);
  }

  values.push(park_redness(image, region));
  values.push(amparo_redness(image, region));

  let mut features = FeatureVector::with_capacity(BASE_FEATURE_NAMES.len());
  for (name, value) in BASE_FEATURE_NAMES.iter().zip(values) {
    let value = if value.is_finite() {
      value
    } else {
      warn!("特征 {}{} 非有限值 {}, 以 0 代替", prefix, name, value);
      0.0
    };
    features.insert(format!("{prefix}{name}"), value);
  }

  debug!("区域 {} 特征提取完成: {} 项", prefix, features.len());
  Ok(features)
}
