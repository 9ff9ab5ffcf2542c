// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/scoring/tables.rs - 标准化与回归参数表
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

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::features::{FeatureVector, canonical_feature_names};

#[derive(Error, Debug)]
pub enum TablesError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("参数无效: {0}")]
  Invalid(String),
}

/// 标准化中心、尺度、回归系数与偏置
///
/// 加载后只读，可在多个评分调用间共享。缺失的键按
/// 中心 0、尺度 1、系数 0 处理。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringTables {
  #[serde(default)]
  center: HashMap<String, f64>,
  #[serde(default)]
  scale: HashMap<String, f64>,
  #[serde(default)]
  coefficients: HashMap<String, f64>,
  #[serde(default)]
  bias: f64,
}

impl ScoringTables {
  pub fn new(
    center: HashMap<String, f64>,
    scale: HashMap<String, f64>,
    coefficients: HashMap<String, f64>,
    bias: f64,
  ) -> Result<Self, TablesError> {
    let tables = Self {
      center,
      scale,
      coefficients,
      bias,
    };
    tables.validate()?;
    Ok(tables)
  }

  /// 中心 0、尺度 1、系数 1、偏置 0：评分等于原始特征之和
  pub fn identity() -> Self {
    let names = canonical_feature_names();
    Self {
      center: names.iter().map(|k| (k.clone(), 0.0)).collect(),
      scale: names.iter().map(|k| (k.clone(), 1.0)).collect(),
      coefficients: names.into_iter().map(|k| (k, 1.0)).collect(),
      bias: 0.0,
    }
  }

  pub fn from_json_str(json: &str) -> Result<Self, TablesError> {
    let tables: Self = serde_json::from_str(json)?;
    tables.validate()?;
    Ok(tables)
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TablesError> {
    let path = path.as_ref();
    info!("加载评分参数: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let tables = Self::from_json_str(&content)?;
    debug!(
      "评分参数: 中心 {} 项, 尺度 {} 项, 系数 {} 项, 偏置 {}",
      tables.center.len(),
      tables.scale.len(),
      tables.coefficients.len(),
      tables.bias
    );
    Ok(tables)
  }

  pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TablesError> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  fn validate(&self) -> Result<(), TablesError> {
    for (name, table) in [("center", &self.center), ("coefficients", &self.coefficients)] {
      if let Some((k, v)) = table.iter().find(|(_, v)| !v.is_finite()) {
        return Err(TablesError::Invalid(format!("{name}[{k}] = {v} 不是有限值")));
      }
    }
    if let Some((k, v)) = self.scale.iter().find(|(_, v)| !v.is_finite() || **v == 0.0) {
      return Err(TablesError::Invalid(format!("scale[{k}] = {v} 必须为非零有限值")));
    }
    if !self.bias.is_finite() {
      return Err(TablesError::Invalid(format!("bias = {} 不是有限值", self.bias)));
    }
    Ok(())
  }

  pub fn center(&self, key: &str) -> f64 {
    self.center.get(key).copied().unwrap_or(0.0)
  }

  pub fn scale(&self, key: &str) -> f64 {
    self.scale.get(key).copied().unwrap_or(1.0)
  }

  pub fn coefficient(&self, key: &str) -> f64 {
    self.coefficients.get(key).copied().unwrap_or(0.0)
  }

  pub fn bias(&self) -> f64 {
    self.bias
  }

  /// z = (v - center) / scale
  pub fn standardize(&self, features: &FeatureVector) -> FeatureVector {
    features.map_values(|k, v| (v - self.center(k)) / self.scale(k))
  }

  /// Σ z·coefficient
  pub fn region_score(&self, standardized: &FeatureVector) -> f64 {
    standardized
      .iter()
      .map(|(k, z)| z * self.coefficient(k))
      .sum()
  }
}
