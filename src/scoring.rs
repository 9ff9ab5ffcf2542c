// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/scoring.rs - PWAT 评分
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

use std::sync::Arc;

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::{
  error::PwatError,
  features::{FeatureVector, PERIWOUND_PREFIX, WOUND_PREFIX, extract_features},
  geometry::{Connectivity, DEFAULT_KERNEL_SIZE, StructuringElement, fill_holes, periwound_mask},
  mask::{MaskPolicy, SemanticMask, count_selected, intersection, union},
};

mod tables;
pub use self::tables::{ScoringTables, TablesError};

/// 周边环是否限制在身体区域内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingPolicy {
  /// 直接使用膨胀减腐蚀得到的环
  #[default]
  Unrestricted,
  /// 与填充后的 (身体 | 伤口) 求交；未提供身体掩码时不限制
  WithinBody,
}

/// 单次评分的完整结果
#[derive(Debug, Clone)]
pub struct Assessment {
  pub score: f64,
  pub wound_score: f64,
  pub periwound_score: f64,
  pub bias: f64,
  /// 未标准化的伤口特征
  pub wound_features: FeatureVector,
  /// 未标准化的周边特征
  pub periwound_features: FeatureVector,
  pub wound_pixels: usize,
  pub periwound_pixels: usize,
  pub wound_mask: GrayImage,
  pub periwound_mask: GrayImage,
}

pub struct PwatScorerBuilder {
  tables: Arc<ScoringTables>,
  kernel_size: (u32, u32),
  connectivity: Connectivity,
  ring_policy: RingPolicy,
  mask_policy: MaskPolicy,
}

impl PwatScorerBuilder {
  pub fn new(tables: impl Into<Arc<ScoringTables>>) -> Self {
    Self {
      tables: tables.into(),
      kernel_size: DEFAULT_KERNEL_SIZE,
      connectivity: Connectivity::Four,
      ring_policy: RingPolicy::default(),
      mask_policy: MaskPolicy::default(),
    }
  }

  pub fn kernel_size(mut self, width: u32, height: u32) -> Self {
    self.kernel_size = (width, height);
    self
  }

  pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
    self.connectivity = connectivity;
    self
  }

  pub fn ring_policy(mut self, ring_policy: RingPolicy) -> Self {
    self.ring_policy = ring_policy;
    self
  }

  pub fn mask_policy(mut self, mask_policy: MaskPolicy) -> Self {
    self.mask_policy = mask_policy;
    self
  }

  pub fn build(self) -> Result<PwatScorer, PwatError> {
    let (width, height) = self.kernel_size;
    let element = StructuringElement::ellipse(width, height)?;
    info!(
      "评分器配置: 结构元素 {}x{}, 连通性 {:?}, 环策略 {:?}, 掩码策略 {:?}",
      width, height, self.connectivity, self.ring_policy, self.mask_policy
    );
    Ok(PwatScorer {
      tables: self.tables,
      element,
      connectivity: self.connectivity,
      ring_policy: self.ring_policy,
      mask_policy: self.mask_policy,
    })
  }
}

/// PWAT 评分器，持有只读参数表，可在多线程间共享
#[derive(Debug, Clone)]
pub struct PwatScorer {
  tables: Arc<ScoringTables>,
  element: StructuringElement,
  connectivity: Connectivity,
  ring_policy: RingPolicy,
  mask_policy: MaskPolicy,
}

impl PwatScorer {
  pub fn builder(tables: impl Into<Arc<ScoringTables>>) -> PwatScorerBuilder {
    PwatScorerBuilder::new(tables)
  }

  pub fn tables(&self) -> &ScoringTables {
    &self.tables
  }

  /// 根据环策略生成周边掩码
  pub fn periwound(&self, wound: &GrayImage, body: Option<&GrayImage>) -> GrayImage {
    let ring = periwound_mask(wound, &self.element);
    match (self.ring_policy, body) {
      (RingPolicy::WithinBody, Some(body)) => {
        let skin = fill_holes(&union(body, wound), self.connectivity);
        intersection(&ring, &skin)
      }
      (RingPolicy::WithinBody, None) => {
        debug!("未提供身体掩码, 周边环不做限制");
        ring
      }
      (RingPolicy::Unrestricted, _) => ring,
    }
  }

  /// 评分入口：伤口掩码加可选的身体掩码
  pub fn assess(
    &self,
    image: &RgbImage,
    wound: &GrayImage,
    body: Option<&GrayImage>,
  ) -> Result<Assessment, PwatError> {
    PwatError::check_shape(image.dimensions(), wound.dimensions())?;
    if let Some(body) = body {
      PwatError::check_shape(image.dimensions(), body.dimensions())?;
    }

    let wound = self.mask_policy.apply(wound)?;
    let body = body.map(|b| self.mask_policy.apply(b)).transpose()?;

    let periwound = self.periwound(&wound, body.as_ref());
    let wound_pixels = count_selected(&wound);
    let periwound_pixels = count_selected(&periwound);
    debug!("伤口像素 {}, 周边像素 {}", wound_pixels, periwound_pixels);

    let (wound_features, periwound_features) = rayon::join(
      || extract_features(image, &wound, WOUND_PREFIX),
      || extract_features(image, &periwound, PERIWOUND_PREFIX),
    );
    let (wound_features, periwound_features) = (wound_features?, periwound_features?);

    let wound_score = self
      .tables
      .region_score(&self.tables.standardize(&wound_features));
    let periwound_score = self
      .tables
      .region_score(&self.tables.standardize(&periwound_features));
    let bias = self.tables.bias();
    let score = wound_score + periwound_score + bias;

    debug!(
      "伤口得分 {:.4}, 周边得分 {:.4}, 偏置 {:.4}",
      wound_score, periwound_score, bias
    );

    Ok(Assessment {
      score,
      wound_score,
      periwound_score,
      bias,
      wound_features,
      periwound_features,
      wound_pixels,
      periwound_pixels,
      wound_mask: wound,
      periwound_mask: periwound,
    })
  }

  pub fn evaluate(
    &self,
    image: &RgbImage,
    wound: &GrayImage,
    body: Option<&GrayImage>,
  ) -> Result<f64, PwatError> {
    self.assess(image, wound, body).map(|a| a.score)
  }

  /// 从语义掩码拆出伤口与身体通道后评分
  pub fn assess_semantic(&self, image: &RgbImage, mask: &SemanticMask) -> Result<Assessment, PwatError> {
    self.assess(image, &mask.wound, Some(&mask.body))
  }

  pub fn evaluate_pwat(&self, image: &RgbImage, mask: &SemanticMask) -> Result<f64, PwatError> {
    self.assess_semantic(image, mask).map(|a| a.score)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb};

  fn centered_square(size: u32, side: u32) -> GrayImage {
    let start = (size - side) / 2;
    GrayImage::from_fn(size, size, |x, y| {
      if (start..start + side).contains(&x) && (start..start + side).contains(&y) {
        Luma([255])
      } else {
        Luma([0])
      }
    })
  }

  fn identity_scorer() -> PwatScorer {
    PwatScorer::builder(ScoringTables::identity()).build().unwrap()
  }

  #[test]
  fn shape_mismatch_fails_fast() {
    let scorer = identity_scorer();
    let image = RgbImage::new(20, 20);
    let wound = GrayImage::new(20, 21);
    assert!(matches!(
      scorer.evaluate(&image, &wound, None),
      Err(PwatError::ShapeMismatch { .. })
    ));
    let body = GrayImage::new(19, 20);
    assert!(matches!(
      scorer.evaluate(&image, &GrayImage::new(20, 20), Some(&body)),
      Err(PwatError::ShapeMismatch { .. })
    ));
  }

  #[test]
  fn zero_kernel_fails_to_build() {
    let result = PwatScorer::builder(ScoringTables::identity())
      .kernel_size(0, 20)
      .build();
    assert!(matches!(result, Err(PwatError::GeometryError(_))));
  }

  #[test]
  fn empty_wound_scores_sentinels_only() {
    let scorer = identity_scorer();
    let image = RgbImage::from_pixel(40, 40, Rgb([90, 60, 50]));
    let assessment = scorer.assess(&image, &GrayImage::new(40, 40), None).unwrap();
    assert_eq!(assessment.wound_pixels, 0);
    assert_eq!(assessment.periwound_pixels, 0);
    // 两个区域都只剩 Park 哨兵 -0.5
    assert_eq!(assessment.score, -1.0);
  }

  #[test]
  fn evaluation_is_deterministic() {
    let scorer = identity_scorer();
    let image = RgbImage::from_fn(60, 60, |x, y| Rgb([(x * 4) as u8, (y * 3) as u8, ((x * y) % 256) as u8]));
    let wound = centered_square(60, 16);
    let first = scorer.evaluate(&image, &wound, None).unwrap();
    for _ in 0..3 {
      assert_eq!(scorer.evaluate(&image, &wound, None).unwrap().to_bits(), first.to_bits());
    }
  }

  #[test]
  fn within_body_policy_clips_the_ring() {
    let tables = Arc::new(ScoringTables::identity());
    let wound = centered_square(80, 20);
    // 身体只覆盖左半边
    let body = GrayImage::from_fn(80, 80, |x, _| if x < 40 { Luma([255]) } else { Luma([0]) });

    let free = PwatScorer::builder(tables.clone()).build().unwrap();
    let clipped = PwatScorer::builder(tables)
      .ring_policy(RingPolicy::WithinBody)
      .build()
      .unwrap();

    let free_ring = free.periwound(&wound, Some(&body));
    let clipped_ring = clipped.periwound(&wound, Some(&body));
    assert!(count_selected(&clipped_ring) < count_selected(&free_ring));
    // 右侧远离伤口、不在身体内的像素被去掉
    assert_eq!(free_ring.get_pixel(55, 40)[0], 255);
    assert_eq!(clipped_ring.get_pixel(55, 40)[0], 0);
    // 左侧身体内的环保留
    assert_eq!(clipped_ring.get_pixel(25, 40)[0], 255);
    // 没有身体掩码时与不限制一致
    assert_eq!(clipped.periwound(&wound, None), free_ring);
  }

  #[test]
  fn reject_policy_surfaces_invalid_values() {
    let scorer = PwatScorer::builder(ScoringTables::identity())
      .mask_policy(MaskPolicy::Reject)
      .build()
      .unwrap();
    let image = RgbImage::new(10, 10);
    let mut wound = GrayImage::new(10, 10);
    wound.put_pixel(3, 3, Luma([1]));
    assert!(matches!(
      scorer.evaluate(&image, &wound, None),
      Err(PwatError::MaskError(_))
    ));
  }

  #[test]
  fn normalize_policy_treats_nonzero_as_wound() {
    let scorer = identity_scorer();
    let image = RgbImage::from_pixel(50, 50, Rgb([150, 70, 60]));
    let wound = centered_square(50, 12);
    let faint = GrayImage::from_fn(50, 50, |x, y| Luma([wound.get_pixel(x, y)[0] / 255]));
    assert_eq!(
      scorer.evaluate(&image, &wound, None).unwrap(),
      scorer.evaluate(&image, &faint, None).unwrap()
    );
  }

  #[test]
  fn bias_is_added() {
    let tables = ScoringTables::from_json_str(r#"{"bias": 12.5}"#).unwrap();
    let scorer = PwatScorer::builder(tables).build().unwrap();
    let image = RgbImage::from_pixel(30, 30, Rgb([120, 50, 50]));
    let assessment = scorer.assess(&image, &centered_square(30, 8), None).unwrap();
    // 无系数时两个区域得分为 0
    assert_eq!(assessment.wound_score, 0.0);
    assert_eq!(assessment.periwound_score, 0.0);
    assert_eq!(assessment.score, 12.5);
  }
}
