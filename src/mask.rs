// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/mask.rs - 二值掩码与语义掩码定义
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

use image::{GrayImage, Luma, Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

const SEMANTIC_CHANNELS: usize = 3;
const BACKGROUND_CHANNEL: usize = 0;
const BODY_CHANNEL: usize = 1;
const WOUND_CHANNEL: usize = 2;

#[derive(Error, Debug)]
pub enum MaskError {
  #[error("掩码在 ({x}, {y}) 处包含非法值 {value}，仅允许 0 或 255")]
  InvalidValue { value: u8, x: u32, y: u32 },
  #[error("语义掩码通道尺寸不一致: {0}")]
  ChannelShape(String),
  #[error("概率图长度不匹配: 期望 {expected}, 实际 {found}")]
  ProbabilityLength { expected: usize, found: usize },
}

/// 掩码取值策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskPolicy {
  /// 所有非零值视为 255
  #[default]
  Normalize,
  /// 出现 {0, 255} 以外的值时报错
  Reject,
}

impl MaskPolicy {
  pub fn apply(&self, mask: &GrayImage) -> Result<GrayImage, MaskError> {
    match self {
      MaskPolicy::Normalize => Ok(binarize(mask)),
      MaskPolicy::Reject => {
        if let Some((x, y, value)) = mask
          .enumerate_pixels()
          .find(|(_, _, p)| p[0] != MASK_ON && p[0] != MASK_OFF)
          .map(|(x, y, p)| (x, y, p[0]))
        {
          return Err(MaskError::InvalidValue { value, x, y });
        }
        Ok(mask.clone())
      }
    }
  }
}

/// 非零即前景
pub fn binarize(mask: &GrayImage) -> GrayImage {
  let mut out = mask.clone();
  for p in out.iter_mut() {
    if *p != MASK_OFF {
      *p = MASK_ON;
    }
  }
  out
}

pub fn count_selected(mask: &GrayImage) -> usize {
  mask.iter().filter(|&&v| v != MASK_OFF).count()
}

/// 逐像素或运算
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
  GrayImage::from_fn(a.width(), a.height(), |x, y| {
    Luma([a.get_pixel(x, y)[0] | b.get_pixel(x, y)[0]])
  })
}

/// 逐像素与运算
pub fn intersection(a: &GrayImage, b: &GrayImage) -> GrayImage {
  GrayImage::from_fn(a.width(), a.height(), |x, y| {
    Luma([a.get_pixel(x, y)[0] & b.get_pixel(x, y)[0]])
  })
}

/// 三通道语义掩码：背景 / 身体 / 伤口
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMask {
  pub background: GrayImage,
  pub body: GrayImage,
  pub wound: GrayImage,
}

impl SemanticMask {
  pub fn new(background: GrayImage, body: GrayImage, wound: GrayImage) -> Result<Self, MaskError> {
    let shape = wound.dimensions();
    if background.dimensions() != shape || body.dimensions() != shape {
      return Err(MaskError::ChannelShape(format!(
        "背景 {:?}, 身体 {:?}, 伤口 {:?}",
        background.dimensions(),
        body.dimensions(),
        shape
      )));
    }
    Ok(Self {
      background,
      body,
      wound,
    })
  }

  /// 仅有伤口通道时，其余通道为空
  pub fn from_wound(wound: GrayImage) -> Self {
    let (width, height) = wound.dimensions();
    Self {
      background: GrayImage::new(width, height),
      body: GrayImage::new(width, height),
      wound,
    }
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.wound.dimensions()
  }

  /// 从 RGB 掩码图像拆分通道（R = 背景，G = 身体，B = 伤口）
  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let channel = |c: usize| GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[c]]));
    Self {
      background: channel(BACKGROUND_CHANNEL),
      body: channel(BODY_CHANNEL),
      wound: channel(WOUND_CHANNEL),
    }
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let (width, height) = self.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
      Rgb([
        self.background.get_pixel(x, y)[0],
        self.body.get_pixel(x, y)[0],
        self.wound.get_pixel(x, y)[0],
      ])
    })
  }

  /// 将分割网络输出的概率图（HWC 排列）按阈值二值化
  pub fn from_probabilities(
    width: u32,
    height: u32,
    probabilities: &[f32],
    tol: f32,
  ) -> Result<Self, MaskError> {
    let expected = width as usize * height as usize * SEMANTIC_CHANNELS;
    if probabilities.len() != expected {
      return Err(MaskError::ProbabilityLength {
        expected,
        found: probabilities.len(),
      });
    }

    let channel = |c: usize| {
      GrayImage::from_fn(width, height, |x, y| {
        let index = (y as usize * width as usize + x as usize) * SEMANTIC_CHANNELS + c;
        if probabilities[index] > tol {
          Luma([MASK_ON])
        } else {
          Luma([MASK_OFF])
        }
      })
    };

    Ok(Self {
      background: channel(BACKGROUND_CHANNEL),
      body: channel(BODY_CHANNEL),
      wound: channel(WOUND_CHANNEL),
    })
  }

  /// 最近邻缩放回原图尺寸
  pub fn resize_to(&self, width: u32, height: u32) -> Self {
    if self.dimensions() == (width, height) {
      return self.clone();
    }
    debug!(
      "缩放语义掩码: {:?} -> {}x{}",
      self.dimensions(),
      width,
      height
    );
    let resize = |m: &GrayImage| image::imageops::resize(m, width, height, FilterType::Nearest);
    Self {
      background: resize(&self.background),
      body: resize(&self.body),
      wound: resize(&self.wound),
    }
  }
}
