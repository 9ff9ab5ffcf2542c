// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/features/color.rs - 颜色空间转换与通道统计
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

use std::sync::LazyLock;

use image::{GrayImage, RgbImage};
use palette::{FromColor, Lab, Srgb};

use crate::mask::MASK_OFF;

// 8 位 HSV 中色相取 [0, 180)，除法用 12 位定点查表
const HUE_RANGE: i32 = 180;
const HSV_SHIFT: u32 = 12;
const LAB_AB_OFFSET: f32 = 128.0;

struct HsvTables {
  sdiv: [i32; 256],
  hdiv: [i32; 256],
}

static HSV_TABLES: LazyLock<HsvTables> = LazyLock::new(|| {
  let mut sdiv = [0i32; 256];
  let mut hdiv = [0i32; 256];
  for i in 1..256 {
    sdiv[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round_ties_even() as i32;
    hdiv[i] = ((HUE_RANGE << HSV_SHIFT) as f64 / (6.0 * i as f64)).round_ties_even() as i32;
  }
  HsvTables { sdiv, hdiv }
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
  Rgb,
  Hsv,
  Lab,
}

impl ColorSpace {
  pub fn convert(&self, rgb: [u8; 3]) -> [u8; 3] {
    match self {
      ColorSpace::Rgb => rgb,
      ColorSpace::Hsv => rgb_to_hsv(rgb),
      ColorSpace::Lab => rgb_to_lab(rgb),
    }
  }
}

/// 8 位 RGB 转 HSV：H ∈ [0, 180)，S、V ∈ [0, 255]
///
/// 与 8 位定点实现逐字节一致：商为 `(x · table + 2048) >> 12`。
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
  let tables = &*HSV_TABLES;
  let (r, g, b) = (r as i32, g as i32, b as i32);
  let v = r.max(g).max(b);
  let vmin = r.min(g).min(b);
  let diff = v - vmin;
  let half = 1 << (HSV_SHIFT - 1);

  let s = (diff * tables.sdiv[v as usize] + half) >> HSV_SHIFT;

  let sector = if v == r {
    g - b
  } else if v == g {
    b - r + 2 * diff
  } else {
    r - g + 4 * diff
  };
  let h = (sector * tables.hdiv[diff as usize] + half) >> HSV_SHIFT;
  let h = if h < 0 { h + HUE_RANGE } else { h };

  [h as u8, s as u8, v as u8]
}

/// 8 位 RGB 转 Lab：L·255/100，a + 128，b + 128（D65）
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> [u8; 3] {
  let srgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
  let lab: Lab = Lab::from_color(srgb);
  let quantize = |v: f32| v.round().clamp(0.0, 255.0) as u8;
  [
    quantize(lab.l * 255.0 / 100.0),
    quantize(lab.a + LAB_AB_OFFSET),
    quantize(lab.b + LAB_AB_OFFSET),
  ]
}

/// 区域内各通道的均值与总体标准差，数值先除以 255
///
/// 区域为空时全部为 0。
pub fn channel_stats(image: &RgbImage, region: &GrayImage, space: ColorSpace) -> ([f64; 3], [f64; 3]) {
  let mut sum = [0f64; 3];
  let mut sqsum = [0f64; 3];
  let mut n = 0usize;

  for (pixel, m) in image.pixels().zip(region.iter()) {
    if *m == MASK_OFF {
      continue;
    }
    let converted = space.convert(pixel.0);
    for c in 0..3 {
      let v = converted[c] as f64 / 255.0;
      sum[c] += v;
      sqsum[c] += v * v;
    }
    n += 1;
  }

  if n == 0 {
    return ([0.0; 3], [0.0; 3]);
  }

  let scale = 1.0 / n as f64;
  let mut avg = [0f64; 3];
  let mut std = [0f64; 3];
  for c in 0..3 {
    avg[c] = sum[c] * scale;
    std[c] = (sqsum[c] * scale - avg[c] * avg[c]).max(0.0).sqrt();
  }
  (avg, std)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb};

  #[test]
  fn hsv_primaries() {
    assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
    assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
    assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    assert_eq!(rgb_to_hsv([255, 0, 255]), [150, 255, 255]);
  }

  #[test]
  fn hsv_table_rounding() {
    // 231 · 30 / 58 = 119.48，查表结果为 120
    assert_eq!(rgb_to_hsv([0, 1, 58]), [120, 255, 58]);
    assert_eq!(rgb_to_hsv([1, 0, 58]), [121, 255, 58]);
    assert_eq!(rgb_to_hsv([10, 20, 30]), [105, 170, 30]);
    assert_eq!(HSV_TABLES.sdiv[58], 18008);
    assert_eq!(HSV_TABLES.hdiv[58], 2119);
    assert_eq!(HSV_TABLES.hdiv[255], 482);
  }

  #[test]
  fn hsv_gray_has_no_hue() {
    assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
  }

  #[test]
  fn lab_extremes() {
    assert_eq!(rgb_to_lab([0, 0, 0]), [0, 128, 128]);
    let white = rgb_to_lab([255, 255, 255]);
    assert_eq!(white[0], 255);
    assert!((white[1] as i32 - 128).abs() <= 1);
    assert!((white[2] as i32 - 128).abs() <= 1);
  }

  #[test]
  fn lab_red_is_positive_a() {
    let red = rgb_to_lab([255, 0, 0]);
    assert!(red[1] > 200);
  }

  #[test]
  fn stats_over_two_values() {
    let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
    let region = GrayImage::from_pixel(2, 1, Luma([255]));
    let (avg, std) = channel_stats(&image, &region, ColorSpace::Rgb);
    assert_eq!(avg, [0.5; 3]);
    assert_eq!(std, [0.5; 3]);
  }

  #[test]
  fn empty_region_stats_are_zero() {
    let image = RgbImage::from_pixel(3, 3, Rgb([10, 20, 30]));
    let region = GrayImage::new(3, 3);
    for space in [ColorSpace::Rgb, ColorSpace::Hsv, ColorSpace::Lab] {
      assert_eq!(channel_stats(&image, &region, space), ([0.0; 3], [0.0; 3]));
    }
  }
}
