// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/features/redness.rs - 红度指标
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

use super::color::rgb_to_hsv;
use crate::mask::MASK_OFF;

pub const PARK_EPSILON: f64 = 1e-5;
/// 空区域时 Park 红度的固定值
pub const PARK_EMPTY: f64 = -0.5;
/// 空区域时 Amparo 红度的固定值
pub const AMPARO_EMPTY: f64 = 0.0;

fn region_mean<F>(image: &RgbImage, region: &GrayImage, empty: f64, f: F) -> f64
where
  F: Fn([u8; 3]) -> f64,
{
  let (sum, n) = image
    .pixels()
    .zip(region.iter())
    .filter(|(_, m)| **m != MASK_OFF)
    .fold((0f64, 0usize), |(sum, n), (p, _)| (sum + f(p.0), n + 1));

  if n == 0 { empty } else { sum / n as f64 }
}

/// Park 红度：(2R - G - B) / (2(R + G + B) + ε)，取值约在 [-0.5, 1]
pub fn park_redness(image: &RgbImage, region: &GrayImage) -> f64 {
  region_mean(image, region, PARK_EMPTY, |[r, g, b]| {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    (2.0 * r - g - b) / (2.0 * (r + g + b) + PARK_EPSILON)
  })
}

/// Amparo 红度：H·S / 255²，H、S 为 8 位 HSV 通道
pub fn amparo_redness(image: &RgbImage, region: &GrayImage) -> f64 {
  region_mean(image, region, AMPARO_EMPTY, |rgb| {
    let [h, s, _] = rgb_to_hsv(rgb);
    (h as f64 * s as f64) / (255.0 * 255.0)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Luma, Rgb};

  #[test]
  fn empty_region_sentinels() {
    let image = RgbImage::from_pixel(5, 5, Rgb([255, 0, 0]));
    let region = GrayImage::new(5, 5);
    assert_eq!(park_redness(&image, &region), -0.5);
    assert_eq!(amparo_redness(&image, &region), 0.0);
  }

  #[test]
  fn pure_red_park_is_close_to_one() {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
    let region = GrayImage::from_pixel(4, 4, Luma([255]));
    let park = park_redness(&image, &region);
    assert!((park - 1.0).abs() < 1e-6);
  }

  #[test]
  fn black_pixels_do_not_divide_by_zero() {
    let image = RgbImage::new(4, 4);
    let region = GrayImage::from_pixel(4, 4, Luma([255]));
    assert_eq!(park_redness(&image, &region), 0.0);
    assert_eq!(amparo_redness(&image, &region), 0.0);
  }

  #[test]
  fn amparo_uses_hue_times_saturation() {
    // 蓝色: H = 120, S = 255
    let image = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
    let region = GrayImage::from_pixel(2, 2, Luma([255]));
    let expected = 120.0 * 255.0 / (255.0 * 255.0);
    assert!((amparo_redness(&image, &region) - expected).abs() < 1e-12);
  }

  #[test]
  fn only_selected_pixels_are_averaged() {
    let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
    let region = GrayImage::from_fn(2, 1, |x, _| if x == 1 { Luma([255]) } else { Luma([0]) });
    let park = park_redness(&image, &region);
    assert!((park + 0.5).abs() < 1e-6);
  }
}
