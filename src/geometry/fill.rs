// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/geometry/fill.rs - 掩码孔洞填充
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

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::debug;

use crate::mask::{MASK_OFF, MASK_ON};

// 保证 (0, 0) 一定是与外界连通的背景点
const FILL_PADDING: u32 = 2;

/// 填充二值掩码中不与边界连通的孔洞
///
/// 先在四周补 2 像素的背景，再从 (0, 0) 做泛洪，
/// 未被泛洪到的背景即为孔洞，与原掩码合并后裁掉补边。
pub fn fill_holes(mask: &GrayImage, connectivity: Connectivity) -> GrayImage {
  let (width, height) = mask.dimensions();
  let padded_w = width + 2 * FILL_PADDING;
  let padded_h = height + 2 * FILL_PADDING;

  // 背景像素作为前景参与连通域标记
  let inverted = GrayImage::from_fn(padded_w, padded_h, |x, y| {
    let inside = x >= FILL_PADDING
      && y >= FILL_PADDING
      && x < width + FILL_PADDING
      && y < height + FILL_PADDING;
    if inside && mask.get_pixel(x - FILL_PADDING, y - FILL_PADDING)[0] != MASK_OFF {
      Luma([MASK_OFF])
    } else {
      Luma([MASK_ON])
    }
  });

  let labels = connected_components(&inverted, connectivity, Luma([MASK_OFF]));
  let seed = labels.get_pixel(0, 0)[0];
  debug!("孔洞填充: 种子连通域编号 {}", seed);

  GrayImage::from_fn(width, height, |x, y| {
    let label = labels.get_pixel(x + FILL_PADDING, y + FILL_PADDING)[0];
    if label == seed {
      Luma([MASK_OFF])
    } else {
      Luma([MASK_ON])
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ring(size: u32, inner: std::ops::Range<u32>) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
      let border = x == 1 || y == 1 || x == size - 2 || y == size - 2;
      let in_box = (1..size - 1).contains(&x) && (1..size - 1).contains(&y);
      let hole = inner.contains(&x) && inner.contains(&y);
      if in_box && (border || !hole) {
        Luma([255])
      } else {
        Luma([0])
      }
    })
  }

  #[test]
  fn enclosed_hole_is_filled() {
    let mask = ring(9, 3..6);
    assert_eq!(mask.get_pixel(4, 4)[0], 0);
    let filled = fill_holes(&mask, Connectivity::Four);
    assert_eq!(filled.get_pixel(4, 4)[0], 255);
    // 外部背景不受影响
    assert_eq!(filled.get_pixel(0, 0)[0], 0);
    assert_eq!(filled.get_pixel(8, 8)[0], 0);
  }

  #[test]
  fn open_region_touching_border_is_kept() {
    // U 形：开口朝上，内部与外界连通
    let mask = GrayImage::from_fn(7, 7, |x, y| {
      if (x == 1 || x == 5) && y >= 1 || y == 5 && (1..=5).contains(&x) {
        Luma([255])
      } else {
        Luma([0])
      }
    });
    let filled = fill_holes(&mask, Connectivity::Four);
    assert_eq!(filled, mask);
  }

  #[test]
  fn diagonal_leak_depends_on_connectivity() {
    // 菱形边界只在对角方向相接
    let mut mask = GrayImage::new(7, 7);
    for (x, y) in [(3, 1), (2, 2), (4, 2), (1, 3), (5, 3), (2, 4), (4, 4), (3, 5)] {
      mask.put_pixel(x, y, Luma([255]));
    }
    let four = fill_holes(&mask, Connectivity::Four);
    assert_eq!(four.get_pixel(3, 3)[0], 255);
    let eight = fill_holes(&mask, Connectivity::Eight);
    assert_eq!(eight.get_pixel(3, 3)[0], 0);
  }

  #[test]
  fn fill_is_idempotent() {
    let masks = [ring(12, 4..8), ring(9, 3..6), GrayImage::new(5, 5)];
    for mask in masks.iter() {
      let once = fill_holes(mask, Connectivity::Four);
      let twice = fill_holes(&once, Connectivity::Four);
      assert_eq!(once, twice);
    }
  }

  #[test]
  fn full_mask_stays_full() {
    let mask = GrayImage::from_pixel(4, 3, Luma([255]));
    assert_eq!(fill_holes(&mask, Connectivity::Four), mask);
  }
}
