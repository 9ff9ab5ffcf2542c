// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/geometry/morphology.rs - 二值形态学运算
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

use image::GrayImage;
use rayon::prelude::*;

use super::GeometryError;
use crate::mask::{MASK_OFF, MASK_ON};

/// 结构元素，按行存储为相对锚点的水平区间 [dx_start, dx_end)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
  width: u32,
  height: u32,
  rows: Vec<ElementRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ElementRow {
  dy: i64,
  dx_start: i64,
  dx_end: i64,
}

impl StructuringElement {
  /// 填充椭圆结构元素，锚点位于 (width / 2, height / 2)
  pub fn ellipse(width: u32, height: u32) -> Result<Self, GeometryError> {
    if width == 0 || height == 0 {
      return Err(GeometryError::InvalidKernel { width, height });
    }

    let r = (height / 2) as i64;
    let c = (width / 2) as i64;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

    let rows = (0..height as i64)
      .filter_map(|i| {
        let dy = i - r;
        if dy.abs() > r {
          return None;
        }
        let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round_ties_even() as i64;
        let j1 = (c - dx).max(0);
        let j2 = (c + dx + 1).min(width as i64);
        (j1 < j2).then_some(ElementRow {
          dy,
          dx_start: j1 - c,
          dx_end: j2 - c,
        })
      })
      .collect();

    Ok(Self {
      width,
      height,
      rows,
    })
  }

  pub fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  /// 结构元素中的有效点数
  pub fn area(&self) -> usize {
    self
      .rows
      .iter()
      .map(|row| (row.dx_end - row.dx_start) as usize)
      .sum()
  }

  pub fn contains(&self, dx: i64, dy: i64) -> bool {
    self
      .rows
      .iter()
      .any(|row| row.dy == dy && (row.dx_start..row.dx_end).contains(&dx))
  }
}

// 逐行前缀和，用于 O(1) 查询一段水平区间内的前景数
struct RowPrefix {
  width: usize,
  height: usize,
  sums: Vec<u32>,
}

impl RowPrefix {
  fn new(mask: &GrayImage) -> Self {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut sums = vec![0u32; height * (width + 1)];
    for (y, row) in mask.as_raw().chunks_exact(width.max(1)).enumerate().take(height) {
      let base = y * (width + 1);
      for (x, &v) in row.iter().enumerate() {
        sums[base + x + 1] = sums[base + x] + u32::from(v != MASK_OFF);
      }
    }
    Self {
      width,
      height,
      sums,
    }
  }

  // 闭区间 [x0, x1] 内的前景数
  fn count(&self, y: usize, x0: usize, x1: usize) -> u32 {
    let base = y * (self.width + 1);
    self.sums[base + x1 + 1] - self.sums[base + x0]
  }
}

fn apply<F>(mask: &GrayImage, op: F) -> GrayImage
where
  F: Fn(&RowPrefix, i64, i64) -> bool + Sync,
{
  let (width, height) = mask.dimensions();
  let mut out = vec![MASK_OFF; width as usize * height as usize];
  if width == 0 || height == 0 {
    return GrayImage::new(width, height);
  }

  let prefix = RowPrefix::new(mask);
  out
    .par_chunks_mut(width as usize)
    .enumerate()
    .for_each(|(y, row)| {
      for (x, v) in row.iter_mut().enumerate() {
        if op(&prefix, x as i64, y as i64) {
          *v = MASK_ON;
        }
      }
    });

  // 缓冲区长度与尺寸一致
  GrayImage::from_raw(width, height, out).unwrap_or_else(|| GrayImage::new(width, height))
}

/// 腐蚀，越界邻域视为背景
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
  apply(mask, |prefix, x, y| {
    let (w, h) = (prefix.width as i64, prefix.height as i64);
    element.rows.iter().all(|row| {
      let sy = y + row.dy;
      let sx0 = x + row.dx_start;
      let sx1 = x + row.dx_end - 1;
      if sy < 0 || sy >= h || sx0 < 0 || sx1 >= w {
        return false;
      }
      prefix.count(sy as usize, sx0 as usize, sx1 as usize) as i64 == sx1 - sx0 + 1
    })
  })
}

/// 膨胀，越界邻域视为背景
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
  apply(mask, |prefix, x, y| {
    let (w, h) = (prefix.width as i64, prefix.height as i64);
    element.rows.iter().any(|row| {
      let sy = y + row.dy;
      if sy < 0 || sy >= h {
        return false;
      }
      let sx0 = (x + row.dx_start).max(0);
      let sx1 = (x + row.dx_end - 1).min(w - 1);
      sx0 <= sx1 && prefix.count(sy as usize, sx0 as usize, sx1 as usize) > 0
    })
  })
}

/// 饱和减法 a - b
pub fn saturating_subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
  let mut out = a.clone();
  for (o, &v) in out.iter_mut().zip(b.iter()) {
    *o = o.saturating_sub(v);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  fn square(size: u32, start: u32, side: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
      if (start..start + side).contains(&x) && (start..start + side).contains(&y) {
        Luma([255])
      } else {
        Luma([0])
      }
    })
  }

  #[test]
  fn ellipse_3x3_is_a_cross() {
    let se = StructuringElement::ellipse(3, 3).unwrap();
    assert_eq!(se.area(), 5);
    assert!(se.contains(0, 0));
    assert!(se.contains(-1, 0) && se.contains(1, 0));
    assert!(se.contains(0, -1) && se.contains(0, 1));
    assert!(!se.contains(1, 1));
  }

  #[test]
  fn ellipse_20x20_rows() {
    let se = StructuringElement::ellipse(20, 20).unwrap();
    // 首行只有锚点列，中间行贯穿整个宽度
    assert!(se.contains(0, -10));
    assert!(!se.contains(1, -10));
    assert!(se.contains(-10, 0) && se.contains(9, 0));
    assert!(!se.contains(0, 10));
    assert_eq!(se.rows.len(), 20);
  }

  #[test]
  fn zero_sized_kernel_is_rejected() {
    assert!(matches!(
      StructuringElement::ellipse(0, 5),
      Err(GeometryError::InvalidKernel { width: 0, height: 5 })
    ));
  }

  #[test]
  fn cross_dilation_and_erosion() {
    let se = StructuringElement::ellipse(3, 3).unwrap();
    let mask = square(7, 2, 3);
    let dilated = dilate(&mask, &se);
    // 十字膨胀不会覆盖对角
    assert_eq!(dilated.get_pixel(1, 3)[0], 255);
    assert_eq!(dilated.get_pixel(1, 1)[0], 0);
    assert_eq!(dilated.iter().filter(|&&v| v == 255).count(), 9 + 4 * 3);

    let eroded = erode(&mask, &se);
    assert_eq!(eroded.iter().filter(|&&v| v == 255).count(), 1);
    assert_eq!(eroded.get_pixel(3, 3)[0], 255);
  }

  #[test]
  fn erosion_treats_border_as_background() {
    let se = StructuringElement::ellipse(3, 3).unwrap();
    let full = GrayImage::from_pixel(4, 4, Luma([255]));
    let eroded = erode(&full, &se);
    assert_eq!(eroded.get_pixel(0, 0)[0], 0);
    assert_eq!(eroded.get_pixel(0, 2)[0], 0);
    assert_eq!(eroded.get_pixel(1, 1)[0], 255);
    assert_eq!(eroded.iter().filter(|&&v| v == 255).count(), 4);
  }

  #[test]
  fn subtraction_saturates() {
    let a = square(4, 0, 2);
    let b = square(4, 1, 3);
    let diff = saturating_subtract(&a, &b);
    assert_eq!(diff.get_pixel(0, 0)[0], 255);
    assert_eq!(diff.get_pixel(1, 1)[0], 0);
    assert_eq!(diff.get_pixel(3, 3)[0], 0);
  }
}
