// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/features/haralick.rs - Haralick 纹理特征
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
use tracing::debug;

use crate::mask::MASK_OFF;

pub const HARALICK_FEATURES: usize = 13;
/// 有效像素少于该值时不计算纹理
pub const MIN_TEXTURE_PIXELS: usize = 10;

// 0°, 45°, 90°, 135°，(dy, dx)，距离为 1
const DIRECTIONS: [(i64, i64); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

/// 区域纹理的 13 个 Haralick 特征，四个方向取平均
///
/// 区域外像素置 0。R、G、B 三个通道平面在同一方向上的共生计数
/// 合并为一个矩阵，取值为 0 的像素不参与统计。
pub fn haralick(image: &RgbImage, region: &GrayImage) -> [f64; HARALICK_FEATURES] {
  let (width, height) = image.dimensions();

  let mut textured = 0usize;
  let mut planes: [Vec<u8>; 3] = Default::default();
  for (p, m) in image.pixels().zip(region.iter()) {
    let selected = *m != MASK_OFF;
    if selected && p[0] != 0 {
      textured += 1;
    }
    for (plane, v) in planes.iter_mut().zip(p.0) {
      plane.push(if selected { v } else { 0 });
    }
  }

  if textured < MIN_TEXTURE_PIXELS {
    debug!("纹理像素不足 ({} < {}), 返回零特征", textured, MIN_TEXTURE_PIXELS);
    return [0.0; HARALICK_FEATURES];
  }

  let levels = planes.iter().flatten().copied().max().unwrap_or(0) as usize + 1;
  let mut mean = [0f64; HARALICK_FEATURES];
  for (dy, dx) in DIRECTIONS {
    let cmat = cooccurrence(&planes, width as i64, height as i64, levels, dy, dx);
    if let Some(feats) = features_from_cooccurrence(&cmat, levels) {
      for (m, f) in mean.iter_mut().zip(feats) {
        *m += f;
      }
    }
  }
  for m in mean.iter_mut() {
    *m /= DIRECTIONS.len() as f64;
  }
  mean
}

// 各平面累加的对称共生矩阵，忽略取值 0
fn cooccurrence<P: AsRef<[u8]>>(
  planes: &[P],
  width: i64,
  height: i64,
  levels: usize,
  dy: i64,
  dx: i64,
) -> Vec<f64> {
  let mut cmat = vec![0f64; levels * levels];
  for plane in planes {
    let plane = plane.as_ref();
    for y in 0..height {
      let y2 = y + dy;
      if y2 < 0 || y2 >= height {
        continue;
      }
      for x in 0..width {
        let x2 = x + dx;
        if x2 < 0 || x2 >= width {
          continue;
        }
        let a = plane[(y * width + x) as usize] as usize;
        let b = plane[(y2 * width + x2) as usize] as usize;
        if a == 0 || b == 0 {
          continue;
        }
        cmat[a * levels + b] += 1.0;
        cmat[b * levels + a] += 1.0;
      }
    }
  }
  cmat
}

// -Σ p·log2(p)，p = 0 的项为 0
fn entropy<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> f64 {
  -values
    .into_iter()
    .filter(|&&p| p > 0.0)
    .map(|&p| p * p.log2())
    .sum::<f64>()
}

fn features_from_cooccurrence(cmat: &[f64], n: usize) -> Option<[f64; HARALICK_FEATURES]> {
  let total: f64 = cmat.iter().sum();
  if total == 0.0 {
    return None;
  }
  let p: Vec<f64> = cmat.iter().map(|v| v / total).collect();

  let mut px = vec![0f64; n];
  let mut py = vec![0f64; n];
  let mut px_plus_y = vec![0f64; 2 * n];
  let mut px_minus_y = vec![0f64; n];
  for i in 0..n {
    for j in 0..n {
      let v = p[i * n + j];
      px[j] += v;
      py[i] += v;
      px_plus_y[i + j] += v;
      px_minus_y[i.abs_diff(j)] += v;
    }
  }

  let k = |i: usize| i as f64;
  let ux: f64 = px.iter().enumerate().map(|(i, v)| k(i) * v).sum();
  let uy: f64 = py.iter().enumerate().map(|(i, v)| k(i) * v).sum();
  let vx: f64 = px.iter().enumerate().map(|(i, v)| k(i) * k(i) * v).sum::<f64>() - ux * ux;
  let vy: f64 = py.iter().enumerate().map(|(i, v)| k(i) * k(i) * v).sum::<f64>() - uy * uy;
  let (sx, sy) = (vx.max(0.0).sqrt(), vy.max(0.0).sqrt());

  let mut f = [0f64; HARALICK_FEATURES];

  // 角二阶矩
  f[0] = p.iter().map(|v| v * v).sum();
  // 对比度
  f[1] = px_minus_y.iter().enumerate().map(|(i, v)| k(i) * k(i) * v).sum();
  // 相关性
  f[2] = if sx == 0.0 || sy == 0.0 {
    1.0
  } else {
    let ij: f64 = (0..n)
      .flat_map(|i| (0..n).map(move |j| (i, j)))
      .map(|(i, j)| k(i) * k(j) * p[i * n + j])
      .sum();
    (ij - ux * uy) / (sx * sy)
  };
  // 方差
  f[3] = vx;
  // 逆差矩
  f[4] = (0..n)
    .flat_map(|i| (0..n).map(move |j| (i, j)))
    .map(|(i, j)| {
      let d = k(i) - k(j);
      p[i * n + j] / (1.0 + d * d)
    })
    .sum();
  // 和均值、和方差、和熵
  f[5] = px_plus_y.iter().enumerate().map(|(i, v)| k(i) * v).sum();
  f[6] = px_plus_y.iter().enumerate().map(|(i, v)| k(i) * k(i) * v).sum::<f64>() - f[5] * f[5];
  f[7] = entropy(&px_plus_y);
  // 熵
  f[8] = entropy(&p);
  // 差方差、差熵
  let mean_diff = px_minus_y.iter().sum::<f64>() / n as f64;
  f[9] = px_minus_y.iter().map(|v| (v - mean_diff) * (v - mean_diff)).sum::<f64>() / n as f64;
  f[10] = entropy(&px_minus_y);

  // 相关信息测度
  let hxy = f[8];
  let hx = entropy(&px);
  let hy = entropy(&py);
  let mut hxy1 = 0f64;
  let mut hxy2 = 0f64;
  for i in 0..n {
    for j in 0..n {
      let q = px[i] * py[j];
      if q > 0.0 {
        hxy1 -= p[i * n + j] * q.log2();
        hxy2 -= q * q.log2();
      }
    }
  }
  let hmax = hx.max(hy);
  f[11] = if hmax == 0.0 { 0.0 } else { (hxy - hxy1) / hmax };
  f[12] = (1.0 - (-2.0 * (hxy2 - hxy)).exp()).max(0.0).sqrt();

  Some(f)
}
