// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/output/overlay.rs - 评分结果可视化
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

use image::{GrayImage, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{mask::MASK_OFF, scoring::Assessment};

const WOUND_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const PERIWOUND_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const TINT_ALPHA: f32 = 0.4;

pub struct Overlay {
  wound_color: [u8; 3],
  periwound_color: [u8; 3],
  box_color: [u8; 3],
  alpha: f32,
}

impl Default for Overlay {
  fn default() -> Self {
    Self {
      wound_color: WOUND_COLOR,
      periwound_color: PERIWOUND_COLOR,
      box_color: BOX_COLOR,
      alpha: TINT_ALPHA,
    }
  }
}

/// 掩码中选中像素的外接矩形
pub fn bounding_box(mask: &GrayImage) -> Option<Rect> {
  let mut bounds: Option<(u32, u32, u32, u32)> = None;
  for (x, y, p) in mask.enumerate_pixels() {
    if p[0] == MASK_OFF {
      continue;
    }
    bounds = Some(match bounds {
      None => (x, y, x, y),
      Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
    });
  }
  bounds.map(|(x0, y0, x1, y1)| Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1))
}

impl Overlay {
  fn tint(&self, pixel: &mut Rgb<u8>, color: [u8; 3]) {
    for (c, target) in pixel.0.iter_mut().zip(color) {
      let blended = (1.0 - self.alpha) * *c as f32 + self.alpha * target as f32;
      *c = blended.round().clamp(0.0, 255.0) as u8;
    }
  }

  /// 伤口染红、周边染绿，并绘制伤口外接框
  pub fn draw(&self, image: &RgbImage, assessment: &Assessment) -> RgbImage {
    let mut canvas = image.clone();
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
      if assessment.wound_mask.get_pixel(x, y)[0] != MASK_OFF {
        self.tint(pixel, self.wound_color);
      } else if assessment.periwound_mask.get_pixel(x, y)[0] != MASK_OFF {
        self.tint(pixel, self.periwound_color);
      }
    }

    // 边框加粗为 2 像素
    if let Some(rect) = bounding_box(&assessment.wound_mask) {
      draw_hollow_rect_mut(&mut canvas, rect, Rgb(self.box_color));
      if rect.width() > 2 && rect.height() > 2 {
        let inner = Rect::at(rect.left() + 1, rect.top() + 1).of_size(rect.width() - 2, rect.height() - 2);
        draw_hollow_rect_mut(&mut canvas, inner, Rgb(self.box_color));
      }
    }
    canvas
  }
}
