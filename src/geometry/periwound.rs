// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/geometry/periwound.rs - 伤口周边环形区域提取
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
use tracing::debug;

use super::morphology::{StructuringElement, dilate, erode, saturating_subtract};

pub const DEFAULT_KERNEL_SIZE: (u32, u32) = (20, 20);

/// 伤口周边环：膨胀结果减去腐蚀结果
///
/// 不在此处与身体区域求交，该策略由评分器决定。
pub fn periwound_mask(wound: &GrayImage, element: &StructuringElement) -> GrayImage {
  let eroded = erode(wound, element);
  let dilated = dilate(wound, element);
  let ring = saturating_subtract(&dilated, &eroded);
  debug!(
    "周边环提取完成: 结构元素 {:?}, 环像素数 {}",
    element.dimensions(),
    crate::mask::count_selected(&ring)
  );
  ring
}
