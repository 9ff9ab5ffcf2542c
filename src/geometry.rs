// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/geometry.rs - 掩码几何处理
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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
  #[error("结构元素尺寸无效: {width}x{height}")]
  InvalidKernel { width: u32, height: u32 },
}

mod fill;
mod morphology;
mod periwound;

pub use self::fill::fill_holes;
pub use self::morphology::{StructuringElement, dilate, erode, saturating_subtract};
pub use self::periwound::{DEFAULT_KERNEL_SIZE, periwound_mask};
pub use imageproc::region_labelling::Connectivity;
