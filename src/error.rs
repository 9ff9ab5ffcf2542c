// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/error.rs - 评分流程错误定义
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

use crate::{geometry::GeometryError, mask::MaskError, scoring::TablesError};

#[derive(Error, Debug)]
pub enum PwatError {
  #[error("尺寸不匹配: 期望 {}x{}, 实际 {}x{}", expected.0, expected.1, found.0, found.1)]
  ShapeMismatch {
    expected: (u32, u32),
    found: (u32, u32),
  },
  #[error("掩码错误: {0}")]
  MaskError(#[from] MaskError),
  #[error("形态学错误: {0}")]
  GeometryError(#[from] GeometryError),
  #[error("评分参数错误: {0}")]
  TablesError(#[from] TablesError),
}

impl PwatError {
  /// 检查两个栅格尺寸是否一致，(宽, 高)
  pub fn check_shape(expected: (u32, u32), found: (u32, u32)) -> Result<(), Self> {
    if expected != found {
      return Err(PwatError::ShapeMismatch { expected, found });
    }
    Ok(())
  }
}
