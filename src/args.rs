// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/args.rs - 评分器命令行参数
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

use std::path::PathBuf;

use clap::Args;
use tracing::info;
use url::Url;

use crate::{
  error::PwatError,
  geometry::Connectivity,
  mask::MaskPolicy,
  scoring::{PwatScorer, RingPolicy, ScoringTables},
};

/// 两个程序共用的评分参数
#[derive(Args, Debug)]
pub struct ScorerArgs {
  /// 评分参数 JSON 文件（center / scale / coefficients / bias）
  #[arg(long, value_name = "FILE")]
  pub tables: PathBuf,
  /// 分割掩码来源
  /// - mask:///path.png 所有照片共用
  /// - mask:?suffix=_mask 照片旁的 <主干>_mask.png
  /// - mask:?suffix=_deepskin_mask 读取 deepskin 生成的 <主干>_deepskin_mask.png
  #[arg(long, value_name = "MASK", default_value = "mask:?suffix=_mask")]
  pub mask: Url,
  /// 椭圆结构元素边长
  #[arg(long, value_name = "PIXELS", default_value_t = 20)]
  pub kernel: u32,
  /// 周边环限制在身体区域内
  #[arg(long)]
  pub within_body: bool,
  /// 掩码出现 0/255 以外的值时报错
  #[arg(long)]
  pub strict_masks: bool,
  /// 填充孔洞时使用 8 连通
  #[arg(long)]
  pub eight_connected: bool,
}

impl ScorerArgs {
  pub fn build_scorer(&self) -> Result<PwatScorer, PwatError> {
    info!("评分参数文件: {}", self.tables.display());
    let tables = ScoringTables::from_json_file(&self.tables)?;

    PwatScorer::builder(tables)
      .kernel_size(self.kernel, self.kernel)
      .ring_policy(if self.within_body {
        RingPolicy::WithinBody
      } else {
        RingPolicy::Unrestricted
      })
      .mask_policy(if self.strict_masks {
        MaskPolicy::Reject
      } else {
        MaskPolicy::Normalize
      })
      .connectivity(if self.eight_connected {
        Connectivity::Eight
      } else {
        Connectivity::Four
      })
      .build()
  }
}
