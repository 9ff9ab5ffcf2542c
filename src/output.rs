// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::FromUrl;
#[cfg(any(feature = "save_image_file", feature = "directory_record"))]
use crate::FromUrlWithScheme;
use crate::{input::WoundImage, mask::SemanticMask, scoring::Assessment};

pub trait Render<Sample, Outcome>: Sized {
  type Error;
  fn render_result(&self, sample: &Sample, result: &Outcome) -> Result<(), Self::Error>;

  /// 不同样本是否写入不同的目标
  fn per_sample_target(&self) -> bool {
    true
  }
}

/// 未指定输出时什么也不做
impl<Sample, Outcome, R: Render<Sample, Outcome>> Render<Sample, Outcome> for Option<R> {
  type Error = R::Error;

  fn render_result(&self, sample: &Sample, result: &Outcome) -> Result<(), Self::Error> {
    match self {
      Some(output) => output.render_result(sample, result),
      None => Ok(()),
    }
  }

  fn per_sample_target(&self) -> bool {
    self.as_ref().is_none_or(R::per_sample_target)
  }
}

/// 一个样本的分割掩码与评分结果
#[derive(Debug, Clone)]
pub struct Evaluation {
  pub mask: SemanticMask,
  pub assessment: Assessment,
}

pub mod overlay;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError, SampleRecord};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<WoundImage, Evaluation> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, sample: &WoundImage, result: &Evaluation) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(sample, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(sample, result)
        .map_err(OutputError::from),
      #[allow(unreachable_patterns)]
      _ => {
        let _ = (sample, result);
        Ok(())
      }
    }
  }

  fn per_sample_target(&self) -> bool {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output.per_sample_target(),
      #[allow(unreachable_patterns)]
      _ => true,
    }
  }
}
