// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/main.rs - 单张照片评分程序
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use pwat::{
  FromUrl,
  args::ScorerArgs,
  input::InputWrapper,
  model::MaskFileSegmenter,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// PWAT 伤口照片评分
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入照片，image:///path.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 可视化输出，image:///out.png 或 folder:///dir
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
  #[command(flatten)]
  pub scorer: ScorerArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("掩码来源: {}", args.scorer.mask);
  if let Some(output) = &args.output {
    info!("输出路径: {}", output);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let segmenter = MaskFileSegmenter::from_url(&args.scorer.mask)?;
  let output = args.output.as_ref().map(OutputWrapper::from_url).transpose()?;
  let scorer = args.scorer.build_scorer()?;

  let evaluation = OneShotTask::new(scorer).run_task(input, segmenter, output)?;
  println!("{:.6}", evaluation.assessment.score);

  Ok(())
}
