// 该文件是 PWAT （伤口照片评估） 项目的一部分。
// src/task.rs - 评分任务
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use rayon::iter::{ParallelBridge, ParallelIterator};
use tracing::{error, info, warn};

use crate::{
  input::WoundImage,
  model::Segmenter,
  output::{Evaluation, Render},
  scoring::PwatScorer,
};

/// 中断后等待在途样本完成的最长时间
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, S, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, segmenter: S, output: O) -> Result<Self::Output, Self::Error>;
}

fn evaluate_sample<S, SE>(
  scorer: &PwatScorer,
  segmenter: &S,
  sample: &WoundImage,
) -> anyhow::Result<Evaluation>
where
  S: Segmenter<Error = SE>,
  SE: std::error::Error + Sync + Send + 'static,
{
  let mask = segmenter.segment(sample)?;
  let assessment = scorer.assess_semantic(&sample.image, &mask)?;
  Ok(Evaluation { mask, assessment })
}

/// 评估输入中的第一张照片
pub struct OneShotTask {
  scorer: PwatScorer,
}

impl OneShotTask {
  pub fn new(scorer: PwatScorer) -> Self {
    Self { scorer }
  }
}

impl<
  SE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = WoundImage>,
  S: Segmenter<Error = SE>,
  O: Render<WoundImage, Evaluation, Error = RE>,
> Task<I, S, O> for OneShotTask
{
  type Output = Evaluation;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, segmenter: S, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let sample = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("读取图像 {} 成功，开始评分...", sample.name);
    let now = Instant::now();
    let evaluation = evaluate_sample(&self.scorer, &segmenter, &sample)?;
    info!(
      "{}: PWAT {:.4}，耗时: {:.2?}",
      sample.name,
      evaluation.assessment.score,
      now.elapsed()
    );
    output.render_result(&sample, &evaluation)?;
    info!("渲染完成，总耗时: {:.2?}", now.elapsed());

    Ok(evaluation)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
  /// 按样本名排序的得分
  pub scores: Vec<(String, f64)>,
  pub failed: usize,
  pub interrupted: bool,
}

impl BatchSummary {
  pub fn processed(&self) -> usize {
    self.scores.len()
  }

  pub fn mean_score(&self) -> Option<f64> {
    if self.scores.is_empty() {
      return None;
    }
    Some(self.scores.iter().map(|(_, s)| s).sum::<f64>() / self.scores.len() as f64)
  }
}

/// 在线程池中评估全部照片，失败的样本记录后跳过
pub struct BatchTask {
  scorer: PwatScorer,
  workers: Option<usize>,
  handle_interrupt: bool,
  stop: Arc<AtomicBool>,
}

impl BatchTask {
  pub fn new(scorer: PwatScorer) -> Self {
    Self {
      scorer,
      workers: None,
      handle_interrupt: false,
      stop: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn with_workers(mut self, workers: Option<usize>) -> Self {
    self.workers = workers;
    self
  }

  /// 收到 Ctrl-C 后不再开始新样本
  pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
    self.handle_interrupt = enabled;
    self
  }

  pub fn stop_flag(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }

  fn install_interrupt_handler(&self) -> Result<(), ctrlc::Error> {
    let stop = self.stop.clone();
    ctrlc::set_handler(move || {
      info!("收到中断信号，等待在途样本完成...");
      stop.store(true, Ordering::SeqCst);
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
  }
}

impl<
  SE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = WoundImage> + Send,
  S: Segmenter<Error = SE> + Sync,
  O: Render<WoundImage, Evaluation, Error = RE> + Sync,
> Task<I, S, O> for BatchTask
{
  type Output = BatchSummary;
  type Error = anyhow::Error;

  fn run_task(self, input: I, segmenter: S, output: O) -> Result<Self::Output, Self::Error> {
    if !output.per_sample_target() {
      anyhow::bail!("批量任务的每个样本需要独立的输出路径，例如 image:///out/{{name}}.png");
    }
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.workers.unwrap_or(0))
      .build()?;
    info!("开始批量任务，工作线程 {}", pool.current_num_threads());

    if self.handle_interrupt {
      self.install_interrupt_handler()?;
    }

    let failed = AtomicUsize::new(0);
    let now = Instant::now();
    let mut scores: Vec<(String, f64)> = pool.install(|| {
      input
        .par_bridge()
        .filter_map(|sample| {
          if self.stop.load(Ordering::SeqCst) {
            return None;
          }
          let result = evaluate_sample(&self.scorer, &segmenter, &sample).and_then(|evaluation| {
            output.render_result(&sample, &evaluation)?;
            Ok(evaluation.assessment.score)
          });
          match result {
            Ok(score) => {
              info!("{}: PWAT {:.4}", sample.name, score);
              Some((sample.name, score))
            }
            Err(e) => {
              error!("样本 {} 评分失败: {:#}", sample.name, e);
              failed.fetch_add(1, Ordering::Relaxed);
              None
            }
          }
        })
        .collect()
    });
    scores.sort_by(|a, b| a.0.cmp(&b.0));

    let summary = BatchSummary {
      scores,
      failed: failed.into_inner(),
      interrupted: self.stop.load(Ordering::SeqCst),
    };
    if summary.interrupted {
      warn!("任务被中断");
    }
    info!(
      "批量任务完成: 成功 {}，失败 {}，耗时 {:.2?}",
      summary.processed(),
      summary.failed,
      now.elapsed()
    );
    Ok(summary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    mask::{MaskError, SemanticMask},
    scoring::ScoringTables,
  };
  use image::{GrayImage, Luma, Rgb, RgbImage};
  use std::sync::Mutex;

  struct CenterSquare;

  impl Segmenter for CenterSquare {
    type Error = MaskError;

    fn segment(&self, input: &WoundImage) -> Result<SemanticMask, Self::Error> {
      if input.name.starts_with("bad") {
        return Err(MaskError::ChannelShape(input.name.clone()));
      }
      let (w, h) = input.dimensions();
      let wound = GrayImage::from_fn(w, h, |x, y| {
        if x >= w / 3 && x < 2 * w / 3 && y >= h / 3 && y < 2 * h / 3 {
          Luma([255])
        } else {
          Luma([0])
        }
      });
      Ok(SemanticMask::from_wound(wound))
    }
  }

  #[derive(Default)]
  struct Recorder(Mutex<Vec<String>>);

  impl Render<WoundImage, Evaluation> for &Recorder {
    type Error = std::io::Error;

    fn render_result(&self, sample: &WoundImage, _: &Evaluation) -> Result<(), Self::Error> {
      self.0.lock().unwrap().push(sample.name.clone());
      Ok(())
    }
  }

  struct SharedTarget;

  impl Render<WoundImage, Evaluation> for SharedTarget {
    type Error = std::io::Error;

    fn render_result(&self, _: &WoundImage, _: &Evaluation) -> Result<(), Self::Error> {
      Ok(())
    }

    fn per_sample_target(&self) -> bool {
      false
    }
  }

  fn samples(names: &[&str]) -> Vec<WoundImage> {
    names
      .iter()
      .enumerate()
      .map(|(i, name)| {
        let image = RgbImage::from_pixel(30, 30, Rgb([100 + i as u8 * 20, 60, 50]));
        WoundImage::new(*name, format!("/photos/{name}.png"), image)
      })
      .collect()
  }

  fn scorer() -> PwatScorer {
    PwatScorer::builder(ScoringTables::identity()).build().unwrap()
  }

  #[test]
  fn one_shot_scores_first_sample() {
    let recorder = Recorder::default();
    let evaluation = OneShotTask::new(scorer())
      .run_task(samples(&["a", "b"]).into_iter(), CenterSquare, &recorder)
      .unwrap();
    assert_eq!(*recorder.0.lock().unwrap(), ["a"]);
    assert_eq!(evaluation.assessment.wound_pixels, 100);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let result = OneShotTask::new(scorer()).run_task(
      Vec::<WoundImage>::new().into_iter(),
      CenterSquare,
      None::<&Recorder>,
    );
    assert!(result.is_err());
  }

  #[test]
  fn batch_skips_failures_and_sorts() {
    let recorder = Recorder::default();
    let summary = BatchTask::new(scorer())
      .with_workers(Some(2))
      .run_task(
        samples(&["c", "bad1", "a", "b"]).into_iter(),
        CenterSquare,
        &recorder,
      )
      .unwrap();
    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.failed, 1);
    assert!(!summary.interrupted);
    let names: Vec<&str> = summary.scores.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(recorder.0.lock().unwrap().len(), 3);

    // 与单张评估一致
    let single = OneShotTask::new(scorer())
      .run_task(samples(&["c"]).into_iter(), CenterSquare, None::<&Recorder>)
      .unwrap();
    assert_eq!(summary.scores[2].1, single.assessment.score);
  }

  #[test]
  fn stop_flag_prevents_new_samples() {
    let task = BatchTask::new(scorer()).with_workers(Some(1));
    task.stop_flag().store(true, Ordering::SeqCst);
    let summary = task
      .run_task(samples(&["a", "b"]).into_iter(), CenterSquare, None::<&Recorder>)
      .unwrap();
    assert_eq!(summary.processed(), 0);
    assert!(summary.interrupted);
    assert_eq!(summary.mean_score(), None);
  }

  #[test]
  fn batch_rejects_shared_output_target() {
    let result = BatchTask::new(scorer())
      .with_workers(Some(1))
      .run_task(samples(&["a", "b"]).into_iter(), CenterSquare, SharedTarget);
    assert!(result.is_err());

    // 单张任务可以写固定路径
    assert!(
      OneShotTask::new(scorer())
        .run_task(samples(&["a"]).into_iter(), CenterSquare, SharedTarget)
        .is_ok()
    );
  }
}
