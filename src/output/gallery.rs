// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/gallery.rs - 将匹配的图像标注后保存到目录
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

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, draw::Annotator},
  query::SearchParameters,
  record::ImageRecord,
  session::DisplayOptions,
};

#[derive(Error, Debug)]
pub enum GalleryOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的图像路径: {0}")]
  InvalidImagePath(String),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 一次输出的统计
#[derive(Debug, Default)]
pub struct GalleryReport {
  pub written: Vec<PathBuf>,
  pub failed: usize,
}

pub struct GalleryOutput {
  directory: PathBuf,
  annotator: Annotator,
  selected: Vec<String>,
  show_boxes: bool,
  highlight_matches: bool,
}

impl FromUrlWithScheme for GalleryOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for GalleryOutput {
  type Error = GalleryOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(GalleryOutputError::SchemeMismatch(format!(
        "期望输出方式 '{}', 实际输出方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let display = DisplayOptions::default();
    Ok(GalleryOutput {
      directory: PathBuf::from(uri.path()),
      annotator: Annotator::default(),
      selected: Vec::new(),
      show_boxes: display.show_boxes,
      highlight_matches: display.highlight_matches,
    })
  }
}

impl GalleryOutput {
  pub fn with_annotator(mut self, annotator: Annotator) -> Self {
    self.annotator = annotator;
    self
  }

  pub fn with_selection(mut self, params: &SearchParameters) -> Self {
    self.selected = params.selected_classes.clone();
    self
  }

  pub fn with_display(mut self, display: &DisplayOptions) -> Self {
    self.show_boxes = display.show_boxes;
    self.highlight_matches = display.highlight_matches;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn output_path(&self, record: &ImageRecord) -> Result<PathBuf, GalleryOutputError> {
    let name = Path::new(&record.image_path)
      .file_name()
      .ok_or_else(|| GalleryOutputError::InvalidImagePath(record.image_path.clone()))?;
    Ok(self.directory.join(name))
  }

  /// 同名文件依次改为 `<stem>-1.<ext>`、`<stem>-2.<ext>` ...
  fn unique_output_path(
    &self,
    record: &ImageRecord,
    taken: &mut HashSet<PathBuf>,
  ) -> Result<PathBuf, GalleryOutputError> {
    let path = self.output_path(record)?;
    if taken.insert(path.clone()) {
      return Ok(path);
    }

    let stem = path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let mut n = 1;
    loop {
      let name = match &ext {
        Some(ext) => format!("{}-{}.{}", stem, n, ext),
        None => format!("{}-{}", stem, n),
      };
      let candidate = self.directory.join(name);
      if taken.insert(candidate.clone()) {
        warn!(
          "输出文件名冲突: {} 改写为 {}",
          record.image_path,
          candidate.display()
        );
        return Ok(candidate);
      }
      n += 1;
    }
  }

  fn open_image(record: &ImageRecord) -> Result<RgbImage, GalleryOutputError> {
    let image = ImageReader::open(&record.image_path)?.decode()?;
    Ok(image.into_rgb8())
  }

  fn save_annotated(
    &self,
    frame: &RgbImage,
    record: &ImageRecord,
    path: &Path,
  ) -> Result<(), GalleryOutputError> {
    std::fs::create_dir_all(&self.directory)?;

    let mut image = frame.clone();
    if self.show_boxes {
      self
        .annotator
        .annotate(&mut image, record, &self.selected, self.highlight_matches);
    }
    image.save(path)?;
    Ok(())
  }

  /// 逐张输出，单张失败只记录；不同目录下的同名图像不会互相覆盖
  pub fn render_records(&self, records: &[ImageRecord]) -> GalleryReport {
    let mut report = GalleryReport::default();
    let mut taken = HashSet::new();
    for record in records {
      let result = Self::open_image(record).and_then(|image| {
        let path = self.unique_output_path(record, &mut taken)?;
        self.save_annotated(&image, record, &path)?;
        Ok(path)
      });
      match result {
        Ok(path) => report.written.push(path),
        Err(e) => {
          error!("加载图像 {} 出错: {}", record.image_path, e);
          report.failed += 1;
        }
      }
    }
    info!(
      "输出 {} 张图像到 {}, {} 张失败",
      report.written.len(),
      self.directory.display(),
      report.failed
    );
    report
  }
}

impl Render<RgbImage, ImageRecord> for GalleryOutput {
  type Error = GalleryOutputError;

  fn render_result(&self, frame: &RgbImage, result: &ImageRecord) -> Result<(), Self::Error> {
    let path = self.output_path(result)?;
    self.save_annotated(frame, result, &path)
  }
}
