// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detect/record_file.rs - 读取目录记录输出的检测结果
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detect::Detector, record::RawDetection};

// 每行: name, score, x_min, y_min, x_max, y_max
const RECORD_FIELDS: usize = 6;
const RECORD_EXTENSION: &str = "txt";

#[derive(Error, Debug)]
pub enum RecordFileError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("无效的坐标模式: {0}")]
  InvalidCoords(String),
  #[error("无效的图像路径: {0}")]
  InvalidImagePath(PathBuf),
  #[error("缺少检测记录文件: {0}")]
  MissingRecord(PathBuf),
  #[error("检测记录格式错误 {path}:{line}: {reason}")]
  Malformed {
    path: PathBuf,
    line: usize,
    reason: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 读取 Shanan 目录记录输出写在图像旁边的 `.txt` 检测记录
///
/// 记录中的坐标默认是归一化坐标，按图像尺寸换算为像素坐标。
#[derive(Debug, Clone)]
pub struct RecordFileDetector {
  record_dir: Option<PathBuf>,
  normalized: bool,
  confidence: f64,
}

impl Default for RecordFileDetector {
  fn default() -> Self {
    Self {
      record_dir: None,
      normalized: true,
      confidence: 0.0,
    }
  }
}

impl FromUrlWithScheme for RecordFileDetector {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordFileDetector {
  type Error = RecordFileError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RecordFileError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let record_dir = match url.path() {
      "" | "/" => None,
      path => Some(PathBuf::from(path)),
    };

    let mut normalized = true;
    for (k, v) in url.query_pairs() {
      if k == "coords" {
        normalized = match v.as_ref() {
          "normalized" => true,
          "pixel" => false,
          other => return Err(RecordFileError::InvalidCoords(other.to_string())),
        };
      }
    }

    Ok(RecordFileDetector {
      record_dir,
      normalized,
      ..Default::default()
    })
  }
}

impl RecordFileDetector {
  pub fn with_confidence(mut self, confidence: f64) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn with_record_dir(mut self, record_dir: impl Into<PathBuf>) -> Self {
    self.record_dir = Some(record_dir.into());
    self
  }

  pub fn with_normalized(mut self, normalized: bool) -> Self {
    self.normalized = normalized;
    self
  }

  fn record_path(&self, image: &Path) -> Result<PathBuf, RecordFileError> {
    match &self.record_dir {
      Some(dir) => {
        let name = image
          .file_name()
          .ok_or_else(|| RecordFileError::InvalidImagePath(image.to_path_buf()))?;
        Ok(dir.join(name).with_extension(RECORD_EXTENSION))
      }
      None => Ok(image.with_extension(RECORD_EXTENSION)),
    }
  }

  fn parse_line(
    &self,
    path: &Path,
    line_no: usize,
    line: &str,
    (w, h): (f64, f64),
  ) -> Result<RawDetection, RecordFileError> {
    let malformed = |reason: String| RecordFileError::Malformed {
      path: path.to_path_buf(),
      line: line_no,
      reason,
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != RECORD_FIELDS {
      return Err(malformed(format!(
        "期望 {} 个字段, 实际 {} 个",
        RECORD_FIELDS,
        fields.len()
      )));
    }

    let class_name = fields[0];
    if class_name.is_empty() {
      return Err(malformed("类别名称为空".to_string()));
    }

    let mut numbers = [0f64; RECORD_FIELDS - 1];
    for (slot, field) in numbers.iter_mut().zip(&fields[1..]) {
      *slot = field
        .parse::<f64>()
        .map_err(|e| malformed(format!("无法解析数值 `{}`: {}", field, e)))?;
      if !slot.is_finite() {
        return Err(malformed(format!("数值不是有限数: `{}`", field)));
      }
    }

    let [confidence, x_min, y_min, x_max, y_max] = numbers;
    if !(0.0..=1.0).contains(&confidence) {
      return Err(malformed(format!("置信度超出 [0, 1]: {}", confidence)));
    }
    if x_min > x_max || y_min > y_max {
      return Err(malformed(format!(
        "边框坐标无效: [{}, {}, {}, {}]",
        x_min, y_min, x_max, y_max
      )));
    }

    let bbox = if self.normalized {
      [x_min * w, y_min * h, x_max * w, y_max * h]
    } else {
      [x_min, y_min, x_max, y_max]
    };

    Ok(RawDetection {
      class_name: class_name.to_string(),
      confidence,
      bbox,
    })
  }
}

impl Detector for RecordFileDetector {
  type Error = RecordFileError;

  fn detect(&self, image: &Path) -> Result<Vec<RawDetection>, Self::Error> {
    let (width, height) = image::image_dimensions(image)?;
    let path = self.record_path(image)?;

    let content = match std::fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(RecordFileError::MissingRecord(path));
      }
      Err(e) => return Err(e.into()),
    };

    let mut detections = Vec::new();
    for (i, line) in content.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      let det = self.parse_line(&path, i + 1, line, (width as f64, height as f64))?;
      if det.confidence < self.confidence {
        debug!(
          "丢弃低置信度检测: {} {:.2} < {:.2}",
          det.class_name, det.confidence, self.confidence
        );
        continue;
      }
      detections.push(det);
    }

    debug!(
      "{}: 读取 {} 个检测 ({}x{})",
      image.display(),
      detections.len(),
      width,
      height
    );
    Ok(detections)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageBuffer, Rgb};

  fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([0u8, 128u8, 255u8]));
    img.save(&path).unwrap();
    path
  }

  #[test]
  fn scales_normalized_boxes_to_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "street.png", 200, 100);
    std::fs::write(
      dir.path().join("street.txt"),
      "person, 0.9000, 0.1000, 0.2000, 0.5000, 1.0000\n\ncar, 0.4000, 0.0, 0.0, 0.25, 0.5\n",
    )
    .unwrap();

    let detections = RecordFileDetector::default().detect(&image).unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_name, "person");
    assert_eq!(detections[0].bbox, [20.0, 20.0, 100.0, 100.0]);
    assert_eq!(detections[1].bbox, [0.0, 0.0, 50.0, 50.0]);
  }

  #[test]
  fn pixel_coords_and_confidence_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let records = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "yard.png", 64, 64);
    std::fs::write(
      records.path().join("yard.txt"),
      "dog, 0.8, 1, 2, 30, 40\ncat, 0.2, 5, 5, 6, 6",
    )
    .unwrap();

    let url = Url::parse(&format!(
      "record://{}?coords=pixel",
      records.path().display()
    ))
    .unwrap();
    let detector = RecordFileDetector::from_url(&url)
      .unwrap()
      .with_confidence(0.5);
    let detections = detector.detect(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_name, "dog");
    assert_eq!(detections[0].bbox, [1.0, 2.0, 30.0, 40.0]);
  }

  #[test]
  fn missing_record_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "lonely.png", 8, 8);
    let err = RecordFileDetector::default().detect(&image).unwrap_err();
    assert!(matches!(err, RecordFileError::MissingRecord(_)));
  }

  #[test]
  fn malformed_line_reports_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "bad.png", 8, 8);
    std::fs::write(dir.path().join("bad.txt"), "dog, 0.8, 0, 0, 1, 1\ndog, 0.8, 0, 0\n").unwrap();
    let err = RecordFileDetector::default().detect(&image).unwrap_err();
    assert!(matches!(err, RecordFileError::Malformed { line: 2, .. }));
  }

  #[test]
  fn non_finite_numbers_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "odd.png", 100, 80);
    let lines = [
      "cat, 0.9, nan, 0.1, 0.5, 0.5",
      "dog, 0.8, 0.1, 0.1, inf, 0.5",
      "dog, 0.8, -inf, 0.1, 0.5, 0.5",
      "bird, NaN, 0.1, 0.1, 0.5, 0.5",
    ];
    for line in lines {
      std::fs::write(dir.path().join("odd.txt"), format!("dog, 0.8, 0, 0, 1, 1\n{}\n", line))
        .unwrap();
      let err = RecordFileDetector::default().detect(&image).unwrap_err();
      assert!(
        matches!(err, RecordFileError::Malformed { line: 2, .. }),
        "{}: {:?}",
        line,
        err
      );
    }
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      RecordFileDetector::from_url(&url),
      Err(RecordFileError::SchemeMismatch { .. })
    ));
  }
}
