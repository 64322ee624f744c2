// 该文件是 Shanan （山南西风） 项目的一部分。
// src/record.rs - 检测记录数据模型
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

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 检测器直接给出的单个检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
  pub class_name: String,
  pub confidence: f64,
  pub bbox: [f64; 4], // [x_min, y_min, x_max, y_max]
}

/// 单个检测目标
///
/// `count` 是冗余字段：同一图像中同类目标的数量，会写到该类的每个目标上。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_name: String,
  pub confidence: f64,
  pub bbox: [f64; 4], // [x_min, y_min, x_max, y_max]，像素坐标
  pub count: u32,
}

/// 单张图像的检测元数据，字段名即持久化格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
  pub image_path: String,
  pub detections: Vec<Detection>,
  pub total_detections: usize,
  pub unique_classes: Vec<String>,
  pub unique_class_count: Vec<u32>,
}

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
  #[error("total_detections 为 {declared}，实际检测数量为 {actual}")]
  TotalMismatch { declared: usize, actual: usize },
  #[error("unique_classes 与 unique_class_count 长度不一致: {classes} != {counts}")]
  UniqueLengthMismatch { classes: usize, counts: usize },
  #[error("类别 `{0}` 在 unique_classes 中重复出现")]
  DuplicateClass(String),
  #[error("类别 `{class}` 记录数量为 {declared}，实际数量为 {actual}")]
  ClassCountMismatch {
    class: String,
    declared: u32,
    actual: u32,
  },
  #[error("类别 `{0}` 出现在检测结果中，但没有列入 unique_classes")]
  MissingClass(String),
  #[error("第 {index} 个检测 ({class}) 的边框无效: {bbox:?}")]
  InvalidBbox {
    index: usize,
    class: String,
    bbox: [f64; 4],
  },
  #[error("第 {index} 个检测 ({class}) 的置信度超出 [0, 1]: {confidence}")]
  InvalidConfidence {
    index: usize,
    class: String,
    confidence: f64,
  },
}

impl ImageRecord {
  /// 由检测器输出构建记录，按首次出现顺序统计类别
  pub fn from_detections(image_path: impl Into<String>, raw: Vec<RawDetection>) -> Self {
    let mut unique_classes: Vec<String> = Vec::new();
    let mut unique_class_count: Vec<u32> = Vec::new();

    for det in &raw {
      match unique_classes.iter().position(|c| *c == det.class_name) {
        Some(i) => unique_class_count[i] += 1,
        None => {
          unique_classes.push(det.class_name.clone());
          unique_class_count.push(1);
        }
      }
    }

    let detections: Vec<Detection> = raw
      .into_iter()
      .map(|det| {
        let count = unique_classes
          .iter()
          .position(|c| *c == det.class_name)
          .map(|i| unique_class_count[i])
          .unwrap_or(1);
        Detection {
          class_name: det.class_name,
          confidence: det.confidence,
          bbox: det.bbox,
          count,
        }
      })
      .collect();

    ImageRecord {
      image_path: image_path.into(),
      total_detections: detections.len(),
      detections,
      unique_classes,
      unique_class_count,
    }
  }

  /// 从 `detections` 重新计数，不读取冗余字段
  pub fn class_count(&self, class_name: &str) -> u32 {
    self
      .detections
      .iter()
      .filter(|det| det.class_name == class_name)
      .count() as u32
  }

  /// `unique_classes` 与 `unique_class_count` 按下标配对
  pub fn class_counts(&self) -> impl Iterator<Item = (&str, u32)> {
    self
      .unique_classes
      .iter()
      .map(String::as_str)
      .zip(self.unique_class_count.iter().copied())
  }

  pub fn check_consistency(&self) -> Result<(), RecordError> {
    if self.total_detections != self.detections.len() {
      return Err(RecordError::TotalMismatch {
        declared: self.total_detections,
        actual: self.detections.len(),
      });
    }

    if self.unique_classes.len() != self.unique_class_count.len() {
      return Err(RecordError::UniqueLengthMismatch {
        classes: self.unique_classes.len(),
        counts: self.unique_class_count.len(),
      });
    }

    for (i, class) in self.unique_classes.iter().enumerate() {
      if self.unique_classes[..i].contains(class) {
        return Err(RecordError::DuplicateClass(class.clone()));
      }
    }

    for (class, declared) in self.class_counts() {
      let actual = self.class_count(class);
      if actual != declared {
        return Err(RecordError::ClassCountMismatch {
          class: class.to_string(),
          declared,
          actual,
        });
      }
    }

    for (index, det) in self.detections.iter().enumerate() {
      let Some(pos) = self.unique_classes.iter().position(|c| *c == det.class_name) else {
        return Err(RecordError::MissingClass(det.class_name.clone()));
      };
      if det.count != self.unique_class_count[pos] {
        return Err(RecordError::ClassCountMismatch {
          class: det.class_name.clone(),
          declared: det.count,
          actual: self.unique_class_count[pos],
        });
      }

      let [x_min, y_min, x_max, y_max] = det.bbox;
      if !det.bbox.iter().all(|v| v.is_finite()) || !(x_min <= x_max && y_min <= y_max) {
        return Err(RecordError::InvalidBbox {
          index,
          class: det.class_name.clone(),
          bbox: det.bbox,
        });
      }

      if !(0.0..=1.0).contains(&det.confidence) {
        return Err(RecordError::InvalidConfidence {
          index,
          class: det.class_name.clone(),
          confidence: det.confidence,
        });
      }
    }

    Ok(())
  }
}

/// 一次处理或加载得到的全部记录，序列化为 JSON 数组
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataCollection {
  records: Vec<ImageRecord>,
}

impl MetadataCollection {
  pub fn new(records: Vec<ImageRecord>) -> Self {
    Self { records }
  }

  pub fn records(&self) -> &[ImageRecord] {
    &self.records
  }

  pub fn into_records(self) -> Vec<ImageRecord> {
    self.records
  }
}

impl Deref for MetadataCollection {
  type Target = [ImageRecord];

  fn deref(&self) -> &Self::Target {
    &self.records
  }
}

impl From<Vec<ImageRecord>> for MetadataCollection {
  fn from(records: Vec<ImageRecord>) -> Self {
    Self { records }
  }
}

impl FromIterator<ImageRecord> for MetadataCollection {
  fn from_iter<I: IntoIterator<Item = ImageRecord>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}

impl IntoIterator for MetadataCollection {
  type Item = ImageRecord;
  type IntoIter = std::vec::IntoIter<ImageRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.into_iter()
  }
}

impl<'a> IntoIterator for &'a MetadataCollection {
  type Item = &'a ImageRecord;
  type IntoIter = std::slice::Iter<'a, ImageRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  pub(crate) fn raw(class_name: &str, confidence: f64) -> RawDetection {
    RawDetection {
      class_name: class_name.to_string(),
      confidence,
      bbox: [10.0, 20.0, 110.0, 220.0],
    }
  }

  /// 按 (类别, 数量) 构建记录
  pub(crate) fn record_with(path: &str, classes: &[(&str, usize)]) -> ImageRecord {
    let detections = classes
      .iter()
      .flat_map(|(class, n)| std::iter::repeat_n(raw(class, 0.9), *n))
      .collect();
    ImageRecord::from_detections(path, detections)
  }

  #[test]
  fn derived_fields_follow_first_seen_order() {
    let record = ImageRecord::from_detections(
      "a.jpg",
      vec![
        raw("car", 0.8),
        raw("person", 0.7),
        raw("car", 0.6),
        raw("dog", 0.5),
        raw("person", 0.4),
      ],
    );

    assert_eq!(record.total_detections, 5);
    assert_eq!(record.unique_classes, vec!["car", "person", "dog"]);
    assert_eq!(record.unique_class_count, vec![2, 2, 1]);
    let counts: Vec<u32> = record.detections.iter().map(|d| d.count).collect();
    assert_eq!(counts, vec![2, 2, 2, 1, 2]);
    assert!(record.check_consistency().is_ok());
  }

  #[test]
  fn empty_detections_give_empty_record() {
    let record = ImageRecord::from_detections("empty.png", Vec::new());
    assert_eq!(record.total_detections, 0);
    assert!(record.unique_classes.is_empty());
    assert!(record.unique_class_count.is_empty());
    assert!(record.check_consistency().is_ok());
  }

  #[test]
  fn class_count_is_recomputed_from_detections() {
    let mut record = record_with("a.jpg", &[("person", 2), ("car", 1)]);
    assert_eq!(record.class_count("person"), 2);
    assert_eq!(record.class_count("bus"), 0);

    record.detections.retain(|d| d.class_name != "person");
    assert_eq!(record.class_count("person"), 0);
  }

  #[test]
  fn consistency_rejects_stale_counts() {
    let mut record = record_with("a.jpg", &[("person", 2)]);
    record.unique_class_count[0] = 3;
    assert_eq!(
      record.check_consistency(),
      Err(RecordError::ClassCountMismatch {
        class: "person".to_string(),
        declared: 3,
        actual: 2,
      })
    );

    let mut record = record_with("a.jpg", &[("person", 2)]);
    record.detections[1].count = 1;
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::ClassCountMismatch { .. })
    ));

    let mut record = record_with("a.jpg", &[("person", 2)]);
    record.total_detections = 1;
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::TotalMismatch { .. })
    ));
  }

  #[test]
  fn consistency_rejects_inverted_bbox() {
    let mut record = record_with("a.jpg", &[("car", 1)]);
    record.detections[0].bbox = [50.0, 0.0, 10.0, 10.0];
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::InvalidBbox { index: 0, .. })
    ));
  }

  #[test]
  fn consistency_rejects_non_finite_values() {
    let mut record = record_with("a.jpg", &[("car", 2)]);
    record.detections[1].bbox = [10.0, 20.0, f64::INFINITY, 220.0];
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::InvalidBbox { index: 1, .. })
    ));

    record.detections[1].bbox = [f64::NAN, 20.0, 110.0, 220.0];
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::InvalidBbox { index: 1, .. })
    ));

    record.detections[1].bbox = [10.0, 20.0, 110.0, 220.0];
    record.detections[1].confidence = f64::NAN;
    assert!(matches!(
      record.check_consistency(),
      Err(RecordError::InvalidConfidence { index: 1, .. })
    ));
  }

  #[test]
  fn json_field_names_are_stable() {
    let record = record_with("/data/a.jpg", &[("person", 1)]);
    let value = serde_json::to_value(&record).unwrap();
    let object = value.as_object().unwrap();
    for key in [
      "image_path",
      "detections",
      "total_detections",
      "unique_classes",
      "unique_class_count",
    ] {
      assert!(object.contains_key(key), "missing {key}");
    }
    let det = value["detections"][0].as_object().unwrap();
    assert_eq!(det.len(), 4);
    for key in ["class_name", "confidence", "bbox", "count"] {
      assert!(det.contains_key(key), "missing {key}");
    }
  }

  #[test]
  fn collection_round_trips_through_json() {
    let collection = MetadataCollection::new(vec![
      ImageRecord::from_detections(
        "/data/r1.jpg",
        vec![RawDetection {
          class_name: "person".to_string(),
          confidence: 0.873_456_123_987_1,
          bbox: [1.5, 2.25, 300.125, 400.0625],
        }],
      ),
      record_with("/data/r2.jpg", &[]),
    ]);

    let json = serde_json::to_string(&collection).unwrap();
    assert!(json.starts_with('['));
    let back: MetadataCollection = serde_json::from_str(&json).unwrap();
    assert_eq!(back, collection);
  }

  #[test]
  fn reads_metadata_written_by_other_tools() {
    let json = r#"[{"image_path": "img/1.jpg",
      "detections": [{"class_name": "cat", "confidence": 0.5, "bbox": [0, 0, 4, 4], "count": 1}],
      "total_detections": 1, "unique_classes": ["cat"], "unique_class_count": [1]}]"#;
    let collection: MetadataCollection = serde_json::from_str(json).unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection[0].detections[0].bbox, [0.0, 0.0, 4.0, 4.0]);
    assert!(collection[0].check_consistency().is_ok());
  }
}
