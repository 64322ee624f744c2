// 该文件是 Shanan （山南西风） 项目的一部分。
// src/annotate.rs - 检测框标注决策
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

use crate::record::{Detection, ImageRecord};

pub const NO_MATCH_SUMMARY: &str = "No matching classes";

/// 单个检测框如何绘制
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderDecision {
  /// 选中类别，突出显示
  Emphasize { label: String },
  /// 未选中类别，以弱化样式显示
  Deemphasize { label: String },
  /// 不绘制
  Omit,
}

impl RenderDecision {
  pub fn label(&self) -> Option<&str> {
    match self {
      RenderDecision::Emphasize { label } | RenderDecision::Deemphasize { label } => Some(label),
      RenderDecision::Omit => None,
    }
  }
}

pub fn detection_label(detection: &Detection) -> String {
  format!("{} {:.2}", detection.class_name, detection.confidence)
}

/// `highlight_mode` 为真时只画选中类别，否则其余类别弱化显示
pub fn decide(detection: &Detection, selected: &[String], highlight_mode: bool) -> RenderDecision {
  if selected.iter().any(|c| *c == detection.class_name) {
    RenderDecision::Emphasize {
      label: detection_label(detection),
    }
  } else if !highlight_mode {
    RenderDecision::Deemphasize {
      label: detection_label(detection),
    }
  } else {
    RenderDecision::Omit
  }
}

/// 图像卡片下方的说明，例如 `person: 2, car: 1`
pub fn match_summary(record: &ImageRecord, selected: &[String]) -> String {
  let items: Vec<String> = record
    .class_counts()
    .filter(|(class, _)| selected.iter().any(|c| c == class))
    .map(|(class, count)| format!("{}: {}", class, count))
    .collect();

  if items.is_empty() {
    NO_MATCH_SUMMARY.to_string()
  } else {
    items.join(", ")
  }
}
