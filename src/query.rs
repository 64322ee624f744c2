// 该文件是 Shanan （山南西风） 项目的一部分。
// src/query.rs - 按类别数量筛选图像
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

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::record::ImageRecord;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
  #[error("未选择任何类别，无法筛选")]
  InvalidQuery,
  #[error("尚未加载元数据")]
  NoMetadata,
  #[error("无法解析搜索模式: {0}")]
  InvalidSearchMode(String),
  #[error("无法解析数量上限: {0}")]
  InvalidThreshold(String),
}

/// 多个类别条件的组合方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
  /// 任一类别满足 (OR)
  #[default]
  MatchAny,
  /// 全部类别满足 (AND)
  MatchAll,
}

impl FromStr for SearchMode {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "any" | "or" => Ok(SearchMode::MatchAny),
      "all" | "and" => Ok(SearchMode::MatchAll),
      _ => Err(QueryError::InvalidSearchMode(s.to_string())),
    }
  }
}

impl fmt::Display for SearchMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SearchMode::MatchAny => write!(f, "any"),
      SearchMode::MatchAll => write!(f, "all"),
    }
  }
}

/// 单个类别的数量上限（含）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Threshold {
  #[default]
  NoLimit,
  AtMost(u32),
}

impl Threshold {
  /// 类别必须出现；`AtMost(0)` 因此永远不满足
  pub fn admits(&self, class_count: u32) -> bool {
    match *self {
      Threshold::NoLimit => class_count > 0,
      Threshold::AtMost(ceiling) => class_count > 0 && class_count <= ceiling,
    }
  }
}

impl FromStr for Threshold {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("none") {
      return Ok(Threshold::NoLimit);
    }
    s.parse::<u32>()
      .map(Threshold::AtMost)
      .map_err(|_| QueryError::InvalidThreshold(s.to_string()))
  }
}

impl fmt::Display for Threshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Threshold::NoLimit => write!(f, "None"),
      Threshold::AtMost(ceiling) => write!(f, "{}", ceiling),
    }
  }
}

/// 一次搜索的参数，由用户在每次查询前修改
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParameters {
  pub search_mode: SearchMode,
  pub selected_classes: Vec<String>,
  pub threshold: BTreeMap<String, Threshold>,
}

impl SearchParameters {
  pub fn with_mode(mut self, search_mode: SearchMode) -> Self {
    self.search_mode = search_mode;
    self
  }

  /// 重复选择同一类别不会改变顺序
  pub fn select(&mut self, class_name: impl Into<String>) {
    let class_name = class_name.into();
    if !self.selected_classes.contains(&class_name) {
      self.selected_classes.push(class_name);
    }
  }

  pub fn deselect(&mut self, class_name: &str) {
    self.selected_classes.retain(|c| c != class_name);
    self.threshold.remove(class_name);
  }

  pub fn set_threshold(&mut self, class_name: impl Into<String>, threshold: Threshold) {
    self.threshold.insert(class_name.into(), threshold);
  }

  pub fn threshold_for(&self, class_name: &str) -> Threshold {
    self
      .threshold
      .get(class_name)
      .copied()
      .unwrap_or_default()
  }

  pub fn is_selected(&self, class_name: &str) -> bool {
    self.selected_classes.iter().any(|c| c == class_name)
  }
}

pub fn record_matches(record: &ImageRecord, params: &SearchParameters) -> bool {
  let mut class_matches = params
    .selected_classes
    .iter()
    .map(|class| params.threshold_for(class).admits(record.class_count(class)));

  match params.search_mode {
    SearchMode::MatchAny => class_matches.any(|m| m),
    SearchMode::MatchAll => class_matches.all(|m| m),
  }
}

/// 按参数筛选记录，结果保持原有顺序
pub fn filter(
  collection: &[ImageRecord],
  params: &SearchParameters,
) -> Result<Vec<ImageRecord>, QueryError> {
  if params.selected_classes.is_empty() {
    return Err(QueryError::InvalidQuery);
  }

  let result: Vec<ImageRecord> = collection
    .iter()
    .filter(|record| record_matches(record, params))
    .cloned()
    .collect();

  debug!(
    "筛选完成: 模式 {}, 类别 {:?}, {}/{} 张图像匹配",
    params.search_mode,
    params.selected_classes,
    result.len(),
    collection.len()
  );

  Ok(result)
}
