// 该文件是 Shanan （山南西风） 项目的一部分。
// src/session.rs - 搜索会话状态
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

use tracing::info;

use crate::facet::{Facets, aggregate};
use crate::query::{QueryError, SearchParameters, Threshold, filter};
use crate::record::{ImageRecord, MetadataCollection};

pub const MIN_GRID_COLS: u8 = 2;
pub const MAX_GRID_COLS: u8 = 5;

/// 结果展示选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
  pub show_boxes: bool,
  grid_cols: u8,
  /// 只绘制选中类别的检测框
  pub highlight_matches: bool,
}

impl Default for DisplayOptions {
  fn default() -> Self {
    Self {
      show_boxes: true,
      grid_cols: 3,
      highlight_matches: true,
    }
  }
}

impl DisplayOptions {
  pub fn grid_cols(&self) -> u8 {
    self.grid_cols
  }

  pub fn set_grid_cols(&mut self, cols: u8) {
    self.grid_cols = cols.clamp(MIN_GRID_COLS, MAX_GRID_COLS);
  }
}

/// 一次交互会话：当前元数据、分面、搜索参数、结果与展示选项
#[derive(Debug, Default)]
pub struct Session {
  metadata: Option<MetadataCollection>,
  facets: Facets,
  search: SearchParameters,
  filtered: Vec<ImageRecord>,
  display: DisplayOptions,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  /// 处理或加载新的元数据后整体替换，旧的选择与结果一并清空
  pub fn replace_collection(&mut self, collection: MetadataCollection) {
    self.facets = aggregate(&collection);
    info!(
      "会话载入 {} 条记录, {} 个类别",
      collection.len(),
      self.facets.len()
    );
    self.metadata = Some(collection);
    self.search = SearchParameters::default().with_mode(self.search.search_mode);
    self.filtered.clear();
  }

  pub fn metadata(&self) -> Option<&MetadataCollection> {
    self.metadata.as_ref()
  }

  pub fn facets(&self) -> &Facets {
    &self.facets
  }

  pub fn search_params(&self) -> &SearchParameters {
    &self.search
  }

  pub fn search_params_mut(&mut self) -> &mut SearchParameters {
    &mut self.search
  }

  pub fn threshold_options(&self, class_name: &str) -> Option<Vec<Threshold>> {
    self.facets.threshold_options(class_name)
  }

  pub fn display(&self) -> &DisplayOptions {
    &self.display
  }

  pub fn display_mut(&mut self) -> &mut DisplayOptions {
    &mut self.display
  }

  pub fn filtered(&self) -> &[ImageRecord] {
    &self.filtered
  }

  /// 用当前参数搜索并保存结果
  pub fn search(&mut self) -> Result<&[ImageRecord], QueryError> {
    let metadata = self.metadata.as_ref().ok_or(QueryError::NoMetadata)?;
    self.filtered = filter(metadata, &self.search)?;
    info!(
      "搜索完成: {} 张图像匹配 {:?}",
      self.filtered.len(),
      self.search.selected_classes
    );
    Ok(&self.filtered)
  }
}
