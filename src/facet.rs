// 该文件是 Shanan （山南西风） 项目的一部分。
// src/facet.rs - 类别与数量分面统计
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

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::query::Threshold;
use crate::record::ImageRecord;

/// 类别 -> 各图像中出现过的不同数量（升序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Facets {
  counts: BTreeMap<String, Vec<u32>>,
}

impl Facets {
  pub fn get(&self, class_name: &str) -> Option<&[u32]> {
    self.counts.get(class_name).map(Vec::as_slice)
  }

  pub fn contains(&self, class_name: &str) -> bool {
    self.counts.contains_key(class_name)
  }

  pub fn classes(&self) -> impl Iterator<Item = &str> {
    self.counts.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
    self
      .counts
      .iter()
      .map(|(class, counts)| (class.as_str(), counts.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// 可供选择的数量上限：不限，以及出现过的每个数量
  pub fn threshold_options(&self, class_name: &str) -> Option<Vec<Threshold>> {
    self.get(class_name).map(|counts| {
      std::iter::once(Threshold::NoLimit)
        .chain(counts.iter().copied().map(Threshold::AtMost))
        .collect()
    })
  }
}

pub fn aggregate(collection: &[ImageRecord]) -> Facets {
  let mut acc: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();

  for record in collection {
    for (class, count) in record.class_counts() {
      acc.entry(class).or_default().insert(count);
    }
  }

  Facets {
    counts: acc
      .into_iter()
      .map(|(class, counts)| (class.to_string(), counts.into_iter().collect()))
      .collect(),
  }
}
