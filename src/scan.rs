// 该文件是 Shanan （山南西风） 项目的一部分。
// src/scan.rs - 扫描图像目录并生成元数据
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

use thiserror::Error;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::detect::Detector;
use crate::record::{ImageRecord, MetadataCollection};

#[derive(Error, Debug)]
pub enum ScanError {
  #[error("图像目录不存在: {0}")]
  DirectoryNotFound(PathBuf),
  #[error("遍历目录错误: {0}")]
  WalkError(#[from] walkdir::Error),
}

/// 单张图像处理失败
#[derive(Debug, Clone)]
pub struct ScanFailure {
  pub image_path: PathBuf,
  pub message: String,
}

#[derive(Debug, Default)]
pub struct ScanReport {
  pub collection: MetadataCollection,
  pub failures: Vec<ScanFailure>,
}

/// 目录下（不递归）文件名以任一扩展名结尾的文件，先按扩展名顺序，再按文件名
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, ScanError> {
  if !dir.is_dir() {
    return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(dir)
    .min_depth(1)
    .max_depth(1)
    .sort_by_file_name()
  {
    let entry = entry?;
    if entry.file_type().is_file() {
      files.push(entry.into_path());
    }
  }

  let mut seen = HashSet::new();
  let mut images = Vec::new();
  for ext in extensions {
    for path in &files {
      let matched = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(ext.as_str()));
      if matched && seen.insert(path.clone()) {
        images.push(path.clone());
      }
    }
  }

  Ok(images)
}

/// 逐张检测并生成记录，单张失败只记录不中断
pub fn scan_directory<D>(
  detector: &D,
  dir: &Path,
  extensions: &[String],
) -> Result<ScanReport, ScanError>
where
  D: Detector,
  D::Error: std::fmt::Display,
{
  info!("查找扩展名为 {:?} 的图像文件", extensions);
  let images = list_images(dir, extensions)?;
  if images.is_empty() {
    warn!("目录 {} 中没有匹配的图像", dir.display());
  }

  let mut records = Vec::with_capacity(images.len());
  let mut failures = Vec::new();
  for image in images {
    match detector.detect(&image) {
      Ok(detections) => {
        records.push(ImageRecord::from_detections(
          image.to_string_lossy(),
          detections,
        ));
      }
      Err(e) => {
        error!("处理图像 {} 失败: {}", image.display(), e);
        failures.push(ScanFailure {
          image_path: image,
          message: e.to_string(),
        });
      }
    }
  }

  info!(
    "扫描完成: {} 张成功, {} 张失败",
    records.len(),
    failures.len()
  );

  Ok(ScanReport {
    collection: MetadataCollection::new(records),
    failures,
  })
}
