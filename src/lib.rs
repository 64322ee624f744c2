// 该文件是 Shanan （山南西风） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod annotate;
pub mod config;
pub mod detect;
pub mod facet;
pub mod output;
pub mod query;
pub mod record;
pub mod scan;
pub mod session;
pub mod store;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::detect::Detector;
use crate::scan::{ScanReport, scan_directory};
use crate::store::save_metadata;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

#[derive(Error, Debug)]
pub enum SeekError {
  #[error("记录错误: {0}")]
  RecordError(#[from] record::RecordError),
  #[error("查询错误: {0}")]
  QueryError(#[from] query::QueryError),
  #[error("检测错误: {0}")]
  DetectorError(#[from] detect::DetectorError),
  #[error("扫描错误: {0}")]
  ScanError(#[from] scan::ScanError),
  #[error("存储错误: {0}")]
  StoreError(#[from] store::StoreError),
  #[error("配置错误: {0}")]
  ConfigError(#[from] config::ConfigError),
  #[cfg(feature = "render")]
  #[error("字体错误: {0}")]
  FontError(#[from] output::FontError),
  #[cfg(feature = "render")]
  #[error("图像输出错误: {0}")]
  GalleryOutputError(#[from] output::GalleryOutputError),
}

/// 扫描图像目录并保存元数据，返回扫描结果与元数据文件路径
pub fn process_directory<D>(
  detector: &D,
  image_dir: &Path,
  config: &Config,
) -> Result<(ScanReport, PathBuf), SeekError>
where
  D: Detector,
  D::Error: std::fmt::Display,
{
  info!("处理图像目录: {}", image_dir.display());
  let report = scan_directory(detector, image_dir, &config.image_extensions)?;
  let output = save_metadata(&report.collection, image_dir, &config.processed_dir)?;
  Ok((report, output))
}
