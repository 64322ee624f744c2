// 该文件是 Shanan （山南西风） 项目的一部分。
// src/store.rs - 元数据的保存与加载
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

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tracing::info;

use crate::record::{ImageRecord, MetadataCollection, RecordError};

pub const METADATA_FILE_NAME: &str = "metadata.json";
const EXPORT_INDENT: &[u8] = b"    ";

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("路径不存在: {0}")]
  NotFound(PathBuf),
  #[error("元数据格式错误 {path}: {source}")]
  Malformed {
    path: PathBuf,
    source: serde_json::Error,
  },
  #[error("元数据 {path} 第 {index} 条记录不一致: {source}")]
  Inconsistent {
    path: PathBuf,
    index: usize,
    source: RecordError,
  },
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 元数据保存位置: `<processed_root>/<图像目录名>/metadata.json`
pub fn metadata_path(image_dir: &Path, processed_root: &Path) -> Result<PathBuf, StoreError> {
  if !image_dir.exists() {
    return Err(StoreError::NotFound(image_dir.to_path_buf()));
  }
  let name = image_dir
    .canonicalize()?
    .file_name()
    .map(|n| n.to_os_string())
    .unwrap_or_default();
  Ok(processed_root.join(name).join(METADATA_FILE_NAME))
}

pub fn save_metadata(
  collection: &MetadataCollection,
  image_dir: &Path,
  processed_root: &Path,
) -> Result<PathBuf, StoreError> {
  let output = metadata_path(image_dir, processed_root)?;
  if let Some(parent) = output.parent() {
    std::fs::create_dir_all(parent)?;
  }

  let mut writer = BufWriter::new(File::create(&output)?);
  serde_json::to_writer(&mut writer, collection)?;
  writer.flush()?;

  info!("{} 条元数据已保存到 {}", collection.len(), output.display());
  Ok(output)
}

/// 加载并校验元数据，文件不存在与内容错误分别报告
pub fn load_metadata(path: &Path) -> Result<MetadataCollection, StoreError> {
  let file = match File::open(path) {
    Ok(file) => file,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Err(StoreError::NotFound(path.to_path_buf()));
    }
    Err(e) => return Err(e.into()),
  };

  let collection: MetadataCollection = serde_json::from_reader(BufReader::new(file)).map_err(
    |source| {
      if source.is_io() {
        StoreError::IoError(source.into())
      } else {
        StoreError::Malformed {
          path: path.to_path_buf(),
          source,
        }
      }
    },
  )?;

  for (index, record) in collection.iter().enumerate() {
    record
      .check_consistency()
      .map_err(|source| StoreError::Inconsistent {
        path: path.to_path_buf(),
        index,
        source,
      })?;
  }

  info!("从 {} 加载了 {} 条元数据", path.display(), collection.len());
  Ok(collection)
}

/// 导出筛选结果，四空格缩进
pub fn export_metadata(records: &[ImageRecord], path: &Path) -> Result<(), StoreError> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  let mut writer = BufWriter::new(File::create(path)?);
  let mut ser = serde_json::Serializer::with_formatter(
    &mut writer,
    PrettyFormatter::with_indent(EXPORT_INDENT),
  );
  records.serialize(&mut ser)?;
  writer.flush()?;

  info!("导出 {} 条元数据到 {}", records.len(), path.display());
  Ok(())
}
