// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detect.rs - 检测能力接口
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

use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::FromUrl;
use crate::record::RawDetection;

/// 给定一张图像，产生其中的检测结果
pub trait Detector {
  type Error;

  fn detect(&self, image: &Path) -> Result<Vec<RawDetection>, Self::Error>;
}

#[cfg(feature = "record_file")]
mod record_file;
#[cfg(feature = "record_file")]
pub use self::record_file::{RecordFileDetector, RecordFileError};

#[derive(Error, Debug)]
pub enum DetectorError {
  #[cfg(feature = "record_file")]
  #[error("检测记录文件错误: {0}")]
  RecordFileError(#[from] RecordFileError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum DetectorWrapper {
  #[cfg(feature = "record_file")]
  RecordFile(RecordFileDetector),
}

impl FromUrl for DetectorWrapper {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "record_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RecordFileDetector::SCHEME {
        let detector = RecordFileDetector::from_url(url)?;
        return Ok(DetectorWrapper::RecordFile(detector));
      }
    }
    Err(DetectorError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl DetectorWrapper {
  /// 丢弃置信度低于阈值的检测
  pub fn with_confidence(self, confidence: f64) -> Self {
    match self {
      #[cfg(feature = "record_file")]
      DetectorWrapper::RecordFile(detector) => {
        DetectorWrapper::RecordFile(detector.with_confidence(confidence))
      }
    }
  }
}

impl Detector for DetectorWrapper {
  type Error = DetectorError;

  fn detect(&self, image: &Path) -> Result<Vec<RawDetection>, Self::Error> {
    match self {
      #[cfg(feature = "record_file")]
      DetectorWrapper::RecordFile(detector) => detector.detect(image).map_err(DetectorError::from),
    }
  }
}
