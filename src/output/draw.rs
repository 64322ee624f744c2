// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 检测框与标签绘制
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::annotate::{RenderDecision, decide};
use crate::record::ImageRecord;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

/// 未配置字体时依次尝试的系统字体
pub const SYSTEM_FONT_PATHS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

const EMPHASIS_STYLE: BoxStyle = BoxStyle {
  color: [0, 128, 0], // 绿色
  thickness: 4,
};
const MUTED_STYLE: BoxStyle = BoxStyle {
  color: [128, 128, 128], // 灰色
  thickness: 1,
};

#[derive(Error, Debug)]
pub enum FontError {
  #[error("读取字体文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

#[derive(Debug, Clone, Copy)]
struct BoxStyle {
  color: [u8; 3],
  thickness: i32,
}

/// 按标注决策在图像上绘制检测框；没有字体时只画框
#[derive(Clone)]
pub struct Annotator {
  font: Option<FontArc>,
  font_size: f32,
}

impl Default for Annotator {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl Annotator {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn load_font(path: &Path) -> Result<FontArc, FontError> {
    let data = std::fs::read(path)?;
    Ok(FontArc::try_from_vec(data)?)
  }

  /// 候选中第一个存在的字体文件
  pub fn find_font<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
      .iter()
      .map(|p| p.as_ref())
      .find(|p| p.is_file())
      .map(Path::to_path_buf)
  }

  /// 返回实际绘制的检测框数量
  pub fn annotate(
    &self,
    image: &mut RgbImage,
    record: &ImageRecord,
    selected: &[String],
    highlight_mode: bool,
  ) -> usize {
    let mut drawn = 0;
    for det in &record.detections {
      let (style, label) = match decide(det, selected, highlight_mode) {
        RenderDecision::Emphasize { label } => (EMPHASIS_STYLE, label),
        RenderDecision::Deemphasize { label } => (MUTED_STYLE, label),
        RenderDecision::Omit => continue,
      };
      if let Some((x, y)) = self.draw_bbox(image, &det.bbox, style) {
        self.draw_label(image, x, y, &label, style);
        drawn += 1;
      }
    }
    drawn
  }

  // bbox 为像素坐标 [x_min, y_min, x_max, y_max]，返回裁剪后的左上角
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[f64; 4], style: BoxStyle) -> Option<(i32, i32)> {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return None;
    }

    // Clamp to image bounds
    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return None;
    }

    // 线宽向内加粗
    for t in 0..style.thickness {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(style.color));
    }

    Some((x_min, y_min))
  }

  // 标签背景放在边框上方
  fn draw_label(&self, image: &mut RgbImage, x: i32, y: i32, label: &str, style: BoxStyle) {
    let Some(font) = &self.font else {
      return;
    };

    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, font, label);

    let label_y = (y - text_height as i32).max(0);
    let max_width = (image.width() as i32 - x).max(0) as u32;
    let label_width = text_width.min(max_width);

    if label_width > 0 && text_height > 0 {
      let rect = Rect::at(x, label_y).of_size(label_width, text_height);
      draw_filled_rect_mut(image, rect, Rgb(style.color));
      draw_text_mut(
        image,
        Rgb(LABEL_TEXT_COLOR),
        x,
        label_y,
        scale,
        font,
        label,
      );
    }
  }
}
