// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/common/mod.rs - 测试夹具
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

use image::{ImageBuffer, Rgb};

/// 写入一张 100x80 的灰色 PNG 以及对应的检测记录（归一化坐标）
pub fn write_image_with_record(dir: &Path, stem: &str, lines: &[&str]) {
  let img = ImageBuffer::from_fn(100, 80, |_, _| Rgb([40u8, 40u8, 40u8]));
  img
    .save(dir.join(format!("{}.png", stem)))
    .expect("Failed to save test image");
  std::fs::write(dir.join(format!("{}.txt", stem)), lines.join("\n"))
    .expect("Failed to write detection record");
}

/// r1: person x2 + car x1, r2: car x3, r3: 检测记录缺失
pub fn street_scene(dir: &Path) {
  write_image_with_record(
    dir,
    "r1",
    &[
      "person, 0.91, 0.10, 0.10, 0.30, 0.90",
      "car, 0.88, 0.50, 0.50, 0.90, 0.90",
      "person, 0.67, 0.35, 0.20, 0.45, 0.80",
    ],
  );
  write_image_with_record(
    dir,
    "r2",
    &[
      "car, 0.95, 0.00, 0.00, 0.20, 0.20",
      "car, 0.71, 0.30, 0.30, 0.50, 0.50",
      "car, 0.55, 0.60, 0.60, 0.80, 0.80",
    ],
  );
  let img = ImageBuffer::from_fn(10, 10, |_, _| Rgb([0u8, 0u8, 0u8]));
  img
    .save(dir.join("r3.png"))
    .expect("Failed to save test image");
}
