//! 标签切片的持久化存储, 用于快速目检.

use std::path::Path;

use image::{GrayImage, ImageResult, Luma};
use itertools::Itertools;
use ndarray::ArrayView2;

use crate::consts::gray::{BLACK, WHITE};

/// 将所有不同的非零标签按升序均匀分布到 `(0, 255]` 灰度区间. 背景为黑色.
fn gray_levels(slice: &ArrayView2<'_, i32>) -> Vec<(i32, u8)> {
    let labels: Vec<i32> = slice
        .iter()
        .copied()
        .filter(|&p| p != 0)
        .sorted_unstable()
        .dedup()
        .collect();
    let k = labels.len();
    labels
        .into_iter()
        .enumerate()
        .map(|(i, l)| {
            let gray = ((i + 1) * WHITE as usize + k / 2) / k;
            (l, gray as u8)
        })
        .collect()
}

/// 将一张二维标签切片以 8-bit 灰度 PNG (或由 `path` 扩展名决定的其它格式) 保存.
///
/// 切片按 (H, W) 组织. 不同标签会被映射为尽量可区分的灰度, 0 保持为黑色.
pub fn save_label_slice<P: AsRef<Path>>(slice: ArrayView2<'_, i32>, path: P) -> ImageResult<()> {
    let levels = gray_levels(&slice);
    let gray_of = |p: i32| {
        levels
            .binary_search_by_key(&p, |&(l, _)| l)
            .map_or(BLACK, |i| levels[i].1)
    };

    let (height, width) = slice.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &pix) in slice.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([gray_of(pix)]));
    }
    buf.save(path)
}
