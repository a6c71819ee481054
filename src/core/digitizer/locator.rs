//! 显示面板定位：连通域 → 过滤噪点 → 相邻段块聚类 → 按面积/宽高比/高度筛选，取面积最大者

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};
use log::debug;
use std::collections::HashMap;

use super::config::DigitizerConfig;
use super::geometry::PixelRect;
use super::preprocess::BinaryFrame;

/// 连通域过多时只保留最大的这些，防止噪声帧拖慢聚类
const MAX_BLOBS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub rect: PixelRect,
    pub pixels: u32,
}

/// 一帧中定位到的数字面板（ROI 坐标），不跨帧保留
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRegion {
    pub rect: PixelRect,
    pub blob_count: usize,
}

pub struct DisplayLocator {
    min_blob_fraction: f32,
    merge_gap_fraction: f32,
    min_area_fraction: f32,
    max_area_fraction: f32,
    min_aspect_ratio: f32,
    max_aspect_ratio: f32,
    min_height_fraction: f32,
    max_height_fraction: f32,
}

impl DisplayLocator {
    pub fn new(config: &DigitizerConfig) -> Self {
        Self {
            min_blob_fraction: config.min_blob_fraction,
            merge_gap_fraction: config.merge_gap_fraction,
            min_area_fraction: config.min_area_fraction,
            max_area_fraction: config.max_area_fraction,
            min_aspect_ratio: config.min_aspect_ratio,
            max_aspect_ratio: config.max_aspect_ratio,
            min_height_fraction: config.min_height_fraction,
            max_height_fraction: config.max_height_fraction,
        }
    }

    /// 找到面板返回 Some；多个候选时取面积最大的（并列取最左），不尝试区分其它显示屏
    pub fn locate(&self, binary: &BinaryFrame) -> Option<DisplayRegion> {
        let candidates = self.candidates(binary);
        let total = candidates.len();

        let accepted: Vec<DisplayRegion> = candidates
            .into_iter()
            .filter(|c| self.is_plausible(&c.rect, binary.width(), binary.height()))
            .collect();

        debug!(
            "locator: {} clusters, {} plausible",
            total,
            accepted.len()
        );

        accepted
            .into_iter()
            .max_by(|a, b| {
                a.rect
                    .area()
                    .cmp(&b.rect.area())
                    .then_with(|| b.rect.x.cmp(&a.rect.x))
            })
    }

    /// 所有聚类结果，未经面积/形状筛选
    pub fn candidates(&self, binary: &BinaryFrame) -> Vec<DisplayRegion> {
        let blobs = self.find_blobs(binary);
        if blobs.is_empty() {
            return Vec::new();
        }

        let mut clusters = UnionFind::new(blobs.len());
        for i in 0..blobs.len() {
            for j in (i + 1)..blobs.len() {
                if self.are_neighbours(&blobs[i], &blobs[j]) {
                    clusters.union(i, j);
                }
            }
        }

        let mut regions: HashMap<usize, DisplayRegion> = HashMap::new();
        for (i, blob) in blobs.iter().enumerate() {
            let root = clusters.find(i);
            regions
                .entry(root)
                .and_modify(|r| {
                    r.rect = r.rect.union(&blob.rect);
                    r.blob_count += 1;
                })
                .or_insert(DisplayRegion {
                    rect: blob.rect,
                    blob_count: 1,
                });
        }

        let mut regions: Vec<DisplayRegion> = regions.into_values().collect();
        regions.sort_by_key(|r| (r.rect.x, r.rect.y));
        regions
    }

    /// 前景连通域，去掉面积过小的噪点
    pub fn find_blobs(&self, binary: &BinaryFrame) -> Vec<Blob> {
        let labels = connected_components(binary.mask(), Connectivity::Eight, Luma([0u8]));
        let min_pixels =
            ((binary.width() as f32 * binary.height() as f32 * self.min_blob_fraction) as u32).max(2);

        // label -> (min_x, min_y, max_x, max_y, count)
        let mut bounds: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            bounds
                .entry(label)
                .and_modify(|b| {
                    b.0 = b.0.min(x);
                    b.1 = b.1.min(y);
                    b.2 = b.2.max(x);
                    b.3 = b.3.max(y);
                    b.4 += 1;
                })
                .or_insert((x, y, x, y, 1));
        }

        let mut blobs: Vec<Blob> = bounds
            .into_values()
            .filter(|b| b.4 >= min_pixels)
            .map(|(x0, y0, x1, y1, pixels)| Blob {
                rect: PixelRect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
                pixels,
            })
            .collect();

        if blobs.len() > MAX_BLOBS {
            debug!("locator: {} blobs, keeping largest {}", blobs.len(), MAX_BLOBS);
            blobs.sort_by(|a, b| b.pixels.cmp(&a.pixels));
            blobs.truncate(MAX_BLOBS);
        }
        blobs.sort_by_key(|b| (b.rect.x, b.rect.y));
        blobs
    }

    /// 段块按自身长边外扩后相交即视为同一面板
    fn are_neighbours(&self, a: &Blob, b: &Blob) -> bool {
        let pad = |r: &PixelRect| r.width.max(r.height) as f32 * self.merge_gap_fraction;
        let reach = pad(&a.rect) + pad(&b.rect);
        let (dx, dy) = a.rect.gap_to(&b.rect);
        dx as f32 <= reach && dy as f32 <= reach
    }

    fn is_plausible(&self, rect: &PixelRect, width: u32, height: u32) -> bool {
        let roi_area = width as f32 * height as f32;
        let area_fraction = rect.area() as f32 / roi_area;
        let height_fraction = rect.height as f32 / height as f32;
        let aspect = rect.aspect_ratio();

        area_fraction >= self.min_area_fraction
            && area_fraction <= self.max_area_fraction
            && height_fraction >= self.min_height_fraction
            && height_fraction <= self.max_height_fraction
            && aspect >= self.min_aspect_ratio
            && aspect <= self.max_aspect_ratio
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
