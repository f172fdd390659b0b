//! Connected-component labeling and noise filtering of difference masks.
//!
//! Labeling uses 8-connectivity throughout the crate (the same adjacency
//! the border-following stage assumes). Components partition the
//! foreground exactly: every foreground pixel gets exactly one label,
//! background stays label 0.

use std::collections::VecDeque;

use image::{GrayImage, Luma};

/// Per-component statistics gathered during labeling.
#[derive(Debug, Clone)]
pub struct Component {
    /// Label id (1-based; 0 is background).
    pub label: u32,
    /// Foreground pixel count.
    pub area: u32,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// First pixel of the component in row-major order (topmost, then
    /// leftmost) — the border-following seed.
    pub seed: [u32; 2],
}

impl Component {
    /// Bounding-box extents measured as max − min, so a one-pixel-wide
    /// streak has width 0.
    pub fn extents(&self) -> (u32, u32) {
        (self.max_x - self.min_x, self.max_y - self.min_y)
    }
}

/// A full labeling of a binary mask.
#[derive(Debug, Clone)]
pub struct Labeling {
    pub width: u32,
    pub height: u32,
    /// Row-major label per pixel; 0 = background.
    pub labels: Vec<u32>,
    pub components: Vec<Component>,
}

impl Labeling {
    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels[(y * self.width + x) as usize]
    }
}

/// Label the foreground (non-zero) pixels of a mask with 8-connectivity
/// breadth-first fill.
pub fn label_components(mask: &GrayImage) -> Labeling {
    let (w, h) = mask.dimensions();
    let mut labels = vec![0u32; (w * h) as usize];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();
    let mut next_label = 0u32;

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if mask.get_pixel(x, y)[0] == 0 || labels[idx] != 0 {
                continue;
            }
            next_label += 1;
            let label = next_label;
            let mut comp = Component {
                label,
                area: 0,
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                seed: [x, y],
            };
            labels[idx] = label;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                comp.area += 1;
                comp.min_x = comp.min_x.min(cx);
                comp.max_x = comp.max_x.max(cx);
                comp.min_y = comp.min_y.min(cy);
                comp.max_y = comp.max_y.max(cy);
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = cx as i32 + dx;
                        let ny = cy as i32 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        let nidx = (ny * w + nx) as usize;
                        if mask.get_pixel(nx, ny)[0] != 0 && labels[nidx] == 0 {
                            labels[nidx] = label;
                            queue.push_back((nx, ny));
                        }
                    }
                }
            }
            components.push(comp);
        }
    }

    Labeling {
        width: w,
        height: h,
        labels,
        components,
    }
}

/// Noise-filter policy for difference masks.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Components with pixel count at or below this are dropped as noise.
    pub min_component_area: u32,
    /// Bounding-box extent below which a component counts as
    /// one-pixel-thin along that axis.
    pub line_thickness: u32,
    /// Maximum extent along the long axis for a thin component to still
    /// count as a registration seam rather than a defect.
    pub line_length: u32,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            min_component_area: 30,
            line_thickness: 2,
            line_length: 1000,
        }
    }
}

impl CleanConfig {
    /// Thin-line artifact rule: elongated single-pixel-wide streaks up to
    /// `line_length` px long are registration seams, not defects.
    fn is_line_artifact(&self, w_ext: u32, h_ext: u32) -> bool {
        (w_ext < self.line_thickness && h_ext < self.line_length)
            || (h_ext < self.line_thickness && w_ext < self.line_length)
    }
}

/// Remove noise blobs and registration seams from a difference mask.
///
/// Surviving components are painted 255; everything else 0. Idempotent:
/// cleaning a cleaned mask changes nothing.
pub fn clean(mask: &GrayImage, config: &CleanConfig) -> GrayImage {
    let labeling = label_components(mask);
    let mut keep = vec![false; labeling.components.len() + 1];
    let mut kept = 0usize;
    for comp in &labeling.components {
        if comp.area <= config.min_component_area {
            continue;
        }
        let (w_ext, h_ext) = comp.extents();
        if config.is_line_artifact(w_ext, h_ext) {
            continue;
        }
        keep[comp.label as usize] = true;
        kept += 1;
    }
    tracing::debug!(
        "clean: {} of {} components kept",
        kept,
        labeling.components.len()
    );

    let mut out = GrayImage::new(labeling.width, labeling.height);
    for y in 0..labeling.height {
        for x in 0..labeling.width {
            let label = labeling.label_at(x, y);
            if label != 0 && keep[label as usize] {
                out.put_pixel(x, y, Luma([255]));
            }
        }
    }
    out
}
