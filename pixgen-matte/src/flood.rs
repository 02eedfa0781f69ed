//! Edge-seeded flood fill that carves a near-black matte out of a sprite

use std::collections::VecDeque;

use image::{DynamicImage, Rgba, RgbaImage};

/// Channel value a pixel must stay below to count as background.
pub const DEFAULT_THRESHOLD: u8 = 40;

/// Pixel classifier for the matte colour.
///
/// A pixel is near-black when its red, green and blue channels are all
/// strictly below `threshold`. Alpha never takes part in the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearBlack {
    pub threshold: u8,
}

impl Default for NearBlack {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl NearBlack {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Check whether a pixel belongs to the matte colour.
    pub fn matches(&self, pixel: &Rgba<u8>) -> bool {
        let [r, g, b, _] = pixel.0;
        r < self.threshold && g < self.threshold && b < self.threshold
    }
}

/// Pending coordinates plus a flag per pixel recording whether it was ever queued.
struct Worklist {
    width: usize,
    visited: Vec<bool>,
    queue: VecDeque<(u32, u32)>,
}

impl Worklist {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as usize,
            visited: vec![false; width as usize * height as usize],
            queue: VecDeque::new(),
        }
    }

    /// Queue a coordinate unless it has been queued before.
    fn push(&mut self, x: u32, y: u32) {
        let idx = y as usize * self.width + x as usize;
        if !self.visited[idx] {
            self.visited[idx] = true;
            self.queue.push_back((x, y));
        }
    }

    fn is_visited(&self, x: u32, y: u32) -> bool {
        self.visited[y as usize * self.width + x as usize]
    }
}

/// In-bounds 4-connected neighbours of `(x, y)`.
fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < width).then(|| (x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < height).then(|| (x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

/// Make every near-black pixel connected to the image border transparent.
///
/// Seeds are the near-black pixels on the four edges. From there the fill
/// walks breadth-first over up/down/left/right neighbours that are also
/// near-black. Reached pixels get alpha 0 and keep their RGB, so running the
/// fill again selects exactly the same region. Near-black pixels enclosed by
/// other colours (pupils, outlines, inner shadows) are left opaque.
///
/// Returns the number of pixels that were carved out.
pub fn flood_fill_transparency(img: &mut RgbaImage, near_black: NearBlack) -> usize {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let mut work = Worklist::new(width, height);

    for x in 0..width {
        for y in [0, height - 1] {
            if near_black.matches(img.get_pixel(x, y)) {
                work.push(x, y);
            }
        }
    }
    for y in 0..height {
        for x in [0, width - 1] {
            if near_black.matches(img.get_pixel(x, y)) {
                work.push(x, y);
            }
        }
    }

    log::trace!("Flood fill seeded with {} edge pixels", work.queue.len());

    let mut carved = 0;
    while let Some((x, y)) = work.queue.pop_front() {
        img.get_pixel_mut(x, y).0[3] = 0;
        carved += 1;

        for (nx, ny) in neighbours(x, y, width, height) {
            if !work.is_visited(nx, ny) && near_black.matches(img.get_pixel(nx, ny)) {
                work.push(nx, ny);
            }
        }
    }

    carved
}

/// Convert a decoded image to RGBA and carve its background.
pub fn strip_background(img: DynamicImage, near_black: NearBlack) -> (RgbaImage, usize) {
    let mut rgba = img.into_rgba8();
    let carved = flood_fill_transparency(&mut rgba, near_black);
    (rgba, carved)
}
