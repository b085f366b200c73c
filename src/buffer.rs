//! Pixel buffers and damage regions.
//!
//! A `PixelBuffer` is a fixed-size RGBX framebuffer; exactly two exist per
//! output and they never reallocate after construction. A `DamageRegion` is
//! an ordered set of non-overlapping rectangles describing the pixels that
//! changed since the last repaint.

use crate::error::BackendError;

/// Bytes per packed pixel (RGBX).
pub const BYTES_PER_PIXEL: usize = 4;

/// Axis-aligned rectangle, half-open on both axes: covers
/// `x1..x2` by `y1..y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// True if the two rectangles share any pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }

    /// Bounding box of both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }
}

/// Fixed-size packed-pixel framebuffer.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates a zeroed buffer. Allocation failure is reported rather than
    /// aborting, so output construction can surface it to backend startup.
    pub fn new(width: u32, height: u32) -> Result<Self, BackendError> {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| BackendError::ResourceExhausted(len))?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bounds of the whole buffer.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Fills a rectangle with one pixel value, clipped to the buffer.
    pub fn fill_rect(&mut self, rect: &Rect, pixel: [u8; BYTES_PER_PIXEL]) {
        let clipped = match rect.intersection(&self.bounds()) {
            Some(r) => r,
            None => return,
        };
        let stride = self.stride();
        for y in clipped.y1..clipped.y2 {
            let row = y as usize * stride;
            for x in clipped.x1..clipped.x2 {
                let idx = row + x as usize * BYTES_PER_PIXEL;
                self.data[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&pixel);
            }
        }
    }
}

/// Ordered set of non-overlapping damage rectangles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageRegion {
    rects: Vec<Rect>,
}

impl DamageRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.add(rect);
        region
    }

    /// Region covering a whole `width` x `height` output.
    pub fn full(width: u32, height: u32) -> Self {
        Self::from_rect(Rect::new(0, 0, width as i32, height as i32))
    }

    /// Adds a rectangle, merging it with any overlapping rectangles so the
    /// set stays non-overlapping. Merging takes the bounding box, which may
    /// over-approximate; damage is allowed to cover extra pixels, never to
    /// miss changed ones.
    pub fn add(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut merged = rect;
        let mut i = 0;
        while i < self.rects.len() {
            if self.rects[i].overlaps(&merged) {
                merged = merged.union(&self.rects[i]);
                self.rects.remove(i);
                i = 0;
            } else {
                i += 1;
            }
        }
        self.rects.push(merged);
    }

    /// Removes the area covered by `other`, splitting partially covered
    /// rectangles into up to four remainders.
    pub fn subtract(&mut self, other: &DamageRegion) {
        for cut in other.rects() {
            let mut remaining = Vec::with_capacity(self.rects.len());
            for r in self.rects.drain(..) {
                match r.intersection(cut) {
                    None => remaining.push(r),
                    Some(ix) => {
                        if ix.y1 > r.y1 {
                            remaining.push(Rect::new(r.x1, r.y1, r.x2, ix.y1));
                        }
                        if ix.y2 < r.y2 {
                            remaining.push(Rect::new(r.x1, ix.y2, r.x2, r.y2));
                        }
                        if ix.x1 > r.x1 {
                            remaining.push(Rect::new(r.x1, ix.y1, ix.x1, ix.y2));
                        }
                        if ix.x2 < r.x2 {
                            remaining.push(Rect::new(ix.x2, ix.y1, r.x2, ix.y2));
                        }
                    }
                }
            }
            self.rects = remaining;
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_dimensions_and_fill() {
        let mut fb = PixelBuffer::new(4, 3).unwrap();
        assert_eq!(fb.bytes().len(), 4 * 3 * BYTES_PER_PIXEL);
        fb.fill_rect(&Rect::new(1, 1, 3, 2), [0xaa, 0xbb, 0xcc, 0xff]);
        let stride = fb.stride();
        let idx = stride + BYTES_PER_PIXEL;
        assert_eq!(&fb.bytes()[idx..idx + 4], &[0xaa, 0xbb, 0xcc, 0xff]);
        // untouched corner stays zeroed
        assert_eq!(&fb.bytes()[0..4], &[0, 0, 0, 0]);
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut fb = PixelBuffer::new(2, 2).unwrap();
        fb.fill_rect(&Rect::new(-5, -5, 10, 10), [1, 2, 3, 4]);
        assert!(fb.bytes().chunks(4).all(|p| p == [1, 2, 3, 4]));
    }

    #[test]
    fn add_merges_overlapping_rects() {
        let mut region = DamageRegion::new();
        region.add(Rect::new(0, 0, 10, 10));
        region.add(Rect::new(5, 5, 15, 15));
        assert_eq!(region.rects(), &[Rect::new(0, 0, 15, 15)]);

        region.add(Rect::new(20, 20, 30, 30));
        assert_eq!(region.len(), 2);
    }

    #[test]
    fn add_ignores_empty_rects() {
        let mut region = DamageRegion::new();
        region.add(Rect::new(10, 10, 10, 20));
        assert!(region.is_empty());
    }

    #[test]
    fn subtract_splits_partial_overlap() {
        let mut region = DamageRegion::from_rect(Rect::new(0, 0, 10, 10));
        region.subtract(&DamageRegion::from_rect(Rect::new(4, 4, 6, 6)));
        assert_eq!(region.len(), 4);
        // the cut area is gone, the rest is still covered
        let covered: i32 = region.rects().iter().map(|r| r.width() * r.height()).sum();
        assert_eq!(covered, 100 - 4);
        assert!(region.rects().iter().all(|r| !r.overlaps(&Rect::new(4, 4, 6, 6))));
    }

    #[test]
    fn subtract_removes_fully_covered() {
        let mut region = DamageRegion::from_rect(Rect::new(2, 2, 4, 4));
        region.subtract(&DamageRegion::from_rect(Rect::new(0, 0, 10, 10)));
        assert!(region.is_empty());
    }
}
