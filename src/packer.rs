/// Rectangle handed out by the packer, in atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackerRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PackerRect {
    pub fn intersects(&self, other: &PackerRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// One step of the skyline: the span `x..x + width` is filled up to `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkylineNode {
    pub x: u32,
    pub y: u32,
    pub width: u32,
}

/// Skyline packer over a fixed surface.
///
/// A one pixel border is kept free on every edge, so the usable area is
/// `(width - 2) x (height - 2)`. Regions are never freed individually;
/// `clear` resets the whole surface.
#[derive(Debug, Clone)]
pub struct AtlasPacker {
    width: u32,
    height: u32,
    nodes: Vec<SkylineNode>,
    used: u64,
}

impl AtlasPacker {
    pub fn new(width: u32, height: u32) -> Self {
        let mut packer = Self {
            width,
            height,
            nodes: Vec::new(),
            used: 0,
        };
        packer.clear();
        packer
    }

    /// Drops every allocation.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(SkylineNode {
            x: 1,
            y: 1,
            width: self.width.saturating_sub(2),
        });
        self.used = 0;
    }

    /// Height at which a `w` x `h` rectangle would sit if its left edge
    /// started at node `index`, or `None` if it does not fit there.
    fn fit(&self, index: usize, w: u32, h: u32) -> Option<u32> {
        let node = self.nodes[index];
        if node.x.checked_add(w)? > self.width.saturating_sub(1) {
            return None;
        }

        let mut y = node.y;
        let mut width_left = w as i64;
        let mut i = index;
        while width_left > 0 {
            let n = self.nodes.get(i)?;
            y = y.max(n.y);
            if y.checked_add(h)? > self.height.saturating_sub(1) {
                return None;
            }
            width_left -= n.width as i64;
            i += 1;
        }
        Some(y)
    }

    /// Places a `w` x `h` rectangle on the lowest skyline span that holds it,
    /// preferring narrower spans on ties.
    ///
    /// Returns `None` when nothing fits; the skyline is left untouched then.
    pub fn insert_raw(&mut self, w: u32, h: u32) -> Option<PackerRect> {
        if w == 0 || h == 0 {
            return None;
        }
        // Larger than the area inside the border.
        if w > self.width.saturating_sub(2) || h > self.height.saturating_sub(2) {
            return None;
        }

        let mut best_bottom = u32::MAX;
        let mut best_width = u32::MAX;
        let mut best: Option<(usize, PackerRect)> = None;

        for i in 0..self.nodes.len() {
            let Some(y) = self.fit(i, w, h) else {
                continue;
            };
            let node = self.nodes[i];
            let bottom = y + h;
            if bottom < best_bottom || (bottom == best_bottom && node.width < best_width) {
                best_bottom = bottom;
                best_width = node.width;
                best = Some((i, PackerRect { x: node.x, y, w, h }));
            }
        }

        let (index, rect) = best?;
        self.nodes.insert(
            index,
            SkylineNode {
                x: rect.x,
                y: rect.y + h,
                width: w,
            },
        );

        // Trim the spans now covered by the new node.
        let mut i = index + 1;
        while i < self.nodes.len() {
            let prev = self.nodes[i - 1];
            let prev_end = prev.x + prev.width;
            let node = &mut self.nodes[i];
            if node.x >= prev_end {
                break;
            }
            let shrink = prev_end - node.x;
            if node.width <= shrink {
                self.nodes.remove(i);
            } else {
                node.x += shrink;
                node.width -= shrink;
                break;
            }
        }

        self.merge();
        self.used += rect.area();
        Some(rect)
    }

    fn merge(&mut self) {
        let mut i = 0;
        while i + 1 < self.nodes.len() {
            if self.nodes[i].y == self.nodes[i + 1].y {
                self.nodes[i].width += self.nodes[i + 1].width;
                self.nodes.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Texture coordinates `[s0, t0, s1, t1]` of `rect`.
    pub fn get_uv_param(&self, rect: &PackerRect) -> [f32; 4] {
        let fw = self.width as f32;
        let fh = self.height as f32;
        [
            rect.x as f32 / fw,
            rect.y as f32 / fh,
            (rect.x + rect.w) as f32 / fw,
            (rect.y + rect.h) as f32 / fh,
        ]
    }

    pub fn skyline(&self) -> &[SkylineNode] {
        &self.nodes
    }

    /// Allocated area in pixels.
    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn test_first_insert_respects_border() {
        let mut packer = AtlasPacker::new(64, 64);
        let rect = packer.insert_raw(10, 4).unwrap();
        assert_eq!(rect, PackerRect { x: 1, y: 1, w: 10, h: 4 });
        assert_eq!(
            packer.skyline(),
            &[
                SkylineNode { x: 1, y: 5, width: 10 },
                SkylineNode { x: 11, y: 1, width: 52 },
            ]
        );
        assert_eq!(packer.used(), 40);
    }

    #[test]
    fn test_prefers_lowest_span() {
        let mut packer = AtlasPacker::new(64, 64);
        packer.insert_raw(20, 30).unwrap();
        let rect = packer.insert_raw(20, 10).unwrap();
        assert_eq!((rect.x, rect.y), (21, 1));
        // Same height as the second one: fills to the right at y = 1 again.
        let rect = packer.insert_raw(10, 10).unwrap();
        assert_eq!((rect.x, rect.y), (41, 1));
    }

    #[test]
    fn test_equal_heights_merge() {
        let mut packer = AtlasPacker::new(32, 32);
        packer.insert_raw(10, 5).unwrap();
        packer.insert_raw(10, 5).unwrap();
        assert_eq!(packer.skyline()[0], SkylineNode { x: 1, y: 6, width: 20 });
        assert_eq!(packer.skyline().len(), 2);
    }

    #[test]
    fn test_random_allocations_never_overlap() {
        let mut packer = AtlasPacker::new(128, 128);
        let mut rng = XorShift(0x9e37_79b9);
        let mut placed: Vec<PackerRect> = Vec::new();

        for _ in 0..400 {
            let w = rng.next() % 20 + 1;
            let h = rng.next() % 20 + 1;
            if let Some(rect) = packer.insert_raw(w, h) {
                assert!(rect.x >= 1 && rect.y >= 1);
                assert!(rect.x + rect.w <= 127 && rect.y + rect.h <= 127);
                for other in &placed {
                    assert!(!rect.intersects(other), "{rect:?} overlaps {other:?}");
                }
                placed.push(rect);
            }
        }
        assert!(placed.len() > 10);
        let total: u64 = placed.iter().map(PackerRect::area).sum();
        assert_eq!(packer.used(), total);
    }

    #[test]
    fn test_failed_insert_changes_nothing() {
        let mut packer = AtlasPacker::new(64, 64);
        let mut count = 0;
        while packer.insert_raw(16, 16).is_some() {
            count += 1;
        }
        assert_eq!(count, 9);

        let skyline = packer.skyline().to_vec();
        let used = packer.used();
        assert!(packer.insert_raw(16, 16).is_none());
        assert!(packer.insert_raw(63, 1).is_none());
        assert_eq!(packer.skyline(), skyline.as_slice());
        assert_eq!(packer.used(), used);

        // The strip to the right of the columns is still usable.
        assert!(packer.insert_raw(8, 8).is_some());
    }

    #[test]
    fn test_clear_restores_full_capacity() {
        let mut packer = AtlasPacker::new(64, 32);
        assert!(packer.insert_raw(64, 32).is_none());
        packer.insert_raw(30, 20).unwrap();
        assert!(packer.insert_raw(62, 30).is_none());

        packer.clear();
        assert_eq!(packer.used(), 0);
        let rect = packer.insert_raw(62, 30).unwrap();
        assert_eq!(rect, PackerRect { x: 1, y: 1, w: 62, h: 30 });
    }

    #[test]
    fn test_zero_sized_request() {
        let mut packer = AtlasPacker::new(16, 16);
        assert!(packer.insert_raw(0, 4).is_none());
        assert!(packer.insert_raw(4, 0).is_none());
        assert_eq!(packer.used(), 0);
    }

    #[test]
    fn test_oversized_request_is_rejected() {
        let mut packer = AtlasPacker::new(64, 64);
        packer.insert_raw(10, 10).unwrap();
        let skyline = packer.skyline().to_vec();
        assert!(packer.insert_raw(u32::MAX, 4).is_none());
        assert!(packer.insert_raw(4, u32::MAX).is_none());
        assert!(packer.insert_raw(u32::MAX, u32::MAX).is_none());
        assert!(packer.insert_raw(63, 4).is_none());
        assert_eq!(packer.skyline(), skyline.as_slice());
        assert_eq!(packer.used(), 100);

        // Degenerate atlases have no usable area at all.
        assert!(AtlasPacker::new(2, 2).insert_raw(1, 1).is_none());
    }

    #[test]
    fn test_uv_param() {
        let packer = AtlasPacker::new(100, 50);
        let uv = packer.get_uv_param(&PackerRect { x: 10, y: 5, w: 20, h: 10 });
        assert_eq!(uv, [0.1, 0.1, 0.3, 0.3]);
    }
}
