//! List virtualization: which rows of a long list intersect the viewport.
//!
//! Geometry is integral (pixels or terminal rows). Everything here is a
//! pure function of the scroll offset and the list geometry.

use serde::Serialize;

/// Placement of one materialized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualRow {
    pub index: usize,
    pub pixel_offset: u64,
    pub size: u32,
}

/// Half-open range `[start, end)` of rows to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualRange {
    pub start: usize,
    pub end: usize,
    /// Height of the whole list, `item_count * item_height`.
    pub total_extent: u64,
    pub item_height: u32,
}

impl VirtualRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = VirtualRow> + '_ {
        (self.start..self.end).map(|index| VirtualRow {
            index,
            pixel_offset: (index as u64).saturating_mul(self.item_height as u64),
            size: self.item_height,
        })
    }
}

/// Rows visible at `scroll_offset`, widened by `overscan` rows on each side
/// and clamped to `[0, item_count]`.
///
/// A zero `item_height` yields an empty range with zero extent.
pub fn visible_range(
    scroll_offset: u64,
    item_height: u32,
    container_height: u32,
    item_count: usize,
    overscan: usize,
) -> VirtualRange {
    if item_height == 0 {
        return VirtualRange::default();
    }
    let ih = item_height as u64;

    let first = scroll_offset / ih;
    let last = scroll_offset
        .saturating_add(container_height as u64)
        .div_ceil(ih);

    let start = usize::try_from(first)
        .unwrap_or(usize::MAX)
        .saturating_sub(overscan)
        .min(item_count);
    let end = usize::try_from(last)
        .unwrap_or(usize::MAX)
        .saturating_add(overscan)
        .min(item_count);

    VirtualRange {
        start,
        end: end.max(start),
        total_extent: (item_count as u64).saturating_mul(ih),
        item_height,
    }
}

/// Stateful scroll position plus list geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Virtualizer {
    scroll_offset: u64,
    item_height: u32,
    container_height: u32,
    item_count: usize,
    overscan: usize,
}

impl Virtualizer {
    pub fn new(item_height: u32, container_height: u32, overscan: usize) -> Self {
        Self {
            scroll_offset: 0,
            item_height,
            container_height,
            item_count: 0,
            overscan,
        }
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn container_height(&self) -> u32 {
        self.container_height
    }

    /// Largest offset that still fills the viewport.
    pub fn max_scroll_offset(&self) -> u64 {
        (self.item_count as u64)
            .saturating_mul(self.item_height as u64)
            .saturating_sub(self.container_height as u64)
    }

    /// Record a scroll position reported by the host.
    pub fn handle_scroll(&mut self, offset: u64) {
        self.scroll_offset = offset;
    }

    /// Move by `delta` pixels, clamped to the scrollable extent.
    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta >= 0 {
            self.scroll_offset.saturating_add(delta as u64)
        } else {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        };
        self.scroll_offset = target.min(self.max_scroll_offset());
    }

    /// Put row `index` at the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        self.scroll_offset = (index as u64).saturating_mul(self.item_height as u64);
    }

    pub fn set_item_count(&mut self, count: usize) {
        self.item_count = count;
    }

    pub fn set_container_height(&mut self, height: u32) {
        self.container_height = height;
    }

    pub fn compute(&self) -> VirtualRange {
        visible_range(
            self.scroll_offset,
            self.item_height,
            self.container_height,
            self.item_count,
            self.overscan,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_of_list_with_overscan() {
        let r = visible_range(0, 40, 400, 1_000, 5);
        assert_eq!((r.start, r.end), (0, 15));
        assert_eq!(r.total_extent, 40_000);
        assert_eq!(r.len(), 15);
    }

    #[test]
    fn middle_of_list() {
        let r = visible_range(2_000, 40, 400, 1_000, 5);
        // rows 50..60 visible, widened by 5 each side
        assert_eq!((r.start, r.end), (45, 65));
        let rows: Vec<VirtualRow> = r.rows().collect();
        assert_eq!(rows.len(), 20);
        assert_eq!(
            rows[0],
            VirtualRow {
                index: 45,
                pixel_offset: 1_800,
                size: 40
            }
        );
    }

    #[test]
    fn partial_row_rounds_outward() {
        let r = visible_range(20, 40, 100, 1_000, 0);
        assert_eq!((r.start, r.end), (0, 3));
    }

    #[test]
    fn end_of_list_is_clamped() {
        let r = visible_range(39_800, 40, 400, 1_000, 5);
        assert_eq!(r.end, 1_000);
        assert!(r.start <= r.end);
    }

    #[test]
    fn scroll_past_end_yields_empty_range() {
        let r = visible_range(1_000_000, 40, 400, 1_000, 5);
        assert!(r.is_empty());
        assert_eq!(r.start, 1_000);
    }

    #[test]
    fn offset_near_u64_max_saturates() {
        let r = visible_range(u64::MAX - 10, 40, 400, 1_000, 5);
        assert!(r.is_empty());
        assert_eq!((r.start, r.end), (1_000, 1_000));

        let huge = visible_range(0, u32::MAX, 400, usize::MAX, 0);
        assert_eq!(huge.total_extent, u64::MAX);
        let row = huge.rows().next().unwrap();
        assert_eq!(row.pixel_offset, 0);
    }

    #[test]
    fn scroll_to_last_possible_index_saturates() {
        let mut v = Virtualizer::new(40, 400, 5);
        v.set_item_count(usize::MAX);
        v.scroll_to_index(usize::MAX);
        assert_eq!(v.scroll_offset(), u64::MAX);
        assert_eq!(v.max_scroll_offset(), u64::MAX - 400);

        let r = v.compute();
        assert!(r.start <= r.end);
        assert_eq!(r.rows().count(), r.len());
        let offsets: Vec<u64> = r.rows().map(|row| row.pixel_offset).collect();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn empty_list_and_zero_height() {
        assert!(visible_range(0, 40, 400, 0, 5).is_empty());
        let r = visible_range(0, 0, 400, 1_000, 5);
        assert!(r.is_empty());
        assert_eq!(r.total_extent, 0);
    }

    #[test]
    fn range_always_within_bounds() {
        for scroll in (0..50_000).step_by(777) {
            for overscan in [0, 3, 5, 50] {
                let r = visible_range(scroll, 40, 400, 1_000, overscan);
                assert!(r.start <= r.end && r.end <= 1_000);
            }
        }
    }

    #[test]
    fn scroll_to_index_sets_offset() {
        let mut v = Virtualizer::new(40, 400, 5);
        v.set_item_count(1_000);
        v.scroll_to_index(50);
        assert_eq!(v.scroll_offset(), 2_000);
        assert_eq!(v.compute().start, 45);
    }

    #[test]
    fn scroll_by_clamps() {
        let mut v = Virtualizer::new(1, 10, 0);
        v.set_item_count(25);
        v.scroll_by(-5);
        assert_eq!(v.scroll_offset(), 0);
        v.scroll_by(100);
        assert_eq!(v.scroll_offset(), 15);
        v.scroll_by(-3);
        assert_eq!(v.scroll_offset(), 12);
        assert_eq!(v.compute().end, 22);
    }

    #[test]
    fn geometry_changes_apply_on_next_compute() {
        let mut v = Virtualizer::new(1, 10, 0);
        v.set_item_count(100);
        assert_eq!(v.compute().end, 10);
        v.set_container_height(20);
        assert_eq!(v.compute().end, 20);
        v.set_item_count(5);
        assert_eq!(v.compute().end, 5);
    }
}
