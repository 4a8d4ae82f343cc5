//! Visual layout of timing spans.
//!
//! Spans are placed on a shared timeline: the origin is the earliest start and
//! the span is the latest end minus that origin. Offsets and widths are
//! percentages of that span, capped just under 100 so bars keep a margin.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::timing::Interval;

/// Upper bound for `left` and `left + width`, in percent.
pub const MAX_PERCENT: f64 = 99.5;

/// Colors cycled over the per-category summary bars.
pub const PALETTE: [&str; 6] = ["#8adb1e", "#1c4dcb", "#b21ccb", "#f53522", "#f5aa22", "#e7f021"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub left: f64,
    pub width: f64,
}

/// Lay out `intervals` on a shared timeline, returning one bar per input in
/// input order.
pub fn layout(intervals: &[Interval]) -> Vec<Bar> {
    let Some(origin) = intervals.iter().map(Interval::start).reduce(f64::min) else {
        return Vec::new();
    };
    let end = intervals
        .iter()
        .map(Interval::stop)
        .fold(origin, f64::max);
    let span = end - origin;

    intervals
        .iter()
        .map(|iv| {
            if span <= 0.0 {
                return Bar { left: 0.0, width: 0.0 };
            }
            let left = (((iv.start() - origin) / span) * 100.0).clamp(0.0, MAX_PERCENT);
            let width = (((iv.stop() - iv.start()) / span) * 100.0).clamp(0.0, MAX_PERCENT - left);
            Bar { left, width }
        })
        .collect()
}

/// Indices of `intervals` ordered by start time; equal starts keep input order.
pub fn start_order(intervals: &[Interval]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..intervals.len()).collect();
    idx.sort_by(|&a, &b| intervals[a].start().total_cmp(&intervals[b].start()));
    idx
}

/// Six-digit hex color derived from `text`; equal text always maps to the
/// same color.
pub fn color_for(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("#{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2])
}

/// Summary bar width; zero when the total is not positive.
pub fn share_percent(part_ms: f64, total_ms: f64) -> f64 {
    if total_ms > 0.0 {
        part_ms / total_ms * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn shared_origin_and_span() {
        let spans = [
            Interval::new(10.0, 11.0),
            Interval::new(12.0, 14.0),
            Interval::new(11.0, 12.0),
        ];
        let bars = layout(&spans);
        assert!(close(bars[0].left, 0.0));
        assert!(close(bars[0].width, 25.0));
        assert!(close(bars[1].left, 50.0));
        // 50 + 50 would reach 100; width is clamped to the cap.
        assert!(close(bars[1].width, MAX_PERCENT - 50.0));
        assert!(close(bars[2].left, 25.0));
        assert!(close(bars[2].width, 25.0));
    }

    #[test]
    fn single_full_span_stays_under_cap() {
        let bars = layout(&[Interval::new(1.0, 2.0)]);
        assert!(close(bars[0].left, 0.0));
        assert!(close(bars[0].width, MAX_PERCENT));
    }

    #[test]
    fn zero_span_does_not_divide_by_zero() {
        let bars = layout(&[Interval::new(5.0, 5.0), Interval::new(5.0, 5.0)]);
        assert!(bars.iter().all(|b| b.left == 0.0 && b.width == 0.0));
        assert!(layout(&[]).is_empty());
    }

    #[test]
    fn start_order_is_stable() {
        let spans = [
            Interval::new(3.0, 4.0),
            Interval::new(1.0, 2.0),
            Interval::new(1.0, 5.0),
        ];
        assert_eq!(start_order(&spans), vec![1, 2, 0]);
    }

    #[test]
    fn color_is_deterministic() {
        let a = color_for("SELECT 1");
        assert_eq!(a, color_for("SELECT 1"));
        assert_ne!(a, color_for("SELECT 2"));
        assert_eq!(a.len(), 7);
        assert!(a.starts_with('#'));
    }
}
