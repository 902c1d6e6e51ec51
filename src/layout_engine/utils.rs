use crate::common::config::GapSettings;
use crate::sys::geometry::{Rect, Round};

/// The part of a monitor left for tiling once outer gaps are applied.
pub fn compute_tiling_area(screen: Rect, gaps: &GapSettings) -> Rect {
    if gaps.outer.top == 0.0
        && gaps.outer.left == 0.0
        && gaps.outer.bottom == 0.0
        && gaps.outer.right == 0.0
    {
        screen
    } else {
        Rect::clamped(
            screen.min_x() + gaps.outer.left,
            screen.min_y() + gaps.outer.top,
            screen.width() - gaps.outer.left - gaps.outer.right,
            screen.height() - gaps.outer.top - gaps.outer.bottom,
        )
        .round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_gaps_shrink_screen() {
        let screen = Rect::new(0.0, 0.0, 1000.0, 800.0).unwrap();
        assert_eq!(compute_tiling_area(screen, &GapSettings::default()), screen);

        let mut gaps = GapSettings::default();
        gaps.outer.top = 30.0;
        gaps.outer.left = 10.0;
        gaps.outer.right = 10.0;
        assert_eq!(
            compute_tiling_area(screen, &gaps),
            Rect::new(10.0, 30.0, 980.0, 770.0).unwrap()
        );

        gaps.outer.left = 2000.0;
        assert_eq!(compute_tiling_area(screen, &gaps).width(), 0.0);
    }
}
