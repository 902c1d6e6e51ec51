use crate::common::config::LayoutSettings;
use crate::layout_engine::{LayoutKind, Orientation};
use crate::model::tree::{LayoutTree, NodeId};
use crate::model::window::WindowId;
use crate::sys::geometry::{Rect, Round};

/// Computes the frame of every tiled window in `tree` laid out inside `area`.
///
/// Frames come out in stacking order: within a stack container the child
/// holding `focused` is emitted last so it ends up on top.
pub fn calculate_layout(
    tree: &LayoutTree,
    area: Rect,
    focused: Option<WindowId>,
    settings: &LayoutSettings,
) -> Vec<(WindowId, Rect)> {
    let mut frames = Vec::with_capacity(tree.window_count());
    if let Some(root) = tree.root() {
        apply(tree, root, area, focused, settings, &mut frames);
    }
    frames
}

fn apply(
    tree: &LayoutTree,
    node: NodeId,
    rect: Rect,
    focused: Option<WindowId>,
    settings: &LayoutSettings,
    frames: &mut Vec<(WindowId, Rect)>,
) {
    if let Some(wid) = tree.window_at(node) {
        frames.push((wid, rect));
        return;
    }
    for (child, child_rect) in child_rects(tree, node, rect, focused, settings) {
        apply(tree, child, child_rect, focused, settings, frames);
    }
}

/// The rectangle `node` occupies when the tree is laid out inside `area`.
pub fn node_rect(
    tree: &LayoutTree,
    node: NodeId,
    area: Rect,
    focused: Option<WindowId>,
    settings: &LayoutSettings,
) -> Option<Rect> {
    let mut current = tree.root()?;
    let mut rect = area;
    for idx in tree.path_of(node) {
        let target = *tree.children(current).get(idx)?;
        rect = child_rects(tree, current, rect, focused, settings)
            .into_iter()
            .find(|(child, _)| *child == target)
            .map(|(_, r)| r)?;
        current = target;
    }
    Some(rect)
}

/// Splits a container's rectangle among its children, in emission order.
fn child_rects(
    tree: &LayoutTree,
    node: NodeId,
    rect: Rect,
    focused: Option<WindowId>,
    settings: &LayoutSettings,
) -> Vec<(NodeId, Rect)> {
    let children = tree.children(node);
    if children.is_empty() {
        return Vec::new();
    }
    let Some(kind) = tree.layout(node) else {
        return Vec::new();
    };
    match kind {
        LayoutKind::HorizontalStack | LayoutKind::VerticalStack => {
            let focused_idx = focused
                .and_then(|wid| tree.node_for(wid))
                .and_then(|leaf| {
                    children.iter().position(|&c| c == leaf || tree.ancestors(leaf).any(|a| a == c))
                })
                .unwrap_or(0);
            let mut out: Vec<_> = children
                .iter()
                .enumerate()
                .map(|(idx, &child)| {
                    (child, stack_frame(rect, idx, children.len(), kind.orientation(), settings))
                })
                .collect();
            let top = out.remove(focused_idx);
            out.push(top);
            out
        }
        LayoutKind::Horizontal | LayoutKind::Vertical => {
            split_axis(tree, children, rect, kind.orientation(), settings)
        }
    }
}

fn stack_frame(
    rect: Rect,
    idx: usize,
    count: usize,
    orientation: Orientation,
    settings: &LayoutSettings,
) -> Rect {
    let offset = settings.stack.stack_offset;
    let shift = idx as f64 * offset;
    let shrink = count.saturating_sub(1) as f64 * offset;
    match orientation {
        Orientation::Horizontal => Rect::clamped(
            rect.min_x() + shift,
            rect.min_y(),
            rect.width() - shrink,
            rect.height(),
        ),
        Orientation::Vertical => Rect::clamped(
            rect.min_x(),
            rect.min_y() + shift,
            rect.width(),
            rect.height() - shrink,
        ),
    }
    .round()
}

fn split_axis(
    tree: &LayoutTree,
    children: &[NodeId],
    rect: Rect,
    orientation: Orientation,
    settings: &LayoutSettings,
) -> Vec<(NodeId, Rect)> {
    let inner_gap = match orientation {
        Orientation::Horizontal => settings.gaps.inner.horizontal,
        Orientation::Vertical => settings.gaps.inner.vertical,
    };
    let total: f64 = children.iter().map(|&c| tree.weight(c)).sum();
    let axis_len = rect.extent(orientation);
    let total_gap = children.len().saturating_sub(1) as f64 * inner_gap;
    let usable_axis = (axis_len - total_gap).max(0.0);

    let mut offset = rect.min(orientation);
    let mut out = Vec::with_capacity(children.len());
    for (i, &child) in children.iter().enumerate() {
        let seg_len = usable_axis * tree.weight(child) / total;
        let child_rect = match orientation {
            Orientation::Horizontal => Rect::clamped(offset, rect.min_y(), seg_len, rect.height()),
            Orientation::Vertical => Rect::clamped(rect.min_x(), offset, rect.width(), seg_len),
        }
        .round();
        out.push((child, child_rect));
        offset += seg_len;
        if i < children.len() - 1 {
            offset += inner_gap;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::Direction;

    fn w(idx: u32) -> WindowId { WindowId::new(1, idx) }

    fn rect(x: f64, y: f64, wd: f64, h: f64) -> Rect { Rect::new(x, y, wd, h).unwrap() }

    fn tree_with(n: u32) -> LayoutTree {
        let mut tree = LayoutTree::new();
        for i in 1..=n {
            tree.insert_after((i > 1).then(|| w(i - 1)), w(i), LayoutKind::Horizontal);
        }
        tree
    }

    #[test]
    fn two_window_split_and_collapse() {
        let settings = LayoutSettings::default();
        let area = rect(0.0, 0.0, 200.0, 100.0);
        let mut tree = tree_with(2);
        assert_eq!(
            calculate_layout(&tree, area, None, &settings),
            vec![(w(1), rect(0.0, 0.0, 100.0, 100.0)), (w(2), rect(100.0, 0.0, 100.0, 100.0))]
        );
        tree.remove_window(w(1));
        assert_eq!(calculate_layout(&tree, area, None, &settings), vec![(w(2), area)]);
    }

    #[test]
    fn empty_tree_has_no_frames() {
        let tree = LayoutTree::new();
        let frames =
            calculate_layout(&tree, rect(0.0, 0.0, 10.0, 10.0), None, &LayoutSettings::default());
        assert!(frames.is_empty());
    }

    #[test]
    fn split_children_tile_parent_exactly() {
        let settings = LayoutSettings::default();
        let area = rect(13.0, 7.0, 1001.0, 607.0);
        let mut tree = tree_with(3);
        let n1 = tree.node_for(w(1)).unwrap();
        tree.resize(n1, 0.137, 0.05);
        let frames = calculate_layout(&tree, area, None, &settings);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].1.min_x(), area.min_x());
        for pair in frames.windows(2) {
            assert_eq!(pair[0].1.max_x(), pair[1].1.min_x());
        }
        assert_eq!(frames[2].1.max_x(), area.max_x());
        let width: f64 = frames.iter().map(|(_, r)| r.width()).sum();
        assert_eq!(width, area.width());
        for (_, r) in &frames {
            assert_eq!((r.min_y(), r.height()), (area.min_y(), area.height()));
        }
    }

    #[test]
    fn nested_vertical_container() {
        let settings = LayoutSettings::default();
        let mut tree = tree_with(3);
        tree.join(w(2), Direction::Right);
        // H[w1, V[w2, w3]] with the V container weighing 2.
        let frames = calculate_layout(&tree, rect(0.0, 0.0, 300.0, 200.0), None, &settings);
        assert_eq!(
            frames,
            vec![
                (w(1), rect(0.0, 0.0, 100.0, 200.0)),
                (w(2), rect(100.0, 0.0, 200.0, 100.0)),
                (w(3), rect(100.0, 100.0, 200.0, 100.0)),
            ]
        );
        let inner = tree.parent_of_window(w(2)).unwrap();
        assert_eq!(
            node_rect(&tree, inner, rect(0.0, 0.0, 300.0, 200.0), None, &settings),
            Some(rect(100.0, 0.0, 200.0, 200.0))
        );
    }

    #[test]
    fn inner_gaps_are_left_between_children() {
        let mut settings = LayoutSettings::default();
        settings.gaps.inner.horizontal = 10.0;
        let tree = tree_with(2);
        let frames = calculate_layout(&tree, rect(0.0, 0.0, 210.0, 100.0), None, &settings);
        assert_eq!(
            frames,
            vec![(w(1), rect(0.0, 0.0, 100.0, 100.0)), (w(2), rect(110.0, 0.0, 100.0, 100.0))]
        );
    }

    #[test]
    fn stack_emits_focused_last_with_offsets() {
        let settings = LayoutSettings::default();
        let mut tree = tree_with(3);
        let root = tree.root().unwrap();
        tree.set_layout(root, LayoutKind::HorizontalStack);
        let frames = calculate_layout(&tree, rect(0.0, 0.0, 1000.0, 500.0), Some(w(2)), &settings);
        assert_eq!(
            frames,
            vec![
                (w(1), rect(0.0, 0.0, 920.0, 500.0)),
                (w(3), rect(80.0, 0.0, 920.0, 500.0)),
                (w(2), rect(40.0, 0.0, 920.0, 500.0)),
            ]
        );
    }
}
