use super::{Algorithm, Placement, SheetSize};

/// A box to place: caller-chosen key plus pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutItem<K> {
    pub key: K,
    pub width: u32,
    pub height: u32,
}

impl<K> LayoutItem<K> {
    pub fn new(key: K, width: u32, height: u32) -> Self {
        Self { key, width, height }
    }
}

/// Result of arranging items: one placement per input item, in input order.
#[derive(Debug, Clone)]
pub struct Layout<K> {
    pub placements: Vec<(K, Placement)>,
    pub size: SheetSize,
}

/// Arranges `items` with `algorithm`, leaving `padding` pixels between neighbours.
///
/// The sheet is sized to the placed content; padding never trails the last image.
pub fn arrange<K: Clone>(
    items: &[LayoutItem<K>],
    algorithm: Algorithm,
    padding: u32,
) -> Layout<K> {
    let origins = match algorithm {
        Algorithm::TopDown => stack(items, padding, false, true),
        Algorithm::LeftRight => stack(items, padding, true, false),
        Algorithm::Diagonal => stack(items, padding, true, true),
        Algorithm::AltDiagonal => alt_diagonal(items, padding),
        Algorithm::BinaryTree => binary_tree(items, padding),
    };
    let mut size = SheetSize::default();
    let placements = items
        .iter()
        .zip(origins)
        .map(|(item, (x, y))| {
            size.width = size.width.max(x + item.width);
            size.height = size.height.max(y + item.height);
            (
                item.key.clone(),
                Placement {
                    x,
                    y,
                    width: item.width,
                    height: item.height,
                },
            )
        })
        .collect();
    Layout { placements, size }
}

fn stack<K>(
    items: &[LayoutItem<K>],
    padding: u32,
    advance_x: bool,
    advance_y: bool,
) -> Vec<(u32, u32)> {
    let (mut x, mut y) = (0u32, 0u32);
    items
        .iter()
        .map(|item| {
            let origin = (x, y);
            if advance_x {
                x += item.width + padding;
            }
            if advance_y {
                y += item.height + padding;
            }
            origin
        })
        .collect()
}

fn alt_diagonal<K>(items: &[LayoutItem<K>], padding: u32) -> Vec<(u32, u32)> {
    let total_w: u32 = items.iter().map(|i| i.width + padding).sum::<u32>();
    let mut right = total_w.saturating_sub(padding);
    let mut y = 0u32;
    items
        .iter()
        .map(|item| {
            let origin = (right.saturating_sub(item.width), y);
            right = right.saturating_sub(item.width + padding);
            y += item.height + padding;
            origin
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Node {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    used: bool,
    right: Option<usize>,
    down: Option<usize>,
}

impl Node {
    fn free(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Binary-tree packer that grows its root right or down as needed.
struct GrowingPacker {
    nodes: Vec<Node>,
    root: usize,
}

impl GrowingPacker {
    fn new(w: u32, h: u32) -> Self {
        Self {
            nodes: vec![Node::free(0, 0, w, h)],
            root: 0,
        }
    }

    fn fit(&mut self, w: u32, h: u32) -> (u32, u32) {
        match self.find(self.root, w, h) {
            Some(idx) => self.split(idx, w, h),
            None => self.grow(w, h),
        }
    }

    fn find(&self, idx: usize, w: u32, h: u32) -> Option<usize> {
        let node = self.nodes[idx];
        if node.used {
            node.right
                .and_then(|r| self.find(r, w, h))
                .or_else(|| node.down.and_then(|d| self.find(d, w, h)))
        } else if w <= node.w && h <= node.h {
            Some(idx)
        } else {
            None
        }
    }

    fn split(&mut self, idx: usize, w: u32, h: u32) -> (u32, u32) {
        let node = self.nodes[idx];
        let down = self.push(Node::free(node.x, node.y + h, node.w, node.h - h));
        let right = self.push(Node::free(node.x + w, node.y, node.w - w, h));
        let n = &mut self.nodes[idx];
        n.used = true;
        n.down = Some(down);
        n.right = Some(right);
        (node.x, node.y)
    }

    fn grow(&mut self, w: u32, h: u32) -> (u32, u32) {
        let root = self.nodes[self.root];
        let can_down = w <= root.w;
        let can_right = h <= root.h;
        let should_right = can_right && root.h >= root.w + w;
        let should_down = can_down && root.w >= root.h + h;
        if should_right || (!should_down && can_right) {
            self.grow_right(w, h)
        } else if can_down {
            self.grow_down(w, h)
        } else {
            // Taller and wider than everything so far: widen and let the
            // new right strip take the full height.
            self.grow_right(w, h)
        }
    }

    fn grow_right(&mut self, w: u32, h: u32) -> (u32, u32) {
        let root = self.nodes[self.root];
        let height = root.h.max(h);
        let right = self.push(Node::free(root.w, 0, w, height));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: root.w + w,
            h: height,
            used: true,
            right: Some(right),
            down: Some(self.root),
        });
        self.root = new_root;
        self.fit(w, h)
    }

    fn grow_down(&mut self, w: u32, h: u32) -> (u32, u32) {
        let root = self.nodes[self.root];
        let down = self.push(Node::free(0, root.h, root.w, h));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: root.w,
            h: root.h + h,
            used: true,
            right: Some(self.root),
            down: Some(down),
        });
        self.root = new_root;
        self.fit(w, h)
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}

fn binary_tree<K>(items: &[LayoutItem<K>], padding: u32) -> Vec<(u32, u32)> {
    let mut origins = vec![(0, 0); items.len()];
    if items.is_empty() {
        return origins;
    }
    // stable order: largest side first, ties keep input order
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        let (ia, ib) = (&items[a], &items[b]);
        ib.width
            .max(ib.height)
            .cmp(&ia.width.max(ia.height))
            .then_with(|| (ib.width * ib.height).cmp(&(ia.width * ia.height)))
    });
    let first = &items[order[0]];
    let mut packer = GrowingPacker::new(first.width + padding, first.height + padding);
    for idx in order {
        let item = &items[idx];
        origins[idx] = packer.fit(item.width + padding, item.height + padding);
    }
    origins
}
