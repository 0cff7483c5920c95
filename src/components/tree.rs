use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::tree::{FlatItem, Node, NodeType, Tree};

/// Tree widget that renders the expanded part of the tree with box-drawing
/// characters, starting at the root.
pub struct TreeWidget<'a> {
    tree: &'a Tree,
    scroll_offset: usize,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree: &'a Tree, scroll_offset: usize) -> Self {
        Self {
            tree,
            scroll_offset,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// Continuation lines depend on whether each ancestor was a last sibling,
    /// which is found by walking back through `items`.
    fn build_prefix(item: &FlatItem, items: &[FlatItem], item_index: usize) -> String {
        if item.depth == 0 {
            return String::new();
        }

        let mut prefix = String::new();
        for d in 1..item.depth {
            let ancestor_is_last = items[..item_index]
                .iter()
                .rev()
                .take_while(|it| it.depth >= d)
                .find(|it| it.depth == d)
                .is_some_and(|it| it.is_last_sibling);
            prefix.push_str(if ancestor_is_last { "   " } else { "│  " });
        }
        prefix.push_str(if item.is_last_sibling { "└──" } else { "├──" });
        prefix
    }

    fn indicator(node: &Node) -> &'static str {
        match node.node_type {
            NodeType::Directory if node.is_expanded() => "▾ ",
            NodeType::Directory => "▸ ",
            NodeType::Symlink => "↪ ",
            NodeType::File => "  ",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let items = self.tree.flatten();
        let visible_height = inner_area.height as usize;
        if items.is_empty() || visible_height == 0 {
            return;
        }

        let selected = self.tree.get_selected_child();
        let current = self.tree.current_dir();
        let marked = self.tree.marked();

        let visible = items
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (row, (idx, item)) in visible.enumerate() {
            let node = &self.tree[item.id];
            let y = inner_area.y + row as u16;

            let mut style = match node.node_type {
                NodeType::Directory => Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
                NodeType::Symlink => Style::default().fg(Color::Cyan),
                NodeType::File => Style::default().fg(Color::White),
            };
            if item.id == current {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if Some(item.id) == marked {
                style = style.fg(Color::Yellow).add_modifier(Modifier::ITALIC);
            }
            if Some(item.id) == selected {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let prefix = Self::build_prefix(item, &items, idx);
            let line = Line::from(vec![
                Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                Span::styled(Self::indicator(node), style),
                Span::styled(node.name.as_str(), style),
            ]);
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::tree::NodeId;
    use std::fs;
    use tempfile::TempDir;

    fn flat(id: NodeId, depth: usize, is_last_sibling: bool) -> FlatItem {
        FlatItem {
            id,
            depth,
            is_last_sibling,
        }
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn prefix_for_nested_items() {
        let dir = TempDir::new().unwrap();
        let id = Tree::new(dir.path(), false).unwrap().root();
        let items = vec![
            flat(id, 0, true),
            flat(id, 1, false),
            flat(id, 2, true),
            flat(id, 1, true),
            flat(id, 2, true),
        ];
        assert_eq!(TreeWidget::build_prefix(&items[0], &items, 0), "");
        assert_eq!(TreeWidget::build_prefix(&items[1], &items, 1), "├──");
        assert_eq!(TreeWidget::build_prefix(&items[2], &items, 2), "│  └──");
        assert_eq!(TreeWidget::build_prefix(&items[3], &items, 3), "└──");
        assert_eq!(TreeWidget::build_prefix(&items[4], &items, 4), "   └──");
    }

    #[test]
    fn renders_root_and_children() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("main.rs"), "").unwrap();
        let tree = Tree::new(dir.path(), false).unwrap();

        let area = Rect::new(0, 0, 40, 4);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&tree, 0).render(area, &mut buf);

        let root_name = tree[tree.root()].name.clone();
        assert!(row_text(&buf, 0).ends_with(&root_name));
        assert_eq!(row_text(&buf, 1), "├──▸ docs");
        assert_eq!(row_text(&buf, 2), "└──  main.rs");
        assert_eq!(row_text(&buf, 3), "");
    }

    #[test]
    fn selected_row_is_reversed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        let mut tree = Tree::new(dir.path(), false).unwrap();
        tree.select_next();

        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&tree, 0).render(area, &mut buf);

        // "├──" is 3 cells, the name starts after the 2-cell indicator
        let a_cell = &buf[(5, 1)];
        let b_cell = &buf[(5, 2)];
        assert_eq!(a_cell.symbol(), "a");
        assert_eq!(b_cell.symbol(), "b");
        assert!(!a_cell.modifier.contains(Modifier::REVERSED));
        assert!(b_cell.modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn scroll_offset_skips_rows() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let tree = Tree::new(dir.path(), false).unwrap();

        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&tree, 2).render(area, &mut buf);
        assert_eq!(row_text(&buf, 0), "├──  b");
        assert_eq!(row_text(&buf, 1), "└──  c");
    }
}
