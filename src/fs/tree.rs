use std::collections::HashMap;
use std::fs;
use std::ops::Index;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::fs::operations;

/// Stable handle to a node in the tree arena.
///
/// A handle stays valid, and keeps naming the same node, until that node is
/// dropped by a collapse or by a refresh that no longer lists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
    Symlink,
}

/// File metadata, read once per refresh and shown in the status bar.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub size: u64,
    #[cfg(unix)]
    pub mode: u32,
}

impl FileMeta {
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        #[cfg(unix)]
        use std::os::unix::fs::PermissionsExt;

        Self {
            size: metadata.len(),
            #[cfg(unix)]
            mode: metadata.permissions().mode(),
        }
    }
}

/// One filesystem entry tracked in memory.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub node_type: NodeType,
    pub meta: FileMeta,
    /// `None` until the directory has been read; `Some(vec![])` for an empty one.
    pub children: Option<Vec<NodeId>>,
    pub parent: Option<NodeId>,
    /// Cursor into `children`, clamped on every structural change.
    pub selected_index: usize,
}

impl Node {
    fn from_entry(
        name: String,
        path: PathBuf,
        metadata: &fs::Metadata,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            name,
            path,
            node_type: node_type_of(metadata),
            meta: FileMeta::from_metadata(metadata),
            children: None,
            parent,
            selected_index: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    fn clamp_selection(&mut self) {
        let len = self.children.as_ref().map_or(0, Vec::len);
        self.selected_index = self.selected_index.min(len.saturating_sub(1));
    }
}

fn node_type_of(metadata: &fs::Metadata) -> NodeType {
    if metadata.is_symlink() {
        NodeType::Symlink
    } else if metadata.is_dir() {
        NodeType::Directory
    } else {
        NodeType::File
    }
}

/// One freshly listed directory entry.
struct Listed {
    name: String,
    path: PathBuf,
    metadata: fs::Metadata,
}

/// A flattened row of the expanded tree, for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub id: NodeId,
    pub depth: usize,
    pub is_last_sibling: bool,
}

/// The navigable tree: node arena plus current directory and mark.
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
    current_dir: NodeId,
    marked: Option<NodeId>,
    dirs_first: bool,
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.nodes[id.0]
            .as_ref()
            .expect("node handles are never kept past release")
    }
}

impl Tree {
    /// Create a tree rooted at `path` and expand the root once.
    pub fn new(path: &Path, dirs_first: bool) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        if !metadata.is_dir() {
            return Err(AppError::InvalidPath(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let root_node = Node::from_entry(name, path.to_path_buf(), &metadata, None);
        let mut tree = Self {
            nodes: vec![Some(root_node)],
            free: Vec::new(),
            root: NodeId(0),
            current_dir: NodeId(0),
            marked: None,
            dirs_first,
        };
        tree.read_children(tree.root)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn current_dir(&self) -> NodeId {
        self.current_dir
    }

    pub fn marked(&self) -> Option<NodeId> {
        self.marked
    }

    /// Look up a node, returning `None` for a handle that has been released.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0]
            .as_mut()
            .expect("node handles are never kept past release")
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Drop a node and its whole subtree from the arena.
    ///
    /// Clears the mark if it pointed into the subtree. Returns whether the
    /// current directory was inside it; callers must re-home it.
    fn release(&mut self, id: NodeId) -> bool {
        let mut hit_current = false;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes[next.0].take() {
                if let Some(children) = node.children {
                    stack.extend(children);
                }
                self.free.push(next.0);
                if self.marked == Some(next) {
                    self.marked = None;
                }
                if self.current_dir == next {
                    hit_current = true;
                }
            }
        }
        hit_current
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<Listed>> {
        let mut listed = Vec::new();
        for entry in fs::read_dir(path)? {
            // Entries that vanish between readdir and stat are skipped.
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(dir = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let entry_path = entry.path();
            let metadata = match fs::symlink_metadata(&entry_path) {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %entry_path.display(), error = %e, "skipping entry without metadata");
                    continue;
                }
            };
            listed.push(Listed {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry_path,
                metadata,
            });
        }

        let dirs_first = self.dirs_first;
        listed.sort_by(|a, b| {
            let mut cmp = std::cmp::Ordering::Equal;
            if dirs_first {
                cmp = b.metadata.is_dir().cmp(&a.metadata.is_dir());
            }
            cmp.then_with(|| a.name.cmp(&b.name))
        });
        Ok(listed)
    }

    /// Re-read a directory's immediate entries and reconcile them with the
    /// existing children.
    ///
    /// Entries whose name matches an existing child reuse that node, so its
    /// own selection and already-read subtree survive. Unmatched entries get
    /// fresh unread nodes; children that are no longer listed are dropped.
    /// On a listing failure the previous children are left untouched.
    pub fn read_children(&mut self, id: NodeId) -> Result<()> {
        if !self[id].is_dir() {
            return Ok(());
        }
        let listed = self.list_dir(&self[id].path)?;

        let mut existing: HashMap<String, NodeId> = self[id]
            .children
            .iter()
            .flatten()
            .map(|&child| (self[child].name.clone(), child))
            .collect();

        let mut children = Vec::with_capacity(listed.len());
        let mut current_lost = false;
        for entry in listed {
            let child = match existing.remove(&entry.name) {
                Some(child) => {
                    let new_type = node_type_of(&entry.metadata);
                    if self[child].node_type != new_type {
                        // Replaced on disk by a different kind of entry.
                        for grandchild in self.node_mut(child).children.take().unwrap_or_default() {
                            current_lost |= self.release(grandchild);
                        }
                        self.node_mut(child).clamp_selection();
                        current_lost |= self.current_dir == child;
                    }
                    let node = self.node_mut(child);
                    node.node_type = new_type;
                    node.meta = FileMeta::from_metadata(&entry.metadata);
                    child
                }
                None => self.alloc(Node::from_entry(
                    entry.name,
                    entry.path,
                    &entry.metadata,
                    Some(id),
                )),
            };
            children.push(child);
        }

        let dropped = existing.len();
        for (_, stale) in existing {
            current_lost |= self.release(stale);
        }

        let node = self.node_mut(id);
        node.children = Some(children);
        node.clamp_selection();

        if current_lost {
            self.current_dir = id;
        }
        debug!(
            dir = %self[id].path.display(),
            entries = self[id].children.as_ref().map_or(0, Vec::len),
            dropped,
            "read children"
        );
        Ok(())
    }

    /// Release a directory's children back to the unread state.
    ///
    /// No-op when the node is the current directory or one of its ancestors,
    /// since the current directory must always stay read.
    pub fn collapse(&mut self, id: NodeId) {
        if self.is_ancestor_or_self(id, self.current_dir) {
            return;
        }
        if let Some(children) = self.node_mut(id).children.take() {
            for child in children {
                self.release(child);
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self[id].parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    // ── Selection & navigation ──────────────────────────────────────────────

    /// The child of the current directory under the cursor.
    pub fn get_selected_child(&self) -> Option<NodeId> {
        let dir = &self[self.current_dir];
        dir.children
            .as_ref()
            .and_then(|children| children.get(dir.selected_index).copied())
    }

    fn current_len(&self) -> usize {
        self[self.current_dir].children.as_ref().map_or(0, Vec::len)
    }

    pub fn select_next(&mut self) {
        let len = self.current_len();
        let dir = self.node_mut(self.current_dir);
        if dir.selected_index + 1 < len {
            dir.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        let dir = self.node_mut(self.current_dir);
        dir.selected_index = dir.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.node_mut(self.current_dir).selected_index = 0;
    }

    pub fn select_last(&mut self) {
        let len = self.current_len();
        self.node_mut(self.current_dir).selected_index = len.saturating_sub(1);
    }

    /// Make the selected directory the current one, reading it if needed.
    ///
    /// Returns whether the current directory changed.
    pub fn descend_into_selected(&mut self) -> Result<bool> {
        let Some(selected) = self.get_selected_child() else {
            return Ok(false);
        };
        if !self[selected].is_dir() {
            return Ok(false);
        }
        if !self[selected].is_expanded() {
            self.read_children(selected)?;
        }
        self.current_dir = selected;
        Ok(true)
    }

    /// Move up to the parent, pointing its cursor back at the directory left.
    pub fn ascend_to_parent(&mut self) {
        let Some(parent) = self[self.current_dir].parent else {
            return;
        };
        let left = self.current_dir;
        let name = self[left].name.clone();
        let position = self[parent]
            .children
            .as_ref()
            .and_then(|children| children.iter().position(|&c| self[c].name == name));
        let parent_node = self.node_mut(parent);
        if let Some(index) = position {
            parent_node.selected_index = index;
        }
        parent_node.clamp_selection();
        self.current_dir = parent;
    }

    /// Collapse the selected child if it is read, expand it otherwise.
    pub fn toggle_expand_selected(&mut self) -> Result<()> {
        let Some(selected) = self.get_selected_child() else {
            return Ok(());
        };
        if self[selected].is_expanded() {
            self.collapse(selected);
        } else {
            self.read_children(selected)?;
        }
        Ok(())
    }

    // ── Mark-then-act ───────────────────────────────────────────────────────

    /// Stage the selected child as the source of a pending action.
    ///
    /// Returns `false`, leaving any previous mark as is, when nothing is selected.
    pub fn mark_selected(&mut self) -> bool {
        match self.get_selected_child() {
            Some(selected) => {
                self.marked = Some(selected);
                true
            }
            None => false,
        }
    }

    pub fn drop_mark(&mut self) {
        self.marked = None;
    }

    /// Refresh a directory if it is still part of the tree.
    fn refresh_if_live(&mut self, id: NodeId) -> Result<()> {
        if self.get(id).is_some() {
            self.read_children(id)?;
        }
        Ok(())
    }

    pub fn copy_marked_to_current(&mut self) -> Result<()> {
        let Some(marked) = self.marked else {
            return Ok(());
        };
        let src = self[marked].path.clone();
        let dest = operations::copy_recursive(&src, &self[self.current_dir].path)?;
        info!(from = %src.display(), to = %dest.display(), "copied");

        self.marked = None;
        self.read_children(self.current_dir)
    }

    pub fn move_marked_to_current(&mut self) -> Result<()> {
        let Some(marked) = self.marked else {
            return Ok(());
        };
        let src = self[marked].path.clone();
        let source_dir = self[marked].parent;
        let dest = operations::move_item(&src, &self[self.current_dir].path)?;
        info!(from = %src.display(), to = %dest.display(), "moved");

        self.marked = None;
        self.read_children(self.current_dir)?;
        if let Some(source_dir) = source_dir {
            self.refresh_if_live(source_dir)?;
        }
        Ok(())
    }

    /// Delete the marked entry. The mark is consumed whether or not the delete succeeds.
    pub fn delete_marked(&mut self) -> Result<()> {
        let Some(marked) = self.marked else {
            return Ok(());
        };
        let path = self[marked].path.clone();
        let parent = self[marked].parent;
        let deleted = operations::delete(&path);
        self.marked = None;
        deleted?;
        info!(path = %path.display(), "deleted");

        if let Some(parent) = parent {
            self.refresh_if_live(parent)?;
        }
        Ok(())
    }

    /// Rename the marked entry in place; like delete, this always consumes the mark.
    pub fn rename_marked(&mut self, new_name: &str) -> Result<()> {
        let Some(marked) = self.marked else {
            return Ok(());
        };
        let path = self[marked].path.clone();
        let parent = self[marked].parent;
        let renamed = operations::rename(&path, new_name);
        self.marked = None;
        let dest = renamed?;
        info!(from = %path.display(), to = %dest.display(), "renamed");

        if let Some(parent) = parent {
            self.refresh_if_live(parent)?;
        }
        Ok(())
    }

    pub fn create_file_in_current(&mut self, name: &str) -> Result<()> {
        let path = operations::create_file(&self[self.current_dir].path, name)?;
        info!(path = %path.display(), "created file");
        self.read_children(self.current_dir)
    }

    pub fn create_dir_in_current(&mut self, name: &str) -> Result<()> {
        let path = operations::create_dir(&self[self.current_dir].path, name)?;
        info!(path = %path.display(), "created directory");
        self.read_children(self.current_dir)
    }

    // ── External change handling ────────────────────────────────────────────

    /// Find a node by walking from the root along `path`'s components.
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        let rel = path.strip_prefix(&self[self.root].path).ok()?;
        let mut id = self.root;
        for component in rel.components() {
            let Component::Normal(name) = component else {
                return None;
            };
            let name = name.to_string_lossy();
            id = self[id]
                .children
                .as_ref()?
                .iter()
                .copied()
                .find(|&c| self[c].name == name)?;
        }
        Some(id)
    }

    /// Re-read the children of the directory at `path`, if it is tracked and read.
    pub fn refresh_path(&mut self, path: &Path) -> Result<()> {
        let Some(id) = self.find_by_path(path) else {
            debug!(path = %path.display(), "change for untracked path ignored");
            return Ok(());
        };
        if !self[id].is_expanded() {
            return Ok(());
        }
        self.read_children(id)
    }

    // ── Rendering support ───────────────────────────────────────────────────

    /// Flatten the expanded part of the tree, root first, in display order.
    pub fn flatten(&self) -> Vec<FlatItem> {
        let mut items = Vec::new();
        self.flatten_node(self.root, 0, true, &mut items);
        items
    }

    fn flatten_node(&self, id: NodeId, depth: usize, is_last: bool, items: &mut Vec<FlatItem>) {
        items.push(FlatItem {
            id,
            depth,
            is_last_sibling: is_last,
        });
        if let Some(children) = &self[id].children {
            for (i, &child) in children.iter().enumerate() {
                self.flatten_node(child, depth + 1, i + 1 == children.len(), items);
            }
        }
    }
}
