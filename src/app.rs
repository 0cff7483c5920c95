use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::fs::tree::Tree;
use crate::keys::Key;
use crate::operation::Operation;

/// Requests the state machine makes of the outer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The quit key was pressed.
    Quit,
    /// A directory was entered for the first time; start watching it.
    Watch(PathBuf),
}

/// Main application state.
pub struct App {
    pub tree: Tree,
    pub operation: Operation,
    /// Text collected while inserting or renaming.
    pub input: String,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
    pub scroll_offset: usize,
    /// Directories the watcher has been asked to observe.
    watched: HashSet<PathBuf>,
}

impl App {
    /// Create a new App rooted at the given directory.
    pub fn new(path: &Path, dirs_first: bool) -> Result<Self> {
        let tree = Tree::new(path, dirs_first)?;
        let watched = HashSet::from([path.to_path_buf()]);
        Ok(Self {
            tree,
            operation: Operation::Noop,
            input: String::new(),
            should_quit: false,
            status_message: None,
            scroll_offset: 0,
            watched,
        })
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Feed one key into the operation state machine.
    ///
    /// Any error from the tree puts the machine back to `Noop` with an empty
    /// input buffer before it is returned, so input never gets stuck.
    pub fn process_key(&mut self, key: Key) -> Result<Option<Effect>> {
        let from = self.operation;
        let result = match self.operation {
            Operation::Noop => self.key_noop(key),
            Operation::Copy | Operation::Move => self.key_paste(key),
            Operation::Delete => self.key_delete(key),
            Operation::GoTo => self.key_goto(key),
            Operation::Insert => self.key_insert(key),
            Operation::InsertFile | Operation::InsertDir | Operation::Rename => {
                self.key_input(key)
            }
        };
        if result.is_err() {
            self.operation = Operation::Noop;
            self.input.clear();
        }
        if from != self.operation {
            debug!(?key, ?from, to = ?self.operation, "operation changed");
        }
        result
    }

    fn key_noop(&mut self, key: Key) -> Result<Option<Effect>> {
        if key.is_quit() {
            return Ok(Some(Effect::Quit));
        }
        match key {
            Key::Esc => {
                self.tree.drop_mark();
                self.operation = Operation::Noop;
            }
            Key::Char('j') | Key::Down => self.tree.select_next(),
            Key::Char('k') | Key::Up => self.tree.select_previous(),
            Key::Char('l') | Key::Right => return self.descend(),
            Key::Char('h') | Key::Left => self.tree.ascend_to_parent(),
            Key::Char('y') => {
                if self.tree.mark_selected() {
                    self.operation = Operation::Copy;
                }
            }
            Key::Char('d') => {
                if self.tree.mark_selected() {
                    self.operation = Operation::Move;
                }
            }
            Key::Char('D') => {
                if self.tree.mark_selected() {
                    self.operation = Operation::Delete;
                }
            }
            Key::Char('g') => self.operation = Operation::GoTo,
            Key::Char('G') => self.tree.select_last(),
            Key::Char('i') => {
                self.tree.drop_mark();
                self.operation = Operation::Insert;
            }
            Key::Char('r') => {
                if self.tree.mark_selected() {
                    if let Some(marked) = self.tree.marked() {
                        self.input = self.tree[marked].name.clone();
                    }
                    self.operation = Operation::Rename;
                }
            }
            Key::Enter => self.tree.toggle_expand_selected()?,
            _ => {}
        }
        Ok(None)
    }

    fn descend(&mut self) -> Result<Option<Effect>> {
        if !self.tree.descend_into_selected()? {
            return Ok(None);
        }
        let path = self.tree[self.tree.current_dir()].path.clone();
        if self.watched.insert(path.clone()) {
            Ok(Some(Effect::Watch(path)))
        } else {
            Ok(None)
        }
    }

    /// Copy/Move stay pending until `p` pastes; navigation, cancel and quit
    /// are served by the `Noop` table without leaving the pending state.
    fn key_paste(&mut self, key: Key) -> Result<Option<Effect>> {
        match key {
            Key::Char('p') => {
                let op = self.operation;
                self.operation = Operation::Noop;
                if op == Operation::Copy {
                    self.tree.copy_marked_to_current()?;
                } else {
                    self.tree.move_marked_to_current()?;
                }
                Ok(None)
            }
            Key::Char('j' | 'k' | 'l' | 'h' | 'G' | 'q')
            | Key::Ctrl('c')
            | Key::Up
            | Key::Down
            | Key::Left
            | Key::Right
            | Key::Enter
            | Key::Esc => self.key_noop(key),
            _ => Ok(None),
        }
    }

    fn key_delete(&mut self, key: Key) -> Result<Option<Effect>> {
        self.operation = Operation::Noop;
        if key == Key::Char('y') {
            self.tree.delete_marked()?;
            return Ok(None);
        }
        self.tree.drop_mark();
        self.key_noop(key)
    }

    fn key_goto(&mut self, key: Key) -> Result<Option<Effect>> {
        self.operation = Operation::Noop;
        if key == Key::Char('g') {
            self.tree.select_first();
            return Ok(None);
        }
        self.key_noop(key)
    }

    fn key_insert(&mut self, key: Key) -> Result<Option<Effect>> {
        match key {
            Key::Char('f') => self.operation = Operation::InsertFile,
            Key::Char('d') => self.operation = Operation::InsertDir,
            _ => {
                self.operation = Operation::Noop;
                return self.key_noop(key);
            }
        }
        Ok(None)
    }

    fn key_input(&mut self, key: Key) -> Result<Option<Effect>> {
        if key.is_cancel() {
            self.tree.drop_mark();
            self.input.clear();
            self.operation = Operation::Noop;
            return Ok(None);
        }
        match key {
            Key::Enter => {
                let text = std::mem::take(&mut self.input);
                let op = std::mem::take(&mut self.operation);
                match op {
                    Operation::InsertFile => self.tree.create_file_in_current(&text)?,
                    Operation::InsertDir => self.tree.create_dir_in_current(&text)?,
                    Operation::Rename => self.tree.rename_marked(&text)?,
                    _ => {}
                }
            }
            Key::Backspace => {
                self.input.pop();
            }
            Key::Char(c) => self.input.push(c),
            _ => {}
        }
        Ok(None)
    }

    /// React to watcher notifications: re-read each changed directory.
    pub fn handle_fs_change(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if let Err(e) = self.tree.refresh_path(&path) {
                warn!(path = %path.display(), error = %e, "refresh after change failed");
                self.set_status_message(format!("{}: {}", path.display(), e));
            }
        }
    }

    /// Index of the selected row within `Tree::flatten()`, if any.
    pub fn selected_row(&self) -> Option<usize> {
        let selected = self.tree.get_selected_child()?;
        self.tree.flatten().iter().position(|item| item.id == selected)
    }

    /// Update the scroll offset to ensure the selected row is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        let selected = self.selected_row().unwrap_or(0);
        if selected < self.scroll_offset {
            self.scroll_offset = selected;
        } else if selected >= self.scroll_offset + visible_height {
            self.scroll_offset = selected - visible_height + 1;
        }
    }
}
