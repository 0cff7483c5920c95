/// The pending operation the key state machine is in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[default]
    Noop,
    /// Waiting for `p`. Navigation, esc and quit stay live so the paste
    /// target can be chosen; other commands are ignored.
    Move,
    /// Same as `Move`, but the marked entry is copied.
    Copy,
    Delete,
    GoTo,
    Insert,
    InsertFile,
    InsertDir,
    Rename,
}

impl Operation {
    /// Short label shown in the status bar.
    pub fn label(self) -> &'static str {
        match self {
            Operation::Noop => "",
            Operation::Move => "moving",
            Operation::Copy => "copying",
            Operation::Delete => "confirm removing (y/n) of",
            Operation::GoTo => "g",
            Operation::Insert => "create new (f)ile/(d)irectory",
            Operation::InsertFile => "enter new file name:",
            Operation::InsertDir => "enter new directory name:",
            Operation::Rename => "renaming",
        }
    }

    /// Whether keys are collected into the input buffer.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Operation::InsertFile | Operation::InsertDir | Operation::Rename
        )
    }

    /// Whether the label refers to the marked entry.
    pub fn shows_marked(self) -> bool {
        matches!(
            self,
            Operation::Move | Operation::Copy | Operation::Delete | Operation::Rename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_noop() {
        assert_eq!(Operation::default(), Operation::Noop);
        assert_eq!(Operation::Noop.label(), "");
    }

    #[test]
    fn input_operations() {
        assert!(Operation::InsertFile.is_input());
        assert!(Operation::InsertDir.is_input());
        assert!(Operation::Rename.is_input());
        assert!(!Operation::Insert.is_input());
        assert!(!Operation::Delete.is_input());
    }

    #[test]
    fn labels_for_pending_actions() {
        assert_eq!(Operation::Copy.label(), "copying");
        assert_eq!(Operation::Move.label(), "moving");
        assert!(Operation::Delete.label().contains("(y/n)"));
        assert!(Operation::Delete.shows_marked());
        assert!(!Operation::InsertFile.shows_marked());
    }
}
