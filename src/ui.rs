use ratatui::{
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::status_bar::{describe, StatusBarWidget};
use crate::components::tree::TreeWidget;

/// Render the application UI: the tree above a one-line status bar.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    // Keep the selected row visible; 2 rows go to the border
    let visible_height = chunks[0].height.saturating_sub(2) as usize;
    app.update_scroll(visible_height);

    let tree = &app.tree;
    let block = Block::default()
        .title(format!(" {} ", tree[tree.root()].name))
        .borders(Borders::ALL);
    frame.render_widget(TreeWidget::new(tree, app.scroll_offset).block(block), chunks[0]);

    let current_path = tree[tree.current_dir()].path.display().to_string();
    let file_info = tree
        .get_selected_child()
        .map(|id| describe(&tree[id]))
        .unwrap_or_default();
    let marked_name = tree.marked().map(|id| tree[id].name.as_str());
    let status = StatusBarWidget::new(&current_path, app.operation)
        .file_info(&file_info)
        .marked_name(marked_name)
        .input(&app.input)
        .status_message(app.status_message.as_ref().map(|(msg, _)| msg.as_str()));
    frame.render_widget(status, chunks[1]);
}
