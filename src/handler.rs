use crossterm::event::KeyEvent;
use tracing::warn;

use crate::app::{App, Effect};
use crate::error::AppError;
use crate::fs::watcher::FsWatcher;
use crate::keys::Key;

/// Handle a key event: run it through the operation state machine and carry
/// out whatever the machine asks of the outside world.
pub fn handle_key_event(app: &mut App, key: KeyEvent, watcher: Option<&mut FsWatcher>) {
    let Some(key) = Key::from_event(&key) else {
        return;
    };

    match app.process_key(key) {
        Ok(Some(Effect::Quit)) => app.quit(),
        Ok(Some(Effect::Watch(dir))) => {
            if let Some(watcher) = watcher {
                if let Err(e) = watcher.watch(&dir).map_err(AppError::from) {
                    warn!(dir = %dir.display(), error = %e, "cannot watch directory");
                    app.set_status_message(e.to_string());
                }
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!(?key, error = %e, "key action failed");
            app.set_status_message(format!("Error: {}", e));
        }
    }
}
