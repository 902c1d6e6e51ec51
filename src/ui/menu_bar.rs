use std::io::{self, Write};

use tracing::debug;

use crate::common::config::MAIN_MODE;
use crate::model::monitor::MonitorId;

const SEPARATOR: &str = " │ ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub monitor: MonitorId,
    pub workspace: String,
    pub focused: bool,
}

/// What the status tray shows, recomputed after every reactor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub text: String,
    pub active_mode: String,
    /// False while tiling is paused.
    pub enabled: bool,
    pub monitors: Vec<MonitorStatus>,
}

static_assertions::assert_impl_all!(StatusSnapshot: Send, Sync);

impl Default for StatusSnapshot {
    fn default() -> Self { Self::new(MAIN_MODE, true, Vec::new()) }
}

impl StatusSnapshot {
    pub fn new(active_mode: &str, enabled: bool, monitors: Vec<MonitorStatus>) -> Self {
        Self {
            text: render_tray_text(active_mode, &monitors),
            active_mode: active_mode.to_string(),
            enabled,
            monitors,
        }
    }
}

/// `"[m] 1 │ *2"`: the mode's first character unless it is the main mode,
/// then each monitor's workspace in registry order. The focused monitor is
/// starred only when there is more than one.
pub fn render_tray_text(active_mode: &str, monitors: &[MonitorStatus]) -> String {
    let mut text = String::new();
    if active_mode != MAIN_MODE {
        if let Some(label) = active_mode.chars().next() {
            text.push('[');
            text.push(label);
            text.push_str("] ");
        }
    }
    let mark = monitors.len() > 1;
    let entries: Vec<String> = monitors
        .iter()
        .map(|m| {
            if mark && m.focused {
                format!("*{}", m.workspace)
            } else {
                m.workspace.clone()
            }
        })
        .collect();
    text.push_str(&entries.join(SEPARATOR));
    text
}

/// Text-mode stand-in for a status bar item: writes one line per change.
pub struct MenuIcon<W> {
    out: W,
    shown: Option<String>,
}

impl<W: Write> MenuIcon<W> {
    pub fn new(out: W) -> Self { Self { out, shown: None } }

    /// Shows the tray text, marked `(paused)` while tiling is off.
    pub fn update(&mut self, snapshot: &StatusSnapshot) -> io::Result<()> {
        let line = if snapshot.enabled {
            snapshot.text.clone()
        } else {
            format!("{} (paused)", snapshot.text)
        };
        if self.shown.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        debug!(%line, "updating status item");
        writeln!(self.out, "status: {line}")?;
        self.out.flush()?;
        self.shown = Some(line);
        Ok(())
    }

    pub fn into_inner(self) -> W { self.out }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn status(id: u32, ws: &str, focused: bool) -> MonitorStatus {
        MonitorStatus {
            monitor: MonitorId::new(id),
            workspace: ws.to_string(),
            focused,
        }
    }

    #[test]
    fn two_monitors_in_main_mode() {
        let monitors = [status(0, "1", true), status(1, "2", false)];
        assert_eq!(render_tray_text("main", &monitors), "*1 │ 2");
    }

    #[test]
    fn single_monitor_is_not_starred() {
        assert_eq!(render_tray_text("main", &[status(0, "main", true)]), "main");
    }

    #[test]
    fn other_modes_get_a_label() {
        let monitors = [status(0, "1", false), status(1, "web", true)];
        assert_eq!(render_tray_text("resize", &monitors), "[r] 1 │ *web");
    }

    #[test]
    fn icon_writes_only_changes() {
        let mut icon = MenuIcon::new(Vec::new());
        let a = StatusSnapshot::new("main", true, vec![status(0, "1", true)]);
        let b = StatusSnapshot::new("main", true, vec![status(0, "2", true)]);
        icon.update(&a).unwrap();
        icon.update(&a).unwrap();
        icon.update(&b).unwrap();
        let out = String::from_utf8(icon.into_inner()).unwrap();
        assert_eq!(out, "status: 1\nstatus: 2\n");
    }

    #[test]
    fn icon_marks_paused_tiling() {
        let mut icon = MenuIcon::new(Vec::new());
        let on = StatusSnapshot::new("main", true, vec![status(0, "1", true)]);
        let off = StatusSnapshot::new("main", false, vec![status(0, "1", true)]);
        assert_eq!(on.text, off.text);
        icon.update(&on).unwrap();
        icon.update(&off).unwrap();
        icon.update(&on).unwrap();
        let out = String::from_utf8(icon.into_inner()).unwrap();
        assert_eq!(out, "status: 1\nstatus: 1 (paused)\nstatus: 1\n");
    }
}
