use tracing::{debug, info, warn};

use crate::actor::reactor::{FrameSink, Reactor, WmCmd, WmCommand};
use crate::common::config::{Config, MAIN_MODE};
use crate::layout_engine::LayoutCommand;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_hotkey<S: FrameSink>(reactor: &mut Reactor<S>, key: &str) {
        let Some(commands) = reactor.config.binding(&reactor.context.active_mode, key) else {
            debug!(key, mode = %reactor.context.active_mode, "unbound key");
            return;
        };
        for cmd in commands.to_vec() {
            Self::handle_command(reactor, cmd);
        }
    }

    pub fn handle_command<S: FrameSink>(reactor: &mut Reactor<S>, cmd: WmCommand) {
        match cmd {
            WmCommand::Wm(WmCmd::EnterMode(mode)) => Self::handle_enter_mode(reactor, mode),
            WmCommand::Wm(WmCmd::ToggleEnabled) => Self::handle_toggle_enabled(reactor),
            WmCommand::Wm(WmCmd::DumpTrees) => {
                for (id, ws) in reactor.layout.workspaces().iter() {
                    info!("workspace {}:\n{}", ws.name, reactor.layout.draw_tree(id));
                }
            }
            WmCommand::Layout(cmd) => Self::handle_command_layout(reactor, cmd),
        }
    }

    pub fn handle_command_layout<S: FrameSink>(reactor: &mut Reactor<S>, cmd: LayoutCommand) {
        info!(?cmd);
        if !reactor.context.enabled {
            debug!(?cmd, "tiling paused - ignoring");
            return;
        }
        let Some(focused) = reactor.context.focused_monitor else {
            warn!(?cmd, "no monitor to run command on");
            return;
        };
        let response = reactor.layout.handle_command(focused, &cmd);
        reactor.handle_layout_response(response);
    }

    fn handle_toggle_enabled<S: FrameSink>(reactor: &mut Reactor<S>) {
        reactor.context.enabled = !reactor.context.enabled;
        if reactor.context.enabled {
            reactor.forget_all_frames();
        }
        info!(enabled = reactor.context.enabled, "tiling toggled");
    }

    fn handle_enter_mode<S: FrameSink>(reactor: &mut Reactor<S>, mode: String) {
        if !reactor.config.modes.contains_key(&mode) {
            warn!(%mode, "unknown mode");
            return;
        }
        debug!(from = %reactor.context.active_mode, to = %mode, "entering mode");
        reactor.context.active_mode = mode;
    }

    pub fn handle_config_updated<S: FrameSink>(reactor: &mut Reactor<S>, new_cfg: Config) {
        reactor.config = new_cfg;
        reactor.layout.set_settings(reactor.config.settings.clone());
        if !reactor.config.modes.contains_key(&reactor.context.active_mode) {
            reactor.context.active_mode = MAIN_MODE.to_string();
        }
        info!("config updated");
    }
}
