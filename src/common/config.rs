use std::path::{Path, PathBuf};

use anyhow::bail;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::actor::reactor::WmCommand;
use crate::common::collections::{BTreeMap, HashMap, HashSet};
use crate::layout_engine::Orientation;

/// The mode every configuration starts in. It is never shown in the tray.
pub const MAIN_MODE: &str = "main";

const MAX_MIN_SHARE: f64 = 0.5;

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".trellis.toml")
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    workspaces: WorkspaceSettings,
    #[serde(default)]
    window_rules: Vec<WindowRule>,
    #[serde(default)]
    modes: BTreeMap<String, ModeFile>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModeFile {
    #[serde(default)]
    bindings: BTreeMap<String, BindingFile>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BindingFile {
    One(WmCommand),
    Many(Vec<WmCommand>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub workspaces: WorkspaceSettings,
    pub window_rules: Vec<WindowRule>,
    pub modes: HashMap<String, Mode>,
    rule_patterns: Vec<Regex>,
}

/// Key bindings active while a mode is entered. Keys are stored normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mode {
    pub bindings: BTreeMap<String, Vec<WmCommand>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Orientation of a root container created when a second window joins a
    /// lone one and no split was requested beforehand.
    #[serde(default)]
    pub default_orientation: DefaultOrientation,
    /// Smallest share of its parent a node can be resized down to.
    #[serde(default = "default_min_share")]
    pub min_share: f64,
    #[serde(default)]
    pub layout: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOrientation {
    /// Horizontal on monitors at least as wide as they are tall.
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

impl DefaultOrientation {
    pub fn resolve(self, width: f64, height: f64) -> Orientation {
        match self {
            DefaultOrientation::Horizontal => Orientation::Horizontal,
            DefaultOrientation::Vertical => Orientation::Vertical,
            DefaultOrientation::Auto if width >= height => Orientation::Horizontal,
            DefaultOrientation::Auto => Orientation::Vertical,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    #[serde(default)]
    pub stack: StackSettings,
    #[serde(default)]
    pub gaps: GapSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct StackSettings {
    /// How far each window in a stack is shifted from the previous one, in
    /// pixels.
    #[serde(default = "default_stack_offset")]
    pub stack_offset: f64,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Space between windows and monitor edges
    #[serde(default)]
    pub outer: OuterGaps,
    /// Space between windows
    #[serde(default)]
    pub inner: InnerGaps,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    #[serde(default)]
    pub horizontal: f64,
    #[serde(default)]
    pub vertical: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSettings {
    /// Workspaces that exist from startup and are never garbage-collected.
    #[serde(default)]
    pub persistent: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct WindowRule {
    /// Regex matched against the owning application's name.
    pub app_name: String,
    #[serde(default)]
    pub floating: bool,
    /// Workspace new windows of the application start on.
    #[serde(default)]
    pub workspace: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_orientation: DefaultOrientation::default(),
            min_share: default_min_share(),
            layout: LayoutSettings::default(),
        }
    }
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            stack_offset: default_stack_offset(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.min_share > 0.0 && self.min_share <= MAX_MIN_SHARE) {
            issues.push(format!(
                "min_share must be in (0, {MAX_MIN_SHARE}], got {}",
                self.min_share
            ));
        }

        issues.extend(self.layout.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if !(self.min_share > 0.0 && self.min_share <= MAX_MIN_SHARE) {
            self.min_share = default_min_share();
            fixes += 1;
        }

        fixes += self.layout.auto_fix_values();

        fixes
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.stack.validate();
        issues.extend(self.gaps.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.stack.auto_fix_values() + self.gaps.auto_fix_values()
    }
}

impl StackSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.stack_offset < 0.0 {
            issues.push(format!(
                "stack_offset must be non-negative, got {}",
                self.stack_offset
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.stack_offset < 0.0 {
            self.stack_offset = default_stack_offset();
            return 1;
        }
        0
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.outer.validate();
        issues.extend(self.inner.validate());
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.outer.auto_fix_values() + self.inner.auto_fix_values()
    }
}

fn negative_gap_issues(gaps: &[(&str, f64)]) -> Vec<String> {
    gaps.iter()
        .filter(|(_, value)| *value < 0.0)
        .map(|(name, value)| format!("{name} gap must be non-negative, got {value}"))
        .collect()
}

fn clamp_negative_gaps(gaps: &mut [&mut f64]) -> usize {
    let mut fixes = 0;
    for gap in gaps.iter_mut() {
        if **gap < 0.0 {
            **gap = 0.0;
            fixes += 1;
        }
    }
    fixes
}

impl OuterGaps {
    pub fn validate(&self) -> Vec<String> {
        negative_gap_issues(&[
            ("outer.top", self.top),
            ("outer.left", self.left),
            ("outer.bottom", self.bottom),
            ("outer.right", self.right),
        ])
    }

    pub fn auto_fix_values(&mut self) -> usize {
        clamp_negative_gaps(&mut [
            &mut self.top,
            &mut self.left,
            &mut self.bottom,
            &mut self.right,
        ])
    }
}

impl InnerGaps {
    pub fn validate(&self) -> Vec<String> {
        negative_gap_issues(&[
            ("inner.horizontal", self.horizontal),
            ("inner.vertical", self.vertical),
        ])
    }

    pub fn auto_fix_values(&mut self) -> usize {
        clamp_negative_gaps(&mut [&mut self.horizontal, &mut self.vertical])
    }
}

impl WorkspaceSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::default();
        for name in &self.persistent {
            if name.trim().is_empty() {
                issues.push("persistent workspace names must not be empty".to_string());
            } else if !seen.insert(name) {
                issues.push(format!("duplicate persistent workspace '{name}'"));
            }
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let before = self.persistent.len();
        let mut seen = HashSet::default();
        self.persistent.retain(|name| !name.trim().is_empty() && seen.insert(name.clone()));
        before - self.persistent.len()
    }
}

fn default_min_share() -> f64 { 0.05 }

fn default_stack_offset() -> f64 { 40.0 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../trellis.default.toml"))
            .expect("bundled default config must parse")
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());
        issues.extend(self.workspaces.validate());

        for (index, rule) in self.window_rules.iter().enumerate() {
            if rule.app_name.is_empty() {
                issues.push(format!("window rule {index} has an empty app_name pattern"));
            }
            if rule.floating && rule.workspace.is_some() {
                issues.push(format!(
                    "window rule {index} sets a workspace for a floating window; it will float there"
                ));
            }
        }

        if !self.modes.contains_key(MAIN_MODE) {
            issues.push(format!("no [modes.{MAIN_MODE}] section; no key bindings are active"));
        }
        for (mode_name, mode) in &self.modes {
            for (key, commands) in &mode.bindings {
                for command in commands {
                    if let Some(target) = command.entered_mode() {
                        if !self.modes.contains_key(target) {
                            issues.push(format!(
                                "binding '{key}' in mode '{mode_name}' enters unknown mode '{target}'"
                            ));
                        }
                    }
                }
            }
        }

        issues
    }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        self.settings.auto_fix_values() + self.workspaces.auto_fix_values()
    }

    /// The first window rule whose pattern matches `app`.
    pub fn rule_for(&self, app: &str) -> Option<&WindowRule> {
        self.rule_patterns
            .iter()
            .zip(&self.window_rules)
            .find(|(pattern, _)| pattern.is_match(app))
            .map(|(_, rule)| rule)
    }

    pub fn binding(&self, mode: &str, key: &str) -> Option<&[WmCommand]> {
        let key = normalize_hotkey(key).ok()?;
        self.modes.get(mode)?.bindings.get(&key).map(Vec::as_slice)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;

        let mut rule_patterns = Vec::with_capacity(c.window_rules.len());
        for rule in &c.window_rules {
            match Regex::new(&rule.app_name) {
                Ok(re) => rule_patterns.push(re),
                Err(e) => bail!("Invalid app_name pattern {:?}: {e}", rule.app_name),
            }
        }

        let mut modes = HashMap::default();
        for (name, mode) in c.modes {
            let mut bindings = BTreeMap::new();
            for (key, binding) in mode.bindings {
                let normalized = normalize_hotkey(&key)?;
                let commands = match binding {
                    BindingFile::One(cmd) => vec![cmd],
                    BindingFile::Many(cmds) => cmds,
                };
                if bindings.insert(normalized, commands).is_some() {
                    bail!("Duplicate binding for {key} in mode {name}");
                }
            }
            modes.insert(name, Mode { bindings });
        }

        Ok(Config {
            settings: c.settings,
            workspaces: c.workspaces,
            window_rules: c.window_rules,
            modes,
            rule_patterns,
        })
    }
}

const MODIFIERS: [(&str, &[&str]); 4] = [
    ("Ctrl", &["ctrl", "control"]),
    ("Alt", &["alt", "option", "opt"]),
    ("Shift", &["shift"]),
    ("Cmd", &["cmd", "command", "meta", "super"]),
];

/// Brings a key chord into canonical form: modifiers in a fixed order and
/// spelling, then the key, joined with `" + "`. `"shift+alt+down"` becomes
/// `"Alt + Shift + ArrowDown"`.
pub fn normalize_hotkey(key: &str) -> anyhow::Result<String> {
    let mut mods = [false; MODIFIERS.len()];
    let mut main_key = None;
    for token in key.split('+').map(str::trim) {
        if token.is_empty() {
            bail!("Could not parse hotkey: {key}");
        }
        let lower = token.to_ascii_lowercase();
        if let Some(idx) = MODIFIERS.iter().position(|(_, names)| names.contains(&lower.as_str())) {
            mods[idx] = true;
            continue;
        }
        if main_key.is_some() {
            bail!("Could not parse hotkey: {key}");
        }
        main_key = Some(match lower.as_str() {
            "up" | "arrowup" => "ArrowUp".to_string(),
            "down" | "arrowdown" => "ArrowDown".to_string(),
            "left" | "arrowleft" => "ArrowLeft".to_string(),
            "right" | "arrowright" => "ArrowRight".to_string(),
            _ if token.chars().count() == 1 => token.to_ascii_uppercase(),
            _ => {
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            }
        });
    }
    let Some(main_key) = main_key else {
        bail!("Could not parse hotkey: {key}");
    };
    let mut parts: Vec<&str> = MODIFIERS
        .iter()
        .zip(mods)
        .filter(|(_, on)| *on)
        .map(|((canonical, _), _)| *canonical)
        .collect();
    parts.push(&main_key);
    Ok(parts.join(" + "))
}
