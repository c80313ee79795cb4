//! Recording fake of the sysfs PWM tree

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use pwmctl_core::{ControlSurface, ExportWait, Hold, HoldOutcome};

pub const ROOT: &str = "/sys/class/pwm";

/// Export budget that never sleeps
pub const NO_SLEEP: ExportWait = ExportWait::new(5, Duration::ZERO);

#[derive(Default)]
struct State
{
    dirs: HashSet<PathBuf>,
    writes: Vec<(PathBuf, String)>,
    failures: HashMap<PathBuf, io::ErrorKind>,
    probes: HashMap<PathBuf, u32>,
    /// Channel nodes appear only after this many probes following `export`
    export_delay: Option<u32>,
    pending: HashMap<PathBuf, u32>,
}

/// Shared handle; clones see the same tree and the same write log
#[derive(Clone, Default)]
pub struct FakeSurface
{
    state: Rc<RefCell<State>>,
}

impl FakeSurface
{
    /// A tree with the given `pwmchipN` directories; exports create nodes at once
    pub fn with_chips(chips: &[u32]) -> Self
    {
        let surface = Self::default();
        for chip in chips {
            surface.add_dir(chip_path(*chip));
        }
        surface.set_export_delay(Some(0));
        surface
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>)
    {
        self.state.borrow_mut().dirs.insert(path.into());
    }

    /// `None` means exporting never creates the node
    pub fn set_export_delay(&self, delay: Option<u32>)
    {
        self.state.borrow_mut().export_delay = delay;
    }

    pub fn fail_writes(&self, path: impl Into<PathBuf>, kind: io::ErrorKind)
    {
        self.state.borrow_mut().failures.insert(path.into(), kind);
    }

    pub fn writes(&self) -> Vec<(PathBuf, String)>
    {
        self.state.borrow().writes.clone()
    }

    /// Writes rendered as `"<path relative to ROOT>=<value>"`
    pub fn log(&self) -> Vec<String>
    {
        self.writes()
            .into_iter()
            .map(|(path, value)| {
                let rel = path.strip_prefix(ROOT).unwrap_or(&path);
                format!("{}={}", rel.display(), value)
            })
            .collect()
    }

    pub fn probes(&self, path: &Path) -> u32
    {
        self.state.borrow().probes.get(path).copied().unwrap_or(0)
    }
}

impl ControlSurface for FakeSurface
{
    fn is_dir(&self, path: &Path) -> bool
    {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        *state.probes.entry(path.to_path_buf()).or_default() += 1;

        if let Some(remaining) = state.pending.get_mut(path) {
            if *remaining == 0 {
                state.pending.remove(path);
                state.dirs.insert(path.to_path_buf());
            } else {
                *remaining -= 1;
            }
        }
        state.dirs.contains(path)
    }

    fn write(&mut self, path: &Path, value: &str) -> io::Result<()>
    {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.writes.push((path.to_path_buf(), value.to_string()));

        if let Some(kind) = state.failures.get(path) {
            return Err(io::Error::from(*kind));
        }
        let parent_exists = path.parent().is_some_and(|parent| state.dirs.contains(parent));
        if !parent_exists {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        match path.file_name().and_then(|name| name.to_str()) {
            Some("export") => {
                let node = parent.join(format!("pwm{value}"));
                if let Some(delay) = state.export_delay {
                    state.pending.insert(node, delay);
                }
            }
            Some("unexport") => {
                let node = parent.join(format!("pwm{value}"));
                state.dirs.remove(&node);
            }
            _ => {}
        }
        Ok(())
    }
}

pub fn chip_path(chip: u32) -> PathBuf
{
    Path::new(ROOT).join(format!("pwmchip{chip}"))
}

pub fn channel_path(chip: u32, channel: u32) -> PathBuf
{
    chip_path(chip).join(format!("pwm{channel}"))
}

/// Hold that records what it was asked and returns a fixed outcome
pub struct ScriptedHold
{
    pub outcome: HoldOutcome,
    pub calls: Vec<Duration>,
    /// Write log length when the hold started
    pub writes_at_hold: Option<usize>,
    surface: Option<FakeSurface>,
}

impl ScriptedHold
{
    pub fn new(outcome: HoldOutcome) -> Self
    {
        Self {
            outcome,
            calls: Vec::new(),
            writes_at_hold: None,
            surface: None,
        }
    }

    pub fn watching(outcome: HoldOutcome, surface: &FakeSurface) -> Self
    {
        Self {
            surface: Some(surface.clone()),
            ..Self::new(outcome)
        }
    }
}

impl Hold for ScriptedHold
{
    fn hold(&mut self, duration: Duration) -> HoldOutcome
    {
        self.calls.push(duration);
        self.writes_at_hold = self.surface.as_ref().map(|s| s.writes().len());
        self.outcome
    }
}
