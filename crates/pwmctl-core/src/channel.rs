//! # PWM Channel Controller
//!
//! Drives one physical PWM channel through its lifecycle:
//!
//! ```text
//! Unbound --export()--> Exported --configure()--> Configured --enable(true)--> Enabled
//!                                                      |                          |
//!                                                      +------enable(false)-------+--> Disabled
//! ```
//!
//! The controller keeps no state flag of its own. Whether the channel is
//! exported is read back from the control surface (the `pwmN` node is present
//! or not), so a channel left exported by an earlier run is picked up as-is.
//!
//! ## Export race
//!
//! Writing to `export` returns before udev (or the kernel) has finished
//! creating the `pwmN` directory. [`PwmChannel::export`] therefore polls for the
//! node a bounded number of times before giving up.
//!
//! ## Write ordering
//!
//! Many drivers reject a `duty_cycle` larger than the currently stored
//! `period`, and some reject timing changes while the output is running.
//! [`PwmChannel::configure`] always disables first, then writes `period`,
//! then `duty_cycle`.

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{PwmError, PwmResult};
use crate::registry::Binding;
use crate::surface::ControlSurface;

const EXPORT: &str = "export";
const UNEXPORT: &str = "unexport";
const PERIOD: &str = "period";
const DUTY_CYCLE: &str = "duty_cycle";
const ENABLE: &str = "enable";

/// Polling budget for the channel node to appear after `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportWait
{
    /// How many times to sleep and re-check
    pub attempts: u32,
    /// Delay between checks
    pub interval: Duration,
}

impl ExportWait
{
    /// Create a new polling budget
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self
    {
        Self { attempts, interval }
    }

    /// Upper bound on the time spent sleeping
    #[must_use]
    pub fn max_wait(&self) -> Duration
    {
        self.interval * self.attempts
    }
}

impl Default for ExportWait
{
    /// Five checks 50 ms apart (250 ms total)
    fn default() -> Self
    {
        Self::new(5, Duration::from_millis(50))
    }
}

/// Result of the disable step that precedes reconfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome
{
    /// `enable` accepted `0`
    Disabled,
    /// The driver refused with `EINVAL` because the output was not running
    ///
    /// This is normal on a freshly exported channel.
    AlreadyDisabled,
}

/// Reject timings the hardware cannot represent
///
/// ## Errors
///
/// - `InvalidDuty`: `duty_ns >= period_ns`
pub fn validate_timing(period_ns: u64, duty_ns: u64) -> PwmResult<()>
{
    if duty_ns >= period_ns {
        return Err(PwmError::InvalidDuty { period_ns, duty_ns });
    }
    Ok(())
}

/// Controller for one PWM channel
///
/// Generic over the [`ControlSurface`] so the state machine can run against
/// sysfs or against a fake in tests.
#[derive(Debug)]
pub struct PwmChannel<S>
{
    binding: Binding,
    base: PathBuf,
    path: PathBuf,
    surface: S,
    wait: ExportWait,
}

impl<S: ControlSurface> PwmChannel<S>
{
    /// Create a controller for `binding` under the PWM class directory `root`
    ///
    /// No I/O happens until [`export`](Self::export) is called.
    pub fn new(binding: Binding, root: &Path, surface: S) -> Self
    {
        let base = root.join(format!("pwmchip{}", binding.chip));
        let path = base.join(format!("pwm{}", binding.channel));
        Self {
            binding,
            base,
            path,
            surface,
            wait: ExportWait::default(),
        }
    }

    /// Replace the export polling budget
    #[must_use]
    pub fn with_export_wait(mut self, wait: ExportWait) -> Self
    {
        self.wait = wait;
        self
    }

    /// The physical binding this controller drives
    pub fn binding(&self) -> &Binding
    {
        &self.binding
    }

    /// `pwmchipN` directory
    pub fn chip_path(&self) -> &Path
    {
        &self.base
    }

    /// `pwmchipN/pwmM` directory
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// The underlying control surface
    pub fn surface(&self) -> &S
    {
        &self.surface
    }

    /// Whether the channel node currently exists
    pub fn is_exported(&self) -> bool
    {
        self.surface.is_dir(&self.path)
    }

    /// Make sure the channel node exists
    ///
    /// Does nothing if the channel is already exported.
    ///
    /// ## Errors
    ///
    /// - `ChipMissing`: the `pwmchipN` directory does not exist
    /// - `Write`: writing to `export` failed
    /// - `ExportTimeout`: the node did not appear within the polling budget
    pub fn export(&mut self) -> PwmResult<()>
    {
        if !self.surface.is_dir(&self.base) {
            return Err(PwmError::ChipMissing { path: self.base.clone() });
        }

        if self.is_exported() {
            debug!(path = %self.path.display(), "channel already exported");
            return Ok(());
        }

        debug!(chip = self.binding.chip, channel = self.binding.channel, "exporting channel");
        let export = self.base.join(EXPORT);
        self.write_to(export, self.binding.channel.to_string())?;

        if self.wait_for_node() {
            Ok(())
        } else {
            Err(PwmError::ExportTimeout {
                path: self.path.clone(),
                attempts: self.wait.attempts,
            })
        }
    }

    /// Release the channel node back to the kernel
    ///
    /// Does nothing if the channel is not exported.
    ///
    /// ## Errors
    ///
    /// - `Write`: writing to `unexport` failed
    pub fn unexport(&mut self) -> PwmResult<()>
    {
        if !self.is_exported() {
            return Ok(());
        }
        debug!(chip = self.binding.chip, channel = self.binding.channel, "unexporting channel");
        let unexport = self.base.join(UNEXPORT);
        self.write_to(unexport, self.binding.channel.to_string())
    }

    /// Program period and duty cycle, leaving the output disabled
    ///
    /// ## Errors
    ///
    /// - `InvalidDuty`: `duty_ns >= period_ns` (nothing is written)
    /// - `NotExported`: the channel node does not exist (nothing is written)
    /// - `Write`: disabling failed for a reason other than `EINVAL`, or
    ///   writing `period` / `duty_cycle` failed
    pub fn configure(&mut self, period_ns: u64, duty_ns: u64) -> PwmResult<()>
    {
        validate_timing(period_ns, duty_ns)?;
        self.ensure_exported()?;

        let outcome = self.disable_for_reconfigure()?;
        debug!(path = %self.path.display(), ?outcome, period_ns, duty_ns, "configuring channel");

        self.write_attr(PERIOD, period_ns.to_string())?;
        self.write_attr(DUTY_CYCLE, duty_ns.to_string())
    }

    /// Start (`true`) or stop (`false`) the output
    ///
    /// Stopping is attempted regardless of state so it can be used for
    /// cleanup.
    ///
    /// ## Errors
    ///
    /// - `NotExported`: enabling a channel whose node does not exist
    /// - `Write`: writing `enable` failed
    pub fn enable(&mut self, enable: bool) -> PwmResult<()>
    {
        if enable {
            self.ensure_exported()?;
        }
        self.write_attr(ENABLE, if enable { "1" } else { "0" }.to_string())
    }

    fn ensure_exported(&self) -> PwmResult<()>
    {
        if self.is_exported() {
            Ok(())
        } else {
            Err(PwmError::NotExported { path: self.path.clone() })
        }
    }

    fn disable_for_reconfigure(&mut self) -> PwmResult<DisableOutcome>
    {
        match self.write_attr(ENABLE, "0".to_string()) {
            Ok(()) => Ok(DisableOutcome::Disabled),
            Err(PwmError::Write { source, .. }) if is_not_enabled(&source) => {
                trace!(path = %self.path.display(), "channel was not enabled");
                Ok(DisableOutcome::AlreadyDisabled)
            }
            Err(err) => Err(err),
        }
    }

    fn wait_for_node(&self) -> bool
    {
        for attempt in 1..=self.wait.attempts {
            if self.is_exported() {
                return true;
            }
            trace!(attempt, path = %self.path.display(), "waiting for channel node");
            thread::sleep(self.wait.interval);
        }
        self.is_exported()
    }

    fn write_attr(&mut self, name: &str, value: String) -> PwmResult<()>
    {
        let path = self.path.join(name);
        self.write_to(path, value)
    }

    fn write_to(&mut self, path: PathBuf, value: String) -> PwmResult<()>
    {
        trace!(path = %path.display(), value = %value, "write");
        self.surface
            .write(&path, &value)
            .map_err(|source| PwmError::Write { value, path, source })
    }
}

/// `EINVAL` from `enable` means the driver has nothing to stop
fn is_not_enabled(err: &io::Error) -> bool
{
    err.kind() == io::ErrorKind::InvalidInput
}
