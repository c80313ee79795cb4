//! # Run Session
//!
//! Resolves a [`RunRequest`], drives every requested channel through
//! export → configure → enable, holds the outputs for the requested time and
//! then disables everything it touched.
//!
//! ## Phases
//!
//! 1. **Plan**: resolve pin names and validate timing. No I/O. Any failure
//!    here rejects the whole run before the hardware is touched.
//! 2. **Setup**: export and configure each channel in request order, then
//!    enable each channel in request order.
//! 3. **Hold**: wait for the hold duration or an interruption ([`Hold`]).
//! 4. **Cleanup**: write `enable = 0` to every channel that was exported,
//!    whatever happened in phases 2 and 3. Failures are logged and collected,
//!    never propagated, so one stuck channel does not keep the others running.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::channel::{validate_timing, ExportWait, PwmChannel};
use crate::error::{PwmError, PwmResult};
use crate::registry::{Registry, ResolvedPin};
use crate::surface::ControlSurface;

/// Default PWM period: 20 ms (50 Hz, the usual hobby servo frame)
pub const DEFAULT_PERIOD_NS: u64 = 20_000_000;

/// Default duty cycle: 1.5 ms (servo centre)
pub const DEFAULT_DUTY_NS: u64 = 1_500_000;

/// Default time to keep the outputs running
pub const DEFAULT_HOLD: Duration = Duration::from_secs(5);

/// How the hold phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome
{
    /// The full duration passed
    Elapsed,
    /// A signal (or the caller) cut the hold short
    Interrupted,
}

/// Waits while the outputs are running
///
/// Implementations decide what counts as an interruption. The session treats
/// both outcomes as success and disables the channels either way.
pub trait Hold
{
    /// Block for up to `duration`
    fn hold(&mut self, duration: Duration) -> HoldOutcome;
}

/// Plain `thread::sleep`, never interrupted
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepHold;

impl Hold for SleepHold
{
    fn hold(&mut self, duration: Duration) -> HoldOutcome
    {
        thread::sleep(duration);
        HoldOutcome::Elapsed
    }
}

/// What to drive and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest
{
    /// Pin names in the order they are driven; empty selects every known pin
    pub pins: Vec<String>,
    /// Period in nanoseconds
    pub period_ns: u64,
    /// Duty cycle in nanoseconds, must be below `period_ns`
    pub duty_ns: u64,
    /// How long to keep the outputs enabled
    pub hold: Duration,
    /// Unexport each channel after disabling it
    pub unexport: bool,
}

impl Default for RunRequest
{
    fn default() -> Self
    {
        Self {
            pins: Vec::new(),
            period_ns: DEFAULT_PERIOD_NS,
            duty_ns: DEFAULT_DUTY_NS,
            hold: DEFAULT_HOLD,
            unexport: false,
        }
    }
}

/// Convert a hold time given in (fractional) seconds
///
/// ## Errors
///
/// - `InvalidHold`: negative, NaN, infinite or out of range
pub fn hold_from_secs(seconds: f64) -> PwmResult<Duration>
{
    Duration::try_from_secs_f64(seconds).map_err(|_| PwmError::InvalidHold(seconds))
}

/// A request that passed resolution and validation
#[derive(Debug, Clone, PartialEq)]
pub struct Plan
{
    pins: Vec<ResolvedPin>,
    period_ns: u64,
    duty_ns: u64,
    hold: Duration,
    unexport: bool,
}

impl Plan
{
    /// Pins in drive order
    pub fn pins(&self) -> &[ResolvedPin]
    {
        &self.pins
    }

    /// Period in nanoseconds
    pub fn period_ns(&self) -> u64
    {
        self.period_ns
    }

    /// Duty cycle in nanoseconds
    pub fn duty_ns(&self) -> u64
    {
        self.duty_ns
    }

    /// Hold duration
    pub fn hold(&self) -> Duration
    {
        self.hold
    }
}

/// A cleanup step that failed
#[derive(Debug)]
pub struct CleanupFailure
{
    /// Pin whose channel could not be disabled or unexported
    pub pin: String,
    /// What went wrong
    pub error: PwmError,
}

/// Summary of a completed run
#[derive(Debug)]
pub struct RunReport
{
    /// Pins that were enabled, in drive order
    pub pins: Vec<String>,
    /// How the hold phase ended
    pub hold: HoldOutcome,
    /// Channels that could not be put back into a safe state
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl RunReport
{
    /// Whether the hold phase was cut short
    pub fn was_interrupted(&self) -> bool
    {
        self.hold == HoldOutcome::Interrupted
    }
}

struct ActiveChannel<S>
{
    pin: String,
    channel: PwmChannel<S>,
}

/// Drives a set of channels for one run
///
/// Each channel gets its own clone of the control surface.
#[derive(Debug)]
pub struct Session<'a, S>
{
    registry: &'a Registry,
    root: PathBuf,
    surface: S,
    wait: ExportWait,
}

impl<'a, S: ControlSurface + Clone> Session<'a, S>
{
    /// Create a session over the PWM class directory `root`
    pub fn new(registry: &'a Registry, root: impl Into<PathBuf>, surface: S) -> Self
    {
        Self {
            registry,
            root: root.into(),
            surface,
            wait: ExportWait::default(),
        }
    }

    /// Replace the export polling budget used for every channel
    #[must_use]
    pub fn with_export_wait(mut self, wait: ExportWait) -> Self
    {
        self.wait = wait;
        self
    }

    /// PWM class directory
    pub fn root(&self) -> &Path
    {
        &self.root
    }

    /// Resolve and validate a request without touching the hardware
    ///
    /// ## Errors
    ///
    /// - `UnknownPin`: a requested name is not in the registry
    /// - `InvalidDuty`: `duty_ns >= period_ns`
    pub fn plan(&self, request: &RunRequest) -> PwmResult<Plan>
    {
        let pins = if request.pins.is_empty() {
            let all: Vec<&str> = self.registry.names().collect();
            self.registry.resolve_all(all.as_slice())?
        } else {
            self.registry.resolve_all(request.pins.as_slice())?
        };
        validate_timing(request.period_ns, request.duty_ns)?;

        Ok(Plan {
            pins,
            period_ns: request.period_ns,
            duty_ns: request.duty_ns,
            hold: request.hold,
            unexport: request.unexport,
        })
    }

    /// Plan and execute a request
    ///
    /// ## Errors
    ///
    /// See [`plan`](Self::plan) and [`execute`](Self::execute).
    pub fn run<H: Hold>(&self, request: &RunRequest, hold: &mut H) -> PwmResult<RunReport>
    {
        let plan = self.plan(request)?;
        self.execute(&plan, hold)
    }

    /// Drive the planned channels, hold, and disable them again
    ///
    /// Every channel that was exported is disabled before this returns,
    /// including when setup fails part way through.
    ///
    /// ## Errors
    ///
    /// The first export, configure or enable failure. Cleanup failures are
    /// reported in [`RunReport::cleanup_failures`] instead.
    pub fn execute<H: Hold>(&self, plan: &Plan, hold: &mut H) -> PwmResult<RunReport>
    {
        self.execute_with(plan, hold, |_| {})
    }

    /// Like [`execute`](Self::execute), calling `on_configure` just before each
    /// channel is exported
    ///
    /// ## Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn execute_with<H, F>(&self, plan: &Plan, hold: &mut H, mut on_configure: F) -> PwmResult<RunReport>
    where
        H: Hold,
        F: FnMut(&ResolvedPin),
    {
        let mut active = Vec::with_capacity(plan.pins.len());
        let outcome = self.drive(plan, &mut active, hold, &mut on_configure);
        let cleanup_failures = disable_all(&mut active, plan.unexport);

        let held = outcome?;
        info!(pins = active.len(), outcome = ?held, "PWM disabled");
        Ok(RunReport {
            pins: active.into_iter().map(|a| a.pin).collect(),
            hold: held,
            cleanup_failures,
        })
    }

    fn drive<H, F>(
        &self,
        plan: &Plan,
        active: &mut Vec<ActiveChannel<S>>,
        hold: &mut H,
        on_configure: &mut F,
    ) -> PwmResult<HoldOutcome>
    where
        H: Hold,
        F: FnMut(&ResolvedPin),
    {
        for pin in &plan.pins {
            info!(pin = %pin.name, binding = %pin.binding, "configuring");
            on_configure(pin);
            let mut channel =
                PwmChannel::new(pin.binding.clone(), &self.root, self.surface.clone()).with_export_wait(self.wait);
            channel.export()?;
            let configured = channel.configure(plan.period_ns, plan.duty_ns);
            active.push(ActiveChannel {
                pin: pin.name.clone(),
                channel,
            });
            configured?;
        }

        for current in active.iter_mut() {
            current.channel.enable(true)?;
        }

        info!(
            seconds = plan.hold.as_secs_f64(),
            period_ns = plan.period_ns,
            duty_ns = plan.duty_ns,
            "PWM running"
        );
        let outcome = hold.hold(plan.hold);
        if outcome == HoldOutcome::Interrupted {
            warn!("hold interrupted, disabling outputs");
        }
        Ok(outcome)
    }
}

fn disable_all<S: ControlSurface>(active: &mut [ActiveChannel<S>], unexport: bool) -> Vec<CleanupFailure>
{
    let mut failures = Vec::new();
    for current in active.iter_mut() {
        if let Err(error) = current.channel.enable(false) {
            warn!(pin = %current.pin, %error, "failed to disable channel");
            failures.push(CleanupFailure {
                pin: current.pin.clone(),
                error,
            });
            continue;
        }
        if unexport {
            if let Err(error) = current.channel.unexport() {
                warn!(pin = %current.pin, %error, "failed to unexport channel");
                failures.push(CleanupFailure {
                    pin: current.pin.clone(),
                    error,
                });
            }
        }
    }
    failures
}
