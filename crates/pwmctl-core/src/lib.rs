//! # pwmctl-core
//!
//! Export, configure and safely disable Linux PWM channels through sysfs.
//!
//! This crate provides:
//! - A pin table mapping logical names to `pwmchip`/channel pairs
//! - A per-channel state machine (export → configure → enable → disable)
//! - A run session that always disables what it enabled
//!
//! ## Example
//!
//! ```rust,no_run
//! use pwmctl_core::{Registry, RunRequest, Session, SleepHold, SysfsSurface, DEFAULT_SYSFS_ROOT};
//!
//! let registry = Registry::jetson_hdr40();
//! let session = Session::new(&registry, DEFAULT_SYSFS_ROOT, SysfsSurface);
//! let request = RunRequest {
//!     pins: vec!["pwm5".to_string()],
//!     ..RunRequest::default()
//! };
//! let report = session.run(&request, &mut SleepHold)?;
//! assert!(report.cleanup_failures.is_empty());
//! # Ok::<(), pwmctl_core::PwmError>(())
//! ```
//!
//! All hardware access goes through the [`ControlSurface`] trait, so the state
//! machine can be exercised against a fake in tests.

pub mod channel;
pub mod error;
pub mod registry;
pub mod session;
pub mod surface;

pub use channel::{DisableOutcome, ExportWait, PwmChannel};
// Re-export commonly used types
pub use error::{ErrorKind, PwmError, PwmResult};
pub use registry::{Binding, Registry, ResolvedPin};
pub use session::{
    hold_from_secs, CleanupFailure, Hold, HoldOutcome, Plan, RunReport, RunRequest, Session, SleepHold, DEFAULT_DUTY_NS,
    DEFAULT_HOLD, DEFAULT_PERIOD_NS,
};
pub use surface::{ControlSurface, SysfsSurface, DEFAULT_SYSFS_ROOT};
