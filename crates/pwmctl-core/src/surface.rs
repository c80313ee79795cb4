//! # Control Surface
//!
//! The file-like interface the kernel exposes for PWM control.
//!
//! [`ControlSurface`] is the seam between the channel state machine and the
//! outside world. [`SysfsSurface`] talks to the real filesystem; tests swap in
//! a recording fake.
//!
//! ## Layout
//!
//! ```text
//! /sys/class/pwm/pwmchip<chip>/export
//! /sys/class/pwm/pwmchip<chip>/unexport
//! /sys/class/pwm/pwmchip<chip>/pwm<channel>/period
//! /sys/class/pwm/pwmchip<chip>/pwm<channel>/duty_cycle
//! /sys/class/pwm/pwmchip<chip>/pwm<channel>/enable
//! ```
//!
//! See: [Linux PWM sysfs interface](https://docs.kernel.org/driver-api/pwm.html#using-pwms-with-the-sysfs-interface)

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Default mount point of the PWM class
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/pwm";

/// Operations the channel controller needs from the control surface
pub trait ControlSurface
{
    /// Whether a directory exists at `path`
    fn is_dir(&self, path: &Path) -> bool;

    /// Write `value` to the attribute at `path`
    ///
    /// The attribute must already exist; sysfs attributes are never created
    /// by userspace.
    ///
    /// ## Errors
    ///
    /// Any I/O error from opening or writing the attribute.
    fn write(&mut self, path: &Path, value: &str) -> io::Result<()>;
}

/// Control surface backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsSurface;

impl ControlSurface for SysfsSurface
{
    fn is_dir(&self, path: &Path) -> bool
    {
        path.is_dir()
    }

    fn write(&mut self, path: &Path, value: &str) -> io::Result<()>
    {
        // sysfs attributes take the whole value in one write(2)
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
        file.write_all(value.as_bytes())?;
        file.flush()
    }
}
