//! # Error Types
//!
//! Error handling for PWM channel control.
//!
//! We use `thiserror` to generate the `Error` trait implementations and the
//! diagnostic messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for PWM operations
///
/// ## Error Categories
///
/// 1. **Resolution errors**: `UnknownPin`
/// 2. **Validation errors**: `InvalidDuty`, `InvalidHold`
/// 3. **I/O errors**: `ChipMissing`, `ExportTimeout`, `NotExported`, `Write`
///
/// Resolution and validation errors are always raised before any write reaches
/// the control surface. Use [`PwmError::kind`] to tell the categories apart.
#[derive(Error, Debug)]
pub enum PwmError
{
    /// A requested pin name is not in the pin table
    #[error("Unknown pin '{name}', valid: {valid}")]
    UnknownPin
    {
        /// The name that failed to resolve
        name: String,
        /// Comma separated list of the known names
        valid: String,
    },

    /// Duty cycle is not strictly shorter than the period
    #[error("duty_ns ({duty_ns}) must be < period_ns ({period_ns})")]
    InvalidDuty
    {
        /// Requested period in nanoseconds
        period_ns: u64,
        /// Requested duty cycle in nanoseconds
        duty_ns: u64,
    },

    /// Hold duration is negative, NaN or too large to represent
    #[error("Invalid hold duration: {0} seconds")]
    InvalidHold(f64),

    /// The PWM controller directory does not exist
    ///
    /// This means the driver for the chip is not loaded (or the chip index
    /// is wrong). It is never retried.
    #[error("{} not present", .path.display())]
    ChipMissing
    {
        /// Expected `pwmchipN` directory
        path: PathBuf,
    },

    /// The channel node did not appear after writing to `export`
    #[error("PWM channel path missing after export: {} (waited {attempts} attempts)", .path.display())]
    ExportTimeout
    {
        /// Expected `pwmN` directory
        path: PathBuf,
        /// Polling attempts spent waiting for the node
        attempts: u32,
    },

    /// Configure or enable was attempted on a channel that is not exported
    #[error("PWM channel not exported: {}", .path.display())]
    NotExported
    {
        /// Expected `pwmN` directory
        path: PathBuf,
    },

    /// Writing a value to a control surface entry failed
    #[error("Failed writing '{value}' to {}: {source}", .path.display())]
    Write
    {
        /// The text that was being written
        value: String,
        /// The attribute file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of [`PwmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{
    /// A pin name did not resolve
    Resolution,
    /// Request parameters were rejected
    Validation,
    /// The control surface failed
    Io,
}

impl PwmError
{
    /// Which of the three error categories this error belongs to
    #[must_use]
    pub const fn kind(&self) -> ErrorKind
    {
        match self {
            Self::UnknownPin { .. } => ErrorKind::Resolution,
            Self::InvalidDuty { .. } | Self::InvalidHold(_) => ErrorKind::Validation,
            Self::ChipMissing { .. } | Self::ExportTimeout { .. } | Self::NotExported { .. } | Self::Write { .. } => {
                ErrorKind::Io
            }
        }
    }
}

/// Convenience type alias for `Result<T, PwmError>`
///
/// ```rust
/// use pwmctl_core::error::PwmResult;
/// fn foo() -> PwmResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type PwmResult<T> = std::result::Result<T, PwmError>;
