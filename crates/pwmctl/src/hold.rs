//! Signal-aware hold for the running phase.
//!
//! The signal streams are registered up front in [`SignalHold::new`], so a
//! Ctrl+C that arrives while channels are still being configured is not lost:
//! it ends the hold immediately and the outputs are disabled.

use std::io;
use std::time::Duration;

use pwmctl_core::{Hold, HoldOutcome};
use pwmctl_utils::{info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Sleeps on a current-thread runtime until the duration passes or SIGINT /
/// SIGTERM arrives
pub struct SignalHold
{
    runtime: Runtime,
    interrupt: Signal,
    terminate: Signal,
    banner: Option<String>,
}

impl SignalHold
{
    /// Build the runtime and install the signal handlers
    ///
    /// ## Errors
    ///
    /// Returns an error if the runtime cannot be built or a handler cannot be
    /// registered.
    pub fn new() -> io::Result<Self>
    {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let (interrupt, terminate) = {
            let _guard = runtime.enter();
            (signal(SignalKind::interrupt())?, signal(SignalKind::terminate())?)
        };
        Ok(Self {
            runtime,
            interrupt,
            terminate,
            banner: None,
        })
    }

    /// Line printed to stdout when the hold starts
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self
    {
        self.banner = Some(banner.into());
        self
    }
}

impl Hold for SignalHold
{
    fn hold(&mut self, duration: Duration) -> HoldOutcome
    {
        if let Some(banner) = &self.banner {
            println!("{banner}");
        }

        let Self {
            runtime,
            interrupt,
            terminate,
            ..
        } = self;
        runtime.block_on(async move {
            tokio::select! {
                () = tokio::time::sleep(duration) => HoldOutcome::Elapsed,
                _ = interrupt.recv() => {
                    info!("received SIGINT");
                    HoldOutcome::Interrupted
                }
                _ = terminate.recv() => {
                    warn!("received SIGTERM");
                    HoldOutcome::Interrupted
                }
            }
        })
    }
}
