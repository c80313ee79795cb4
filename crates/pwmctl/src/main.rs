use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use pwmctl_core::{
    hold_from_secs, Registry, RunRequest, Session, SysfsSurface, DEFAULT_DUTY_NS, DEFAULT_PERIOD_NS, DEFAULT_SYSFS_ROOT,
};
use pwmctl_utils::{debug, init_with_config, LogConfig, LogLevel};

mod hold;

use hold::SignalHold;

/// Drive Jetson HDR40 PWM pins via sysfs.
#[derive(Parser, Debug)]
#[command(name = "pwmctl")]
#[command(version)]
#[command(about = "Drive Jetson HDR40 PWM pins via sysfs", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Export, configure and enable pins, hold, then disable them
    Run(RunArgs),
    /// List the pins this tool knows about
    Pins,
}

#[derive(Args, Debug)]
struct RunArgs
{
    /// Comma list of pins to drive (default: every known pin)
    #[arg(long, value_delimiter = ',')]
    pins: Vec<String>,
    /// PWM period in nanoseconds
    #[arg(long, default_value_t = DEFAULT_PERIOD_NS)]
    period_ns: u64,
    /// PWM duty in nanoseconds
    #[arg(long, default_value_t = DEFAULT_DUTY_NS)]
    duty_ns: u64,
    /// How long to keep PWM enabled
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    seconds: f64,
    /// PWM class directory
    #[arg(long, default_value = DEFAULT_SYSFS_ROOT)]
    sysfs_root: PathBuf,
    /// Release the channels back to the kernel after disabling them
    #[arg(long, default_value_t = false)]
    unexport: bool,
}

fn main()
{
    let cli = Cli::parse();

    // RUST_LOG and PWMCTL_LOG_* are read here; --log-level wins over RUST_LOG
    if let Err(e) = LogConfig::from_env(cli.log_level).and_then(|config| init_with_config(&config)) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    let registry = Registry::jetson_hdr40();
    let result = match cli.command {
        Commands::Run(args) => run(&registry, args),
        Commands::Pins => {
            list_pins(&registry);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(registry: &Registry, args: RunArgs) -> Result<(), Box<dyn Error>>
{
    let request = RunRequest {
        pins: args.pins.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
        period_ns: args.period_ns,
        duty_ns: args.duty_ns,
        hold: hold_from_secs(args.seconds)?,
        unexport: args.unexport,
    };
    debug!(?request, root = %args.sysfs_root.display(), "run requested");

    let session = Session::new(registry, args.sysfs_root, SysfsSurface);
    // unknown pins and bad timings are rejected here, before any sysfs write
    let plan = session.plan(&request)?;

    let mut hold = SignalHold::new()?.with_banner(format!(
        "PWM running for {} seconds (period={}ns duty={}ns)",
        args.seconds,
        plan.period_ns(),
        plan.duty_ns()
    ));
    let report = session.execute_with(&plan, &mut hold, |pin| {
        println!("Configuring {} ({})", pin.name, pin.binding);
    })?;

    if report.was_interrupted() {
        println!("Interrupted");
    }
    for failure in &report.cleanup_failures {
        eprintln!("Warning: could not disable {}: {}", failure.pin, failure.error);
    }
    println!("PWM disabled");
    Ok(())
}

fn list_pins(registry: &Registry)
{
    for (name, binding) in registry.pins() {
        println!("{name}: {binding}");
    }
}
