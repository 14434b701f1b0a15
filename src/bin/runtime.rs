use ::clap::Parser;
use ::eyre::WrapErr;
use ::std::path::PathBuf;
use ::std::sync::Arc;
use ::std::time::Duration;
use tracing::info;

use zbot_behaviors::clock::SystemClock;
use zbot_behaviors::constants::DEFAULT_MODEL_PATH;
use zbot_behaviors::dispatcher::Dispatcher;
use zbot_behaviors::keyboard::{KeyboardInput, Keymap};
use zbot_behaviors::policy::{ModelFileLoader, WalkCommand, WalkConfig};
use zbot_behaviors::session::Session;
use zbot_behaviors::sim::SimulatedRobot;
use zbot_behaviors::{initialize_file_and_console_logging, initialize_logging};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the ONNX walking policy
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model_path: PathBuf,
    /// Walk control tick in milliseconds (defaults to the policy's own rate)
    #[arg(long)]
    dt: Option<u64>,
    /// Scale applied to policy actions
    #[arg(long, default_value_t = 0.25)]
    action_scale: f32,
    /// Forward velocity command
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vx: f32,
    /// Lateral velocity command
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vy: f32,
    /// Yaw rate command
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    dyaw: f32,
    /// File logging
    #[arg(long, default_value = "false")]
    file_logging: bool,
    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> eyre::Result<()> {
    let args = Args::parse();

    let _guard = if args.file_logging {
        Some(initialize_file_and_console_logging(&args.log_dir))
    } else {
        initialize_logging();
        None
    };

    let config = WalkConfig {
        action_scale: args.action_scale,
        command: WalkCommand {
            vx: args.vx,
            vy: args.vy,
            dyaw: args.dyaw,
        },
        ..WalkConfig::default()
    };
    let tick = args
        .dt
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.tick());
    info!(
        "Walking policy: {} ({:?} tick)",
        args.model_path.display(),
        tick
    );
    let loader = ModelFileLoader::new(&args.model_path, config);

    let dispatcher = Dispatcher::new(
        SimulatedRobot::new(),
        Box::new(loader),
        Arc::new(SystemClock),
        tick,
    );

    Keymap::print_help();
    let input = KeyboardInput::new().wrap_err("failed to put the terminal in raw mode")?;
    let mut session = Session::new(dispatcher, input);

    session.start().wrap_err("failed to stand the robot")?;
    let result = session.run().wrap_err("behavior session failed");

    info!("Stopping behaviors...");
    session.shutdown();
    drop(session);

    result?;
    println!("Graceful shutdown complete");
    Ok(())
}
