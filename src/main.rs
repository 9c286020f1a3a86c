use clap::Parser;
use ringin::config::{Config, ConfigLoader, CONFIG_FILE_NAME};
use ringin::logging::init_tracing;
use ringin::{open_modem, Controller, RinginResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "ringin",
    version,
    about = "Answers incoming modem calls and bridges them to a program.",
    long_about = "Waits for RING on a Hayes-compatible modem, answers, and connects the caller to the configured program's stdin/stdout until the program exits or the carrier drops."
)]
struct Args {
    /// Configuration file. Without it the standard locations are searched.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overriding the configuration.
    #[arg(short, long)]
    port: Option<String>,

    /// Write the default configuration to --config (or ./ringin.toml) and exit.
    #[arg(long)]
    write_defaults: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ringin: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> RinginResult<()> {
    if args.write_defaults {
        let path = args
            .config
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        let loader = ConfigLoader {
            config_path: None,
            config: Config::default(),
        };
        loader.save_to(&path)?;
        println!("wrote default configuration to {}", path.display());
        return Ok(());
    }

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    let line_settings = config.serial.port_configuration()?;

    init_tracing(&config.logging);
    info!(
        port = %config.serial.port,
        baud = line_settings.baud_rate,
        program = %config.program.command,
        "starting"
    );

    let session = open_modem(&config.serial.port, &line_settings)?;
    let span = tracing::info_span!("ringin", port = %config.serial.port);
    let controller = Controller::from_config(session, &config, span);

    match controller.run().await {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}
