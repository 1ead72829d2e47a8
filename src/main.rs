use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xrate::core::log::{LogMode, init_logging};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for xrate::AppCommand {
    fn from(cmd: Commands) -> xrate::AppCommand {
        match cmd {
            Commands::Serve => xrate::AppCommand::Serve,
            Commands::Currencies => xrate::AppCommand::Currencies,
            Commands::Convert { amount, from, to } => {
                xrate::AppCommand::Convert { amount, from, to }
            }
            Commands::Manual { amount, rate } => xrate::AppCommand::ManualConvert { amount, rate },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the conversion server
    Serve,
    /// List currencies known to the server
    Currencies,
    /// Convert an amount using the server's rates
    Convert {
        /// Amount to convert
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
    },
    /// Multiply an amount by a rate of your choice
    Manual {
        /// Amount to convert
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Rate to apply
        #[arg(allow_hyphen_values = true)]
        rate: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = match (&cli.command, cli.verbose) {
        (_, true) => LogMode::Verbose,
        (Some(Commands::Serve), false) => LogMode::Service,
        _ => LogMode::Quiet,
    };
    init_logging(mode);

    let result = match cli.command {
        Some(Commands::Setup) => xrate::cli::setup::setup(),
        Some(cmd) => xrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
