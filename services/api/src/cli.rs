use crate::demo::{run_demo, run_sanction_preview, DemoArgs, SanctionArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use school_clearance::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "School Clearance",
    about = "Run the clearance and discipline service or explore it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Preview default sanctions for a violation selection and an ad-hoc offense history
    Sanctions(SanctionArgs),
    /// Run an end-to-end clearance and discipline walkthrough against in-memory stores
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Sanctions(args) => run_sanction_preview(args),
        Command::Demo(args) => run_demo(args),
    }
}
