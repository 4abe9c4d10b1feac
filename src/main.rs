use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser, Debug)]
#[command(name = "taxengine", version, about = "Tax calculation and penalty determination")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate one tax type, with penalties when a due date is given
    Calculate(cmd::calculate::CalculateCommand),
    /// Assess every tax type for a client and year, with a compliance score
    Assess(cmd::assess::AssessCommand),
    /// List, resolve or convert rate tables
    Rates(cmd::rates::RatesCommand),
    /// Print the expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Calculate(cmd) => cmd.exec(),
        Command::Assess(cmd) => cmd.exec(),
        Command::Rates(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
