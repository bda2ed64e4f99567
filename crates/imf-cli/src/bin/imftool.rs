use clap::{Parser, Subcommand};

use imf_cli::commands::{config_ops, opcodes, simulate};

#[derive(Parser)]
#[command(name = "imftool", about = "Input method client diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the op codes of every interface
    Opcodes {
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
    /// Run a scripted session against the loopback service
    Simulate {
        /// Path to the script TOML file
        script: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    imf_client::trace_init::init_tracing(std::path::Path::new("."));

    let cli = Cli::parse();

    match cli.command {
        Command::Opcodes { json } => opcodes::opcodes(json),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
        Command::Simulate { script, json } => simulate::simulate(&script, json),
    }
}
