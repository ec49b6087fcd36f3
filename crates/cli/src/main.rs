mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use archvariant_lib::platform::OsType;

use crate::output::{OutputFormat, print_error};

/// archvariant - expand build modules into their OS and arch variants
#[derive(Parser)]
#[command(name = "archvariant")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the targets a product configuration resolves to
  Targets {
    /// Product variables JSON file
    product: PathBuf,

    /// Resolve as if building on this OS (default: the current machine)
    #[arg(long, value_parser = parse_os)]
    build_os: Option<OsType>,
  },

  /// Print the arch tables as Starlark
  ArchConfig,

  /// Split every module of a module file into its variants
  Variants {
    /// Module declarations JSON file
    modules: PathBuf,

    /// Product variables JSON file
    #[arg(short, long)]
    product: PathBuf,

    /// Resolve as if building on this OS (default: the current machine)
    #[arg(long, value_parser = parse_os)]
    build_os: Option<OsType>,

    /// Only show variants of this module
    #[arg(short, long)]
    module: Option<String>,
  },
}

fn parse_os(name: &str) -> Result<OsType, String> {
  OsType::from_name(name).ok_or_else(|| format!("unknown OS {:?}", name))
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Targets { product, build_os } => cmd::cmd_targets(&product, build_os, cli.format),
    Commands::ArchConfig => cmd::cmd_arch_config(),
    Commands::Variants {
      modules,
      product,
      build_os,
      module,
    } => cmd::cmd_variants(&modules, &product, build_os, module.as_deref(), cli.verbose, cli.format),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
