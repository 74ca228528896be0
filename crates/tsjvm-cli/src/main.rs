//! tsjvm command-line tool
//!
//! Compiles a syntax tree (JSON, as produced by an external parser) into
//! class files, inspects class files, and runs compiled code on the
//! built-in interpreter.

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tsjvm")]
#[command(about = "TypeScript subset to JVM class-file compiler", long_about = None)]
#[command(version)]
struct Cli {
    /// Log compiler passes (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Colored output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a syntax tree into class files
    Compile {
        /// Module AST as JSON
        input: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
        #[command(flatten)]
        options: config::OptionArgs,
    },

    /// Print the structure and bytecode of a class file
    Inspect {
        /// Class file to read
        file: PathBuf,
        /// Run the structural verifier as well
        #[arg(long)]
        verify: bool,
    },

    /// Compile and execute a static method with the interpreter
    Run {
        /// Module AST as JSON
        input: PathBuf,
        /// Zero-argument static method to call
        #[arg(short, long, default_value = "main")]
        entry: String,
        /// Class declaring the method (defaults to the root function container)
        #[arg(long)]
        class: Option<String>,
        /// Instruction limit for the run
        #[arg(long)]
        step_limit: Option<u64>,
        #[command(flatten)]
        options: config::OptionArgs,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut out = output::StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));

    let result = match cli.command {
        Commands::Compile {
            input,
            out_dir,
            options,
        } => commands::compile::execute(&input, &out_dir, &options, &mut out),
        Commands::Inspect { file, verify } => commands::inspect::execute(&file, verify, &mut out),
        Commands::Run {
            input,
            entry,
            class,
            step_limit,
            options,
        } => commands::run::execute(
            commands::run::RunArgs {
                input,
                entry,
                class,
                step_limit,
            },
            &options,
            &mut out,
        ),
    };

    if let Err(err) = result {
        out.stderr_error("error");
        out.stderr_plain(&format!(": {:#}\n", err));
        std::process::exit(1);
    }
}
