use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use emulator::loader;
use emulator::report::Report;
use emulator::vm::Vm;

/// Run a program for the MIPS-subset simulator and print the final state
#[derive(Parser, Debug)]
#[command(name = "main", version, about)]
struct Args {
  /// Instruction file, one instruction per line, `;` starts a comment
  instructions: PathBuf,

  /// Memory file, one `<address> <value>` pair per line
  memory: PathBuf,

  /// Stop after this many instructions if the program has not halted
  #[arg(long, value_name = "N")]
  max_steps: Option<u64>,

  /// Do not print each executed instruction
  #[arg(short, long)]
  quiet: bool,

  /// Log more (-v for info, -vv for debug, -vvv for trace); `RUST_LOG` wins
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_logging(args.verbose);

  let memory = loader::load_memory(&args.memory);
  let program = loader::load_program(&args.instructions);
  tracing::info!(instructions = program.len(), words = memory.len(), "loaded");

  let mut vm = Vm::with_memory(memory);
  let result = vm.run_with(&program, args.max_steps, |trace| {
    if !args.quiet {
      println!("{trace}");
    }
  });

  println!();
  println!("{}", Report::new(&vm));
  match result {
    Ok(_) => ExitCode::SUCCESS,
    Err(error) => {
      eprintln!("error: {error}");
      ExitCode::FAILURE
    }
  }
}
