use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{debug, error};

use littlevm::bytecode::assembly::{assemble, disassemble};
use littlevm::{Machine, MachineConfig};

/// Runs a littlevm program image, printing each environment call's string to stdout.
#[derive(Parser, Debug)]
#[command(name = "littlevm", version)]
struct Args {
  /// Program to run: raw bytecode, or assembly text with `--assembly`.
  program: PathBuf,

  /// Treat the program file as assembly text.
  #[arg(short, long)]
  assembly: bool,

  /// Capacity of the instruction store in bytes.
  #[arg(long, default_value_t = littlevm::config::DEFAULT_CODE_CAPACITY)]
  code_size: usize,

  /// Capacity of the stack in bytes.
  #[arg(long, default_value_t = littlevm::config::DEFAULT_STACK_CAPACITY)]
  stack_size: usize,

  /// Milliseconds to sleep between steps while tracing.
  #[arg(long, default_value_t = 0)]
  delay_ms: u64,

  /// Print the machine state once the program halts.
  #[arg(long)]
  dump: bool,

  /// List the decoded program instead of running it.
  #[arg(short, long)]
  disassemble: bool,
}

fn main() {
  env_logger::init();

  let args = Args::parse();

  #[cfg(feature = "trace_computation")]
  log::info!("Computation Tracing ENABLED");

  if let Err(e) = run(&args) {
    error!("{:#}", e);
    std::process::exit(1);
  }
}

fn run(args: &Args) -> anyhow::Result<()> {
  let image = read_program(args)?;

  if args.disassemble {
    let listing = disassemble(&image)
      .with_context(|| format!("could not disassemble {}", args.program.display()))?;
    for (address, instruction) in listing {
      println!("{:>6}: {}", address, instruction);
    }
    return Ok(());
  }

  let config = MachineConfig {
    code_capacity  : args.code_size,
    stack_capacity : args.stack_size,
    ..MachineConfig::default()
  };

  let mut machine = Machine::load(&image, &config)
    .with_context(|| format!("could not load {}", args.program.display()))?;

  let stdout = std::io::stdout();
  let status = machine
    .run_with(&mut stdout.lock(), Duration::from_millis(args.delay_ms))
    .with_context(|| format!("execution failed at pc {:#x}", machine.registers().pc))?;

  debug!("Finished with status {}.", status);
  if args.dump {
    println!("{}", machine);
  }
  Ok(())
}

fn read_program(args: &Args) -> anyhow::Result<Vec<u8>> {
  let bytes = fs::read(&args.program)
    .with_context(|| format!("could not read {}", args.program.display()))?;

  match args.assembly {

    true => {
      let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not UTF-8 text", args.program.display()))?;
      let image = assemble(&text)
        .with_context(|| format!("could not assemble {}", args.program.display()))?;
      Ok(image)
    }

    false => Ok(bytes)

  }
}
