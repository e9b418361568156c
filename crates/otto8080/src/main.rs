mod loader;

use std::path::PathBuf;

use anyhow::Result;
use otto8080_core::{Machine, StopReason};

const DEFAULT_MAX_STEPS: u64 = 50_000_000;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rom_path = match args.next() {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!(
                "Usage: otto8080 <rom> [max_steps]\n\
                 <rom> is either a directory with the invaders.h/g/f/e segments\n\
                 or a single combined image file loaded at 0x0000."
            );
            std::process::exit(1);
        }
    };
    let max_steps = match args.next() {
        Some(s) => match s.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("max_steps must be a number, got '{}'", s);
                std::process::exit(1);
            }
        },
        None => DEFAULT_MAX_STEPS,
    };

    if let Err(err) = run(&rom_path, max_steps) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(rom_path: &std::path::Path, max_steps: u64) -> Result<()> {
    let memory = loader::load_rom(rom_path)?;
    let mut machine = Machine::with_memory(memory);

    log::info!("starting execution at 0x0000, step budget {}", max_steps);
    let outcome = machine.run(max_steps);
    // Dump the final state whether the run ended cleanly or not.
    println!("{}", machine.snapshot());

    match outcome {
        Ok(StopReason::Halted) => {
            log::info!("processor halted");
            Ok(())
        }
        Ok(StopReason::OutOfSteps) => {
            log::info!("step budget exhausted");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
