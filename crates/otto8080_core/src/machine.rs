use crate::cpu::{Cpu8080, CpuSnapshot};
use crate::error::ExecutionError;
use crate::memory::Memory;

/// Execution driver owning the CPU and its memory.
///
/// The driver is the single owner of the processor state; nothing else
/// mutates it between steps, so a run is fully deterministic.
pub struct Machine {
    cpu: Cpu8080,
    memory: Memory,
}

/// Why [`Machine::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The CPU executed `HLT`.
    Halted,
    /// The step budget ran out before a halt.
    OutOfSteps,
}

impl Machine {
    /// Build a machine with a zeroed memory buffer of `memory_size` bytes.
    pub fn new(memory_size: usize) -> Self {
        Self {
            cpu: Cpu8080::new(),
            memory: Memory::new(memory_size),
        }
    }

    /// Build a machine around an already-populated memory image.
    pub fn with_memory(memory: Memory) -> Self {
        Self {
            cpu: Cpu8080::new(),
            memory,
        }
    }

    pub fn cpu(&self) -> &Cpu8080 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu8080 {
        &mut self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Read-only register/flag snapshot for diagnostics.
    pub fn snapshot(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    /// Reset the CPU to power-on state, preserving memory contents.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        self.cpu.step(&mut self.memory)
    }

    /// Step until the CPU halts or `max_steps` instructions have run.
    ///
    /// The first error stops the loop and is returned as-is; the caller
    /// decides what to do with the (still inspectable) machine state.
    pub fn run(&mut self, max_steps: u64) -> Result<StopReason, ExecutionError> {
        for _ in 0..max_steps {
            self.step()?;
            if self.cpu.is_halted() {
                log::debug!("run loop stopped: {}", self.cpu.snapshot());
                return Ok(StopReason::Halted);
            }
        }
        Ok(StopReason::OutOfSteps)
    }
}
