//! Intel 8080 fetch-decode-execute core.
//!
//! The crate is split the way the hardware is: [`memory::Memory`] is the
//! byte-addressable buffer, [`cpu::Cpu8080`] is the register file plus the
//! decoder and ALU, and [`machine::Machine`] is the driver that owns both
//! and steps them. Peripherals (I/O ports, interrupts, video) are out of
//! scope; every opcode that would need them reports
//! [`error::ExecutionError::UnimplementedOpcode`].

pub mod bits;
pub mod cpu;
pub mod error;
pub mod machine;
pub mod memory;

pub use cpu::{Cpu8080, CpuSnapshot, ExecState, Flags, Reg, RegPair};
pub use error::ExecutionError;
pub use machine::{Machine, StopReason};
pub use memory::{Memory, ADDRESS_SPACE};
