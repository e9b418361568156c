/// Errors surfaced by the fetch-decode-execute core.
///
/// Every error is fatal for the instruction in progress; the driver decides
/// whether the run loop continues. Nothing in the core panics on bad input.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    /// An address (from `pc`, `sp`, a register pair, or an immediate) fell
    /// outside the allocated memory buffer.
    #[error("memory access out of range: address {addr:#06x}, memory size {size:#06x}")]
    OutOfRange { addr: u16, size: usize },

    /// An opcode with no assigned semantics was fetched while running.
    #[error("unimplemented opcode {opcode:#04x} at {pc:#06x}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}
