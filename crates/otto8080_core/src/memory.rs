use crate::error::ExecutionError;

/// Size of the full 8080 address space (64 KiB).
pub const ADDRESS_SPACE: usize = 0x10000;

/// Byte-addressable memory behind the CPU.
///
/// The buffer size is chosen by the harness (the reference setup allocates
/// 32 KiB, a full machine 64 KiB) and the core never assumes a fixed size:
/// every access is bounds-checked and an out-of-range address is reported as
/// an [`ExecutionError::OutOfRange`] instead of wrapping or panicking.
#[derive(Debug)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Allocate a zero-filled buffer of `size` bytes, capped at the 64 KiB
    /// address space.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size.min(ADDRESS_SPACE)],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn read(&self, addr: u16) -> Result<u8, ExecutionError> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(ExecutionError::OutOfRange {
                addr,
                size: self.bytes.len(),
            })
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), ExecutionError> {
        let size = self.bytes.len();
        match self.bytes.get_mut(addr as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ExecutionError::OutOfRange { addr, size }),
        }
    }

    /// Bulk-copy a ROM segment at `offset`, for the image loader.
    pub fn load(&mut self, offset: u16, data: &[u8]) -> Result<(), ExecutionError> {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            return Err(ExecutionError::OutOfRange {
                addr: offset,
                size: self.bytes.len(),
            });
        }
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Read-only view of the whole buffer, for inspection.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
