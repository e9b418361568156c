use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use otto8080_core::{Memory, ADDRESS_SPACE};

/// The four Space Invaders ROM segments and the offsets they map to.
const SEGMENTS: [(&str, u16); 4] = [
    ("invaders.h", 0x0000),
    ("invaders.g", 0x0800),
    ("invaders.f", 0x1000),
    ("invaders.e", 0x1800),
];

/// Load a ROM image into a fresh full-address-space memory buffer.
///
/// `path` may be either a directory containing the four `invaders.*`
/// segments, or a single combined image file loaded at 0x0000.
pub fn load_rom(path: &Path) -> Result<Memory> {
    let mut memory = Memory::new(ADDRESS_SPACE);
    if path.is_dir() {
        load_segments(path, &mut memory)?;
    } else {
        let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        memory
            .load(0x0000, &data)
            .with_context(|| format!("image {} does not fit in memory", path.display()))?;
    }
    Ok(memory)
}

/// Copy the four fixed-size segments to their documented offsets.
fn load_segments(dir: &Path, memory: &mut Memory) -> Result<()> {
    for (name, offset) in SEGMENTS {
        let path = dir.join(name);
        let data = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        log::info!("loading {} ({} bytes) at {:#06x}", name, data.len(), offset);
        memory
            .load(offset, &data)
            .with_context(|| format!("segment {} does not fit at {:#06x}", name, offset))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_image_lands_at_zero() {
        let dir = std::env::temp_dir().join("otto8080_loader_test");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("combined.rom");
        fs::write(&file, [0xc3, 0x00, 0x00]).unwrap();

        let memory = load_rom(&file).unwrap();
        assert_eq!(memory.read(0x0000), Ok(0xc3));
        assert_eq!(memory.size(), ADDRESS_SPACE);
    }

    #[test]
    fn segments_land_at_their_offsets() {
        let dir = std::env::temp_dir().join("otto8080_segments_test");
        fs::create_dir_all(&dir).unwrap();
        for (i, (name, _)) in SEGMENTS.iter().enumerate() {
            fs::write(dir.join(name), vec![i as u8 + 1; 4]).unwrap();
        }

        let memory = load_rom(&dir).unwrap();
        assert_eq!(memory.read(0x0000), Ok(1));
        assert_eq!(memory.read(0x0800), Ok(2));
        assert_eq!(memory.read(0x1000), Ok(3));
        assert_eq!(memory.read(0x1800), Ok(4));
    }

    #[test]
    fn missing_segment_is_reported_with_context() {
        let dir = std::env::temp_dir().join("otto8080_missing_test");
        fs::create_dir_all(&dir).unwrap();
        let _ = fs::remove_file(dir.join("invaders.h"));

        let err = load_rom(&dir).unwrap_err();
        assert!(err.to_string().contains("invaders.h"));
    }
}
