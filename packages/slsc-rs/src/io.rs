//! Raw acquisition file access

use crate::error::{Result, SlscError};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Open a file and map it into memory (read-only)
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    if !path.exists() {
        return Err(SlscError::FileNotFound(path.display().to_string()));
    }
    let file = File::open(path).map_err(SlscError::IoError)?;
    let mmap = unsafe { Mmap::map(&file).map_err(SlscError::IoError)? };
    Ok(mmap)
}

/// Decode little-endian `i16` samples
pub fn decode_i16_le(bytes: &[u8]) -> Result<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(SlscError::size(
            "raw sample bytes (multiple of 2)",
            bytes.len() + 1,
            bytes.len(),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Read a whole raw acquisition file of little-endian `i16` samples
pub fn read_i16_samples(path: &Path) -> Result<Vec<i16>> {
    let mmap = mmap_file(path)?;
    let samples = decode_i16_le(&mmap)?;
    log::debug!("Read {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

/// Write little-endian `i16` samples, the inverse of [`read_i16_samples`]
pub fn write_i16_samples(path: &Path, samples: &[i16]) -> Result<()> {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_little_endian_samples() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80]).unwrap();
        file.flush().unwrap();
        let samples = read_i16_samples(file.path()).unwrap();
        assert_eq!(samples, vec![1, -1, i16::MIN]);
    }

    #[test]
    fn test_odd_byte_count_is_size_mismatch() {
        let err = decode_i16_le(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, SlscError::SizeMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = read_i16_samples(Path::new("/nonexistent/raw.bin")).unwrap_err();
        assert!(matches!(err, SlscError::FileNotFound(_)));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.bin");
        write_i16_samples(&path, &[3, -4, 500]).unwrap();
        assert_eq!(read_i16_samples(&path).unwrap(), vec![3, -4, 500]);
    }
}
