//! Minimal `.npy` writer
//!
//! spec.md §4.6 ("Training sideband") and §6 (`FACES_DIR/{face_id}.npy`)
//! require saving cropped face arrays to disk in the same format
//! `original_source/frigate/video.py`'s `np.save(FACES_DIR + "/" +
//! face_id, cropped)` writes: a single-channel `uint8` NumPy array. No
//! crate in the corpus wraps the NumPy array format, and the format
//! itself is a short, fixed header (magic, version, a literal Python
//! dict describing dtype/shape, then raw bytes) — small enough to write
//! directly rather than pull in a dependency for.

use std::io::{self, Write};
use std::path::Path;

/// Writes `pixels` (row-major, one byte per pixel) as a `(height, width)`
/// `uint8` NumPy array at `path`.
pub fn write_gray_u8(path: &Path, width: u32, height: u32, pixels: &[u8]) -> io::Result<()> {
    let header_dict = format!("{{'descr': '|u1', 'fortran_order': False, 'shape': ({height}, {width}), }}");

    // Magic (6) + version (2) + header-length field (2) + dict + "\n" must
    // be a multiple of 64 bytes, per the NumPy format spec.
    let prefix_len = 6 + 2 + 2;
    let unpadded_len = prefix_len + header_dict.len() + 1;
    let padded_len = unpadded_len.div_ceil(64) * 64;
    let pad = padded_len - unpadded_len;

    let mut header = header_dict;
    header.push_str(&" ".repeat(pad));
    header.push('\n');
    let header_len = header.len() as u16;

    let mut file = std::fs::File::create(path)?;
    file.write_all(b"\x93NUMPY")?;
    file.write_all(&[1u8, 0u8])?;
    file.write_all(&header_len.to_le_bytes())?;
    file.write_all(header.as_bytes())?;
    file.write_all(pixels)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_valid_npy_header_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.npy");
        let pixels: Vec<u8> = (0..20).collect();
        write_gray_u8(&path, 5, 4, &pixels).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..6], b"\x93NUMPY");
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let header = String::from_utf8_lossy(&bytes[10..10 + header_len]);
        assert!(header.contains("'shape': (4, 5)"));
        assert!(header.contains("'descr': '|u1'"));
        assert_eq!(&bytes[10 + header_len..], pixels.as_slice());
    }
}
