//! Writing downloaded files

use super::FetchError;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

/// Content fingerprint used as a marker when the server sends neither
/// `Last-Modified` nor `ETag`
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Write `bytes` to `dest` verbatim, replacing any existing file
///
/// The body goes to a temp file next to `dest` and is renamed into place, so a
/// failed write leaves the previous file intact.
pub fn write_file(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    let io_err = |source| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(dest).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(
            fingerprint(b"abc"),
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_write_creates_dirs_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("RESTRICCIONES/COSING_Annex_II_v2.xlsx");

        write_file(&dest, b"first version").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"first version");

        write_file(&dest, b"v2").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"v2");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.xls");
        write_file(&dest, b"data").unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
