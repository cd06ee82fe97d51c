use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Heuristic binary-file sniff: read a small prefix and look for a NUL byte.
/// Unreadable files are treated as binary (skip rather than fail the walk).
pub fn is_binary_file(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return true,
    };

    let mut buffer = [0u8; 8192];
    let bytes_read = match file.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return true,
    };

    buffer[..bytes_read].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_text_file_not_binary() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "fn main() {{}}").unwrap();
        assert!(!is_binary_file(file.path()));
    }

    #[test]
    fn test_nul_byte_is_binary() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8, 1, 2, 3]).unwrap();
        assert!(is_binary_file(file.path()));
    }
}
