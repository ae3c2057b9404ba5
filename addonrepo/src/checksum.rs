//! SHA-256 checksums for archives and the manifest.
//!
//! Digests are always lowercase hexadecimal, the form stored in the
//! manifest and in `sha256sum`-style checksum files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// Calculate the SHA-256 checksum of an in-memory buffer.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Calculate the SHA-256 checksum of a file.
///
/// Streams the file in 64KB chunks and returns the lowercase hex digest.
pub fn calculate_file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check that a string looks like a lowercase hex SHA-256 digest.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Format a `sha256sum`-compatible checksum line.
pub fn checksum_line(digest: &str, file_name: &str) -> String {
    format!("{}  {}\n", digest, file_name)
}

/// Extract the digest from a `sha256sum`-style line.
pub fn parse_checksum_line(line: &str) -> Option<&str> {
    line.split_whitespace().next().filter(|d| is_sha256_hex(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_hex_known_value() {
        // SHA-256 of "hello world"
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_calculate_file_checksum() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let checksum = calculate_file_checksum(&file_path).unwrap();
        assert_eq!(checksum, sha256_hex(b"hello world"));
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.txt");
        File::create(&file_path).unwrap();

        // SHA-256 of empty string
        assert_eq!(
            calculate_file_checksum(&file_path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_large_file_spans_buffers() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");
        let data = vec![0xABu8; BUFFER_SIZE * 3 + 17];
        std::fs::write(&file_path, &data).unwrap();

        assert_eq!(calculate_file_checksum(&file_path).unwrap(), sha256_hex(&data));
    }

    #[test]
    fn test_calculate_missing_file() {
        let result = calculate_file_checksum(Path::new("/nonexistent/file.zip"));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(&"a".repeat(64)));
        assert!(!is_sha256_hex(&"A".repeat(64)));
        assert!(!is_sha256_hex(&"a".repeat(63)));
        assert!(!is_sha256_hex(&"g".repeat(64)));
    }

    #[test]
    fn test_checksum_line_round_trip() {
        let digest = sha256_hex(b"manifest");
        let line = checksum_line(&digest, "manifest.json");
        assert_eq!(line, format!("{}  manifest.json\n", digest));
        assert_eq!(parse_checksum_line(&line), Some(digest.as_str()));
        assert_eq!(parse_checksum_line("garbage manifest.json"), None);
    }
}
