//! Artifact transports.
//!
//! A transport copies the bytes behind an artifact URL to a local file.
//! It is the only component that may touch the network, so swapping it out
//! makes the "no network" guarantees of the cache checkable in tests.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::core::error::FetchError;
use crate::util::shell::Shell;

/// Fetches artifact bytes to a local path.
pub trait Transport: Send + Sync {
    /// Write the artifact at `url` to `dest`, creating or truncating it.
    fn fetch(&self, url: &str, dest: &Path, shell: &Shell) -> Result<(), FetchError>;
}

/// Transport for `http(s)://` and `file://` references.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gostage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Request {
                url: String::new(),
                source,
            })?;
        Ok(HttpTransport { client })
    }

    fn download(&self, url: &Url, dest: &Path) -> Result<(), FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = File::create(dest).map_err(|e| FetchError::io(dest, e))?;
        response
            .copy_to(&mut file)
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, dest: &Path, shell: &Shell) -> Result<(), FetchError> {
        let unsupported = || FetchError::Unsupported {
            url: url.to_string(),
        };
        let parsed = Url::parse(url).map_err(|_| unsupported())?;

        match parsed.scheme() {
            "http" | "https" => {
                shell.info(format_args!("Download [{}]", parsed));
                self.download(&parsed, dest)
            }
            "file" => {
                let source = parsed.to_file_path().map_err(|_| unsupported())?;
                shell.info(format_args!("Copy [{}]", source.display()));
                copy_file(&source, dest)
            }
            _ => Err(unsupported()),
        }
    }
}

fn copy_file(source: &Path, dest: &Path) -> Result<(), FetchError> {
    let mut reader = File::open(source).map_err(|e| FetchError::io(source, e))?;
    let mut writer = File::create(dest).map_err(|e| FetchError::io(dest, e))?;
    io::copy(&mut reader, &mut writer).map_err(|e| FetchError::io(dest, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::shell::Verbosity;
    use tempfile::TempDir;

    #[test]
    fn test_file_url_is_copied_and_logged() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("go.tar.gz");
        std::fs::write(&source, b"toolchain").unwrap();
        let dest = tmp.path().join("out");

        let url = Url::from_file_path(&source).unwrap();
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let (shell, capture) = Shell::captured(Verbosity::Normal);
        transport.fetch(url.as_str(), &dest, &shell).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"toolchain");
        assert!(capture
            .contents()
            .contains(&format!("Copy [{}]", source.display())));
    }

    #[test]
    fn test_unsupported_scheme() {
        let tmp = TempDir::new().unwrap();
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let (shell, _) = Shell::captured(Verbosity::Normal);
        let err = transport
            .fetch("ftp://example.com/go.tgz", &tmp.path().join("x"), &shell)
            .unwrap_err();
        assert!(matches!(err, FetchError::Unsupported { .. }));
    }

    #[test]
    fn test_missing_local_file() {
        let tmp = TempDir::new().unwrap();
        let url = Url::from_file_path(tmp.path().join("absent.tgz")).unwrap();
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let (shell, _) = Shell::captured(Verbosity::Normal);
        let err = transport
            .fetch(url.as_str(), &tmp.path().join("x"), &shell)
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
