use std::path::Path;
use std::time::Duration;

use log::debug;
use reqwest::Client;

use srs_compiler::CompileError;

/// Where a rule list is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocation<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

impl<'a> SourceLocation<'a> {
    pub fn parse(location: &'a str) -> Self {
        if location.starts_with("https://") || location.starts_with("http://") {
            Self::Remote(location)
        } else {
            Self::Local(Path::new(location))
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("srsgen/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Read the raw rule list behind `location`.
pub async fn load_source(client: &Client, location: &str) -> Result<Vec<u8>, CompileError> {
    let data = match SourceLocation::parse(location) {
        SourceLocation::Remote(url) => fetch_remote(client, url)
            .await
            .map_err(|e| CompileError::fetch(location, e))?,
        SourceLocation::Local(path) => tokio::fs::read(path)
            .await
            .map_err(|e| CompileError::fetch(location, e))?,
    };
    debug!("loaded {} bytes from {}", data.len(), location);
    Ok(data)
}

async fn fetch_remote(client: &Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_locations() {
        assert_eq!(
            SourceLocation::parse("https://example.com/list.txt"),
            SourceLocation::Remote("https://example.com/list.txt")
        );
        assert_eq!(
            SourceLocation::parse("http://example.com/list.txt"),
            SourceLocation::Remote("http://example.com/list.txt")
        );
        assert_eq!(
            SourceLocation::parse("lists/reject.yaml"),
            SourceLocation::Local(Path::new("lists/reject.yaml"))
        );
    }

    #[tokio::test]
    async fn reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.yaml");
        std::fs::write(&path, "payload: ['a.example']").unwrap();

        let client = build_client(Duration::from_secs(5)).unwrap();
        let data = load_source(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(data, b"payload: ['a.example']");
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let client = build_client(Duration::from_secs(5)).unwrap();
        let err = load_source(&client, path.to_str().unwrap()).await.expect_err("should fail");
        assert!(matches!(err, CompileError::Fetch { .. }));
        assert_eq!(err.stage(), "fetch");
    }
}
