use crate::error::FetchError;
use crate::ports::fetch::SourceFetcher;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use reqwest::Client;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// Downloads sources over HTTP(S), streaming the body straight to disk.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, local_path: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        stream_to_file(local_path, response.bytes_stream())
            .await
            .map_err(|source| FetchError::Io {
                url: url.to_string(),
                source,
            })
    }
}

/// Save a byte `Stream` to a file, returning the number of bytes written.
pub(crate) async fn stream_to_file<S, B, E>(path: &Path, stream: S) -> io::Result<u64>
where
    S: Stream<Item = Result<B, E>>,
    B: bytes::Buf,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::new(File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_stream_to_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.bin");

        let mock_stream = stream::iter(vec![
            Ok::<Bytes, std::io::Error>(Bytes::from("Hello, ")),
            Ok(Bytes::from("world!")),
        ]);

        let written = stream_to_file(&file_path, mock_stream).await.unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read_to_string(file_path).unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn test_stream_to_file_error() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.bin");

        let mock_stream = stream::iter(vec![Err::<Bytes, _>("Test error")]);
        let result = stream_to_file(&file_path, mock_stream).await;

        assert_eq!(result.unwrap_err().to_string(), "Test error");
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/clip.mp4");
                then.status(200).body("SEGMENT-A");
            })
            .await;

        let temp_dir = tempdir().unwrap();
        let dest = temp_dir.path().join("clip.mp4");
        let fetcher = HttpFetcher::new(Client::new());

        let written = fetcher.fetch(&server.url("/clip.mp4"), &dest).await.unwrap();

        mock.assert_async().await;
        assert_eq!(written, 9);
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "SEGMENT-A");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.mp4");
                then.status(404);
            })
            .await;

        let temp_dir = tempdir().unwrap();
        let fetcher = HttpFetcher::new(Client::new());
        let result = fetcher
            .fetch(&server.url("/missing.mp4"), &temp_dir.path().join("x.mp4"))
            .await;

        match result {
            Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        let temp_dir = tempdir().unwrap();
        let fetcher = HttpFetcher::new(Client::new());
        let result = fetcher
            .fetch("http://127.0.0.1:1/unreachable.mp4", &temp_dir.path().join("x.mp4"))
            .await;

        assert!(matches!(result, Err(FetchError::Network { .. })));
    }
}
