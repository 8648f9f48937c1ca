//! Local file serving.
//!
//! # Responsibilities
//! - Resolve a request path under a route's root
//! - Stream the file with a content type guessed from its extension
//!
//! # Design Decisions
//! - Lexical confinement first (security::paths), then a canonical check
//!   so symlinks cannot lead outside the root
//! - Missing files, directories and rejected paths are all 404
//! - An unexpected filesystem error is retried once before it becomes a 500

use std::fs::Metadata;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::RelayError;
use crate::security::paths::confine;

/// Content types `mime_guess` does not know about.
const EXTRA_CONTENT_TYPES: &[(&str, &str)] = &[("sld", "application/vnd.ogc.sld+xml")];

/// Serve `request` from `root`, stripping `strip_prefix` from its path.
pub async fn serve_local(request: Request<Body>, root: &Path, strip_prefix: Option<&str>) -> Result<Response, RelayError> {
    let candidate = confine(root, request.uri().path(), strip_prefix).map_err(|e| {
        tracing::warn!(path = %request.uri().path(), reason = %e, "Rejected local path");
        RelayError::NotFound
    })?;

    let metadata = probe(&candidate).await?;
    if !metadata.is_file() {
        return Err(RelayError::NotFound);
    }

    let real_root = tokio::fs::canonicalize(root).await.map_err(|_| RelayError::NotFound)?;
    let real_file = tokio::fs::canonicalize(&candidate).await.map_err(|_| RelayError::NotFound)?;
    if !real_file.starts_with(&real_root) {
        tracing::warn!(path = %request.uri().path(), "Local path resolves outside its root");
        return Err(RelayError::NotFound);
    }

    let response = match ServeFile::new(&real_file).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if let Some(content_type) = extra_content_type(&real_file) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    Ok(response)
}

async fn probe(path: &Path) -> Result<Metadata, RelayError> {
    probe_with(path, || tokio::fs::metadata(path)).await
}

/// Run `stat`, retrying once when it fails with anything but a lookup miss.
async fn probe_with<F, Fut>(path: &Path, mut stat: F) -> Result<Metadata, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<Metadata>>,
{
    let mut retried = false;
    loop {
        match stat().await {
            Ok(metadata) => return Ok(metadata),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::PermissionDenied) => {
                return Err(RelayError::NotFound);
            }
            Err(e) if !retried => {
                tracing::debug!(path = %path.display(), error = %e, "Retrying file probe");
                retried = true;
            }
            Err(e) => {
                return Err(RelayError::Internal(format!("probing {}: {}", path.display(), e)));
            }
        }
    }
}

fn extra_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    EXTRA_CONTENT_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, content_type)| *content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("css")).unwrap();
        std::fs::write(root.path().join("css/site.css"), "body {}").unwrap();

        let response = serve_local(get("/static/css/site.css"), root.path(), Some("/static/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"body {}");
    }

    #[tokio::test]
    async fn test_sld_content_type() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("county_none.sld"), "<StyledLayerDescriptor/>").unwrap();

        let response = serve_local(get("/sld/county_none.sld"), root.path(), Some("/sld/"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/vnd.ogc.sld+xml");
    }

    #[tokio::test]
    async fn test_missing_and_directory_are_not_found() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("sub")).unwrap();

        for path in ["/static/absent.css", "/static/sub", "/static/../etc/passwd"] {
            let err = serve_local(get(path), root.path(), Some("/static/")).await.unwrap_err();
            assert!(matches!(err, RelayError::NotFound), "{}", path);
        }
    }

    fn flaky_stat(
        failures: usize,
        metadata: Metadata,
    ) -> (std::sync::Arc<std::sync::atomic::AtomicUsize>, impl FnMut() -> std::future::Ready<io::Result<Metadata>>) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stat = move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if call < failures {
                Err(io::Error::other("stale handle"))
            } else {
                Ok(metadata.clone())
            })
        };
        (calls, stat)
    }

    #[tokio::test]
    async fn test_probe_retries_once_after_unexpected_error() {
        let root = tempfile::tempdir().unwrap();
        let metadata = std::fs::metadata(root.path()).unwrap();

        let (calls, stat) = flaky_stat(1, metadata);
        let found = probe_with(root.path(), stat).await.unwrap();
        assert!(found.is_dir());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_second_failure_is_internal() {
        let root = tempfile::tempdir().unwrap();
        let metadata = std::fs::metadata(root.path()).unwrap();

        let (calls, stat) = flaky_stat(2, metadata);
        let err = probe_with(root.path(), stat).await.unwrap_err();
        assert!(matches!(err, RelayError::Internal(_)));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_probe_does_not_retry_not_found() {
        let root = tempfile::tempdir().unwrap();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let err = probe_with(root.path(), || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            std::future::ready(Err(io::Error::from(ErrorKind::NotFound)))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RelayError::NotFound));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_not_found() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), "x").unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), root.path().join("link")).unwrap();

        let err = serve_local(get("/static/link"), root.path(), Some("/static/")).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound));
    }
}
