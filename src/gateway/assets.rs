//! OpenAPI asset serving for `GET /openapiv2/<name>.swagger.json`.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::{HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use tracing::debug;

/// URL prefix under which assets are served.
pub(crate) const PREFIX: &str = "/openapiv2/";

/// Only files with this suffix are served.
const SUFFIX: &str = ".swagger.json";

/// Returns the asset path (relative to [`PREFIX`]) if `req` asks for one.
///
/// Only `GET` requests under the prefix qualify; the query string is ignored.
pub(crate) fn asset_request<B>(req: &Request<B>) -> Option<&str> {
    if req.method() != Method::GET {
        return None;
    }
    req.uri().path().strip_prefix(PREFIX)
}

/// Maps a request path onto a file under `dir`.
///
/// Rejects anything that is not a plain relative path ending in `.swagger.json`.
pub(crate) fn resolve(dir: &Path, rel: &str) -> Option<PathBuf> {
    if !rel.ends_with(SUFFIX) {
        return None;
    }
    let rel = Path::new(rel);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(dir.join(rel))
}

/// Answers with the asset, or a 404 if it is missing or not servable.
pub(crate) async fn respond(dir: &Path, rel: &str) -> Response<Full<Bytes>> {
    let body = match resolve(dir, rel) {
        Some(path) => tokio::fs::read(&path).await.ok(),
        None => None,
    };

    match body {
        Some(body) => response(StatusCode::OK, "application/json", Bytes::from(body)),
        None => {
            debug!(asset = rel, "asset not found");
            response(
                StatusCode::NOT_FOUND,
                "text/plain",
                Bytes::from_static(b"not found\n"),
            )
        }
    }
}

/// Builds a response with a fixed body and content type.
pub(crate) fn response(
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(body));
    *res.status_mut() = status;
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    #[test]
    fn test_asset_request_matches_get_under_prefix() {
        let req = request(Method::GET, "/openapiv2/v1/echo.swagger.json?x=1");
        assert_eq!(asset_request(&req), Some("v1/echo.swagger.json"));
    }

    #[test]
    fn test_everything_else_is_not_an_asset() {
        assert_eq!(asset_request(&request(Method::POST, "/openapiv2/a.swagger.json")), None);
        assert_eq!(asset_request(&request(Method::GET, "/v1/echo")), None);
        assert_eq!(asset_request(&request(Method::GET, "/openapiv2")), None);
    }

    #[test]
    fn test_resolve_rejects_traversal_and_other_files() {
        let dir = Path::new("/srv/assets");
        assert_eq!(
            resolve(dir, "v1/echo.swagger.json"),
            Some(PathBuf::from("/srv/assets/v1/echo.swagger.json"))
        );
        assert_eq!(resolve(dir, "../etc/x.swagger.json"), None);
        assert_eq!(resolve(dir, "/etc/x.swagger.json"), None);
        assert_eq!(resolve(dir, "./x.swagger.json"), None);
        assert_eq!(resolve(dir, "passwd"), None);
    }

    #[tokio::test]
    async fn test_respond_serves_file_and_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("echo.swagger.json"), b"{\"swagger\":\"2.0\"}").unwrap();

        let res = respond(dir.path(), "echo.swagger.json").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"swagger\":\"2.0\"}");

        let res = respond(dir.path(), "missing.swagger.json").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
