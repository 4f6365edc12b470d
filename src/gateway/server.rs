//! # Gateway task: listen, route, serve assets or forward to the backend.
//!
//! Each accepted connection is served as HTTP/1.1 by `hyper`. Asset requests are
//! answered locally; every other request is forwarded over a fresh backend
//! connection and the backend's response is streamed back.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{client, server};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, lookup_host};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::assets;
use super::config::{GatewayConfig, Network};
use crate::error::TaskError;
use crate::tasks::Task;

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Body type of every response the gateway sends.
type GatewayBody = BoxBody<Bytes, hyper::Error>;

/// A connection to the backend endpoint.
enum Backend {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

/// Why a request could not be forwarded.
#[derive(Error, Debug)]
enum ProxyError {
    #[error(transparent)]
    Dial(#[from] TaskError),
    #[error("backend exchange failed: {0}")]
    Http(#[from] hyper::Error),
}

/// The gateway task.
///
/// Holds its configuration; once listening, [`Gateway::local_addr`] reports the
/// bound address (useful with port `0`).
pub struct Gateway {
    cfg: Arc<GatewayConfig>,
    local_addr: OnceLock<SocketAddr>,
}

impl Gateway {
    /// Creates a gateway that will run with `cfg`.
    pub fn new(cfg: GatewayConfig) -> Self {
        Self {
            cfg: Arc::new(cfg),
            local_addr: OnceLock::new(),
        }
    }

    /// Returns the bound listen address once startup has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    async fn serve(&self, listener: TcpListener, network: Network, ctx: CancellationToken) {
        let mut conns = JoinSet::new();

        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let cfg = Arc::clone(&self.cfg);
                        conns.spawn(async move {
                            if let Err(e) = handle_conn(stream, cfg, network).await {
                                debug!(%peer, error = %e, "connection closed with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(res) = conns.join_next(), if !conns.is_empty() => {
                    if let Err(e) = res {
                        if e.is_panic() {
                            warn!(error = %e, "connection handler panicked");
                        }
                    }
                }
            }
        }

        let open = conns.len();
        conns.shutdown().await;
        info!(aborted = open, "gateway stopped");
    }
}

#[async_trait]
impl Task for Gateway {
    fn name(&self) -> &str {
        "gateway"
    }

    #[instrument(
        level = "debug",
        name = "gateway",
        skip(self, ctx),
        fields(listen = %self.cfg.bind_addr, backend = %self.cfg.endpoint)
    )]
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let network = self.cfg.endpoint.network()?;

        // Fail fast on an unreachable backend; the probe connection is not reused.
        drop(dial(&self.cfg, network).await?);

        let listen = self.cfg.listen_addr();
        let listener = TcpListener::bind(&listen).await.map_err(|e| TaskError::Fail {
            error: format!("listen on {listen}: {e}"),
        })?;
        if let Ok(addr) = listener.local_addr() {
            let _ = self.local_addr.set(addr);
        }
        info!(addr = ?self.local_addr(), "gateway listening");

        self.serve(listener, network, ctx).await;
        Ok(())
    }
}

/// Dials the backend, bounded by the configured dial timeout.
async fn dial(cfg: &GatewayConfig, network: Network) -> Result<Backend, TaskError> {
    let addr = cfg.endpoint.addr.as_str();
    let attempt = async {
        match network {
            Network::Tcp => TcpStream::connect(addr).await.map(Backend::Tcp),
            Network::Tcp4 => connect_family(addr, SocketAddr::is_ipv4).await.map(Backend::Tcp),
            Network::Tcp6 => connect_family(addr, SocketAddr::is_ipv6).await.map(Backend::Tcp),
            #[cfg(unix)]
            Network::Unix => tokio::net::UnixStream::connect(addr).await.map(Backend::Unix),
            #[cfg(not(unix))]
            Network::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    };

    match time::timeout(cfg.dial_timeout, attempt).await {
        Ok(Ok(backend)) => Ok(backend),
        Ok(Err(e)) => Err(TaskError::Fail {
            error: format!("backend {} unreachable: {e}", cfg.endpoint),
        }),
        Err(_elapsed) => Err(TaskError::Fail {
            error: format!(
                "backend {} unreachable: timed out after {:?}",
                cfg.endpoint, cfg.dial_timeout
            ),
        }),
    }
}

/// Connects to the first resolved address of the wanted family.
async fn connect_family(addr: &str, wanted: fn(&SocketAddr) -> bool) -> io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in lookup_host(addr).await?.filter(|a| wanted(a)) {
        match TcpStream::connect(candidate).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address of the requested family for {addr}"),
        )
    }))
}

/// Serves one client connection until it closes.
async fn handle_conn(
    stream: TcpStream,
    cfg: Arc<GatewayConfig>,
    network: Network,
) -> hyper::Result<()> {
    let service = service_fn(move |req| {
        let cfg = Arc::clone(&cfg);
        async move { Ok::<_, Infallible>(handle_request(req, &cfg, network).await) }
    });
    server::conn::http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
}

/// Answers an asset request locally; forwards anything else to the backend.
async fn handle_request(
    req: Request<Incoming>,
    cfg: &GatewayConfig,
    network: Network,
) -> Response<GatewayBody> {
    if let Some(rel) = assets::asset_request(&req).map(str::to_owned) {
        return boxed(assets::respond(&cfg.assets_dir, &rel).await);
    }

    let target = req.uri().path().to_owned();
    match proxy(req, cfg, network).await {
        Ok(res) => res.map(BodyExt::boxed),
        Err(e) => {
            warn!(path = %target, error = %e, "forwarding to backend failed");
            boxed(assets::response(
                StatusCode::BAD_GATEWAY,
                "text/plain",
                Bytes::from(format!("{e}\n")),
            ))
        }
    }
}

fn boxed(res: Response<Full<Bytes>>) -> Response<GatewayBody> {
    res.map(|body| body.map_err(|never: Infallible| match never {}).boxed())
}

/// Forwards `req` over a new backend connection.
async fn proxy(
    req: Request<Incoming>,
    cfg: &GatewayConfig,
    network: Network,
) -> Result<Response<Incoming>, ProxyError> {
    match dial(cfg, network).await? {
        Backend::Tcp(stream) => forward(stream, req).await,
        #[cfg(unix)]
        Backend::Unix(stream) => forward(stream, req).await,
    }
}

async fn forward<S>(stream: S, req: Request<Incoming>) -> Result<Response<Incoming>, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = client::conn::http1::handshake(TokioIo::new(stream)).await?;
    // Drives the backend connection while the response body streams back.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "backend connection closed with error");
        }
    });
    Ok(sender.send_request(req).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoint;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn closed_port() -> String {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = l.local_addr().unwrap();
        drop(l);
        addr.to_string()
    }

    /// Answers every request with `"<method> <path> <body>"`.
    async fn backend_reply(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
        let line = format!("{} {}", req.method(), req.uri().path());
        let body = req.into_body().collect().await.unwrap().to_bytes();
        Ok(Response::new(Full::new(Bytes::from(format!(
            "{line} {}",
            String::from_utf8_lossy(&body)
        )))))
    }

    async fn serve_backend<S>(stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let _ = server::conn::http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service_fn(backend_reply))
            .await;
    }

    async fn http_backend() -> (String, tokio::task::JoinHandle<()>) {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = l.local_addr().unwrap();
        let accept = tokio::spawn(async move {
            while let Ok((s, _)) = l.accept().await {
                tokio::spawn(serve_backend(s));
            }
        });
        (addr.to_string(), accept)
    }

    /// Runs the gateway in the background and waits until it is listening.
    async fn start(
        cfg: GatewayConfig,
    ) -> (
        Arc<Gateway>,
        CancellationToken,
        tokio::task::JoinHandle<Result<(), TaskError>>,
    ) {
        let gw = Arc::new(Gateway::new(cfg));
        let token = CancellationToken::new();
        let run = {
            let gw = Arc::clone(&gw);
            let token = token.clone();
            tokio::spawn(async move { gw.run(token).await })
        };
        for _ in 0..200 {
            if gw.local_addr().is_some() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gw.local_addr().is_some(), "gateway did not start listening");
        (gw, token, run)
    }

    /// Sends a raw request and reads the whole response.
    async fn exchange(addr: SocketAddr, request: &str) -> String {
        let mut c = TcpStream::connect(addr).await.unwrap();
        c.write_all(request.as_bytes()).await.unwrap();
        let mut out = String::new();
        time::timeout(Duration::from_secs(5), c.read_to_string(&mut out))
            .await
            .unwrap()
            .unwrap();
        out
    }

    fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: gw\r\nConnection: close\r\n\r\n")
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_fast() {
        let cfg = GatewayConfig::new(
            "127.0.0.1:0",
            Endpoint::new("tcp", closed_port().await),
            "assets",
        );
        let res = Gateway::new(cfg).run(CancellationToken::new()).await;
        match res {
            Err(TaskError::Fail { error }) => assert!(error.contains("unreachable"), "{error}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_network_is_fatal() {
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("udp", "127.0.0.1:1"), "assets");
        let res = Gateway::new(cfg).run(CancellationToken::new()).await;
        assert!(matches!(res, Err(TaskError::Fatal { .. })));
    }

    #[tokio::test]
    async fn test_bad_listen_address_fails() {
        let (backend, _accept) = http_backend().await;
        let cfg = GatewayConfig::new("not-an-address", Endpoint::new("tcp", backend), "assets");
        let res = Gateway::new(cfg).run(CancellationToken::new()).await;
        match res {
            Err(TaskError::Fail { error }) => assert!(error.starts_with("listen on"), "{error}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_cleanly() {
        let (backend, _accept) = http_backend().await;
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", backend), "assets");
        let (_gw, token, run) = start(cfg).await;
        token.cancel();
        let res = time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_before_run_still_checks_backend() {
        let cfg = GatewayConfig::new(
            "127.0.0.1:0",
            Endpoint::new("tcp", closed_port().await),
            "assets",
        );
        let token = CancellationToken::new();
        token.cancel();
        let res = Gateway::new(cfg).run(token).await;
        assert!(matches!(res, Err(TaskError::Fail { .. })));
    }

    #[tokio::test]
    async fn test_forwards_requests_to_backend() {
        let (backend, _accept) = http_backend().await;
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", backend), "assets");
        let (gw, token, run) = start(cfg).await;
        let addr = gw.local_addr().unwrap();

        let res = exchange(
            addr,
            "POST /v1/echo HTTP/1.1\r\nHost: gw\r\nContent-Length: 4\r\nConnection: close\r\n\r\nping",
        )
        .await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
        assert!(res.ends_with("POST /v1/echo ping"), "{res}");

        // Non-GET requests under the asset prefix belong to the backend too.
        let res = exchange(
            addr,
            "POST /openapiv2/a.swagger.json HTTP/1.1\r\nHost: gw\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(res.ends_with("POST /openapiv2/a.swagger.json "), "{res}");

        token.cancel();
        assert!(run.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_lost_backend_answers_bad_gateway() {
        let (backend, accept) = http_backend().await;
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", backend), "assets");
        let (gw, token, run) = start(cfg).await;

        accept.abort();
        let _ = accept.await;

        let res = exchange(gw.local_addr().unwrap(), &get("/v1/echo")).await;
        assert!(res.starts_with("HTTP/1.1 502 Bad Gateway\r\n"), "{res}");
        assert!(res.contains("unreachable"), "{res}");

        token.cancel();
        assert!(run.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_serves_swagger_assets() {
        let root = tempfile::tempdir().unwrap();
        let assets_dir = root.path().join("assets");
        std::fs::create_dir(&assets_dir).unwrap();
        std::fs::write(assets_dir.join("echo.swagger.json"), b"{}").unwrap();
        std::fs::write(root.path().join("secret.swagger.json"), b"secret").unwrap();

        let (backend, _accept) = http_backend().await;
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", backend), &assets_dir);
        let (gw, token, run) = start(cfg).await;
        let addr = gw.local_addr().unwrap();

        let ok = exchange(addr, &get("/openapiv2/echo.swagger.json")).await;
        assert!(ok.starts_with("HTTP/1.1 200 OK\r\n"), "{ok}");
        assert!(ok.contains("content-type: application/json"), "{ok}");
        assert!(ok.ends_with("{}"), "{ok}");

        let traversal = exchange(addr, &get("/openapiv2/../secret.swagger.json")).await;
        assert!(traversal.starts_with("HTTP/1.1 404"), "{traversal}");
        assert!(!traversal.contains("secret"), "{traversal}");

        let other = exchange(addr, &get("/openapiv2/echo.yaml")).await;
        assert!(other.starts_with("HTTP/1.1 404"), "{other}");

        token.cancel();
        assert!(run.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bare_lf_request_is_served_as_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.swagger.json"), b"{\"a\":1}").unwrap();

        let (backend, _accept) = http_backend().await;
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", backend), dir.path());
        let (gw, token, run) = start(cfg).await;

        let res = exchange(
            gw.local_addr().unwrap(),
            "GET /openapiv2/a.swagger.json HTTP/1.1\nHost: gw\nConnection: close\n\n",
        )
        .await;
        assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
        assert!(res.ends_with("{\"a\":1}"), "{res}");

        token.cancel();
        assert!(run.await.unwrap().is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_backend() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("backend.sock");
        let listener = tokio::net::UnixListener::bind(&sock).unwrap();
        tokio::spawn(async move {
            while let Ok((s, _)) = listener.accept().await {
                tokio::spawn(serve_backend(s));
            }
        });

        let cfg = GatewayConfig::new(
            "127.0.0.1:0",
            Endpoint::new("unix", sock.to_string_lossy()),
            dir.path(),
        );
        let (gw, token, run) = start(cfg).await;

        let res = exchange(gw.local_addr().unwrap(), &get("/v1/over-unix")).await;
        assert!(res.ends_with("GET /v1/over-unix "), "{res}");

        token.cancel();
        assert!(run.await.unwrap().is_ok());
    }
}
