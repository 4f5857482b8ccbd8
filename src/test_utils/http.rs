//! Minimal HTTP/1.1 server for download tests.
//!
//! Serves registered bodies by path, answers `HEAD`, honors single
//! `Range: bytes=a-b` requests for routes that advertise range support, and
//! records every request. Each connection handles one request and is closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[derive(Clone)]
struct Route {
    body: Arc<Vec<u8>>,
    content_type: &'static str,
    accept_ranges: bool,
    status: u16,
    head_status: Option<u16>,
}

/// A request seen by the fixture.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// `GET` or `HEAD`
    pub method: String,
    /// Path including any query string
    pub path: String,
    /// Value of the `Range` header, if any
    pub range: Option<String>,
    /// Value of the `Authorization` header, if any
    pub authorization: Option<String>,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;
type Requests = Arc<Mutex<Vec<RecordedRequest>>>;

/// Local HTTP server bound to `127.0.0.1` on an ephemeral port.
pub struct HttpFixture {
    port: u16,
    routes: Routes,
    requests: Requests,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl HttpFixture {
    /// Bind and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener =
            TcpListener::bind(("127.0.0.1", 0)).await.expect("failed to bind HTTP fixture");
        let port = listener.local_addr().expect("failed to read fixture address").port();
        let routes: Routes = Arc::default();
        let requests: Requests = Arc::default();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = {
            let routes = routes.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        incoming = listener.accept() => {
                            let Ok((stream, _peer)) = incoming else {
                                break;
                            };
                            let routes = routes.clone();
                            let requests = requests.clone();
                            tokio::spawn(async move {
                                let _ = handle_connection(stream, routes, requests).await;
                            });
                        }
                    }
                }
            })
        };

        Self {
            port,
            routes,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// Serve `body` at `path` with range support.
    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.insert(path, body.into(), "application/octet-stream", true, 200);
    }

    /// Serve `body` at `path`, ignoring `Range` headers.
    pub fn serve_without_ranges(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.insert(path, body.into(), "application/octet-stream", false, 200);
    }

    /// Serve a JSON document at `path`.
    pub fn serve_json(&self, path: &str, json: &str) {
        self.insert(path, json.as_bytes().to_vec(), "application/json", false, 200);
    }

    /// Serve `body` at `path` with range support, but answer `HEAD` with
    /// `head_status`.
    pub fn serve_rejecting_head(&self, path: &str, body: impl Into<Vec<u8>>, head_status: u16) {
        self.insert(path, body.into(), "application/octet-stream", true, 200);
        if let Some(route) = self.routes.lock().expect("routes lock").get_mut(path) {
            route.head_status = Some(head_status);
        }
    }

    /// Answer `path` with the given status and an empty body.
    pub fn fail(&self, path: &str, status: u16) {
        self.insert(path, Vec::new(), "text/plain", false, status);
    }

    fn insert(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &'static str,
        accept_ranges: bool,
        status: u16,
    ) {
        self.routes.lock().expect("routes lock").insert(
            path.to_string(),
            Route {
                body: Arc::new(body),
                content_type,
                accept_ranges,
                status,
                head_status: None,
            },
        );
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of `GET` requests received for `path` (query ignored).
    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == "GET" && strip_query(&r.path) == path)
            .count()
    }
}

impl Drop for HttpFixture {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        self.handle.abort();
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

async fn handle_connection(
    stream: TcpStream,
    routes: Routes,
    requests: Requests,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut range = None;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "range" => range = Some(value.trim().to_string()),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    requests.lock().expect("requests lock").push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        range: range.clone(),
        authorization,
    });

    let route = routes.lock().expect("routes lock").get(strip_query(&path)).cloned();
    let mut stream = reader.into_inner();

    let Some(route) = route else {
        let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.write_all(response.as_bytes()).await?;
        return stream.shutdown().await;
    };

    let status = match route.head_status {
        Some(head_status) if method == "HEAD" => head_status,
        _ => route.status,
    };
    if status != 200 {
        let response =
            format!("HTTP/1.1 {status} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await?;
        return stream.shutdown().await;
    }

    let total = route.body.len();
    let ranges_header = if route.accept_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    let (status_line, content_range, body): (&str, String, &[u8]) =
        match range.as_deref().and_then(|r| parse_range(r, total)) {
            Some((start, end)) if route.accept_ranges => (
                "HTTP/1.1 206 Partial Content",
                format!("Content-Range: bytes {start}-{end}/{total}\r\n"),
                &route.body[start..=end],
            ),
            _ => ("HTTP/1.1 200 OK", String::new(), route.body.as_slice()),
        };

    let head = format!(
        "{status_line}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{ranges_header}{content_range}Connection: close\r\n\r\n",
        route.content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    if method != "HEAD" {
        stream.write_all(body).await?;
    }
    stream.flush().await?;
    stream.shutdown().await
}

fn parse_range(header: &str, total: usize) -> Option<(usize, usize)> {
    let bounds = header.strip_prefix("bytes=")?;
    let (start, end) = bounds.split_once('-')?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = match end.trim() {
        "" => total.checked_sub(1)?,
        end => end.parse::<usize>().ok()?.min(total.checked_sub(1)?),
    };
    (start <= end).then_some((start, end))
}
