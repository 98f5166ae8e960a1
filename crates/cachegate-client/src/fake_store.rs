//! In-process RESP2 server for tests.
//!
//! Records every command it receives and answers from a per-test responder,
//! falling back to the handshake replies redis-rs and deadpool expect
//! (`PING`, `CLUSTER SLOTS`, `+OK` for everything else).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cachegate_domain::{NodeAddr, PoolSizing, TopologyConfig};
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// One reply, optionally sent after a pause.
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub bytes: Vec<u8>,
}

impl Reply {
    fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            delay: Duration::ZERO,
            bytes: bytes.into(),
        }
    }

    pub fn ok() -> Self {
        Self::raw("+OK\r\n")
    }

    pub fn status(text: &str) -> Self {
        Self::raw(format!("+{text}\r\n"))
    }

    pub fn int(n: i64) -> Self {
        Self::raw(format!(":{n}\r\n"))
    }

    pub fn nil() -> Self {
        Self::raw("$-1\r\n")
    }

    pub fn bulk(text: &str) -> Self {
        Self::raw(bulk_bytes(text))
    }

    /// Array of bulk strings.
    pub fn bulks(items: &[&str]) -> Self {
        let mut bytes = format!("*{}\r\n", items.len()).into_bytes();
        for item in items {
            bytes.extend(bulk_bytes(item));
        }
        Self::raw(bytes)
    }

    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn bulk_bytes(text: &str) -> Vec<u8> {
    format!("${}\r\n{text}\r\n", text.len()).into_bytes()
}

type Responder = dyn Fn(&[String]) -> Option<Reply> + Send + Sync;

pub struct FakeStore {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeStore {
    /// Listen on an ephemeral local port. `responder` sees each command with
    /// its name upper-cased; `None` falls through to the default replies.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&[String]) -> Option<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let accept_log = Arc::clone(&log);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(
                    stream,
                    addr.port(),
                    Arc::clone(&responder),
                    Arc::clone(&accept_log),
                ));
            }
        });

        Self { addr, log }
    }

    pub fn node(&self) -> NodeAddr {
        NodeAddr::new("127.0.0.1", self.addr.port())
    }

    /// Every received command whose name is `name`.
    pub fn received(&self, name: &str) -> Vec<Vec<String>> {
        self.log
            .lock()
            .iter()
            .filter(|cmd| cmd.first().is_some_and(|c| c == name))
            .cloned()
            .collect()
    }

    /// Standalone configuration pointing at this server, one warm connection.
    pub fn config(&self, app_id: &str) -> TopologyConfig {
        TopologyConfig::builder(app_id)
            .node(self.node())
            .connect_timeout(Duration::from_secs(1))
            .read_timeout(Duration::from_secs(1))
            .max_wait(Duration::from_secs(1))
            .pool(PoolSizing::new(4, 1))
            .build()
    }

    pub fn count(&self, name: &str) -> usize {
        self.received(name).len()
    }
}

async fn serve(stream: TcpStream, port: u16, responder: Arc<Responder>, log: Arc<Mutex<Vec<Vec<String>>>>) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    while let Ok(Some(mut cmd)) = read_command(&mut reader).await {
        if let Some(name) = cmd.first_mut() {
            *name = name.to_ascii_uppercase();
        }
        log.lock().push(cmd.clone());
        let reply = responder(&cmd).unwrap_or_else(|| default_reply(&cmd, port));
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        if write.write_all(&reply.bytes).await.is_err() {
            return;
        }
    }
}

fn default_reply(cmd: &[String], port: u16) -> Reply {
    match cmd.first().map(String::as_str) {
        Some("PING") => match cmd.get(1) {
            Some(echo) => Reply::bulk(echo),
            None => Reply::status("PONG"),
        },
        Some("CLUSTER") if cmd.get(1).is_some_and(|s| s.eq_ignore_ascii_case("SLOTS")) => {
            let node = format!("*3\r\n$9\r\n127.0.0.1\r\n:{port}\r\n$4\r\nnode\r\n");
            Reply::raw(format!("*1\r\n*3\r\n:0\r\n:16383\r\n{node}"))
        }
        Some("EXPIRE") => Reply::int(1),
        _ => Reply::ok(),
    }
}

async fn read_command<R>(reader: &mut R) -> std::io::Result<Option<Vec<String>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count = header(&line, '*');
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len = header(&line, '$');
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn header(line: &str, marker: char) -> usize {
    line.trim_end()
        .strip_prefix(marker)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}
