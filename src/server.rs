use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::prelude::*;
use crate::router::error_response;

const POLL_TIMEOUT: Duration = Duration::from_secs(30);

struct Listener {
    socket: TcpListener,
    port: u16,
}

/// Per-socket record: the stream, the listen port it was accepted on, the
/// bytes accumulated so far and, for large bodies, the in-flight transfer.
struct Connection {
    stream: TcpStream,
    port: u16,
    buffer: Vec<u8>,
    upload: Option<UploadState>,
}

/// The event-driven multiplexer. Owns every listen and connection socket
/// and drives the readiness loop; the configuration must outlive it.
pub struct Server<'a> {
    poll: Poll,
    events: Events,
    listeners: HashMap<Token, Listener>,
    connections: HashMap<Token, Connection>,
    router: Router<'a>,
    next_token: usize,
}

impl<'a> Server<'a> {
    /// Binds one non-blocking listener per distinct configured endpoint
    /// and registers it for readiness. Any bind failure aborts startup.
    pub fn new(config: &'a Config) -> Result<Self> {
        let poll = Poll::new()?;
        let mut listeners = HashMap::new();
        let mut bound = HashSet::new();
        let mut next_token = 0;

        for server in &config.servers {
            for listen in &server.listens {
                if !bound.insert((listen.addr, listen.port)) {
                    continue;
                }
                let addr = SocketAddr::V4(SocketAddrV4::new(
                    Ipv4Addr::from(listen.addr),
                    listen.port,
                ));
                info!("attempting to create listen socket for {}", addr);
                let mut socket = match TcpListener::bind(addr) {
                    Ok(socket) => socket,
                    Err(e) => {
                        error!("failed to bind {}: {}", addr, e);
                        return Err(e.into());
                    }
                };
                let token = Token(next_token);
                next_token += 1;
                poll.registry()
                    .register(&mut socket, token, Interest::READABLE)?;
                listeners.insert(
                    token,
                    Listener {
                        socket,
                        port: listen.port,
                    },
                );
                info!("listening on {} (token {})", addr, token.0);
            }
        }

        Ok(Server {
            poll,
            events: Events::with_capacity(MAX_POLL_EVENTS),
            listeners,
            connections: HashMap::new(),
            router: Router::new(config),
            next_token,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        info!("entering event loop ({} listeners)", self.listeners.len());
        loop {
            if let Err(e) = self.poll.poll(&mut self.events, Some(POLL_TIMEOUT)) {
                error!("poll failed: {}", e);
                break;
            }
            if self.events.is_empty() {
                continue;
            }

            // Dispatch in ascending token order within the batch.
            let mut ready: Vec<Token> = self.events.iter().map(|event| event.token()).collect();
            ready.sort();
            ready.dedup();

            for token in ready {
                if self.listeners.contains_key(&token) {
                    self.accept_connections(token);
                } else if self.connections.contains_key(&token) {
                    self.handle_connection(token);
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Closes every descriptor. Unfinished uploads release their temp
    /// files as the states drop.
    fn shutdown(&mut self) {
        for (_, mut listener) in self.listeners.drain() {
            let _ = self.poll.registry().deregister(&mut listener.socket);
        }
        for (_, mut conn) in self.connections.drain() {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
        info!("event loop stopped, all descriptors closed");
    }

    /// Drains the listener until the kernel has no pending connections.
    fn accept_connections(&mut self, token: Token) {
        let Some(listener) = self.listeners.get(&token) else {
            return;
        };
        let port = listener.port;
        loop {
            match listener.socket.accept() {
                Ok((mut stream, peer)) => {
                    let client = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(e) =
                        self.poll
                            .registry()
                            .register(&mut stream, client, Interest::READABLE)
                    {
                        warn!("failed to register connection from {}: {}", peer, e);
                        continue;
                    }
                    debug!(
                        "accepted connection from {} on port {} (token {})",
                        peer, port, client.0
                    );
                    self.connections.insert(
                        client,
                        Connection {
                            stream,
                            port,
                            buffer: Vec::new(),
                            upload: None,
                        },
                    );
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("unable to accept new connection: {}", e);
                    break;
                }
            }
        }
    }

    fn handle_connection(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };
        let keep = if conn.upload.is_some() {
            self.continue_upload(&mut conn)
        } else {
            self.read_request(&mut conn)
        };
        if keep {
            self.connections.insert(token, conn);
        } else {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }

    /// Accumulates header bytes, decides between the inline and the
    /// streamed body path, and responds. Returns false once the
    /// connection is done with.
    fn read_request(&mut self, conn: &mut Connection) -> bool {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        let header_end;
        loop {
            if let Some(pos) = find_subsequence(&conn.buffer, b"\r\n\r\n") {
                header_end = pos;
                break;
            }
            match conn.stream.read(&mut buf) {
                // Peer closed before the header terminator arrived.
                Ok(0) => return false,
                Ok(n) => conn.buffer.extend_from_slice(&buf[..n]),
                // Wait for the next readiness event.
                Err(e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(e) => {
                    debug!("read error: {}", e);
                    return false;
                }
            }
        }

        let body_start = header_end + 4;
        let declared = declared_content_length(&conn.buffer[..header_end]);

        if UploadSink::is_large(declared) {
            return self.begin_upload(conn, body_start, declared);
        }

        if declared > 0 {
            // Pull the rest of a small body in within this event.
            let mut retries = 0;
            while conn.buffer.len() < body_start + declared {
                match conn.stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        conn.buffer.extend_from_slice(&buf[..n]);
                        retries = 0;
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        retries += 1;
                        if retries > READ_RETRY_LIMIT {
                            warn!(
                                "request body still short after {} empty reads, continuing",
                                READ_RETRY_LIMIT
                            );
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }

        self.respond(conn, None);
        false
    }

    /// Opens the sink, seeds it with body bytes that arrived with the
    /// header read, and leaves the connection parked for continuation.
    fn begin_upload(&mut self, conn: &mut Connection, body_start: usize, declared: usize) -> bool {
        let mut sink = UploadSink::new();
        if let Err(e) = sink.start(declared) {
            error!("failed to start upload sink: {}", e);
            return false;
        }

        let header_bytes = conn.buffer[..body_start].to_vec();
        let mut state = UploadState::new(sink, declared, header_bytes);

        let seed = &conn.buffer[body_start..];
        if !seed.is_empty() {
            let take = seed.len().min(declared);
            if let Err(e) = state.sink.write(&seed[..take]) {
                error!("failed to stream upload chunk: {}", e);
                return false;
            }
            state.received = take;
        }
        conn.buffer.clear();

        if state.is_finished() {
            return self.finish_upload(conn, state);
        }
        info!(
            "streaming large upload: {}/{} bytes buffered",
            state.received, state.expected
        );
        conn.upload = Some(state);
        self.continue_upload(conn)
    }

    /// One continuation step: read 8 KiB slices until the kernel would
    /// block, the body completes, or the transfer dies. Abandoned
    /// transfers drop their state, which deletes the temp file.
    fn continue_upload(&mut self, conn: &mut Connection) -> bool {
        let Some(mut state) = conn.upload.take() else {
            return false;
        };
        let mut buf = [0u8; UPLOAD_CHUNK_SIZE];
        loop {
            match conn.stream.read(&mut buf) {
                Ok(0) => {
                    warn!(
                        "peer closed mid-upload ({}/{} bytes)",
                        state.received, state.expected
                    );
                    return false;
                }
                Ok(n) => {
                    let take = n.min(state.remaining());
                    if let Err(e) = state.sink.write(&buf[..take]) {
                        error!("failed to stream upload chunk: {}", e);
                        return false;
                    }
                    state.received += take;
                    state.retries = 0;
                    if state.is_finished() {
                        return self.finish_upload(conn, state);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    state.retries += 1;
                    if state.retries > UPLOAD_RETRY_LIMIT {
                        warn!(
                            "upload stalled, abandoning after {} empty reads",
                            UPLOAD_RETRY_LIMIT
                        );
                        return false;
                    }
                    conn.upload = Some(state);
                    return true;
                }
                Err(e) => {
                    error!("upload read error: {}", e);
                    return false;
                }
            }
        }
    }

    /// Finalizes the sink, reparses the retained header bytes with the
    /// temp-file path attached, and sends the routed response.
    fn finish_upload(&mut self, conn: &mut Connection, mut state: UploadState) -> bool {
        if state.sink.finish().is_err() {
            return false;
        }
        state.sink.release_retention();
        let temp_path = state.sink.path().to_path_buf();
        conn.buffer = std::mem::take(&mut state.header_bytes);
        self.respond(conn, Some(temp_path));
        false
    }

    /// Parse, route, serialize, send. One write; the connection is closed
    /// right after by the caller.
    fn respond(&mut self, conn: &mut Connection, temp_path: Option<PathBuf>) {
        let mut request = HttpRequest::new();
        if let Some(path) = temp_path {
            request.set_temp_file_path(path);
        }

        let response = match request.parse(&conn.buffer) {
            Ok(()) => self.router.process(&request, conn.port),
            Err(e) => {
                warn!("request parse failed: {}", e);
                error_response(HTTP_BAD_REQUEST, self.router.server_for_port(conn.port))
            }
        };

        let bytes = response.to_bytes();
        match conn.stream.write(&bytes) {
            Ok(sent) => debug!(
                "response {} sent on port {} ({}/{} bytes)",
                response.status_code,
                conn.port,
                sent,
                bytes.len()
            ),
            Err(e) => debug!("send failed: {}", e),
        }
    }
}

/// Last Content-Length in the header section, or 0.
fn declared_content_length(head: &[u8]) -> usize {
    let head = String::from_utf8_lossy(head);
    let mut length = 0;
    for line in head.split("\r\n").skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    length
}
