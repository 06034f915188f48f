//! Unix-socket listener holding at most one client session.

use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{FrameError, RemoteError};
use crate::protocol::{Decoded, FrameDecoder, Request, Response};

const READ_CHUNK: usize = 4096;

/// Retry interval while the client is not draining our writes.
const WRITE_RETRY: Duration = Duration::from_millis(1);

/// One event read from the session.
#[derive(Debug)]
pub enum Incoming {
    Request(Request),
    Malformed(FrameError),
    /// The session ended. The listener has already dropped it.
    Closed,
}

enum ReadState {
    Alive,
    Disconnected,
}

struct Session {
    id: u64,
    stream: UnixStream,
    decoder: FrameDecoder,
    // The client closed its write side; buffered frames are still served.
    closing: bool,
}

pub struct Listener {
    listener: UnixListener,
    path: PathBuf,
    session: Option<Session>,
    max_request: usize,
    next_id: u64,
}

impl Listener {
    /// Bind the control socket, replacing any stale socket file.
    pub fn bind(path: &Path, max_request: usize) -> Result<Self, RemoteError> {
        let bind_err = |source| RemoteError::Bind {
            path: path.to_path_buf(),
            source,
        };
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed stale socket {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(bind_err(e)),
        }
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        info!("Remote control listening on {}", path.display());
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            session: None,
            max_request,
            next_id: 1,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Accept a pending connection, if any. A new client supersedes the
    /// current one, which is shut down first. Returns true when a new
    /// session was adopted.
    pub fn poll_accept(&mut self) -> bool {
        let stream = match self.listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
            Err(e) => {
                warn!("Remote control accept failed: {e}");
                return false;
            }
        };
        if let Err(e) = stream.set_nonblocking(true) {
            warn!("Remote control could not configure client socket: {e}");
            return false;
        }

        if let Some(old) = self.session.take() {
            info!("Session {} superseded by a new client", old.id);
            let _ = old.stream.shutdown(Shutdown::Both);
        }

        let id = self.next_id;
        self.next_id += 1;
        info!("Session {id} connected");
        self.session = Some(Session {
            id,
            stream,
            decoder: FrameDecoder::new(self.max_request),
            closing: false,
        });
        true
    }

    /// Next event from the session without blocking. Buffered frames are
    /// returned before the socket is read again, and frames received before
    /// the client closed are all returned before `Closed`.
    pub fn next_request(&mut self) -> Option<Incoming> {
        let session = self.session.as_mut()?;

        let decoded = match session.decoder.decode() {
            Some(decoded) => decoded,
            None if session.closing => {
                self.drop_session("closed by client");
                return Some(Incoming::Closed);
            }
            None => {
                match read_available(&mut session.stream, &mut session.decoder) {
                    Ok(ReadState::Alive) => {}
                    Ok(ReadState::Disconnected) => session.closing = true,
                    Err(e) => {
                        warn!("Session read failed: {e}");
                        self.drop_session("read error");
                        return Some(Incoming::Closed);
                    }
                }
                match session.decoder.decode() {
                    Some(decoded) => decoded,
                    None if session.closing => {
                        self.drop_session("closed by client");
                        return Some(Incoming::Closed);
                    }
                    None => return None,
                }
            }
        };

        Some(match decoded {
            Decoded::Frame(payload) => match Request::parse(&payload) {
                Ok(request) => Incoming::Request(request),
                Err(e) => Incoming::Malformed(e),
            },
            Decoded::Malformed(e) => Incoming::Malformed(e),
        })
    }

    /// Write a response, blocking until the client has taken all of it.
    /// Returns false when the session was dropped because the write failed.
    pub fn send(&mut self, response: &Response) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match write_all_blocking(&mut session.stream, &response.encode()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Session write failed: {e}");
                self.drop_session("write error");
                false
            }
        }
    }

    fn drop_session(&mut self, reason: &str) {
        if let Some(session) = self.session.take() {
            info!("Session {} disconnected ({reason})", session.id);
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.stream.shutdown(Shutdown::Both);
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Could not remove socket {}: {e}", self.path.display());
            }
        }
    }
}

fn read_available(
    stream: &mut UnixStream,
    decoder: &mut FrameDecoder,
) -> std::io::Result<ReadState> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(ReadState::Disconnected),
            Ok(n) => {
                decoder.extend(&chunk[..n]);
                if n < chunk.len() {
                    return Ok(ReadState::Alive);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadState::Alive),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn write_all_blocking(stream: &mut UnixStream, mut bytes: &[u8]) -> std::io::Result<()> {
    while !bytes.is_empty() {
        match stream.write(bytes) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(WRITE_RETRY),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
