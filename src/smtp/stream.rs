use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};

use super::error::SmtpError;

/// One parsed SMTP reply, possibly accumulated from several continuation
/// lines (code followed by `-` in the 4th column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

/// Blocking byte stream to one mail exchanger.
///
/// Owns reply-line buffering and the in-place STARTTLS upgrade. All reads and
/// writes honour the timeout given at connect time; `close` is idempotent.
#[derive(Debug)]
pub struct SmtpStream {
    state: StreamState,
    buffer: Vec<u8>,
}

impl SmtpStream {
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self, SmtpError> {
        let connect_err = |source: io::Error| SmtpError::ConnectionFailed {
            host: host.to_string(),
            port,
            source,
        };

        let addrs: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();

        let mut last_err = None;
        let mut stream = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(tcp) => {
                    stream = Some(tcp);
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }

        let stream = match stream {
            Some(stream) => stream,
            None => {
                let source = last_err.unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address resolved")
                });
                return Err(connect_err(source));
            }
        };

        stream.set_read_timeout(timeout).map_err(SmtpError::io)?;
        stream.set_write_timeout(timeout).map_err(SmtpError::io)?;
        Ok(Self {
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
        })
    }

    /// Write `command` plus CRLF and flush.
    pub fn send_command(&mut self, command: &str) -> Result<(), SmtpError> {
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        match &mut self.state {
            StreamState::Plain(stream) => write_all(stream, &data),
            StreamState::Tls(stream) => write_all(stream.as_mut(), &data),
            StreamState::Closed => Err(SmtpError::Protocol("stream is closed".into())),
        }
    }

    /// Read one full reply, following continuation lines until a terminal
    /// line (space in the 4th column) arrives. If the peer stops sending
    /// mid-reply, the lines accumulated so far form the reply.
    pub fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut code: Option<u16> = None;
        let mut lines = Vec::new();
        loop {
            let line = match self.read_line() {
                Ok(line) => line,
                // Timeout or close mid-reply: keep what already arrived.
                Err(err) if !lines.is_empty() => {
                    tracing::trace!(error = %err, "reply truncated, keeping accumulated lines");
                    break;
                }
                Err(err) => return Err(err),
            };
            if line.len() < 3 {
                return Err(SmtpError::Protocol(format!("invalid reply line: {line:?}")));
            }
            let parsed = line[..3]
                .parse::<u16>()
                .map_err(|_| SmtpError::Protocol(format!("invalid reply code in: {line:?}")))?;
            code.get_or_insert(parsed);
            let continuation = line.as_bytes().get(3).copied() == Some(b'-');
            let text = if line.len() > 4 {
                line[4..].to_string()
            } else {
                String::new()
            };
            lines.push(text);
            if !continuation {
                break;
            }
        }
        match code {
            Some(code) => Ok(SmtpReply { code, lines }),
            None => Err(SmtpError::Protocol("reply missing status code".into())),
        }
    }

    fn read_line(&mut self) -> Result<String, SmtpError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                if line.ends_with(b"\r\n") {
                    line.truncate(line.len() - 2);
                } else if line.ends_with(b"\n") {
                    line.truncate(line.len() - 1);
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpError::Protocol(format!("utf8 error: {err}")));
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Closed => {
                    return Err(SmtpError::Protocol("stream is closed".into()));
                }
            };
            let read = read.map_err(SmtpError::io)?;
            if read == 0 {
                return Err(SmtpError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }

    /// Perform the TLS handshake in place (after an accepted STARTTLS).
    /// Failure is fatal to the stream: the state becomes closed.
    pub fn upgrade_tls(
        &mut self,
        domain: &str,
        connector: &TlsConnector,
        timeout: Option<Duration>,
    ) -> Result<(), SmtpError> {
        let state = std::mem::replace(&mut self.state, StreamState::Closed);
        let plain = match state {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Closed => {
                return Err(SmtpError::Protocol("stream is closed".into()));
            }
        };

        let mut tls = complete_handshake(connector, domain, plain)?;
        if let Some(timeout) = timeout {
            tls.get_mut()
                .set_read_timeout(Some(timeout))
                .map_err(SmtpError::io)?;
            tls.get_mut()
                .set_write_timeout(Some(timeout))
                .map_err(SmtpError::io)?;
        }
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    /// Release the connection. Safe to call more than once.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Plain(stream) => {
                stream.shutdown(Shutdown::Both).ok();
            }
            StreamState::Tls(mut stream) => {
                stream.shutdown().ok();
            }
            StreamState::Closed => {}
        }
    }
}

fn write_all<W: Write>(stream: &mut W, data: &[u8]) -> Result<(), SmtpError> {
    stream.write_all(data).map_err(SmtpError::io)?;
    stream.flush().map_err(SmtpError::io)
}

fn complete_handshake(
    connector: &TlsConnector,
    domain: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, SmtpError> {
    match connector.connect(domain, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(err)) => Err(SmtpError::EncryptionUpgradeFailed { source: err }),
        Err(HandshakeError::WouldBlock(mut mid)) => loop {
            match mid.handshake() {
                Ok(tls) => break Ok(tls),
                Err(HandshakeError::Failure(err)) => {
                    break Err(SmtpError::EncryptionUpgradeFailed { source: err });
                }
                Err(HandshakeError::WouldBlock(next)) => mid = next,
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn serve_bytes(payload: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                socket.write_all(payload).ok();
                // Hold the socket open briefly so the client reads before EOF.
                thread::sleep(Duration::from_millis(50));
            }
        });
        port
    }

    fn connect(port: u16) -> SmtpStream {
        SmtpStream::connect("127.0.0.1", port, Some(Duration::from_secs(2))).expect("connect")
    }

    #[test]
    fn parses_single_line_reply() {
        let port = serve_bytes(b"220 mx.example ESMTP\r\n");
        let mut stream = connect(port);
        let reply = stream.read_reply().expect("reply");
        assert_eq!(reply.code, 220);
        assert_eq!(reply.lines, ["mx.example ESMTP"]);
        stream.close();
    }

    #[test]
    fn continuation_lines_do_not_terminate_reading() {
        let port = serve_bytes(b"250-Hello\r\n250-SIZE 35882577\r\n250 OK\r\n");
        let mut stream = connect(port);
        let reply = stream.read_reply().expect("reply");
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, ["Hello", "SIZE 35882577", "OK"]);
    }

    #[test]
    fn truncated_multiline_reply_keeps_accumulated_lines() {
        let port = serve_bytes(b"250-Hello\r\n");
        let mut stream = connect(port);
        let reply = stream.read_reply().expect("reply");
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, ["Hello"]);
    }

    #[test]
    fn garbage_reply_is_a_protocol_error() {
        let port = serve_bytes(b"oops\r\n");
        let mut stream = connect(port);
        let err = stream.read_reply().expect_err("should fail");
        assert!(matches!(err, SmtpError::Protocol(_)));
    }

    #[test]
    fn send_command_appends_crlf() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).expect("read");
            buf[..n].to_vec()
        });

        let mut stream = connect(port);
        stream.send_command("NOOP check").expect("send");
        let received = server.join().expect("join");
        assert_eq!(received, b"NOOP check\r\n");
    }

    #[test]
    fn connect_to_unbound_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let err = SmtpStream::connect("127.0.0.1", port, Some(Duration::from_millis(500)))
            .expect_err("refused");
        assert!(matches!(err, SmtpError::ConnectionFailed { .. }));
    }

    #[test]
    fn close_is_idempotent() {
        let port = serve_bytes(b"220 hi\r\n");
        let mut stream = connect(port);
        stream.close();
        stream.close();
        let err = stream.send_command("NOOP").expect_err("closed");
        assert!(matches!(err, SmtpError::Protocol(_)));
    }
}
