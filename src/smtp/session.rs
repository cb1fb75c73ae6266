use std::time::Duration;

use native_tls::TlsConnector;

use super::error::SmtpError;
use super::stream::{SmtpReply, SmtpStream};

/// Command/reply layer over one [`SmtpStream`].
///
/// Construction covers the first two arrows of a domain pass: TCP connect and
/// the 220 greeting. Anything else is issued through [`command`], which
/// checks the reply code against the caller's accepted set.
///
/// [`command`]: SmtpSession::command
#[derive(Debug)]
pub struct SmtpSession {
    host: String,
    stream: SmtpStream,
    timeout: Option<Duration>,
}

impl SmtpSession {
    /// Connect to `host:port` and consume the greeting, which must be 220.
    /// Any failure leaves no open socket behind.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self, SmtpError> {
        let stream = SmtpStream::connect(host, port, timeout)?;
        let mut session = Self {
            host: host.to_string(),
            stream,
            timeout,
        };
        match session.expect_reply(&[220]) {
            Ok(greeting) => {
                tracing::trace!(host, code = greeting.code, "greeting");
                Ok(session)
            }
            Err(err) => {
                session.stream.close();
                Err(err)
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Send `text` and read one full reply. With a non-empty `accepted` set,
    /// a reply code outside the set fails with
    /// [`SmtpError::UnexpectedResponse`]; an empty set accepts anything
    /// (used for RSET and QUIT).
    pub fn command(&mut self, text: &str, accepted: &[u16]) -> Result<SmtpReply, SmtpError> {
        tracing::trace!(host = %self.host, command = text, "send");
        self.stream.send_command(text)?;
        self.expect_reply(accepted)
    }

    fn expect_reply(&mut self, accepted: &[u16]) -> Result<SmtpReply, SmtpError> {
        let reply = self.stream.read_reply()?;
        tracing::trace!(host = %self.host, code = reply.code, "reply");
        if !accepted.is_empty() && !accepted.contains(&reply.code) {
            return Err(SmtpError::UnexpectedResponse {
                code: reply.code,
                text: reply.text(),
            });
        }
        Ok(reply)
    }

    /// Upgrade the underlying stream to TLS, using the exchanger hostname for
    /// SNI and certificate validation.
    pub fn upgrade_tls(&mut self, connector: &TlsConnector) -> Result<(), SmtpError> {
        let host = self.host.clone();
        self.stream.upgrade_tls(&host, connector, self.timeout)
    }

    /// Wind the session down: RSET, QUIT, close. Runs on every exit path,
    /// successful or not, so reply mismatches and dead sockets are ignored.
    pub fn teardown(&mut self) {
        self.command("RSET", &[]).ok();
        self.command("QUIT", &[]).ok();
        self.stream.close();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn scripted_server(
        greeting: &'static str,
        replies: &'static [(&'static str, &'static str)],
    ) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            let (socket, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return received,
            };
            let mut writer = socket.try_clone().expect("clone");
            writer.write_all(greeting.as_bytes()).ok();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let command = line.trim_end().to_string();
                let quit = command == "QUIT";
                let reply = replies
                    .iter()
                    .find(|(prefix, _)| command.starts_with(prefix))
                    .map(|(_, reply)| *reply)
                    .unwrap_or("500 unrecognized\r\n");
                received.push(command);
                writer.write_all(reply.as_bytes()).ok();
                if quit {
                    break;
                }
            }
            received
        });
        (port, handle)
    }

    fn connect(port: u16) -> Result<SmtpSession, SmtpError> {
        SmtpSession::connect("127.0.0.1", port, Some(Duration::from_secs(2)))
    }

    #[test]
    fn rejects_non_220_greeting() {
        let (port, _handle) = scripted_server("554 go away\r\n", &[]);
        let err = connect(port).expect_err("greeting must be 220");
        assert!(matches!(
            err,
            SmtpError::UnexpectedResponse { code: 554, .. }
        ));
    }

    #[test]
    fn command_checks_accepted_codes() {
        let (port, _handle) = scripted_server(
            "220 mx.example\r\n",
            &[("HELO", "250 mx.example\r\n"), ("RCPT", "550 no mailbox\r\n")],
        );
        let mut session = connect(port).expect("connect");
        let reply = session
            .command("HELO sender.example", &[250])
            .expect("helo accepted");
        assert_eq!(reply.code, 250);

        let err = session
            .command("RCPT TO:<x@example.com>", &[250, 251])
            .expect_err("rcpt rejected");
        assert!(matches!(
            err,
            SmtpError::UnexpectedResponse { code: 550, .. }
        ));
    }

    #[test]
    fn empty_accepted_set_takes_any_reply() {
        let (port, _handle) =
            scripted_server("220 mx.example\r\n", &[("RSET", "502 not today\r\n")]);
        let mut session = connect(port).expect("connect");
        let reply = session.command("RSET", &[]).expect("any code accepted");
        assert_eq!(reply.code, 502);
    }

    #[test]
    fn teardown_sends_rset_and_quit() {
        let (port, handle) = scripted_server(
            "220 mx.example\r\n",
            &[("RSET", "250 ok\r\n"), ("QUIT", "221 bye\r\n")],
        );
        let mut session = connect(port).expect("connect");
        session.teardown();
        let received = handle.join().expect("server");
        assert_eq!(received, ["RSET", "QUIT"]);
    }
}
