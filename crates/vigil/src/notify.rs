//! Operator notification.
//!
//! Reports and engine errors are mailed as plain text through an SMTP relay.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{error, info};

use crate::config::Config;
use crate::error::NotifyError;

/// Upper bound for one complete SMTP conversation
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Notifier trait for abstracting how reports reach the operator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Tell the operator about an engine error; a failure to do so is only logged
pub async fn notify_error(notifier: &dyn Notifier, err: &dyn Display) {
    let subject = format!("VIGIL: An error occurred: {}", err);
    if let Err(e) = notifier.notify(&subject, &err.to_string()).await {
        error!("Unable to send error notification: {}", e);
    }
}

/// Plain SMTP delivery without authentication
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    server: String,
    from: String,
    to: String,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(server: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { server: server.into(), from: from.into(), to: to.into(), timeout: SMTP_TIMEOUT }
    }

    /// Create a notifier from the configured relay, sender and recipient
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.smtp_server(), &config.email_from, &config.email_to)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Headers and dot-stuffed body, CRLF terminated lines
    fn message(&self, subject: &str, body: &str) -> String {
        let mut message = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=\"utf-8\"\r\n\r\n",
            self.from, self.to, subject
        );

        for line in body.lines() {
            if line.starts_with('.') {
                message.push('.');
            }
            message.push_str(line);
            message.push_str("\r\n");
        }

        message
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let stream = TcpStream::connect(&self.server).await?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        expect_reply(&mut reader, "connect", &[220]).await?;
        command(&mut writer, &mut reader, "HELO vigil", &[250]).await?;
        command(&mut writer, &mut reader, &format!("MAIL FROM:<{}>", self.from), &[250]).await?;
        command(&mut writer, &mut reader, &format!("RCPT TO:<{}>", self.to), &[250, 251]).await?;
        command(&mut writer, &mut reader, "DATA", &[354]).await?;

        writer.write_all(self.message(subject, body).as_bytes()).await?;
        command(&mut writer, &mut reader, ".", &[250]).await?;
        command(&mut writer, &mut reader, "QUIT", &[221]).await?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!("Sending '{}' to {} via {}", subject, self.to, self.server);
        tokio::time::timeout(self.timeout, self.send(subject, body))
            .await
            .map_err(|_| NotifyError::Timeout)?
    }
}

async fn command<W, R>(
    writer: &mut W,
    reader: &mut R,
    line: &str,
    accepted: &[u16],
) -> Result<(), NotifyError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufReadExt + Unpin,
{
    writer.write_all(format!("{}\r\n", line).as_bytes()).await?;
    writer.flush().await?;
    expect_reply(reader, line, accepted).await
}

/// Read a (possibly multi-line) reply and check its code
async fn expect_reply<R>(reader: &mut R, command: &str, accepted: &[u16]) -> Result<(), NotifyError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut reply = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(NotifyError::Smtp {
                command: command.to_string(),
                reply: "connection closed".to_string(),
            });
        }
        reply.push_str(&line);
        // "250-" continues a reply, "250 " ends it
        if line.as_bytes().get(3) != Some(&b'-') {
            break;
        }
    }

    let code = reply.get(..3).and_then(|code| code.parse::<u16>().ok());
    match code {
        Some(code) if accepted.contains(&code) => Ok(()),
        _ => Err(NotifyError::Smtp { command: command.to_string(), reply: reply.trim().to_string() }),
    }
}
