//! SMTP provider: one mail per event
//!
//! Every event opens a short SMTP session (`EHLO`, optional `AUTH LOGIN`,
//! `MAIL FROM`, `RCPT TO` per recipient, `DATA`, `QUIT`). Connect, read and
//! write are bounded by `ConnectTimeoutMs`. With `UseSSL` the session runs
//! over implicit TLS, which needs the `tls` cargo feature.

use crate::core::{
    keys, EventKind, LineStyle, LogEvent, LoggerError, ProviderProperties, ProviderSink, Result,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const COMPONENT: &str = "SMTPProvider";
const SUBJECT_PREVIEW: usize = 60;

/// Connection and envelope settings read from the provider properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub credentials: Option<(String, String)>,
    pub use_ssl: bool,
    pub sender_name: Option<String>,
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Send an HTML body coloured by event kind
    pub html: bool,
}

impl SmtpSettings {
    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        let use_ssl = properties.flag(keys::USE_SSL);
        if use_ssl && !cfg!(feature = "tls") {
            return Err(LoggerError::config(
                COMPONENT,
                "UseSSL requires the crate to be built with the `tls` feature",
            ));
        }

        let to = split_addresses(properties.text(keys::RECIPIENT));
        if to.is_empty() {
            properties.require_text(keys::RECIPIENT)?;
        }

        let credentials = match (
            properties.text(keys::USER_NAME),
            properties.text(keys::PASSWORD),
        ) {
            (Some(user), Some(password)) => Some((user.to_string(), password.to_string())),
            _ => None,
        };

        Ok(Self {
            host: properties.require_text(keys::HOST)?.to_string(),
            port: properties
                .port()
                .unwrap_or(if use_ssl { 465 } else { 25 }),
            timeout: properties
                .count(keys::CONNECT_TIMEOUT_MS)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            credentials,
            use_ssl,
            sender_name: properties.text(keys::SENDER_NAME).map(String::from),
            from: properties.require_text(keys::FROM)?.to_string(),
            to,
            cc: split_addresses(properties.text(keys::CC)),
            bcc: split_addresses(properties.text(keys::BCC)),
            subject: properties.text(keys::SUBJECT).map(String::from),
            body: properties.text(keys::BODY).map(String::from),
            html: properties.flag(keys::SHOW_EVENT_COLORS),
        })
    }

    fn recipients(&self) -> impl Iterator<Item = &String> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }
}

fn split_addresses(list: Option<&str>) -> Vec<String> {
    list.map(|s| {
        s.split([',', ';'])
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

pub struct SmtpSink {
    settings: SmtpSettings,
    style: LineStyle,
    hello_name: String,
    #[cfg(feature = "tls")]
    tls: Option<std::sync::Arc<rustls::ClientConfig>>,
}

impl SmtpSink {
    pub fn from_properties(properties: &ProviderProperties) -> Result<Self> {
        let settings = SmtpSettings::from_properties(properties)?;
        let style = LineStyle {
            show_colors: false,
            ..LineStyle::from_properties(properties)
        };

        #[cfg(feature = "tls")]
        let tls = if settings.use_ssl {
            Some(tls_config()?)
        } else {
            None
        };

        Ok(Self {
            settings,
            style,
            hello_name: std::env::var("HOSTNAME")
                .ok()
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            #[cfg(feature = "tls")]
            tls,
        })
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn subject(&self, event: &LogEvent) -> String {
        match &self.settings.subject {
            Some(subject) => format!("{} [{}]", subject, event.kind),
            None => {
                let preview: String = event.message.chars().take(SUBJECT_PREVIEW).collect();
                format!("[{}] {}", event.kind, preview)
            }
        }
    }

    /// Build the RFC 5322 message text, CRLF line endings, not yet dot-stuffed
    pub fn compose(&self, event: &LogEvent) -> String {
        let s = &self.settings;
        let mut headers = Vec::with_capacity(8);

        let from = match &s.sender_name {
            Some(name) => format!("\"{}\" <{}>", header_value(name), s.from),
            None => format!("<{}>", s.from),
        };
        headers.push(format!("From: {}", header_value(&from)));
        headers.push(format!("To: {}", header_value(&s.to.join(", "))));
        if !s.cc.is_empty() {
            headers.push(format!("Cc: {}", header_value(&s.cc.join(", "))));
        }
        headers.push(format!("Subject: {}", header_value(&self.subject(event))));
        headers.push(format!("Date: {}", Local::now().to_rfc2822()));
        headers.push("MIME-Version: 1.0".to_string());
        let content_type = if s.html { "text/html" } else { "text/plain" };
        headers.push(format!("Content-Type: {}; charset=utf-8", content_type));
        headers.push("Content-Transfer-Encoding: 8bit".to_string());

        let line = self.style.render_verbatim(event);
        let body = if s.html {
            html_body(s.body.as_deref(), &line, event.kind)
        } else {
            match &s.body {
                Some(intro) => format!("{}\n\n{}", intro, line),
                None => line,
            }
        };

        let mut message = headers.join("\r\n");
        message.push_str("\r\n\r\n");
        message.push_str(&crlf(&body));
        message
    }

    fn connect(&self) -> Result<TcpStream> {
        let s = &self.settings;
        let addrs = (s.host.as_str(), s.port).to_socket_addrs().map_err(|e| {
            LoggerError::transport(COMPONENT, format!("cannot resolve {}: {}", s.host, e))
        })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, s.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(s.timeout))?;
                    stream.set_write_timeout(Some(s.timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(LoggerError::transport(
            COMPONENT,
            format!(
                "cannot connect to {}:{}: {}",
                s.host,
                s.port,
                last_error.map_or_else(|| "no address".to_string(), |e| e.to_string())
            ),
        ))
    }

    #[cfg(feature = "tls")]
    fn wrap_tls(
        &self,
        config: &std::sync::Arc<rustls::ClientConfig>,
        stream: TcpStream,
    ) -> Result<rustls::StreamOwned<rustls::ClientConnection, TcpStream>> {
        let server_name = rustls::pki_types::ServerName::try_from(self.settings.host.clone())
            .map_err(|e| {
                LoggerError::config(
                    COMPONENT,
                    format!("invalid TLS server name '{}': {}", self.settings.host, e),
                )
            })?;
        let connection = rustls::ClientConnection::new(std::sync::Arc::clone(config), server_name)
            .map_err(|e| LoggerError::transport(COMPONENT, format!("TLS setup failed: {}", e)))?;
        Ok(rustls::StreamOwned::new(connection, stream))
    }
}

impl ProviderSink for SmtpSink {
    fn emit(&mut self, event: &LogEvent) -> Result<()> {
        let message = self.compose(event);
        let stream = self.connect()?;

        #[cfg(feature = "tls")]
        if let Some(config) = &self.tls {
            let stream = self.wrap_tls(config, stream)?;
            return send_mail(stream, &self.settings, &self.hello_name, &message);
        }

        send_mail(stream, &self.settings, &self.hello_name, &message)
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

#[cfg(feature = "tls")]
fn tls_config() -> Result<std::sync::Arc<rustls::ClientConfig>> {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder_with_provider(std::sync::Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| LoggerError::config(COMPONENT, format!("TLS configuration failed: {}", e)))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(std::sync::Arc::new(config))
}

/// Line-oriented SMTP client over any byte stream
struct SmtpSession<S: Read + Write> {
    stream: BufReader<S>,
}

impl<S: Read + Write> SmtpSession<S> {
    fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Read one possibly multi-line reply
    fn read_reply(&mut self, stage: &str) -> Result<(u16, String)> {
        let mut text = String::new();
        loop {
            let mut line = String::new();
            let read = self
                .stream
                .read_line(&mut line)
                .map_err(|e| LoggerError::transport(COMPONENT, format!("{}: {}", stage, e)))?;
            if read == 0 {
                return Err(LoggerError::transport(
                    COMPONENT,
                    format!("{}: connection closed by server", stage),
                ));
            }
            let code = line
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or_else(|| {
                    LoggerError::transport(
                        COMPONENT,
                        format!("{}: malformed reply '{}'", stage, line.trim_end()),
                    )
                })?;
            text.push_str(line.get(4..).unwrap_or("").trim_end());
            if line.as_bytes().get(3) != Some(&b'-') {
                return Ok((code, text));
            }
            text.push('\n');
        }
    }

    fn expect(&mut self, accepted: &[u16], stage: &str) -> Result<String> {
        let (code, text) = self.read_reply(stage)?;
        if accepted.contains(&code) {
            Ok(text)
        } else {
            Err(rejected(stage, code, &text))
        }
    }

    fn write_raw(&mut self, data: &str, stage: &str) -> Result<()> {
        let stream = self.stream.get_mut();
        stream
            .write_all(data.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| LoggerError::transport(COMPONENT, format!("{}: {}", stage, e)))
    }

    fn command(&mut self, line: &str, accepted: &[u16], stage: &str) -> Result<String> {
        self.write_raw(&format!("{}\r\n", line), stage)?;
        self.expect(accepted, stage)
    }
}

fn rejected(stage: &str, code: u16, text: &str) -> LoggerError {
    let message = format!("{} rejected: {} {}", stage, code, text.trim());
    // Bad credentials do not get better by retrying
    if stage.starts_with("AUTH") && code >= 500 {
        LoggerError::fault(COMPONENT, message)
    } else {
        LoggerError::transport(COMPONENT, message)
    }
}

fn send_mail<S: Read + Write>(
    stream: S,
    settings: &SmtpSettings,
    hello_name: &str,
    message: &str,
) -> Result<()> {
    let mut session = SmtpSession::new(stream);
    session.expect(&[220], "greeting")?;

    if session
        .command(&format!("EHLO {}", hello_name), &[250], "EHLO")
        .is_err()
    {
        session.command(&format!("HELO {}", hello_name), &[250], "HELO")?;
    }

    if let Some((user, password)) = &settings.credentials {
        session.command("AUTH LOGIN", &[334], "AUTH")?;
        session.command(&STANDARD.encode(user), &[334], "AUTH username")?;
        session.command(&STANDARD.encode(password), &[235], "AUTH password")?;
    }

    session.command(&format!("MAIL FROM:<{}>", settings.from), &[250], "MAIL FROM")?;
    for recipient in settings.recipients() {
        session.command(&format!("RCPT TO:<{}>", recipient), &[250, 251], "RCPT TO")?;
    }

    session.command("DATA", &[354], "DATA")?;
    let mut payload = dot_stuff(message);
    payload.push_str("\r\n.\r\n");
    session.write_raw(&payload, "message")?;
    session.expect(&[250], "message")?;

    let _ = session.command("QUIT", &[221], "QUIT");
    Ok(())
}

/// Strip line breaks from a header value
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn crlf(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// Escape lines starting with a dot, as DATA requires
pub fn dot_stuff(message: &str) -> String {
    message
        .split("\r\n")
        .map(|line| {
            if line.starts_with('.') {
                format!(".{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn html_body(intro: Option<&str>, line: &str, kind: EventKind) -> String {
    let mut html = String::from("<html><body>\n");
    if let Some(intro) = intro {
        html.push_str(&format!("<p>{}</p>\n", html_escape(intro)));
    }
    html.push_str(&format!(
        "<pre style=\"color:{}\">{}</pre>\n",
        kind.html_color(),
        html_escape(line)
    ));
    html.push_str("</body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ProviderType;
    use std::net::TcpListener;
    use std::thread;

    fn smtp_props(port: u16) -> ProviderProperties {
        let mut props = ProviderProperties::new("smtp", ProviderType::Smtp);
        props
            .set_provider_info([
                ("Host", crate::core::PropertyValue::from("127.0.0.1")),
                ("Port", port.into()),
                ("UserName", "user".into()),
                ("Password", "secret".into()),
                ("SenderName", "Log Robot".into()),
                ("From", "noreply@domain.com".into()),
                ("Recipient", "alert@domain.com".into()),
                ("CC", "cc1@domain.com; cc2@domain.com".into()),
                ("BCC", "audit@domain.com".into()),
                ("Subject", "Production alert".into()),
                ("ShowEventColors", false.into()),
                ("ShowTimeStamp", false.into()),
            ])
            .unwrap();
        props
    }

    /// Minimal scripted SMTP server; returns every line the client sent
    fn fake_server(password_reply: &'static str) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);
            let mut seen = Vec::new();
            let mut in_data = false;
            let mut auth_step = 0;

            writer.write_all(b"220 fake ESMTP ready\r\n").unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                seen.push(line.clone());

                let reply: &str = if in_data {
                    if line == "." {
                        in_data = false;
                        "250 queued\r\n"
                    } else {
                        continue;
                    }
                } else if auth_step == 1 {
                    auth_step = 2;
                    "334 UGFzc3dvcmQ6\r\n"
                } else if auth_step == 2 {
                    auth_step = 0;
                    password_reply
                } else if line.starts_with("EHLO") {
                    "250-fake greets you\r\n250 AUTH LOGIN\r\n"
                } else if line == "AUTH LOGIN" {
                    auth_step = 1;
                    "334 VXNlcm5hbWU6\r\n"
                } else if line.starts_with("MAIL FROM") || line.starts_with("RCPT TO") {
                    "250 ok\r\n"
                } else if line == "DATA" {
                    in_data = true;
                    "354 go ahead\r\n"
                } else if line == "QUIT" {
                    writer.write_all(b"221 bye\r\n").unwrap();
                    break;
                } else {
                    "500 unknown\r\n"
                };
                writer.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });
        (port, handle)
    }

    #[test]
    fn test_settings_require_host_from_recipient() {
        let props = ProviderProperties::new("smtp", ProviderType::Smtp);
        assert!(SmtpSettings::from_properties(&props).is_err());

        let settings = SmtpSettings::from_properties(&smtp_props(2525)).unwrap();
        assert_eq!(settings.port, 2525);
        assert_eq!(settings.cc, vec!["cc1@domain.com", "cc2@domain.com"]);
        assert_eq!(settings.recipients().count(), 4);
        assert_eq!(settings.timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn test_ssl_needs_tls_feature() {
        let mut props = smtp_props(465);
        props.set(keys::USE_SSL, true).unwrap();
        assert!(matches!(
            SmtpSettings::from_properties(&props),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_full_session() {
        let (port, server) = fake_server("235 authenticated\r\n");
        let mut sink = SmtpSink::from_properties(&smtp_props(port)).unwrap();

        sink.emit(&LogEvent::new(EventKind::Error, "Error line"))
            .unwrap();
        let seen = server.join().unwrap();

        assert!(seen.iter().any(|l| l == &STANDARD.encode("user")));
        assert!(seen.iter().any(|l| l == &STANDARD.encode("secret")));
        assert!(seen.contains(&"MAIL FROM:<noreply@domain.com>".to_string()));
        for rcpt in ["alert@domain.com", "cc1@domain.com", "cc2@domain.com", "audit@domain.com"] {
            assert!(seen.contains(&format!("RCPT TO:<{}>", rcpt)), "missing {}", rcpt);
        }
        assert!(seen.contains(&"Subject: Production alert [ERROR]".to_string()));
        assert!(seen.contains(&"[ERROR] Error line".to_string()));
        assert!(!seen.iter().any(|l| l.starts_with("Bcc")));
        assert_eq!(seen.last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn test_rejected_password_is_unrecoverable() {
        let (port, server) = fake_server("535 bad credentials\r\n");
        let mut sink = SmtpSink::from_properties(&smtp_props(port)).unwrap();

        let err = sink
            .emit(&LogEvent::new(EventKind::Info, "x"))
            .unwrap_err();
        drop(sink);
        let _ = server.join();

        assert!(err.is_unrecoverable(), "{}", err);
    }

    #[test]
    fn test_connection_refused_is_transient() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut sink = SmtpSink::from_properties(&smtp_props(port)).unwrap();

        let err = sink
            .emit(&LogEvent::new(EventKind::Info, "x"))
            .unwrap_err();
        assert!(matches!(err, LoggerError::Transport { .. }));
    }

    #[test]
    fn test_compose_html_body() {
        let mut props = smtp_props(25);
        props
            .set_provider_info([("ShowEventColors", true)])
            .unwrap();
        props.set(keys::BODY, "See <details>").unwrap();
        let sink = SmtpSink::from_properties(&props).unwrap();

        let message = sink.compose(&LogEvent::new(EventKind::Warning, "disk & cpu"));
        assert!(message.contains("Content-Type: text/html; charset=utf-8"));
        assert!(message.contains("<p>See &lt;details&gt;</p>"));
        assert!(message.contains("disk &amp; cpu"));
        assert!(message.contains(EventKind::Warning.html_color()));
        assert!(message.contains("From: \"Log Robot\" <noreply@domain.com>"));
    }

    #[test]
    fn test_plain_body_keeps_message_lines() {
        let sink = SmtpSink::from_properties(&smtp_props(25)).unwrap();

        let message = sink.compose(&LogEvent::new(
            EventKind::Critical,
            "disk full\nretrying\tin 5s",
        ));
        let (headers, body) = message.split_once("\r\n\r\n").unwrap();
        assert!(headers.contains("Subject: Production alert [CRITICAL]\r\n"));
        assert!(body.ends_with("[CRITICAL] disk full\r\nretrying\tin 5s"));
    }

    #[test]
    fn test_dot_stuffing() {
        assert_eq!(dot_stuff("a\r\n.b\r\n..c"), "a\r\n..b\r\n...c");
        assert_eq!(crlf("x\ny\r\nz\rw"), "x\r\ny\r\nz\r\nw");
    }
}
