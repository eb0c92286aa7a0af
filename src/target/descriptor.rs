//! Connection string parsing.
//!
//! # Accepted Forms
//! ```text
//! Server=db;Port=3306;Database=app;User=api;Password=secret   (keyword pairs)
//! mysql://api:secret@db:3306/app                              (URL)
//! db:3306                                                     (bare host[:port])
//! ```
//!
//! # Design Decisions
//! - Only the host and port are needed to probe; the rest is kept for logging
//! - The password is never stored, only whether one was supplied
//! - Unknown keywords are ignored (drivers accept many tuning options)

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Port used when the connection string does not name one.
pub const DEFAULT_PORT: u16 = 3306;

/// Errors produced while parsing a connection string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("connection string is empty")]
    Empty,

    #[error("connection string names no host")]
    MissingHost,

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("malformed keyword pair '{0}'")]
    MalformedPair(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A parsed connection target.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Host name or IP address of the datastore.
    pub host: String,
    /// TCP port of the datastore.
    pub port: u16,
    /// Database (schema) name, if given.
    pub database: Option<String>,
    /// User name, if given.
    pub user: Option<String>,
    has_password: bool,
}

impl ConnectionDescriptor {
    /// Parse any of the accepted connection string forms.
    pub fn parse(input: &str) -> Result<Self, DescriptorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DescriptorError::Empty);
        }

        if has_url_scheme(input) {
            Self::parse_url(input)
        } else if input.contains('=') {
            Self::parse_keywords(input)
        } else {
            let (host, port) = split_host_port(input)?;
            Ok(Self {
                host,
                port: port.unwrap_or(DEFAULT_PORT),
                database: None,
                user: None,
                has_password: false,
            })
        }
    }

    /// `host:port` pair used for socket connections.
    pub fn address(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Whether the original string carried a password.
    pub fn has_password(&self) -> bool {
        self.has_password
    }

    fn parse_url(input: &str) -> Result<Self, DescriptorError> {
        let url = url::Url::parse(input)?;

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .filter(|h| !h.is_empty())
            .ok_or(DescriptorError::MissingHost)?;

        let database = Some(url.path().trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            database,
            user,
            has_password: url.password().is_some(),
        })
    }

    fn parse_keywords(input: &str) -> Result<Self, DescriptorError> {
        let mut host = None;
        let mut port = None;
        let mut database = None;
        let mut user = None;
        let mut has_password = false;

        for (key, value) in keyword_pairs(input)? {
            let value = value.as_str();
            match key.as_str() {
                "server" | "host" | "data source" | "datasource" | "address" | "addr"
                | "network address" => {
                    let (h, p) = split_host_port(first_host(value))?;
                    host = Some(h);
                    if p.is_some() {
                        port = p;
                    }
                }
                "port" => port = Some(parse_port(value)?),
                "database" | "initial catalog" => database = Some(value.to_string()),
                "user" | "user id" | "userid" | "uid" | "username" | "user name" => {
                    user = Some(value.to_string())
                }
                "password" | "pwd" => has_password = !value.is_empty(),
                _ => {}
            }
        }

        Ok(Self {
            host: host.ok_or(DescriptorError::MissingHost)?,
            port: port.unwrap_or(DEFAULT_PORT),
            database: database.filter(|d| !d.is_empty()),
            user: user.filter(|u| !u.is_empty()),
            has_password,
        })
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)?;
        } else {
            write!(f, "{}:{}", self.host, self.port)?;
        }
        if let Some(db) = &self.database {
            write!(f, "/{}", db)?;
        }
        if let Some(user) = &self.user {
            write!(f, " (user={})", user)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &if self.has_password { "<redacted>" } else { "<none>" })
            .finish()
    }
}

/// Drivers accept several comma-separated hosts; only the first is probed.
/// `host,port` is also valid, so a purely numeric tail is kept as the port.
fn first_host(value: &str) -> &str {
    match value.split_once(',') {
        Some((_, tail)) if !tail.trim().is_empty() && tail.trim().bytes().all(|b| b.is_ascii_digit()) => {
            value
        }
        Some((head, _)) => head.trim(),
        None => value,
    }
}

fn split_host_port(value: &str) -> Result<(String, Option<u16>), DescriptorError> {
    let value = value.trim();

    // [v6]:port
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or(DescriptorError::MissingHost)?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None => None,
        };
        return non_empty_host(host).map(|h| (h, port));
    }

    if let Some((host, port)) = value.split_once(',') {
        return Ok((non_empty_host(host)?, Some(parse_port(port)?)));
    }

    // A bare IPv6 literal has several colons and no port.
    match value.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            Ok((non_empty_host(host)?, Some(parse_port(port)?)))
        }
        _ => non_empty_host(value).map(|h| (h, None)),
    }
}

fn non_empty_host(host: &str) -> Result<String, DescriptorError> {
    let host = host.trim();
    if host.is_empty() {
        Err(DescriptorError::MissingHost)
    } else {
        Ok(host.to_string())
    }
}

fn parse_port(value: &str) -> Result<u16, DescriptorError> {
    let value = value.trim();
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DescriptorError::InvalidPort(value.to_string())),
    }
}

/// `scheme://...` with an RFC 3986 scheme. Keyword strings may carry `://`
/// inside a value, so the prefix has to be a bare scheme.
fn has_url_scheme(input: &str) -> bool {
    match input.split_once("://") {
        Some((scheme, _)) => {
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Split `key=value;...` into lowercased keys and unquoted values.
///
/// Values may be wrapped in `"` or `'`; inside quotes `;` is literal and a
/// doubled quote stands for one quote character.
fn keyword_pairs(input: &str) -> Result<Vec<(String, String)>, DescriptorError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ';').is_some() {}
        if chars.peek().is_none() {
            return Ok(pairs);
        }

        let mut key = String::new();
        loop {
            match chars.next() {
                Some('=') => break,
                Some(';') | None => return Err(DescriptorError::MalformedPair(key.trim().to_string())),
                Some(c) => key.push(c),
            }
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        match chars.next_if(|c| *c == '"' || *c == '\'') {
            Some(quote) => {
                loop {
                    match chars.next() {
                        Some(c) if c == quote => {
                            if chars.next_if_eq(&quote).is_some() {
                                value.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => return Err(DescriptorError::MalformedPair(key.trim().to_string())),
                    }
                }
                // Only whitespace may follow the closing quote.
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                if chars.next_if(|c| *c != ';').is_some() {
                    return Err(DescriptorError::MalformedPair(key.trim().to_string()));
                }
            }
            None => {
                while let Some(c) = chars.next_if(|c| *c != ';') {
                    value.push(c);
                }
                value = value.trim().to_string();
            }
        }

        pairs.push((key.trim().to_ascii_lowercase(), value));
    }
}
