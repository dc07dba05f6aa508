//! This module contains a client for the supervisor's line-oriented status query interface.
use log::debug;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

const RESPONSE_HEADERS: &str = "OutputFormat: json\nColumnHeaders: on\n";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    Response(String),
}

/// Where the status query socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Unix(PathBuf),
    Tcp(String, u16),
}

impl FromStr for Address {
    type Err = ClientError;

    /// Absolute paths are unix sockets, anything else is read as `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('/') {
            return Ok(Address::Unix(PathBuf::from(s)));
        }
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ClientError::Response(format!("Invalid address: {}", s)))?;
        let port = port
            .parse()
            .map_err(|_| ClientError::Response(format!("Invalid port in address: {}", s)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok(Address::Tcp(host.to_string(), port))
    }
}

/// Sends a query and returns one JSON object per data row, keyed by column header.
pub async fn query(address: &Address, request: &str) -> Result<Vec<Map<String, Value>>, ClientError> {
    debug!("Status query to {:?}: {:?}", address, request);
    let body = match address {
        Address::Unix(path) => exchange(UnixStream::connect(path).await?, request).await?,
        Address::Tcp(host, port) => {
            exchange(TcpStream::connect((host.as_str(), *port)).await?, request).await?
        }
    };
    parse_rows(&body)
}

/// Appends the JSON output headers unless the request already asks for them.
fn with_response_headers(request: &str) -> String {
    if request.contains(RESPONSE_HEADERS) {
        request.to_string()
    } else {
        format!("{}\n{}", request.trim_end_matches('\n'), RESPONSE_HEADERS)
    }
}

async fn exchange<S>(mut stream: S, request: &str) -> Result<String, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(with_response_headers(request).as_bytes())
        .await?;
    stream.shutdown().await?;
    let mut body = String::new();
    stream.read_to_string(&mut body).await?;
    Ok(body)
}

fn parse_rows(body: &str) -> Result<Vec<Map<String, Value>>, ClientError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let table: Vec<Vec<Value>> = serde_json::from_str(body)?;
    let mut rows = table.into_iter();
    let headers: Vec<String> = match rows.next() {
        Some(headers) => headers
            .into_iter()
            .map(|h| match h {
                Value::String(s) => Ok(s),
                other => Err(ClientError::Response(format!(
                    "Column header is not a string: {}",
                    other
                ))),
            })
            .collect::<Result<_, _>>()?,
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .map(|row| headers.iter().cloned().zip(row).collect())
        .collect())
}
