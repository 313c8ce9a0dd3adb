//! Memcached Client
//!
//! Minimal memcached text-protocol client (`get` and `set` only) used as the
//! [`RemoteClient`] behind [`RemoteStore`](crate::store::RemoteStore).

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::store::RemoteClient;

/// Relative expiry limit; memcached reads larger values as Unix timestamps.
const MAX_RELATIVE_EXPIRY_SECS: u64 = 60 * 60 * 24 * 30;
const MAX_KEY_LENGTH: usize = 250;
/// Default memcached item size limit (1 MiB)
const MAX_VALUE_LENGTH: usize = 1024 * 1024;

type StoreResult<T> = std::result::Result<T, StoreError>;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Connection {
    fn open(addr: SocketAddr, io_timeout: Duration) -> io::Result<Self> {
        let stream = TcpStream::connect_timeout(&addr, io_timeout)?;
        stream.set_read_timeout(Some(io_timeout))?;
        stream.set_write_timeout(Some(io_timeout))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    fn read_line(&mut self) -> StoreResult<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(StoreError::Remote("connection closed by server".to_string()));
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    fn get(&mut self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        write!(self.writer, "get {}\r\n", key)?;
        self.writer.flush()?;

        let header = self.read_line()?;
        if header == "END" {
            return Ok(None);
        }

        let length = parse_value_header(&header, key)?;
        let mut data = vec![0u8; length + 2];
        self.reader.read_exact(&mut data)?;
        if !data.ends_with(b"\r\n") {
            return Err(StoreError::Protocol("value not terminated by CRLF".to_string()));
        }
        data.truncate(length);

        let trailer = self.read_line()?;
        if trailer != "END" {
            return Err(StoreError::Protocol(trailer));
        }
        Ok(Some(data))
    }

    fn set(&mut self, key: &str, value: &[u8], exptime: u64) -> StoreResult<()> {
        write!(self.writer, "set {} 0 {} {}\r\n", key, exptime, value.len())?;
        self.writer.write_all(value)?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;

        match self.read_line()?.as_str() {
            "STORED" => Ok(()),
            other => Err(StoreError::Protocol(other.to_string())),
        }
    }
}

// == Memcached Client ==
/// Blocking memcached client with bounded I/O.
///
/// Every connect, read and write is limited by `io_timeout`. A connection that
/// failed mid-command is dropped and re-opened on the next call.
pub struct MemcachedClient {
    addr: SocketAddr,
    io_timeout: Duration,
    connection: Mutex<Option<Connection>>,
}

impl MemcachedClient {
    /// Connects to `addr` eagerly so misconfiguration shows up at startup.
    pub fn connect(addr: impl ToSocketAddrs, io_timeout: Duration) -> io::Result<Self> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address to connect to")
        })?;
        let connection = Connection::open(addr, io_timeout)?;

        Ok(Self {
            addr,
            io_timeout,
            connection: Mutex::new(Some(connection)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn with_connection<T>(
        &self,
        command: impl FnOnce(&mut Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.connection.lock();
        if guard.is_none() {
            debug!("memcached: reconnecting to {}", self.addr);
            *guard = Some(Connection::open(self.addr, self.io_timeout)?);
        }
        let Some(connection) = guard.as_mut() else {
            return Err(StoreError::Remote("no connection".to_string()));
        };

        let result = command(connection);
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

impl RemoteClient for MemcachedClient {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate_key(key)?;
        self.with_connection(|conn| conn.get(key))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        validate_key(key)?;
        let exptime = expiry_for(ttl);
        self.with_connection(|conn| conn.set(key, value, exptime))
    }
}

/// Expiry field for a TTL.
///
/// Rounded up to whole seconds and at least 1, since 0 means "never expire".
/// Absolute timestamps are clamped to the 32-bit range memcached accepts.
fn expiry_for(ttl: Duration) -> u64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .max(1);
    if secs > MAX_RELATIVE_EXPIRY_SECS {
        let now = Utc::now().timestamp().max(0) as u64;
        now.saturating_add(secs).min(u64::from(u32::MAX))
    } else {
        secs
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || key.len() > MAX_KEY_LENGTH
        || key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(StoreError::Remote(format!("invalid memcached key: {:?}", key)));
    }
    Ok(())
}

// VALUE <key> <flags> <bytes> [<cas>]
fn parse_value_header(header: &str, key: &str) -> StoreResult<usize> {
    let mut parts = header.split(' ');
    let length: usize = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("VALUE"), Some(found), Some(_flags), Some(bytes)) if found == key => bytes
            .parse()
            .map_err(|_| StoreError::Protocol(header.to_string()))?,
        _ => return Err(StoreError::Protocol(header.to_string())),
    };
    if length > MAX_VALUE_LENGTH {
        return Err(StoreError::Protocol(format!(
            "value of {} bytes exceeds the {} byte item limit",
            length, MAX_VALUE_LENGTH
        )));
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    /// Serves get/set from a map on one connection at a time.
    fn spawn_fake_memcached() -> (SocketAddr, Arc<parking_lot::Mutex<HashMap<String, (u64, Vec<u8>)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let data = Arc::new(parking_lot::Mutex::new(HashMap::<String, (u64, Vec<u8>)>::new()));
        let shared = Arc::clone(&data);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut writer = stream;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 {
                        break;
                    }
                    let parts: Vec<&str> = line.trim_end().split(' ').collect();
                    match parts.as_slice() {
                        ["get", key] => {
                            let reply = match shared.lock().get(*key) {
                                Some((_, value)) => {
                                    let mut reply = format!("VALUE {} 0 {}\r\n", key, value.len()).into_bytes();
                                    reply.extend_from_slice(value);
                                    reply.extend_from_slice(b"\r\nEND\r\n");
                                    reply
                                }
                                None => b"END\r\n".to_vec(),
                            };
                            writer.write_all(&reply).unwrap();
                        }
                        ["set", key, _flags, exptime, len] => {
                            let len: usize = len.parse().unwrap();
                            let mut value = vec![0u8; len + 2];
                            reader.read_exact(&mut value).unwrap();
                            value.truncate(len);
                            shared
                                .lock()
                                .insert(key.to_string(), (exptime.parse().unwrap(), value));
                            writer.write_all(b"STORED\r\n").unwrap();
                        }
                        _ => writer.write_all(b"ERROR\r\n").unwrap(),
                    }
                }
            }
        });

        (addr, data)
    }

    #[test]
    fn test_set_then_get() {
        let (addr, data) = spawn_fake_memcached();
        let client = MemcachedClient::connect(addr, Duration::from_secs(2)).unwrap();

        client.set("abc", b"hello\r\nworld", Duration::from_secs(60)).unwrap();
        assert_eq!(client.get("abc").unwrap(), Some(b"hello\r\nworld".to_vec()));
        assert_eq!(client.get("missing").unwrap(), None);
        assert_eq!(data.lock().get("abc").unwrap().0, 60);
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        assert_eq!(expiry_for(Duration::from_millis(100)), 1);
        assert_eq!(expiry_for(Duration::ZERO), 1);
        assert_eq!(expiry_for(Duration::from_millis(1500)), 2);
        assert_eq!(expiry_for(Duration::from_secs(3600)), 3600);
    }

    #[test]
    fn test_long_ttl_becomes_absolute_timestamp() {
        let ttl = Duration::from_secs(MAX_RELATIVE_EXPIRY_SECS + 1);
        let exptime = expiry_for(ttl);
        assert!(exptime > Utc::now().timestamp() as u64);
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        assert_eq!(expiry_for(Duration::MAX), u64::from(u32::MAX));
        assert_eq!(expiry_for(Duration::from_secs(u64::MAX)), u64::from(u32::MAX));
    }

    /// Answers every `get` with the same raw reply.
    fn spawn_canned_memcached(reply: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut writer = stream;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 {
                        break;
                    }
                    if writer.write_all(reply).is_err() {
                        break;
                    }
                }
            }
        });

        addr
    }

    #[test]
    fn test_oversized_value_header_is_a_protocol_error() {
        let addr = spawn_canned_memcached(b"VALUE abc 0 18446744073709551615\r\n");
        let client = MemcachedClient::connect(addr, Duration::from_secs(2)).unwrap();

        assert!(matches!(client.get("abc"), Err(StoreError::Protocol(_))));
    }

    #[test]
    fn test_value_above_item_limit_is_a_protocol_error() {
        let addr = spawn_canned_memcached(b"VALUE abc 0 1048577\r\n");
        let client = MemcachedClient::connect(addr, Duration::from_secs(2)).unwrap();

        assert!(matches!(client.get("abc"), Err(StoreError::Protocol(_))));
        // The failed connection is replaced on the next call
        assert!(matches!(client.get("abc"), Err(StoreError::Protocol(_))));
    }

    #[test]
    fn test_invalid_keys_are_rejected_without_io() {
        assert!(validate_key("has space").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"k".repeat(251)).is_err());
        assert!(validate_key("GET_http://example.com/").is_ok());
    }

    #[test]
    fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(MemcachedClient::connect(addr, Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_value_header_parsing() {
        assert_eq!(parse_value_header("VALUE abc 0 5", "abc").unwrap(), 5);
        assert_eq!(parse_value_header("VALUE abc 0 5 42", "abc").unwrap(), 5);
        assert!(parse_value_header("VALUE other 0 5", "abc").is_err());
        assert!(parse_value_header("SERVER_ERROR out of memory", "abc").is_err());
        assert!(parse_value_header("VALUE abc 0 18446744073709551615", "abc").is_err());
        assert_eq!(
            parse_value_header("VALUE abc 0 1048576", "abc").unwrap(),
            MAX_VALUE_LENGTH
        );
    }
}
