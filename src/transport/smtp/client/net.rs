use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::TlsStream;

use super::{mock::MockStream, TlsParameters};
use crate::transport::smtp::{
    client::Phase,
    error::{self, Error},
};

/// Represents the different types of underlying network streams
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(TlsStream<TcpStream>),
    /// Mock stream
    Mock(MockStream),
}

impl NetworkStream {
    /// Returns peer's address
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            NetworkStream::Tcp(s) => s.peer_addr(),
            NetworkStream::Tls(s) => s.get_ref().peer_addr(),
            NetworkStream::Mock(_) => Ok(SocketAddr::from(([127, 0, 0, 1], 25))),
        }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(s) => s.shutdown(how),
            NetworkStream::Tls(s) => s.get_ref().shutdown(how),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Opens a TCP connection, wrapped in TLS right away when `tls_parameters` is set
    ///
    /// Every resolved address is tried in turn, each bounded by `timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect(
            addr: &SocketAddr,
            timeout: Option<Duration>,
        ) -> io::Result<TcpStream> {
            match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            }
        }

        let addrs = (host, port).to_socket_addrs().map_err(error::connection)?;

        let mut last_err = None;
        let mut tcp_stream = None;
        for addr in addrs {
            match try_connect(&addr, timeout) {
                Ok(stream) => {
                    tcp_stream = Some(stream);
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }

        let tcp_stream = match (tcp_stream, last_err) {
            (Some(stream), _) => stream,
            (None, Some(err)) => return Err(error::connection(err)),
            (None, None) => {
                return Err(error::connection(format!(
                    "could not resolve {host}:{port}"
                )))
            }
        };
        tcp_stream
            .set_read_timeout(timeout)
            .and_then(|()| tcp_stream.set_write_timeout(timeout))
            .map_err(error::connection)?;

        let mut stream = NetworkStream::Tcp(tcp_stream);
        if let Some(tls_parameters) = tls_parameters {
            stream.upgrade_tls(tls_parameters, Phase::Connect)?;
        }
        Ok(stream)
    }

    /// Hands the socket to the TLS connector and waits for the handshake
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters, phase: Phase) -> Result<(), Error> {
        match self {
            NetworkStream::Tcp(stream) => {
                let tcp_stream = stream.try_clone().map_err(|err| error::tls(phase, err))?;
                let tls_stream = tls_parameters
                    .connector
                    .connect(tls_parameters.domain(), tcp_stream)
                    .map_err(|err| error::tls(phase, err.to_string()))?;
                *self = NetworkStream::Tls(tls_stream);
                Ok(())
            }
            NetworkStream::Tls(_) => Ok(()),
            NetworkStream::Mock(stream) => stream.upgrade_tls().map_err(|err| error::tls(phase, err)),
        }
    }

    /// Tells if the stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        match self {
            NetworkStream::Tcp(_) => false,
            NetworkStream::Tls(_) => true,
            NetworkStream::Mock(s) => s.is_upgraded(),
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_read_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_read_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.set_write_timeout(duration),
            NetworkStream::Tls(stream) => stream.get_ref().set_write_timeout(duration),
            NetworkStream::Mock(_) => Ok(()),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(s) => s.read(buf),
            NetworkStream::Tls(s) => s.read(buf),
            NetworkStream::Mock(s) => s.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(s) => s.write(buf),
            NetworkStream::Tls(s) => s.write(buf),
            NetworkStream::Mock(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(s) => s.flush(),
            NetworkStream::Tls(s) => s.flush(),
            NetworkStream::Mock(s) => s.flush(),
        }
    }
}
