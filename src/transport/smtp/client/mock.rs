//! In-memory stream replaying scripted server replies
// Comes from https://github.com/inre/rust-mq/blob/master/netopt

use std::{
    io::{self, BufRead, Cursor, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

type MockCursor = Cursor<Vec<u8>>;

/// A stream that reads canned replies and records everything written to it
///
/// Clones share the same buffers, so a test can keep one handle and give the other
/// to a connection.
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
    tls: Arc<Mutex<TlsState>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum TlsState {
    #[default]
    Plain,
    Upgraded,
    Refused,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockStream {
    /// Creates a stream with nothing to read
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// Creates a stream that will serve `replies`, in order
    pub fn with_vec(replies: Vec<u8>) -> MockStream {
        let stream = MockStream::new();
        *lock(&stream.reader) = MockCursor::new(replies);
        stream
    }

    /// Makes the next TLS upgrade fail
    pub fn refuse_tls(self) -> MockStream {
        *lock(&self.tls) = TlsState::Refused;
        self
    }

    /// Takes everything written so far
    pub fn take_vec(&mut self) -> Vec<u8> {
        let mut cursor = lock(&self.writer);
        let vec = cursor.get_ref().clone();
        cursor.set_position(0);
        cursor.get_mut().clear();
        vec
    }

    /// Everything written so far, lossily decoded
    pub fn written(&self) -> String {
        String::from_utf8_lossy(lock(&self.writer).get_ref()).into_owned()
    }

    /// Whether a TLS upgrade happened
    pub fn is_upgraded(&self) -> bool {
        *lock(&self.tls) == TlsState::Upgraded
    }

    pub(super) fn upgrade_tls(&mut self) -> io::Result<()> {
        let mut state = lock(&self.tls);
        match *state {
            TlsState::Refused => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "handshake failure",
            )),
            _ => {
                *state = TlsState::Upgraded;
                Ok(())
            }
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        lock(&self.writer).write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

impl Read for MockStream {
    /// Hands out at most one line per call, like a server answering one command at a time
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reader = lock(&self.reader);
        let available = reader.fill_buf()?;
        let line = available
            .iter()
            .position(|&b| b == b'\n')
            .map_or(available.len(), |end| end + 1);
        let n = line.min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        reader.consume(n);
        Ok(n)
    }
}
