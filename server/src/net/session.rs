use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};

use crate::error::TransportError;

/// Reading half of a client connection. Yields whole `\n`-terminated lines.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

/// Writing half of a client connection. Every line is flushed immediately.
pub struct LineWriter<W> {
    inner: W,
}

/// Split a duplex stream (plain TCP or anything else) into line halves.
pub fn split<S>(stream: S) -> (LineReader<ReadHalf<S>>, LineWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (reader, writer) = tokio::io::split(stream);
    (LineReader::new(reader), LineWriter::new(writer))
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Wait for the next complete line, without its terminator.
    /// Returns `Ok(None)` once the peer closes. A trailing fragment with no
    /// newline is discarded.
    pub async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(TransportError::Read)?;

        if n == 0 || self.buf.last() != Some(&b'\n') {
            return Ok(None);
        }

        self.buf.pop();
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    /// Write `line` plus a newline and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');
        self.inner
            .write_all(data.as_bytes())
            .await
            .map_err(TransportError::Write)?;
        self.inner.flush().await.map_err(TransportError::Write)
    }

    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner.shutdown().await.map_err(TransportError::Write)
    }
}
