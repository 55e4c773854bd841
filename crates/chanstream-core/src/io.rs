//! `std::io` との接続
//!
//! - `ChannelReader` / `ChannelWriter` / `ChannelStreamAdapter` に
//!   `Read` / `BufRead` / `Write` を実装する
//! - 任意の `std::io` オブジェクトをチャンネルとして使う [`IoChannel`]

use std::io;
use std::string::ToString;

use crate::adapter::ChannelStreamAdapter;
use crate::buffer::{DrainRegion, FillRegion};
use crate::channel::{ReadableChannel, WritableChannel};
use crate::error::StreamError;
use crate::reader::ChannelReader;
use crate::writer::ChannelWriter;

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match &err {
            StreamError::UnsupportedChannelType | StreamError::InvalidBufferSize(_) => {
                io::ErrorKind::InvalidInput
            }
            StreamError::NotReadable | StreamError::NotWritable => io::ErrorKind::Unsupported,
            StreamError::InvalidCount { .. } => io::ErrorKind::InvalidData,
            StreamError::ShortWrite { .. } => io::ErrorKind::WriteZero,
            StreamError::ChannelFault(_) | StreamError::BufferFull { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

impl<R: ReadableChannel> io::Read for ChannelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChannelReader::read(self, buf)?)
    }
}

impl<R: ReadableChannel> io::BufRead for ChannelReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(ChannelReader::fill_buf(self)?)
    }

    fn consume(&mut self, amt: usize) {
        ChannelReader::consume(self, amt)
    }
}

impl<W: WritableChannel> io::Write for ChannelWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ChannelWriter::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.sync()?)
    }
}

impl<R: ReadableChannel, W: WritableChannel> io::Read for ChannelStreamAdapter<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChannelStreamAdapter::read(self, buf)?)
    }
}

impl<R: ReadableChannel, W: WritableChannel> io::BufRead for ChannelStreamAdapter<R, W> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let reader = self.reader_mut().ok_or(StreamError::NotReadable)?;
        Ok(reader.fill_buf()?)
    }

    fn consume(&mut self, amt: usize) {
        if let Some(reader) = self.reader_mut() {
            reader.consume(amt);
        }
    }
}

impl<R: ReadableChannel, W: WritableChannel> io::Write for ChannelStreamAdapter<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ChannelStreamAdapter::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.can_write() {
            return Err(StreamError::NotWritable.into());
        }
        Ok(self.sync()?)
    }
}

/// `std::io::Read` / `std::io::Write` をチャンネルとして扱うラッパー
///
/// 読み込みが 0 を返したら終端（-1）として報告する。
/// `Interrupted` は再試行し、それ以外の I/O エラーは `ChannelFault` になる。
#[derive(Debug)]
pub struct IoChannel<T>(pub T);

impl<T> IoChannel<T> {
    pub fn new(inner: T) -> Self {
        IoChannel(inner)
    }

    pub fn get_ref(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: io::Read> ReadableChannel for IoChannel<T> {
    fn read(&mut self, mut region: FillRegion<'_>) -> Result<i32, StreamError> {
        loop {
            match io::Read::read(&mut self.0, region.as_mut_slice()) {
                Ok(0) => return Ok(-1),
                Ok(n) => return Ok(n as i32),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::ChannelFault(e.to_string())),
            }
        }
    }
}

impl<T: io::Write> WritableChannel for IoChannel<T> {
    fn write(&mut self, region: DrainRegion<'_>) -> Result<i32, StreamError> {
        loop {
            match io::Write::write(&mut self.0, region.as_slice()) {
                Ok(n) => return Ok(n as i32),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::ChannelFault(e.to_string())),
            }
        }
    }
}
