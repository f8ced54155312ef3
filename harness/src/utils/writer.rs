use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Stderr, Stdout, Write};

use crate::errors::Result;

/// Destination for everything the harness prints: progress notices,
/// reports and error messages.
pub struct Writer {
    buffer: WriteBuffer,
    err: WriteBuffer,
}

impl Writer {
    pub fn new(buffer: WriteBuffer) -> Self {
        Self {
            buffer,
            err: WriteBuffer::Stderr(std::io::stderr()),
        }
    }

    pub fn new_with_err(buffer: WriteBuffer, err: WriteBuffer) -> Self {
        Self { buffer, err }
    }

    pub fn stdout() -> Self {
        Self::new(WriteBuffer::Stdout(std::io::stdout()))
    }

    /// An in-memory writer, mostly useful in tests.
    pub fn capture() -> Self {
        Self::new_with_err(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]))
    }

    pub fn write_err(&mut self, message: String) -> std::io::Result<()> {
        writeln!(self.err, "{message}")
    }

    /// What has been written so far, without ANSI escapes. Only in-memory
    /// and file buffers can be read back; terminals yield an empty string.
    pub fn contents(&mut self) -> Result<String> {
        let raw = self.buffer.read_back()?;
        Ok(String::from_utf8(strip_ansi_escapes::strip(raw)?)?)
    }

    pub fn err_contents(&mut self) -> Result<String> {
        let raw = self.err.read_back()?;
        Ok(String::from_utf8(strip_ansi_escapes::strip(raw)?)?)
    }

    pub fn into_string(mut self) -> Result<String> {
        Ok(String::from_utf8(self.buffer.read_back()?)?)
    }

    pub fn stripped(mut self) -> Result<String> {
        self.contents()
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

pub enum WriteBuffer {
    Stdout(Stdout),
    Stderr(Stderr),
    Vec(Vec<u8>),
    File(File),
}

impl WriteBuffer {
    fn read_back(&mut self) -> std::io::Result<Vec<u8>> {
        match self {
            WriteBuffer::Stdout(..) | WriteBuffer::Stderr(..) => Ok(vec![]),
            WriteBuffer::Vec(vec) => Ok(vec.clone()),
            WriteBuffer::File(file) => {
                let position = file.stream_position()?;
                file.seek(SeekFrom::Start(0))?;
                let mut data = vec![];
                file.read_to_end(&mut data)?;
                file.seek(SeekFrom::Start(position))?;
                Ok(data)
            }
        }
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.write(buf),
            WriteBuffer::Stderr(stderr) => stderr.write(buf),
            WriteBuffer::Vec(vec) => vec.write(buf),
            WriteBuffer::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.flush(),
            WriteBuffer::Stderr(stderr) => stderr.flush(),
            WriteBuffer::Vec(vec) => vec.flush(),
            WriteBuffer::File(file) => file.flush(),
        }
    }
}
