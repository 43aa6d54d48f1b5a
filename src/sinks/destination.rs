//! 内置 Sink 的输出目标

use serde::Deserialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Sink 写出渲染结果的目标
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// 标准输出
    #[default]
    Stdout,
    /// 标准错误
    Stderr,
    /// 以追加模式打开的文件，不存在时创建
    File(PathBuf),
    /// 进程内的 writer 句柄
    #[serde(skip_deserializing)]
    Writer(SharedWriter),
}

impl Destination {
    /// Wrap any writer as a destination.
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Destination::Writer(SharedWriter::new(writer))
    }

    /// 打开输出目标
    pub fn open(&self) -> io::Result<Output> {
        Ok(match self {
            Destination::Stdout => Output::Stdout(io::stdout()),
            Destination::Stderr => Output::Stderr(io::stderr()),
            Destination::File(path) => Output::File(
                OpenOptions::new().create(true).append(true).open(path)?,
            ),
            Destination::Writer(writer) => Output::Shared(writer.clone()),
        })
    }

    /// Whether the destination is attached to a terminal.
    pub fn is_terminal(&self) -> bool {
        match self {
            Destination::Stdout => io::stdout().is_terminal(),
            Destination::Stderr => io::stderr().is_terminal(),
            _ => false,
        }
    }
}

/// A writer shared between the configuring code and a sink.
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<dyn Write + Send>>);

impl SharedWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self(Arc::new(Mutex::new(writer)))
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedWriter")
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

/// An opened [`Destination`].
#[derive(Debug)]
pub enum Output {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    File(File),
    Shared(SharedWriter),
}

impl Output {
    /// 写入完整的一行并刷新
    pub fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');
        self.write_all(&buf)?;
        self.flush()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::Stderr(w) => w.write(buf),
            Output::File(w) => w.write(buf),
            Output::Shared(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.lock().write_all(buf),
            Output::Stderr(w) => w.lock().write_all(buf),
            Output::File(w) => w.write_all(buf),
            Output::Shared(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::Stderr(w) => w.flush(),
            Output::File(w) => w.flush(),
            Output::Shared(w) => w.flush(),
        }
    }
}
