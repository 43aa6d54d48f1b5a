//! 控制台输出 Sink 实现
//!
//! 每条消息输出为一行：级别标签加上 logfmt 编码的键值对，启用时按级别着色。

use crate::config::SinkConfig;
use crate::format::encode_keyvals;
use crate::level::Level;
use crate::message::Message;
use crate::registry::CONSOLE;
use crate::sinks::adapter::{Adapter, Render, WorkerState};
use crate::sinks::destination::Output;
use crate::sinks::timestamp_fields;
use crate::sinks::traits::{ErrorSender, MessageSender, Sink, SinkError, SinkResult};
use crate::value::Value;
use async_trait::async_trait;

/// 控制台输出 Sink
#[derive(Debug, Default)]
pub struct ConsoleSink {
    adapter: Adapter<ConsoleRenderer>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册表构造函数
    pub fn boxed() -> Box<dyn Sink> {
        Box::new(Self::new())
    }
}

#[derive(Debug)]
struct ConsoleRenderer {
    output: Output,
    default_fields: Vec<Value>,
    colored: bool,
    timestamp: bool,
}

impl ConsoleRenderer {
    fn format(&self, msg: &Message) -> SinkResult<String> {
        let stamp = timestamp_fields(self.timestamp);
        let pairs = encode_keyvals(
            self.default_fields
                .iter()
                .chain(stamp.iter())
                .chain(msg.body.iter()),
        )?;
        let line = format!("{}{}", msg.level.tag(), pairs);
        if self.colored {
            Ok(msg.level.paint(&line))
        } else {
            Ok(line)
        }
    }
}

impl Render for ConsoleRenderer {
    fn render(&mut self, msg: &Message) -> SinkResult<()> {
        let line = self.format(msg)?;
        self.output.write_line(line.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn level(&self) -> Level {
        self.adapter.level()
    }

    fn init(&mut self, config: SinkConfig) -> SinkResult<()> {
        let cfg = match config {
            SinkConfig::Console(cfg) => cfg,
            other => return Err(SinkError::config_object("ConsoleConfig", &other)),
        };

        let output = cfg.output.open()?;
        let colored = cfg.colored.unwrap_or_else(|| cfg.output.is_terminal());
        self.adapter.configure(
            cfg.level,
            cfg.buffer_size,
            ConsoleRenderer {
                output,
                default_fields: cfg.default_fields,
                colored,
                timestamp: cfg.timestamp,
            },
        );
        Ok(())
    }

    fn exchange_chans(&mut self, errors: ErrorSender) -> SinkResult<MessageSender> {
        self.adapter.exchange_chans(errors)
    }

    fn start(&mut self) -> SinkResult<()> {
        self.adapter.start(CONSOLE)
    }

    async fn destroy(&mut self) -> SinkResult<()> {
        self.adapter.destroy().await
    }

    fn state(&self) -> WorkerState {
        self.adapter.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConsoleConfig, JsonFormatConfig};
    use crate::sinks::destination::Destination;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(buffer: &Buffer) -> ConsoleConfig {
        ConsoleConfig {
            output: Destination::writer(buffer.clone()),
            colored: Some(false),
            buffer_size: 8,
            ..Default::default()
        }
    }

    fn message(level: Level, body: Vec<Value>) -> Arc<Message> {
        Arc::new(Message::new(level, body))
    }

    #[tokio::test]
    async fn test_console_sink_renders_lines() {
        let buffer = Buffer::default();
        let mut sink = ConsoleSink::new();
        sink.init(config(&buffer).into()).unwrap();
        let (err_tx, _err_rx) = mpsc::channel(5);
        let tx = sink.exchange_chans(err_tx).unwrap();
        sink.start().unwrap();

        tx.send(message(Level::Info, vec!["user".into(), "bob".into()]))
            .await
            .unwrap();
        tx.send(message(Level::Error, vec!["msg".into(), "disk full".into()]))
            .await
            .unwrap();
        sink.destroy().await.unwrap();

        assert_eq!(
            buffer.contents(),
            "[ INFO] user=bob\n[ERROR] msg=\"disk full\"\n"
        );
    }

    #[tokio::test]
    async fn test_default_fields_are_prepended() {
        let buffer = Buffer::default();
        let mut sink = ConsoleSink::new();
        let mut cfg = config(&buffer);
        cfg.default_fields = vec!["service".into(), "api".into()];
        sink.init(cfg.into()).unwrap();
        let (err_tx, _err_rx) = mpsc::channel(5);
        let tx = sink.exchange_chans(err_tx).unwrap();
        sink.start().unwrap();

        let shared = message(Level::Warn, vec!["k".into(), 1.into()]);
        tx.send(shared.clone()).await.unwrap();
        sink.destroy().await.unwrap();

        assert_eq!(buffer.contents(), "[ WARN] service=api k=1\n");
        // The shared message itself is untouched.
        assert_eq!(shared.body.len(), 2);
    }

    #[tokio::test]
    async fn test_encode_failure_is_reported() {
        let buffer = Buffer::default();
        let mut sink = ConsoleSink::new();
        sink.init(config(&buffer).into()).unwrap();
        let (err_tx, mut err_rx) = mpsc::channel(5);
        let tx = sink.exchange_chans(err_tx).unwrap();
        sink.start().unwrap();

        tx.send(message(Level::Info, vec!["".into(), 1.into()]))
            .await
            .unwrap();
        tx.send(message(Level::Info, vec!["good".into(), 2.into()]))
            .await
            .unwrap();
        sink.destroy().await.unwrap();

        assert!(matches!(err_rx.try_recv(), Ok(SinkError::Encode(_))));
        assert_eq!(buffer.contents(), "[ INFO] good=2\n");
    }

    #[test]
    fn test_colored_line_is_always_escaped() {
        let renderer = ConsoleRenderer {
            output: Destination::writer(Vec::new()).open().unwrap(),
            default_fields: Vec::new(),
            colored: true,
            timestamp: false,
        };
        let line = renderer
            .format(&Message::new(Level::Fatal, vec!["a".into(), 1.into()]))
            .unwrap();
        assert_eq!(line, "\x1b[91m[FATAL] a=1\x1b[0m");
    }

    #[test]
    fn test_timestamp_field() {
        let renderer = ConsoleRenderer {
            output: Destination::writer(Vec::new()).open().unwrap(),
            default_fields: Vec::new(),
            colored: false,
            timestamp: true,
        };
        let line = renderer
            .format(&Message::new(Level::Info, vec!["a".into(), 1.into()]))
            .unwrap();
        assert!(line.starts_with("[ INFO] time="));
        assert!(line.ends_with(" a=1"));
    }

    #[test]
    fn test_wrong_config_shape() {
        let mut sink = ConsoleSink::new();
        let err = sink.init(JsonFormatConfig::default().into()).unwrap_err();
        assert!(matches!(
            err,
            SinkError::ConfigObject {
                expect: "ConsoleConfig",
                ..
            }
        ));
    }
}
