//! JSON 输出 Sink 实现
//!
//! Renders each message as one JSON object per line. The body is merged into
//! a mapping (see [`crate::format::merge`]) after the default fields and an
//! injected `level` field.

use crate::config::SinkConfig;
use crate::format::merge;
use crate::level::Level;
use crate::message::Message;
use crate::registry::JSON_FORMAT;
use crate::sinks::adapter::{Adapter, Render, WorkerState};
use crate::sinks::destination::Output;
use crate::sinks::timestamp_fields;
use crate::sinks::traits::{ErrorSender, MessageSender, Sink, SinkError, SinkResult};
use crate::value::Value;
use async_trait::async_trait;

/// 结构化（JSON lines）输出 Sink
#[derive(Debug, Default)]
pub struct JsonFormatSink {
    adapter: Adapter<JsonRenderer>,
}

impl JsonFormatSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册表构造函数
    pub fn boxed() -> Box<dyn Sink> {
        Box::new(Self::new())
    }
}

#[derive(Debug)]
struct JsonRenderer {
    output: Output,
    default_fields: Vec<Value>,
    timestamp: bool,
}

impl JsonRenderer {
    fn encode(&self, msg: &Message) -> SinkResult<Vec<u8>> {
        let stamp = timestamp_fields(self.timestamp);
        let level = [Value::from("level"), Value::Level(msg.level)];
        let fields = merge(
            self.default_fields
                .iter()
                .chain(stamp.iter())
                .chain(level.iter())
                .chain(msg.body.iter()),
        );
        Ok(serde_json::to_vec(&fields)?)
    }
}

impl Render for JsonRenderer {
    fn render(&mut self, msg: &Message) -> SinkResult<()> {
        let line = self.encode(msg)?;
        self.output.write_line(&line)?;
        Ok(())
    }
}

#[async_trait]
impl Sink for JsonFormatSink {
    fn level(&self) -> Level {
        self.adapter.level()
    }

    fn init(&mut self, config: SinkConfig) -> SinkResult<()> {
        let cfg = match config {
            SinkConfig::JsonFormat(cfg) => cfg,
            other => return Err(SinkError::config_object("JsonFormatConfig", &other)),
        };

        let output = cfg.output.open()?;
        self.adapter.configure(
            cfg.level,
            cfg.buffer_size,
            JsonRenderer {
                output,
                default_fields: cfg.default_fields,
                timestamp: cfg.timestamp,
            },
        );
        Ok(())
    }

    fn exchange_chans(&mut self, errors: ErrorSender) -> SinkResult<MessageSender> {
        self.adapter.exchange_chans(errors)
    }

    fn start(&mut self) -> SinkResult<()> {
        self.adapter.start(JSON_FORMAT)
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
    use crate::value::{MarshalError, MarshalText};
    use serde_json::json;
    use tempfile::TempDir;

    fn renderer(default_fields: Vec<Value>) -> JsonRenderer {
        JsonRenderer {
            output: Destination::writer(Vec::new()).open().unwrap(),
            default_fields,
            timestamp: false,
        }
    }

    fn decode(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[derive(Debug)]
    struct Unencodable;

    impl MarshalText for Unencodable {
        fn marshal_text(&self) -> Result<String, MarshalError> {
            Err("cannot encode".into())
        }
    }

    #[test]
    fn test_level_is_injected() {
        let line = renderer(Vec::new())
            .encode(&Message::new(Level::Warn, vec!["k".into(), "v".into()]))
            .unwrap();
        assert_eq!(decode(&line), json!({"level": 2, "k": "v"}));
    }

    #[test]
    fn test_body_overrides_defaults_and_level() {
        let line = renderer(vec!["service".into(), "api".into(), "env".into(), "dev".into()])
            .encode(&Message::new(
                Level::Info,
                vec!["env".into(), "prod".into(), "level".into(), "custom".into()],
            ))
            .unwrap();
        assert_eq!(
            decode(&line),
            json!({"service": "api", "env": "prod", "level": "custom"})
        );
    }

    #[test]
    fn test_odd_body() {
        let line = renderer(Vec::new())
            .encode(&Message::new(Level::Error, vec!["a".into(), 1.into(), "b".into()]))
            .unwrap();
        assert_eq!(decode(&line), json!({"level": 3, "a": 1, "b": "(Missing)"}));
    }

    #[test]
    fn test_marshal_failure_is_a_render_error() {
        let err = renderer(Vec::new())
            .encode(&Message::new(Level::Info, vec!["t".into(), Value::text(Unencodable)]))
            .unwrap_err();
        assert!(matches!(err, SinkError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_json_sink_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");

        let mut sink = JsonFormatSink::new();
        sink.init(
            JsonFormatConfig {
                level: Level::Info,
                buffer_size: 4,
                output: Destination::File(path.clone()),
                ..Default::default()
            }
            .into(),
        )
        .unwrap();
        assert_eq!(sink.level(), Level::Info);

        let (err_tx, _err_rx) = tokio::sync::mpsc::channel(5);
        let tx = sink.exchange_chans(err_tx).unwrap();
        sink.start().unwrap();
        assert_eq!(sink.state(), WorkerState::Running);

        for i in 0..3 {
            tx.send(std::sync::Arc::new(Message::new(
                Level::Info,
                vec!["seq".into(), i.into()],
            )))
            .await
            .unwrap();
        }
        sink.destroy().await.unwrap();
        assert_eq!(sink.state(), WorkerState::Terminated);

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(
            records,
            vec![
                json!({"level": 1, "seq": 0}),
                json!({"level": 1, "seq": 1}),
                json!({"level": 1, "seq": 2}),
            ]
        );
    }

    #[test]
    fn test_wrong_config_shape() {
        let mut sink = JsonFormatSink::new();
        let err = sink.init(ConsoleConfig::default().into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config object is not an instance of JsonFormatConfig, instead got 'ConsoleConfig'"
        );
    }
}
