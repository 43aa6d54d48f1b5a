//! Process-wide facade: one test, since every call shares the global dispatcher.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use xlog::{values, ConsoleConfig, Destination, Level, LoggerConfig};

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

#[tokio::test]
async fn global_facade_lifecycle() {
    assert!(!xlog::VERSION.is_empty());

    let buffer = Buffer::default();
    let config = xlog::load_config_from_str(
        r#"
        [[sinks]]
        mode = "jsonFormat"
        level = "error"
        output = "stderr"
        "#,
    )
    .unwrap();
    xlog::init_with_config(config).await.unwrap();

    xlog::new(
        xlog::CONSOLE,
        ConsoleConfig {
            level: Level::Info,
            output: Destination::writer(buffer.clone()),
            colored: Some(false),
            default_fields: values!["app", "demo"],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        xlog::dispatcher().modes().await,
        vec![xlog::JSON_FORMAT, xlog::CONSOLE]
    );

    xlog::trace(values!["hidden", 1]).await;
    xlog::info(values!["shown", 2]).await;
    xlog::warn!("count", 3).await;
    xlog::delete(xlog::JSON_FORMAT).await;
    xlog::error(0, values!["plain", "error"]).await;

    xlog::shutdown().await;
    assert!(xlog::dispatcher().modes().await.is_empty());
    assert_eq!(
        buffer.contents(),
        "[ INFO] app=demo shown=2\n[ WARN] app=demo count=3\n[ERROR] app=demo plain=error\n"
    );

    let empty = LoggerConfig::default();
    xlog::init_with_config(empty).await.unwrap();
    assert!(xlog::diagnostics_snapshot().messages_dispatched >= 3);
}
