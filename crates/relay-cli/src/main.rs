use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use relay_core::{
    HttpTransport, OperationKind, QueueConfig, SerializedRequestQueue, Ticket, TransportConfig,
    observability,
};

/// Send arena operations through the serialized request queue.
#[derive(Debug, Parser)]
#[command(name = "relay", version)]
struct Cli {
    /// Arena API origin. Falls back to ARENA_API_URL, then localhost.
    #[arg(long, env = "ARENA_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new match on chain.
    CreateMatch {
        /// JSON body forwarded as-is.
        #[arg(long)]
        payload: String,
    },
    /// Record one move of a match on chain.
    RecordMove {
        #[arg(long)]
        payload: String,
    },
    /// Submit every line of a JSON-lines file: `{"kind": "...", "payload": {...}}`.
    Batch { file: PathBuf },
}

#[derive(Debug, Deserialize)]
struct BatchLine {
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let config = QueueConfig::from_env()?;
    let mut transport_config = TransportConfig::from_env();
    if let Some(url) = cli.api_url {
        transport_config.base_url = url;
    }
    let transport = HttpTransport::new(transport_config, config.dispatch_timeout)?;
    let queue = SerializedRequestQueue::start(config, Arc::new(transport));

    let tickets = match cli.command {
        Command::CreateMatch { payload } => {
            vec![queue.submit(OperationKind::CreateMatch, parse_payload(&payload)?).await]
        }
        Command::RecordMove { payload } => {
            vec![queue.submit(OperationKind::RecordMove, parse_payload(&payload)?).await]
        }
        Command::Batch { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            submit_batch(&queue, &content).await?
        }
    };

    let failed = report(tickets).await;

    let status = queue.status().await;
    info!(
        pending = status.pending_count,
        last_execution_at = ?status.last_execution_at,
        "all items settled"
    );
    queue.shutdown().await;

    if failed > 0 {
        bail!("{failed} item(s) failed");
    }
    Ok(())
}

fn parse_payload(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("payload must be valid JSON")
}

/// Validate every line, then submit them all. A bad line submits nothing.
async fn submit_batch(
    queue: &SerializedRequestQueue,
    content: &str,
) -> anyhow::Result<Vec<Ticket>> {
    let entries = parse_batch(content)?;

    let mut tickets = Vec::with_capacity(entries.len());
    for (kind, payload) in entries {
        tickets.push(queue.submit(kind, payload).await);
    }
    Ok(tickets)
}

fn parse_batch(content: &str) -> anyhow::Result<Vec<(OperationKind, Value)>> {
    let mut entries = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: BatchLine = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a batch entry", lineno + 1))?;
        let kind: OperationKind = entry
            .kind
            .parse()
            .with_context(|| format!("line {}", lineno + 1))?;
        entries.push((kind, entry.payload));
    }
    Ok(entries)
}

/// Print one JSON line per ticket, in submission order. Returns the failure count.
async fn report(tickets: Vec<Ticket>) -> usize {
    let mut failed = 0;
    for ticket in tickets {
        let id = ticket.id().to_string();
        let line = match ticket.wait().await {
            Ok(body) => json!({ "item": id, "ok": true, "response": body }),
            Err(err) => {
                failed += 1;
                json!({ "item": id, "ok": false, "error": err.to_string() })
            }
        };
        println!("{line}");
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::{DispatchError, Transport};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn dispatch(
            &self,
            _kind: OperationKind,
            _payload: &Value,
        ) -> Result<Value, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "success": true }))
        }
    }

    fn start_queue(transport: &Arc<CountingTransport>) -> SerializedRequestQueue {
        let config = QueueConfig {
            min_spacing: Duration::ZERO,
            ..QueueConfig::default()
        };
        SerializedRequestQueue::start(config, transport.clone())
    }

    #[rstest]
    #[case::malformed_json("{\"kind\": \"record-move\", \"payload\": ")]
    #[case::unknown_kind("{\"kind\": \"resign\", \"payload\": {}}")]
    #[case::missing_kind("{\"payload\": {}}")]
    #[tokio::test(start_paused = true)]
    async fn bad_line_submits_nothing(#[case] second_line: &str) {
        let transport = Arc::new(CountingTransport::default());
        let queue = start_queue(&transport);
        let content = format!(
            "{{\"kind\": \"create-match\", \"payload\": {{\"id\": 1}}}}\n{second_line}\n{{\"kind\": \"record-move\"}}\n"
        );

        let err = submit_batch(&queue, &content).await.unwrap_err();
        assert!(err.to_string().starts_with("line 2"), "{err:#}");

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.status().await.pending_count, 0);
        queue.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn valid_batch_submits_every_line() {
        let transport = Arc::new(CountingTransport::default());
        let queue = start_queue(&transport);
        let content = "{\"kind\": \"create-match\", \"payload\": {\"id\": 1}}\n\n{\"kind\": \"record-move\"}\n";

        let tickets = submit_batch(&queue, content).await.unwrap();
        assert_eq!(tickets.len(), 2);

        assert_eq!(report(tickets).await, 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        queue.shutdown().await;
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let entries = parse_batch("{\"kind\": \"record-move\"}").unwrap();
        assert_eq!(entries, vec![(OperationKind::RecordMove, Value::Null)]);
    }
}
