//! Conversation telemetry agent.
//!
//! Reads activity events as JSON lines on stdin, keeps the conversation
//! metrics, streams them to the relay, and prints requested summaries on
//! stdout. Logs go to stderr.

use talkmeter_agent::{
    config, write_summary, ActivitySource, RelayPublisher, SourceCommand, SourceError,
};
use talkmeter_metrics::{Conversation, MetricsEngine};
use talkmeter_types::ActivityEvent;
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let location =
        talkmeter_runtime::resolve_config_path("TALKMETER_AGENT_CONFIG_PATH", "talkmeter-agent.toml");

    let config = config::load_config(Some(&location.path))
        .expect("failed to load configuration, the agent cannot start without valid config");

    talkmeter_runtime::init_tracing(&config.logging.level, config.logging.json);

    tracing::info!(
        source = location.source.as_str(),
        path = %location.path,
        "resolved startup configuration path"
    );

    let publisher = RelayPublisher::spawn(&config.relay);
    let mut conversation = Conversation::new(MetricsEngine::new(), publisher);
    if config.conversation.auto_start {
        conversation.ingest(ActivityEvent::ConversationStart);
    }

    let mut source = ActivitySource::new(BufReader::new(tokio::io::stdin()));
    let mut stdout = tokio::io::stdout();
    let shutdown = talkmeter_runtime::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let command = tokio::select! {
            () = &mut shutdown => break,
            command = source.next_command() => command,
        };

        match command {
            Ok(Some(SourceCommand::Activity(event))) => {
                conversation.ingest(event);
            }
            Ok(Some(SourceCommand::RequestSummary)) => {
                let summary = conversation.request_summary();
                if let Err(e) = write_summary(&mut stdout, &summary).await {
                    tracing::warn!(error = %e, "failed to write summary");
                }
            }
            Ok(None) => {
                tracing::info!("activity source closed");
                break;
            }
            Err(e @ SourceError::InvalidLine { .. }) => {
                tracing::warn!(error = %e, "skipping activity line");
            }
            Err(e) => {
                tracing::error!(error = %e, "activity source failed");
                break;
            }
        }
    }

    let (engine, publisher) = conversation.into_parts();
    let metrics = engine.metrics();
    tracing::info!(
        turn_count = metrics.turn_count,
        interruptions = metrics.interruption_count,
        "conversation ended"
    );
    publisher.shutdown().await;
}
