use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use printdesk_agent::{ChatReply, ChatRuntime};
use printdesk_core::flows::FlowServices;
use printdesk_core::TracingAuditSink;
use printdesk_db::SqlDataStore;

use crate::commands::{migrated_pool, prepare, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    pub turns: u64,
    /// Whether the conversation reached End Chat rather than running out of input.
    pub completed: bool,
}

pub fn run(customer: Option<String>) -> CommandResult {
    let (config, runtime) = match prepare("chat") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;
        let store = Arc::new(SqlDataStore::new(pool.clone()));
        let services =
            FlowServices::new(store, config.flow_settings(), Arc::new(TracingAuditSink));
        let chat = ChatRuntime::standard(services)
            .map_err(|error| ("flow_graph", error.to_string(), 7u8))?;

        let summary = drive(&chat, customer, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
            .map_err(|error| ("chat_io", error.to_string(), 8u8))?;

        pool.close().await;
        Ok::<ChatSummary, super::StepError>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "chat",
            format!(
                "session {} after {} turns",
                if summary.completed { "completed" } else { "closed" },
                summary.turns
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("chat", error_class, message, exit_code)
        }
    }
}

/// Runs one chat session, reading a line of user input per turn until the
/// chat ends or input runs out. The session is released from the runtime on
/// every exit path, including I/O failures.
pub async fn drive<R, W>(
    runtime: &ChatRuntime,
    customer: Option<String>,
    reader: R,
    mut writer: W,
) -> anyhow::Result<ChatSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let start = runtime.start_session(customer).await;
    let outcome = converse(runtime, &start, reader, &mut writer).await;

    let transcript = runtime.end_session(&start.session_id).await?;
    let summary = outcome?;
    info!(
        event_name = "chat.transcript_closed",
        session_id = %start.session_id,
        messages = transcript.len(),
        turns = summary.turns,
        "terminal chat finished"
    );
    Ok(summary)
}

async fn converse<R, W>(
    runtime: &ChatRuntime,
    start: &ChatReply,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<ChatSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    render(writer, start).await?;

    let mut lines = reader.lines();
    let mut summary = ChatSummary { turns: 0, completed: start.ended };
    while !summary.completed {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let reply = runtime.handle_input(&start.session_id, input).await?;
        summary.turns += 1;
        summary.completed = reply.ended;
        render(writer, &reply).await?;
    }
    Ok(summary)
}

async fn render<W>(writer: &mut W, reply: &ChatReply) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = String::new();
    for message in &reply.messages {
        for line in message.text.lines() {
            out.push_str("bot> ");
            out.push_str(line);
            out.push('\n');
        }
    }
    if !reply.quick_replies.is_empty() {
        out.push_str(&format!("     [{}]\n", reply.quick_replies.join("] [")));
    }
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use tokio::io::AsyncWrite;

    use printdesk_agent::ChatRuntime;
    use printdesk_core::flows::{FlowServices, FlowSettings};
    use printdesk_core::{InMemoryAuditSink, InMemoryDataStore};

    use super::{drive, ChatSummary};

    fn runtime() -> ChatRuntime {
        let services = FlowServices::new(
            Arc::new(InMemoryDataStore::new()),
            FlowSettings::default(),
            Arc::new(InMemoryAuditSink::default()),
        );
        ChatRuntime::standard(services).expect("standard flows")
    }

    /// Terminal whose output side has gone away.
    struct ClosedTerminal;

    impl AsyncWrite for ClosedTerminal {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn chat_runs_until_end_chat() {
        let runtime = runtime();
        let input: &[u8] = b"hello?\n\nEnd Chat\nPlace Order\n";
        let mut output = Vec::new();

        let summary = drive(&runtime, None, input, &mut output).await.expect("drive");

        assert_eq!(summary, ChatSummary { turns: 2, completed: true });
        let printed = String::from_utf8(output).expect("utf8");
        assert!(printed.contains("[Place Order]"));
        assert!(printed.contains("bot> Thank you for chatting with us."));
        assert_eq!(runtime.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn chat_closes_when_input_runs_out() {
        let runtime = runtime();
        let input: &[u8] = b"Services\n";
        let mut output = Vec::new();

        let summary = drive(&runtime, None, input, &mut output).await.expect("drive");

        assert_eq!(summary, ChatSummary { turns: 1, completed: false });
        assert_eq!(runtime.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn failed_output_still_releases_the_session() {
        let runtime = runtime();
        let input: &[u8] = b"Services\n";

        let error = drive(&runtime, None, input, ClosedTerminal).await.expect_err("broken pipe");

        assert_eq!(error.downcast_ref::<io::Error>().map(io::Error::kind), Some(io::ErrorKind::BrokenPipe));
        assert_eq!(runtime.active_sessions().await, 0);
    }
}
