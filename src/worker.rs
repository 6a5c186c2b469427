use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::actions;
use crate::error::WorkerError;
use crate::heuristic::ScoringRules;
use crate::page::Page;
use crate::recovery::{self, RetryPolicy};
use crate::types::{Action, Command, Observation, Response};

/// Why [`Worker::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Exit,
    EndOfInput,
}

/// The command loop. Owns a handle to the one page for the lifetime of
/// the process and runs one command at a time against it.
pub struct Worker {
    page: Arc<dyn Page>,
    rules: Arc<ScoringRules>,
    policy: RetryPolicy,
}

impl Worker {
    pub fn new(page: Arc<dyn Page>, rules: ScoringRules) -> Self {
        Self {
            page,
            rules: Arc::new(rules),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Emits the startup line, then answers every non-blank input line with
    /// exactly one response line until `exit` or end of input.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> Result<Shutdown>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_response(&mut output, &Response::started()).await?;
        info!("worker started, waiting for commands");

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input
                .read_until(b'\n', &mut buf)
                .await
                .context("Failed to read command")?
                == 0
            {
                info!("input closed");
                return Ok(Shutdown::EndOfInput);
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match parse_line(line) {
                Ok(Action::Exit) => {
                    write_response(&mut output, &Response::exiting()).await?;
                    info!("exit requested");
                    return Ok(Shutdown::Exit);
                }
                Ok(action) => {
                    let name = action.name();
                    debug!(action = name, "dispatching");
                    match self.handle(action).await {
                        Ok(observation) => {
                            info!(
                                action = name,
                                url = %observation.url,
                                elements = observation.interactive_elements.len(),
                                "command ok"
                            );
                            Response::observation(observation)
                        }
                        Err(err) => {
                            warn!(action = name, error = %err, "command failed");
                            Response::error(&err)
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "rejected command");
                    Response::error(&err)
                }
            };
            write_response(&mut output, &response).await?;
        }
    }

    /// Runs the action and the follow-up observation on the blocking pool.
    async fn handle(&self, action: Action) -> Result<Observation, WorkerError> {
        let page = Arc::clone(&self.page);
        let rules = Arc::clone(&self.rules);
        let policy = self.policy;

        tokio::task::spawn_blocking(move || -> Result<Observation, WorkerError> {
            actions::execute(page.as_ref(), &rules, &action)?;
            Ok(recovery::build_with_recovery(page.as_ref(), &policy)?)
        })
        .await
        .map_err(|e| WorkerError::Internal(e.to_string()))?
    }
}

fn parse_line(line: &str) -> Result<Action, WorkerError> {
    let command: Command =
        serde_json::from_str(line).map_err(|e| WorkerError::malformed(e.to_string()))?;
    Action::try_from(command)
}

async fn write_response<W: AsyncWrite + Unpin>(output: &mut W, response: &Response) -> Result<()> {
    let mut line = serde_json::to_vec(response).context("Failed to encode response")?;
    line.push(b'\n');
    output
        .write_all(&line)
        .await
        .context("Failed to write response")?;
    output.flush().await.context("Failed to flush response")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_lines_are_malformed() {
        assert!(matches!(parse_line("not json"), Err(WorkerError::MalformedCommand(_))));
        assert!(matches!(parse_line("[1,2]"), Err(WorkerError::MalformedCommand(_))));
        assert!(matches!(
            parse_line(r#"{"action":7}"#),
            Err(WorkerError::MalformedCommand(_))
        ));
        assert_eq!(parse_line(r#"{"action":"exit","args":{}}"#).unwrap(), Action::Exit);
    }
}
