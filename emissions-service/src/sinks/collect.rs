use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Rows accepted by a [`CollectSink`], plus how many were skipped.
#[derive(Debug)]
pub struct Collected<T> {
    pub rows: Vec<T>,
    pub rejected: u64,
}

/// Gathers a pipeline's payloads in memory.
///
/// Fatal upstream errors always stop the sink. Per-record errors stop it in
/// strict mode and are logged and skipped otherwise.
pub struct CollectSink<T> {
    table: &'static str,
    strict: bool,
    out: Arc<Mutex<Collected<T>>>,
}

impl<T> CollectSink<T> {
    pub fn new(table: &'static str, strict: bool) -> Self {
        Self {
            table,
            strict,
            out: Arc::new(Mutex::new(Collected {
                rows: Vec::new(),
                rejected: 0,
            })),
        }
    }

    /// Shared handle to the collected rows; stays valid after the sink is
    /// moved into a pipeline.
    pub fn handle(&self) -> Arc<Mutex<Collected<T>>> {
        self.out.clone()
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> Sink<T> for CollectSink<T> {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut out = self.out.lock().await;

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => {
                    out.rows.push(env.payload);
                    metrics::counter!("warehouse_rows_loaded_total", "table" => self.table).increment(1);
                }
                Err(e) if e.is_fatal() || self.strict => {
                    tracing::error!(error = %e, table = self.table, "load aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, table = self.table, "skipping rejected row");
                    out.rejected += 1;
                }
            }
        }

        Ok(())
    }
}
