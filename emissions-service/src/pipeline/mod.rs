use std::{fmt, pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};

/// Where a record came from: file and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: Arc<str>,
    pub line: u64,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub origin: Origin,
    pub received_at: SystemTime,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("decode error at {origin}: {message}")]
    Decode { origin: Origin, message: String },
    #[error("transform error at {origin}: {message}")]
    Transform { origin: Origin, message: String },
    #[error("sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    /// Source and sink failures stop a pipeline. Per-record decode and
    /// transform failures may be skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Source(_) | PipelineError::Sink(_))
    }
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>, // same-type transforms chain
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        let mut stream = self.source.stream().await;

        // Apply transforms in sequence (if any).
        for t in self.transforms {
            let t_arc = t.clone();
            stream = Box::pin(stream.then(move |item| {
                let t_inner = t_arc.clone();
                async move {
                    match item {
                        Ok(env) => t_inner.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_and_sink_errors_are_fatal() {
        let origin = Origin {
            file: "gas.csv".into(),
            line: 3,
        };
        assert!(PipelineError::Source("missing".into()).is_fatal());
        assert!(PipelineError::Sink("closed".into()).is_fatal());
        assert!(!PipelineError::Decode {
            origin: origin.clone(),
            message: "bad id".into()
        }
        .is_fatal());
        let err = PipelineError::Transform {
            origin,
            message: "empty gas".into(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "transform error at gas.csv:3: empty gas");
    }
}
