use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::error::{PipelineError, Result};
use crate::llm::Summarizer;
use crate::prompt::PromptTemplate;
use crate::scraper::{extract, PageFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Summarize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Summarize => "summarize",
        };
        f.write_str(name)
    }
}

/// Progress reported at each stage boundary of a run.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    FetchStarted { url: &'a str },
    FetchCompleted { url: &'a str, bytes: usize },
    ExtractionCompleted { chars: usize },
    PromptDispatched { chars: usize },
    SummaryReceived { chars: usize },
    Failed { stage: Stage, error: &'a PipelineError },
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

/// Writes pipeline events to the tracing subscriber.
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::FetchStarted { url } => info!(%url, "Fetching page"),
            PipelineEvent::FetchCompleted { url, bytes } => info!(%url, bytes, "Page fetched"),
            PipelineEvent::ExtractionCompleted { chars } => info!(chars, "Text extracted"),
            PipelineEvent::PromptDispatched { chars } => info!(chars, "Prompt sent to model"),
            PipelineEvent::SummaryReceived { chars } => info!(chars, "Summary received"),
            PipelineEvent::Failed { stage, error } => warn!(%stage, %error, "Pipeline stage failed"),
        }
    }
}

/// Fetch, extract, build the prompt, summarize. The first failure ends the
/// run and is returned as is.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Arc<dyn Summarizer>,
    template: PromptTemplate,
    observer: Arc<dyn PipelineObserver>,
    fetch_timeout: Option<Duration>,
    summarize_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        summarizer: Arc<dyn Summarizer>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            template,
            observer: Arc::new(TracingObserver),
            fetch_timeout: None,
            summarize_timeout: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_summarize_timeout(mut self, timeout: Duration) -> Self {
        self.summarize_timeout = Some(timeout);
        self
    }

    pub async fn run(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PipelineError::missing_url());
        }

        self.emit(PipelineEvent::FetchStarted { url });
        let page = bounded(self.fetch_timeout, self.fetcher.fetch(url), |limit| {
            PipelineError::Transport {
                url: url.to_string(),
                message: format!("timed out after {:?}", limit),
            }
        })
        .await
        .map_err(|e| self.failed(Stage::Fetch, e))?;
        self.emit(PipelineEvent::FetchCompleted { url, bytes: page.len() });

        let text = extract(&page).map_err(|e| self.failed(Stage::Extract, e))?;
        drop(page);
        self.emit(PipelineEvent::ExtractionCompleted { chars: text.char_len() });

        let prompt = self.template.build(text);
        self.emit(PipelineEvent::PromptDispatched { chars: prompt.char_len() });

        let summary = bounded(self.summarize_timeout, self.summarizer.summarize(prompt), |limit| {
            PipelineError::Upstream(format!("model did not respond within {:?}", limit))
        })
        .await
        .map_err(|e| self.failed(Stage::Summarize, e))?;
        self.emit(PipelineEvent::SummaryReceived { chars: summary.chars().count() });

        Ok(summary)
    }

    fn emit(&self, event: PipelineEvent<'_>) {
        self.observer.on_event(&event);
    }

    fn failed(&self, stage: Stage, error: PipelineError) -> PipelineError {
        self.emit(PipelineEvent::Failed { stage, error: &error });
        error
    }
}

async fn bounded<T, F>(
    limit: Option<Duration>,
    stage: F,
    on_elapsed: impl FnOnce(Duration) -> PipelineError,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, stage)
            .await
            .unwrap_or_else(|_| Err(on_elapsed(limit))),
        None => stage.await,
    }
}
