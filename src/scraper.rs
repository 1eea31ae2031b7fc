use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Node, Selector};
use std::time::Duration;
use tracing::debug;
use crate::error::{PipelineError, Result};

const USER_AGENT: &str = concat!("page-summarizer/", env!("CARGO_PKG_VERSION"));

/// Elements whose contents are code or CSS rather than readable text.
const STRIPPED_ELEMENTS: [&str; 2] = ["script", "style"];

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

/// Page body as returned by the remote server, decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage(String);

impl RawPage {
    pub fn new(body: impl Into<String>) -> Self {
        RawPage(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Normalized body text of a page. Only [`extract`] builds one, so it is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanText(String);

impl CleanText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawPage>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage> {
        let transport = |e: reqwest::Error| PipelineError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "page fetch returned non-success status");
            return Err(PipelineError::Fetch { status: status.as_u16() });
        }

        let html = response.text().await.map_err(transport)?;
        Ok(RawPage(html))
    }
}

/// Reads the text of `<body>`, skipping script and style contents, and
/// collapses whitespace.
pub fn extract(page: &RawPage) -> Result<CleanText> {
    let document = Html::parse_document(page.as_str());
    let body = document
        .select(&BODY_SELECTOR)
        .next()
        .ok_or(PipelineError::EmptyContent)?;

    let mut text = String::with_capacity(page.len() / 2);
    for node in body.descendants() {
        match node.value() {
            // A removed node still separates the words around it.
            Node::Element(element) if STRIPPED_ELEMENTS.contains(&element.name()) => text.push(' '),
            Node::Text(content) => {
                let inside_stripped = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| STRIPPED_ELEMENTS.contains(&el.name()))
                });
                if !inside_stripped {
                    text.push_str(content);
                }
            }
            _ => {}
        }
    }

    let normalized = collapse_whitespace(&text);
    if normalized.is_empty() {
        return Err(PipelineError::EmptyContent);
    }
    Ok(CleanText(normalized))
}

/// Replaces every run of two or more whitespace characters with one space
/// and trims both ends. Lone whitespace characters are kept as they are.
pub fn collapse_whitespace(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() && chars.peek().is_some_and(|next| next.is_whitespace()) {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            result.push(' ');
        } else {
            result.push(c);
        }
    }

    result
}
