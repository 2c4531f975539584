//! Result pages as HTML: parsing a listing page into result nodes, and the
//! page sources built on top of that parser.

use std::time::Duration;

use anyhow::Context;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::data_models::SearchQuery;
use crate::error::SourceError;
use crate::extractor::ResultNode;
use crate::page_source::{PageSource, SourceFactory, StaticPageSource};

/// Listing containers, most specific first. The first selector that matches
/// anything on a page decides what a result node is for that page.
const CONTAINER_SELECTORS: [&str; 4] = [
    "div.VkpGBb",
    "div[jscontroller][data-hveid]",
    "div.rllt__details",
    "div[data-cid]",
];

const NEXT_PAGE_SELECTORS: [&str; 3] = [
    "a#pnnext",
    r#"a[aria-label="Next page"]"#,
    r#"a[aria-label="Next"]"#,
];

/// Elements that start a new line of rendered text.
const BLOCK_TAGS: [&str; 30] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "tr", "ul",
];

const HIDDEN_TAGS: [&str; 4] = ["script", "style", "template", "noscript"];

/// Text of `element` as a browser lays it out: inline runs joined by single
/// spaces, a line break around every block element and at `<br>`.
fn rendered_lines(element: ElementRef<'_>) -> Vec<String> {
    let mut lines = vec![String::new()];
    render_into(element, &mut lines);
    lines
        .iter()
        .map(|line| line.split_whitespace().collect::<Vec<&str>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn render_into(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if let Some(line) = lines.last_mut() {
                    line.push(' ');
                    line.push_str(text);
                }
            }
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    lines.push(String::new());
                    continue;
                }
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let Some(inner) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    lines.push(String::new());
                }
                render_into(inner, lines);
                if block {
                    lines.push(String::new());
                }
            }
            _ => {}
        }
    }
}

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                log::error!("invalid selector {s}: {e:?}");
                None
            }
        })
        .collect()
}

/// One listing, kept as its own HTML fragment so it can move between tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlResultNode {
    html: String,
}

impl HtmlResultNode {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

impl ResultNode for HtmlResultNode {
    fn field_text(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        let fragment = Html::parse_fragment(&self.html);
        let element = fragment.select(&selector).next()?;

        let text = rendered_lines(element).join(" ");
        if !text.is_empty() {
            return Some(text);
        }
        element
            .value()
            .attr("aria-label")
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
    }

    fn text(&self) -> String {
        let fragment = Html::parse_fragment(&self.html);
        rendered_lines(fragment.root_element()).join("\n")
    }
}

/// A parsed result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub nodes: Vec<HtmlResultNode>,
    /// Raw href of the "next page" link, if the page has one.
    pub next_href: Option<String>,
}

pub fn parse_result_page(html: &str) -> ResultPage {
    let document = Html::parse_document(html);

    let nodes = compile(&CONTAINER_SELECTORS)
        .iter()
        .map(|sel| {
            document
                .select(sel)
                .map(|el| HtmlResultNode::new(el.html()))
                .collect::<Vec<HtmlResultNode>>()
        })
        .find(|nodes| !nodes.is_empty())
        .unwrap_or_default();

    let next_href = compile(&NEXT_PAGE_SELECTORS).iter().find_map(|sel| {
        document
            .select(sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.to_string())
    });

    ResultPage { nodes, next_href }
}

/// Replays result pages saved to disk, in order.
pub fn saved_pages_source(pages: &[String]) -> StaticPageSource<HtmlResultNode> {
    StaticPageSource::new(
        pages
            .iter()
            .map(|html| parse_result_page(html).nodes)
            .collect(),
    )
}

/// Search URL for `query`: `base` with `q` set to the query's search text.
pub fn search_url(base: &str, query: &SearchQuery) -> Result<Url, SourceError> {
    let mut url =
        Url::parse(base).map_err(|e| SourceError::Malformed(format!("search url {base}: {e}")))?;
    url.query_pairs_mut().append_pair("q", &query.search_text());
    Ok(url)
}

/// Fetches result pages over HTTP and follows the "next page" link.
/// No retries: a failed request surfaces as a [`SourceError`].
pub struct HttpPageSource {
    client: reqwest::Client,
    current_url: Url,
    page: Option<ResultPage>,
}

impl HttpPageSource {
    pub fn new(client: reqwest::Client, start_url: Url) -> Self {
        Self {
            client,
            current_url: start_url,
            page: None,
        }
    }

    pub fn current_url(&self) -> &Url {
        &self.current_url
    }

    async fn load(&mut self) -> Result<&ResultPage, SourceError> {
        log::debug!("fetching {}", self.current_url);
        let html = self
            .client
            .get(self.current_url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let page = self.page.insert(parse_result_page(&html));
        Ok(&*page)
    }

    async fn loaded(&mut self) -> Result<&ResultPage, SourceError> {
        if self.page.is_none() {
            return self.load().await;
        }
        self.page
            .as_ref()
            .ok_or_else(|| SourceError::Malformed("page not loaded".into()))
    }
}

impl PageSource for HttpPageSource {
    type Node = HtmlResultNode;

    async fn current_page_nodes(&mut self) -> Result<Vec<HtmlResultNode>, SourceError> {
        Ok(self.loaded().await?.nodes.clone())
    }

    async fn advance(&mut self) -> Result<bool, SourceError> {
        let Some(href) = self.loaded().await?.next_href.clone() else {
            return Ok(false);
        };
        let next = self
            .current_url
            .join(&href)
            .map_err(|e| SourceError::Malformed(format!("next page link {href}: {e}")))?;

        log::info!("moving to next page: {next}");
        self.current_url = next;
        self.page = None;
        self.load().await?;
        Ok(true)
    }
}

/// Opens an [`HttpPageSource`] per query against a search endpoint.
#[derive(Debug, Clone)]
pub struct HttpSourceFactory {
    client: reqwest::Client,
    search_url: String,
}

impl HttpSourceFactory {
    pub fn new(search_url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("rankfinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            search_url: search_url.into(),
        })
    }
}

impl SourceFactory for HttpSourceFactory {
    type Source = HttpPageSource;

    async fn open(&self, query: &SearchQuery) -> Result<HttpPageSource, SourceError> {
        let url = search_url(&self.search_url, query)?;
        Ok(HttpPageSource::new(self.client.clone(), url))
    }
}
