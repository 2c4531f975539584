/// Labels this short are icons, ratings or blank glyphs, not business names.
const MIN_LABEL_CHARS: usize = 3;

/// A text-fallback line this long is a whole listing blob, not a name.
const MAX_TEXT_LABEL_CHARS: usize = 100;

const DEFAULT_TEXT_LINES: usize = 3;

/// Read access to one listing on a result page. The engine never looks inside a
/// node itself; it only hands nodes to an [`Extractor`].
pub trait ResultNode: Send + Sync {
    /// Text of the first descendant matching the CSS `selector`, or its
    /// `aria-label` when that text is blank. `None` when nothing matches.
    fn field_text(&self, selector: &str) -> Option<String>;

    /// Readable text of the whole node, one line per text block.
    fn text(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Read a named field of the node.
    Field(String),
    /// Take the first acceptable line among the node's first `max_lines` lines.
    TextLines { max_lines: usize },
}

impl ExtractionStrategy {
    pub fn field(selector: &str) -> Self {
        ExtractionStrategy::Field(selector.to_string())
    }

    fn apply<N: ResultNode + ?Sized>(&self, node: &N) -> Option<String> {
        match self {
            ExtractionStrategy::Field(selector) => {
                let raw = node.field_text(selector)?;
                let label = clean_label(&raw);
                (label.chars().count() > MIN_LABEL_CHARS).then_some(label)
            }
            ExtractionStrategy::TextLines { max_lines } => node
                .text()
                .split('\n')
                .take(*max_lines)
                .map(clean_label)
                .find(|line| {
                    let len = line.chars().count();
                    len > MIN_LABEL_CHARS && len < MAX_TEXT_LABEL_CHARS
                }),
        }
    }
}

/// Pulls a business label out of a result node by trying each strategy in order.
#[derive(Debug, Clone)]
pub struct Extractor {
    strategies: Vec<ExtractionStrategy>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(vec![
            ExtractionStrategy::field(r#"div[role="heading"]"#),
            ExtractionStrategy::field("span.OSrXXb"),
            ExtractionStrategy::field("div.dbg0pd"),
            ExtractionStrategy::field("a span"),
            ExtractionStrategy::TextLines {
                max_lines: DEFAULT_TEXT_LINES,
            },
        ])
    }
}

impl Extractor {
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[ExtractionStrategy] {
        &self.strategies
    }

    /// Returns `None` when no strategy yields a usable label; callers skip the node.
    pub fn extract<N: ResultNode + ?Sized>(&self, node: &N) -> Option<String> {
        self.strategies.iter().find_map(|s| s.apply(node))
    }
}

/// Collapses whitespace, then drops trailing qualifiers such as
/// "Acme Dental - Dentist" or "Acme Dental (Open now)".
pub fn clean_label(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<&str>>().join(" ");
    let head = collapsed.split(" -").next().unwrap_or_default();
    let head = head.split('(').next().unwrap_or_default();
    head.trim().to_string()
}
