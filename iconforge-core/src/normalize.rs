//! Color-Safe Normalizer
//!
//! Rewrites literal black `fill`/`stroke` values to `currentColor` inside
//! sprite symbols, one pass over the document. Every byte is classified
//! into a span:
//!
//! - `Mask`: a `<mask>` element and everything nested in it. Emitted verbatim.
//! - `Verbatim`: markup outside any symbol, and whole skip-listed symbols.
//! - `Rewritable`: symbol markup outside masks. Only here are values changed.
//!
//! Nested masks match outer-to-inner: the outermost `<mask` shields
//! everything up to its balanced `</mask>`. An unterminated `<mask` shields
//! nothing. A `</symbol>` inside a mask does not close the symbol.
//!
//! No document parse happens. Only double-quoted attribute values preceded
//! by whitespace are recognized.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::OnceLock;

use crate::config::SkipList;

pub const THEME_TOKEN: &str = "currentColor";

const MASK: &str = "mask";
const SYMBOL: &str = "symbol";
const MASK_CLOSE: &[u8] = b"</mask>";
const SYMBOL_CLOSE: &[u8] = b"</symbol>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Verbatim,
    Mask,
    Rewritable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeStats {
    pub symbols: usize,
    pub skipped_symbols: usize,
    pub masks: usize,
    pub rewrites: usize,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub markup: String,
    pub stats: NormalizeStats,
}

fn black_attribute() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?P<pre>\s)(?P<attr>fill|stroke)="(?:#000000|#000|black)""#)
            .expect("valid color pattern")
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

struct Classifier<'a> {
    doc: &'a str,
    skip: &'a SkipList,
    spans: Vec<Span>,
    stats: NormalizeStats,
}

impl<'a> Classifier<'a> {
    fn new(doc: &'a str, skip: &'a SkipList) -> Self {
        Self {
            doc,
            skip,
            spans: vec![],
            stats: NormalizeStats::default(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.doc.as_bytes()
    }

    fn find(&self, needle: u8, from: usize) -> Option<usize> {
        self.bytes()
            .get(from..)?
            .iter()
            .position(|&b| b == needle)
            .map(|i| from + i)
    }

    fn has_at(&self, pos: usize, literal: &[u8]) -> bool {
        self.bytes()
            .get(pos..pos + literal.len())
            .map_or(false, |s| s.eq_ignore_ascii_case(literal))
    }

    /// `<name` followed by a non-word byte or end of input.
    fn is_open(&self, lt: usize, name: &str) -> bool {
        let after = lt + 1 + name.len();
        self.has_at(lt + 1, name.as_bytes())
            && self.bytes().get(after).map_or(true, |&b| !is_word_byte(b))
    }

    fn push(&mut self, kind: SpanKind, start: usize, end: usize) {
        if start >= end {
            return;
        }
        if let Some(last) = self.spans.last_mut() {
            if last.kind == kind && last.range.end == start {
                last.range.end = end;
                return;
            }
        }
        self.spans.push(Span { kind, range: start..end });
    }

    /// End (exclusive) of the mask opening at `lt`, balanced over nesting.
    fn mask_end(&self, lt: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut pos = lt;

        loop {
            let at = self.find(b'<', pos)?;
            if self.is_open(at, MASK) {
                let gt = self.find(b'>', at)?;
                if self.bytes()[gt - 1] == b'/' {
                    if depth == 0 {
                        return Some(gt + 1);
                    }
                } else {
                    depth += 1;
                }
                pos = gt + 1;
            } else if self.has_at(at, MASK_CLOSE) {
                pos = at + MASK_CLOSE.len();
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(pos);
                }
            } else {
                pos = at + 1;
            }
        }
    }

    fn symbol_id(open_tag: &str) -> Option<&str> {
        let bytes = open_tag.as_bytes();
        let mut from = 0;
        while let Some(i) = open_tag[from..].find("id=\"") {
            let at = from + i;
            if at > 0 && bytes[at - 1].is_ascii_whitespace() {
                let value_start = at + 4;
                let value_len = open_tag[value_start..].find('"')?;
                return (value_len > 0).then(|| &open_tag[value_start..value_start + value_len]);
            }
            from = at + 1;
        }
        None
    }

    /// Classify the symbol opening at `lt`. Returns where scanning resumes,
    /// or `None` when this is not a complete identified symbol.
    fn symbol(&mut self, lt: usize, text_start: usize) -> Option<usize> {
        let doc = self.doc;
        let gt = self.find(b'>', lt)?;
        let open_tag = &doc[lt..=gt];
        let skipped = self.skip.skips_color(Self::symbol_id(open_tag)?);
        let kind = if skipped { SpanKind::Verbatim } else { SpanKind::Rewritable };

        let mut masks = vec![];
        let end = if open_tag.ends_with("/>") {
            gt + 1
        } else {
            let mut pos = gt + 1;
            loop {
                let at = self.find(b'<', pos)?;
                if self.is_open(at, MASK) {
                    if let Some(mask_end) = self.mask_end(at) {
                        masks.push(at..mask_end);
                        pos = mask_end;
                        continue;
                    }
                } else if self.has_at(at, SYMBOL_CLOSE) {
                    break at + SYMBOL_CLOSE.len();
                }
                pos = at + 1;
            }
        };

        self.push(SpanKind::Verbatim, text_start, lt);
        let mut cursor = lt;
        for mask in &masks {
            self.push(kind, cursor, mask.start);
            self.push(SpanKind::Mask, mask.start, mask.end);
            cursor = mask.end;
        }
        self.push(kind, cursor, end);

        self.stats.masks += masks.len();
        if skipped {
            self.stats.skipped_symbols += 1;
        } else {
            self.stats.symbols += 1;
        }
        Some(end)
    }

    fn run(mut self) -> (Vec<Span>, NormalizeStats) {
        let mut pos = 0;
        let mut text_start = 0;

        while let Some(lt) = self.find(b'<', pos) {
            if self.is_open(lt, MASK) {
                if let Some(end) = self.mask_end(lt) {
                    self.push(SpanKind::Verbatim, text_start, lt);
                    self.push(SpanKind::Mask, lt, end);
                    self.stats.masks += 1;
                    pos = end;
                    text_start = end;
                    continue;
                }
            } else if self.is_open(lt, SYMBOL) {
                if let Some(end) = self.symbol(lt, text_start) {
                    pos = end;
                    text_start = end;
                    continue;
                }
            }
            pos = lt + 1;
        }

        self.push(SpanKind::Verbatim, text_start, self.doc.len());
        (self.spans, self.stats)
    }
}

/// Split `doc` into contiguous spans covering every byte exactly once.
pub fn classify(doc: &str, skip: &SkipList) -> Vec<Span> {
    Classifier::new(doc, skip).run().0
}

/// Rewrite black fill/stroke values in one rewritable region.
pub fn rewrite_region(region: &str) -> (String, usize) {
    let mut count = 0;
    let rewritten = black_attribute().replace_all(region, |caps: &Captures| {
        count += 1;
        format!("{}{}=\"{}\"", &caps["pre"], &caps["attr"], THEME_TOKEN)
    });
    (rewritten.into_owned(), count)
}

pub struct ColorNormalizer<'a> {
    skip: &'a SkipList,
}

impl<'a> ColorNormalizer<'a> {
    pub fn new(skip: &'a SkipList) -> Self {
        Self { skip }
    }

    pub fn normalize(&self, doc: &str) -> Normalized {
        let (spans, mut stats) = Classifier::new(doc, self.skip).run();
        let mut markup = String::with_capacity(doc.len());

        for span in &spans {
            let text = &doc[span.range.clone()];
            match span.kind {
                SpanKind::Verbatim | SpanKind::Mask => markup.push_str(text),
                SpanKind::Rewritable => {
                    let (rewritten, count) = rewrite_region(text);
                    stats.rewrites += count;
                    markup.push_str(&rewritten);
                }
            }
        }

        Normalized { markup, stats }
    }
}
