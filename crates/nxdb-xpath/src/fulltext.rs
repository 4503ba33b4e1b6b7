//! Full-text support: tokenizer, wildcard masking, term patterns and the
//! AND-query used to preselect nodes before an exact comparison.
use core::fmt;
use core::ops::Range;

use compact_str::CompactString;
use fancy_regex::Regex;
use itertools::Itertools;

use crate::document::DocumentSet;
use crate::error::Error;
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::runtime::QueryContext;
use crate::storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Letters only.
    Word,
    /// Digits only (optionally with inner decimal points).
    Number,
    /// Letters and digits mixed.
    AlphaNum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToken {
    pub text: CompactString,
    pub kind: TokenKind,
    /// Byte range of the run in the tokenized text.
    pub span: Range<usize>,
}

impl TextToken {
    /// Tokens that contain digits; indexes may be configured to drop them.
    pub fn is_alpha_numeric(&self) -> bool {
        matches!(self.kind, TokenKind::Number | TokenKind::AlphaNum)
    }
}

/// Splits text into lower-cased runs of letters and digits.
///
/// In wildcard mode `*` and `?` belong to tokens and a backslash escapes the
/// following `*`, `?` or `\`; the escape pair is kept in the token text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer {
    wildcards: bool,
}

impl SimpleTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wildcards(mut self, wildcards: bool) -> Self {
        self.wildcards = wildcards;
        self
    }

    /// Lazily tokenize `text`. The returned iterator is `Clone`, so a
    /// sequence can be restarted from any point.
    pub fn tokenize<'a>(&self, text: &'a str) -> Tokens<'a> {
        Tokens {
            text,
            pos: 0,
            wildcards: self.wildcards,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a str,
    pos: usize,
    wildcards: bool,
}

impl Tokens<'_> {
    fn escape_at(&self, i: usize) -> Option<char> {
        let rest = &self.text[i..];
        let mut it = rest.chars();
        match (it.next(), it.next()) {
            (Some('\\'), Some(c @ ('*' | '?' | '\\'))) if self.wildcards => Some(c),
            _ => None,
        }
    }

    fn starts_token(&self, i: usize, c: char) -> bool {
        c.is_alphanumeric() || (self.wildcards && matches!(c, '*' | '?')) || self.escape_at(i).is_some()
    }
}

impl Iterator for Tokens<'_> {
    type Item = TextToken;

    fn next(&mut self) -> Option<TextToken> {
        loop {
            // skip separators
            let (start, _) = self.text[self.pos..]
                .char_indices()
                .map(|(i, c)| (self.pos + i, c))
                .find(|&(i, c)| self.starts_token(i, c))?;

            let mut out = CompactString::default();
            let (mut alpha, mut digit) = (false, false);
            let mut i = start;
            while i < self.text.len() {
                if let Some(esc) = self.escape_at(i) {
                    out.push('\\');
                    out.push(esc);
                    i += 1 + esc.len_utf8();
                    continue;
                }
                let Some(c) = self.text[i..].chars().next() else { break };
                if c.is_alphabetic() {
                    alpha = true;
                    out.extend(c.to_lowercase());
                } else if c.is_numeric() {
                    digit = true;
                    out.push(c);
                } else if self.wildcards && matches!(c, '*' | '?') {
                    out.push(c);
                } else if c == '.' && digit && !alpha && self.text[i + 1..].starts_with(|n: char| n.is_ascii_digit()) {
                    out.push(c);
                } else {
                    break;
                }
                i += c.len_utf8();
            }
            self.pos = i;
            if !alpha && !digit {
                // pure wildcard runs carry no term
                continue;
            }
            let kind = match (alpha, digit) {
                (true, true) => TokenKind::AlphaNum,
                (false, true) => TokenKind::Number,
                _ => TokenKind::Word,
            };
            return Some(TextToken {
                text: out,
                kind,
                span: start..i,
            });
        }
    }
}

/// Translate a comparison literal into index-query syntax: `%` becomes the
/// `*` wildcard; a literal `*` or `\` is backslash-escaped.
pub fn mask_wildcards(expr: &str) -> String {
    let mut buf = String::with_capacity(expr.len() + 4);
    for ch in expr.chars() {
        match ch {
            '*' => buf.push_str("\\*"),
            '\\' => buf.push_str("\\\\"),
            '%' => buf.push('*'),
            _ => buf.push(ch),
        }
    }
    buf
}

/// Inverse of [`mask_wildcards`].
pub fn unmask_wildcards(expr: &str) -> String {
    let mut buf = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if matches!(chars.peek(), Some('*' | '\\')) => {
                buf.extend(chars.next());
            }
            '*' => buf.push('%'),
            _ => buf.push(ch),
        }
    }
    buf
}

pub(crate) fn push_regex_escaped(out: &mut String, ch: char) {
    if matches!(
        ch,
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
    ) {
        out.push('\\');
    }
    out.push(ch);
}

/// A compiled full-text query term.
///
/// Plain terms must equal one token of the node text. Terms with wildcards
/// or escapes are searched in the whole lower-cased text, so a wildcard may
/// span token boundaries and escaped characters (which the tokenizer drops
/// from node text) still match.
#[derive(Debug)]
pub enum TermPattern {
    Exact(CompactString),
    Wildcard { source: String, regex: Regex },
}

impl TermPattern {
    pub fn compile(term: &str) -> Result<Self, fancy_regex::Error> {
        if !term.contains(['*', '?', '\\']) {
            return Ok(TermPattern::Exact(term.chars().flat_map(char::to_lowercase).collect()));
        }
        let mut re = String::from("(?s)");
        let mut chars = term.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    if let Some(esc) = chars.next() {
                        push_regex_escaped(&mut re, esc);
                    }
                }
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                other => other.to_lowercase().for_each(|c| push_regex_escaped(&mut re, c)),
            }
        }
        Ok(TermPattern::Wildcard {
            source: term.to_string(),
            regex: Regex::new(&re)?,
        })
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TermPattern::Wildcard { .. })
    }

    /// Test the term against the text of one node. A regex that fails to
    /// run counts as a match: preselection may keep too much, never too little.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TermPattern::Exact(t) => SimpleTokenizer::new().tokenize(text).any(|tok| tok.text == *t),
            TermPattern::Wildcard { regex, .. } => {
                let lowered: String = text.chars().flat_map(char::to_lowercase).collect();
                regex.is_match(&lowered).unwrap_or(true)
            }
        }
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Exact(t) => f.write_str(t),
            TermPattern::Wildcard { source, .. } => f.write_str(source),
        }
    }
}

/// Full-text query that keeps nodes containing every one of its terms.
#[derive(Debug, Clone, Default)]
pub struct FulltextQuery {
    terms: Vec<CompactString>,
}

impl FulltextQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, term: impl Into<CompactString>) {
        self.terms.push(term.into());
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(CompactString::as_str)
    }

    /// Nodes of `candidates` that contain all terms. An empty query keeps
    /// every candidate.
    pub fn evaluate<N: StoredNode>(
        &self,
        ctx: &QueryContext<N>,
        docs: &DocumentSet,
        candidates: &NodeSet<N>,
    ) -> Result<NodeSet<N>, Error> {
        let mut current = candidates.clone();
        if self.terms.is_empty() {
            return Ok(current);
        }
        let broker = storage::acquire(ctx.pool()?)
            .map_err(|e| Error::storage(format!("full-text query {self}"), e))?;
        for term in &self.terms {
            if current.is_empty() {
                break;
            }
            let mut next = broker
                .nodes_containing(docs, &current, term)
                .map_err(|e| Error::storage(format!("full-text term '{term}' of {self}"), e))?;
            next.set_has_index(candidates.has_index());
            current = next;
        }
        Ok(current)
    }
}

impl fmt::Display for FulltextQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&= '{}'", self.terms.iter().join(" "))
    }
}
