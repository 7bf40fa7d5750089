//! Layout Output Parser
//!
//! Reconstructs node positions and the edge list from the DOT text emitted
//! by a Graphviz layout run (or from a `.gv`/`.dot` file that already carries
//! positions). The input is the engine's canonical output, for example:
//!
//! ```text
//! strict graph {
//!     graph [bb="0,0,124.94,118.03"];
//!     node [height=0,
//!         shape=none,
//!         width=0
//!     ];
//!     0    [pos="27,18"];
//!     0 -- 1    [pos="54.08,18 79.91,18"];
//!     1    [pos="97.94,18"];
//! }
//! ```
//!
//! Parsing runs in four stages:
//! 1. Normalization: tabs become spaces, blank lines and every line holding
//!    a brace are dropped (braces only delimit the top-level block).
//! 2. Statement reading: lines are accumulated up to and including the next
//!    line with a semicolon outside a quoted string, so attribute lists
//!    wrapped over several lines form one statement.
//! 3. Lexing: each statement is tokenized by an explicit state machine into
//!    identifiers (bare, quoted or HTML), edge operators and punctuation.
//! 4. Classification: each statement becomes a [`Statement`]. Default
//!    attribute statements (`graph`, `node`, `edge`, `key=value`) are skipped
//!    wherever they appear; edges contribute their first two endpoints;
//!    nodes contribute their label and `pos` attribute.
//!
//! The parser is pure: identical text always yields identical output.

use crate::error::{Result, VisError};
use crate::topology::{Edge, NodeId};
use crate::Point;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Words that open a default-attribute statement
pub const RESERVED_WORDS: [&str; 3] = ["graph", "node", "edge"];

/// Lexical token of a DOT statement
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, numeral, quoted string or HTML string (delimiters removed)
    Id { text: String, quoted: bool },
    /// `--` or `->`
    EdgeOp,
    LBracket,
    RBracket,
    Equals,
    Comma,
    Semicolon,
}

impl Token {
    fn bare(text: &str) -> Self {
        Token::Id {
            text: text.to_string(),
            quoted: false,
        }
    }

    fn id_text(&self) -> Option<&str> {
        match self {
            Token::Id { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Kind of default-attribute statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultKind {
    Graph,
    Node,
    Edge,
    /// Top-level `key=value` graph attribute assignment
    Assignment(String),
}

/// A classified DOT statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Default attributes, no topology
    Default(DefaultKind),
    Node {
        id: NodeId,
        attrs: Vec<(String, String)>,
    },
    Edge {
        tail: NodeId,
        head: NodeId,
    },
    /// Stray `;` or an attribute-less fragment with no tokens
    Empty,
}

impl Statement {
    /// Value of a node attribute by exact key
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Statement::Node { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Node positions and edges recovered from layout text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLayout {
    pub positions: HashMap<NodeId, Point>,
    pub edges: Vec<Edge>,
    /// Nodes declared without a `pos` attribute
    pub unpositioned: Vec<NodeId>,
    /// Number of default-attribute statements skipped
    pub defaults_skipped: usize,
}

impl ParsedLayout {
    pub fn position(&self, id: &NodeId) -> Option<&Point> {
        self.positions.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.positions.len() + self.unpositioned.len()
    }
}

/// A normalized line with its 1-based line number in the original text
#[derive(Debug, Clone)]
struct Line {
    number: usize,
    text: String,
}

/// Tabs to spaces, trim, drop blank lines and lines containing a brace.
fn normalize(lines: &[String]) -> Vec<Line> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.contains('{') && !l.contains('}'))
        .map(|(i, l)| Line {
            number: i + 1,
            text: l.replace('\t', " ").trim().to_string(),
        })
        .filter(|l| !l.text.is_empty())
        .collect()
}

/// True if `text` contains a `;` outside double quotes. `in_quotes` carries
/// the quoting state across lines of one statement.
fn ends_statement(text: &str, in_quotes: &mut bool) -> bool {
    let mut escaped = false;
    let mut terminated = false;
    for c in text.chars() {
        if *in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => *in_quotes = false,
                _ => {}
            }
        } else {
            match c {
                '"' => *in_quotes = true,
                ';' => terminated = true,
                _ => {}
            }
        }
    }
    terminated
}

/// Groups normalized lines into multi-line statements.
struct StatementReader<'a> {
    lines: &'a [Line],
    pos: usize,
}

impl<'a> StatementReader<'a> {
    fn new(lines: &'a [Line]) -> Self {
        Self { lines, pos: 0 }
    }
}

impl<'a> Iterator for StatementReader<'a> {
    /// (first line number, joined statement text)
    type Item = (usize, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.lines.len() {
            return None;
        }
        let start = self.pos;
        let mut in_quotes = false;
        while self.pos < self.lines.len() {
            let done = ends_statement(&self.lines[self.pos].text, &mut in_quotes);
            self.pos += 1;
            if done {
                break;
            }
        }
        let joined = self.lines[start..self.pos]
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Some((self.lines[start].number, joined))
    }
}

fn is_punct(c: char) -> bool {
    matches!(c, '[' | ']' | '=' | ',' | ';' | '"' | '<')
}

/// Tokenize one statement.
pub fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Equals);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            '-' if matches!(chars.get(i + 1), Some('-') | Some('>')) => {
                tokens.push(Token::EdgeOp);
                i += 2;
            }
            '"' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(format!("unterminated quoted string in `{text}`")),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        // an escape always consumes the next character
                        Some('\\') => {
                            match chars.get(i + 1) {
                                Some('"') => value.push('"'),
                                Some(&next) => {
                                    value.push('\\');
                                    value.push(next);
                                }
                                None => {
                                    return Err(format!("unterminated quoted string in `{text}`"))
                                }
                            }
                            i += 2;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Id {
                    text: value,
                    quoted: true,
                });
            }
            '<' => {
                // HTML string: balanced angle brackets
                let mut depth = 0usize;
                let start = i;
                loop {
                    match chars.get(i) {
                        None => return Err(format!("unterminated HTML string in `{text}`")),
                        Some('<') => depth += 1,
                        Some('>') => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        Some(_) => {}
                    }
                    i += 1;
                }
                tokens.push(Token::Id {
                    text: chars[start + 1..i - 1].iter().collect(),
                    quoted: true,
                });
            }
            _ => {
                let start = i;
                while i < chars.len() {
                    let ch = chars[i];
                    if ch.is_whitespace() || is_punct(ch) {
                        break;
                    }
                    if ch == '-' && i > start && matches!(chars.get(i + 1), Some('-') | Some('>')) {
                        break;
                    }
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(Token::bare(&word));
            }
        }
    }
    Ok(tokens)
}

/// Key/value pairs from every bracketed attribute list in `tokens`.
fn attributes(tokens: &[Token]) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::LBracket => depth += 1,
            Token::RBracket => depth = depth.saturating_sub(1),
            Token::Id { text: key, .. } if depth > 0 => {
                if tokens.get(i + 1) == Some(&Token::Equals) {
                    if let Some(value) = tokens.get(i + 2).and_then(Token::id_text) {
                        attrs.push((key.clone(), value.to_string()));
                        i += 3;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    attrs
}

/// Classify the tokens of one statement (no trailing semicolon).
pub fn classify(tokens: &[Token]) -> std::result::Result<Statement, String> {
    let Some(first) = tokens.first() else {
        return Ok(Statement::Empty);
    };

    if let Token::Id {
        text,
        quoted: false,
    } = first
    {
        match text.as_str() {
            "graph" => return Ok(Statement::Default(DefaultKind::Graph)),
            "node" => return Ok(Statement::Default(DefaultKind::Node)),
            "edge" => return Ok(Statement::Default(DefaultKind::Edge)),
            _ => {}
        }
    }
    if let (Some(key), Some(Token::Equals)) = (first.id_text(), tokens.get(1)) {
        return Ok(Statement::Default(DefaultKind::Assignment(key.to_string())));
    }

    // Endpoints are the identifiers ahead of the attribute list
    let head_end = tokens
        .iter()
        .position(|t| *t == Token::LBracket)
        .unwrap_or(tokens.len());
    let head = &tokens[..head_end];

    if head.contains(&Token::EdgeOp) {
        let mut ids = head.iter().filter_map(Token::id_text);
        return match (ids.next(), ids.next()) {
            (Some(tail), Some(head)) => Ok(Statement::Edge {
                tail: NodeId::new(tail),
                head: NodeId::new(head),
            }),
            _ => Err("edge statement needs two endpoints".to_string()),
        };
    }

    match first.id_text() {
        Some(id) => Ok(Statement::Node {
            id: NodeId::new(id),
            attrs: attributes(&tokens[1..]),
        }),
        None if head.is_empty() => Ok(Statement::Empty),
        None => Err(format!("statement starts with {first:?} instead of a node identifier")),
    }
}

/// Parse a `pos` value such as `"27,18"`, `"27,18!"` or `"1,2,3"`.
pub fn parse_position(value: &str) -> std::result::Result<Point, String> {
    let trimmed = value.trim().trim_end_matches('!');
    let components = trimmed
        .split(',')
        .map(|piece| {
            piece
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite())
                .ok_or_else(|| format!("`{piece}` in pos=\"{value}\" is not a finite number"))
        })
        .collect::<std::result::Result<Vec<f64>, String>>()?;
    Point::from_components(&components)
        .ok_or_else(|| format!("pos=\"{value}\" has fewer than two coordinates"))
}

fn malformed(line: usize, msg: String) -> VisError {
    VisError::MalformedInput(format!("layout line {line}: {msg}"))
}

/// Split layout text into classified statements, each tagged with the line
/// number it starts on.
pub fn statements(lines: &[String]) -> Result<Vec<(usize, Statement)>> {
    if lines.is_empty() {
        return Err(VisError::NotLaidOut);
    }
    let normalized = normalize(lines);
    let mut out = Vec::new();
    for (line, text) in StatementReader::new(&normalized) {
        let tokens = tokenize(&text).map_err(|e| malformed(line, e))?;
        for fragment in tokens.split(|t| *t == Token::Semicolon) {
            let stmt = classify(fragment).map_err(|e| malformed(line, e))?;
            if stmt != Statement::Empty {
                out.push((line, stmt));
            }
        }
    }
    Ok(out)
}

/// Parse layout text into node positions and edges.
///
/// Fails with [`VisError::NotLaidOut`] on empty input and with
/// [`VisError::MalformedInput`] on unreadable statements or positions.
pub fn parse_layout(lines: &[String]) -> Result<ParsedLayout> {
    let mut layout = ParsedLayout::default();
    let mut declared: Vec<NodeId> = Vec::new();
    let mut declared_set: HashSet<NodeId> = HashSet::new();

    for (line, stmt) in statements(lines)? {
        match stmt {
            Statement::Default(kind) => {
                debug!(line, ?kind, "skipped default-attribute statement");
                layout.defaults_skipped += 1;
            }
            Statement::Node { ref id, .. } => {
                if let Some(value) = stmt.attr("pos") {
                    let point = parse_position(value).map_err(|e| malformed(line, e))?;
                    layout.positions.insert(id.clone(), point);
                }
                if declared_set.insert(id.clone()) {
                    declared.push(id.clone());
                }
            }
            Statement::Edge { tail, head } => {
                layout.edges.push(Edge { tail, head });
            }
            Statement::Empty => {}
        }
    }

    layout.unpositioned = declared
        .into_iter()
        .filter(|id| !layout.positions.contains_key(id))
        .collect();
    debug!(
        nodes = layout.positions.len(),
        edges = layout.edges.len(),
        unpositioned = layout.unpositioned.len(),
        defaults = layout.defaults_skipped,
        "parsed layout text"
    );
    Ok(layout)
}
