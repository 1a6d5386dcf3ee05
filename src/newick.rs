//! Reading and writing trees in Newick format.
//!
//! Supported syntax:
//! - nested `( ... )` subtrees separated by `,`, terminated by `;`
//! - unquoted labels, or single-quoted labels where `''` is a literal quote
//! - `:length` after any node
//! - bracketed comments `[...]` between tokens, which are skipped
//!   (this swallows BEAST `[&rate=...]` and NHX `[&&NHX:...]` annotations)
//!
//! A numeric label after a closing parenthesis is read as the support value
//! of that internal node (as written by RAxML and friends); any other label is
//! the node's name.
//!
//! Both directions are iterative so very deep (caterpillar) trees do not
//! overflow the stack.

use crate::error::{Error, Result};
use crate::tree::{Node, NodeId, Tree};
use std::collections::HashMap;
use std::fmt::Write;

/// Number of characters shown on each side of a syntax error.
const SNIPPET_RADIUS: usize = 15;

/// Characters that end an unquoted label.
fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | ',' | ':' | ';' | '[' | ']' | '\'') || c.is_whitespace()
}

/// Parse a single Newick tree.
///
/// # Example
/// ```
/// use rust_python_subset_support::newick::parse;
///
/// let tree = parse("((A:0.1,B:0.2)95:0.3,C:0.4);").unwrap();
/// assert_eq!(tree.n_leaves(), 3);
/// assert_eq!(tree.get(&1).unwrap().support, Some(95.0));
/// ```
///
/// # Errors
/// [`Error::Format`] with the character position of the offending token.
pub fn parse(text: &str) -> Result<Tree> {
    NewickParser::new(text).parse()
}

struct NewickParser<'a> {
    chars: Vec<char>,
    pos: usize,
    text: &'a str,
}

impl<'a> NewickParser<'a> {
    fn new(text: &'a str) -> Self {
        NewickParser {
            chars: text.chars().collect(),
            pos: 0,
            text,
        }
    }

    fn parse(mut self) -> Result<Tree> {
        let mut tree: Option<Tree> = None;
        // Internal nodes whose closing parenthesis has not been seen yet
        let mut open: Vec<NodeId> = Vec::new();
        // True right after `(` or `,`, i.e. when a new node must start
        let mut expect_node = true;
        let mut leaf_names: HashMap<String, usize> = HashMap::new();

        loop {
            self.skip_blanks()?;
            let Some(c) = self.peek() else {
                return Err(self.error("missing terminating ';'"));
            };

            match c {
                '(' => {
                    if !expect_node {
                        return Err(self.error("unexpected '('"));
                    }
                    self.pos += 1;
                    let id = Self::attach(&mut tree, &open, Node::default())?;
                    open.push(id);
                }
                ',' => {
                    if expect_node {
                        return Err(self.error("empty node before ','"));
                    }
                    if open.is_empty() {
                        return Err(self.error("',' outside of parentheses"));
                    }
                    self.pos += 1;
                }
                ')' => {
                    if expect_node {
                        return Err(self.error("empty node before ')'"));
                    }
                    let Some(id) = open.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    self.pos += 1;
                    let (label, length) = self.annotations()?;
                    // `tree` is always set once a node has been opened
                    if let Some(tree) = tree.as_mut() {
                        let node = tree.get_mut(&id)?;
                        if let Some(label) = label {
                            match label.parse::<f64>() {
                                Ok(support) if support.is_finite() => node.support = Some(support),
                                _ => node.name = Some(label),
                            }
                        }
                        node.branch_length = length;
                    }
                }
                ';' => {
                    if expect_node {
                        return Err(self.error("empty node before ';'"));
                    }
                    if !open.is_empty() {
                        return Err(self.error(&format!(
                            "{} unclosed '(' at end of tree",
                            open.len()
                        )));
                    }
                    self.pos += 1;
                    self.skip_blanks()?;
                    if self.peek().is_some() {
                        return Err(self.error("unexpected content after ';'"));
                    }
                    return tree.ok_or_else(|| self.error("empty tree"));
                }
                _ => {
                    if !expect_node {
                        return Err(self.error(&format!("unexpected '{c}'")));
                    }
                    if tree.is_some() && open.is_empty() {
                        return Err(self.error("multiple root nodes, missing parentheses"));
                    }
                    let start = self.pos;
                    let (label, length) = self.annotations()?;
                    let Some(name) = label else {
                        return Err(self.error_at(start, "leaf without a name"));
                    };
                    if leaf_names.insert(name.clone(), start).is_some() {
                        return Err(self.error_at(start, &format!("duplicate leaf name '{name}'")));
                    }
                    let node = Node::named(name).with_branch_length(length);
                    Self::attach(&mut tree, &open, node)?;
                }
            }

            expect_node = matches!(c, '(' | ',');
        }
    }

    /// Add `node` under the innermost open parenthesis, or as the root.
    fn attach(tree: &mut Option<Tree>, open: &[NodeId], node: Node) -> Result<NodeId> {
        match (tree.as_mut(), open.last()) {
            (Some(tree), Some(parent)) => tree.add_child(*parent, node),
            (None, _) => {
                *tree = Some(Tree::new(node));
                Ok(0)
            }
            (Some(_), None) => Err(Error::InvariantViolation("second root while parsing".into())),
        }
    }

    /// Optional label followed by an optional `:length`.
    fn annotations(&mut self) -> Result<(Option<String>, Option<f64>)> {
        self.skip_blanks()?;
        let label = self.label()?;
        self.skip_blanks()?;
        let length = if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_blanks()?;
            Some(self.branch_length()?)
        } else {
            None
        };
        Ok((label, length))
    }

    fn label(&mut self) -> Result<Option<String>> {
        match self.peek() {
            Some('\'') => self.quoted_label().map(Some),
            Some(c) if !is_delimiter(c) => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !is_delimiter(c)) {
                    self.pos += 1;
                }
                Ok(Some(self.chars[start..self.pos].iter().collect()))
            }
            _ => Ok(None),
        }
    }

    fn quoted_label(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut label = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error_at(start, "unterminated quoted label")),
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    label.push('\'');
                    self.pos += 2;
                }
                Some('\'') => {
                    self.pos += 1;
                    break;
                }
                Some(c) => {
                    label.push(c);
                    self.pos += 1;
                }
            }
        }
        if label.is_empty() {
            return Err(self.error_at(start, "empty quoted label"));
        }
        Ok(label)
    }

    fn branch_length(&mut self) -> Result<f64> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        match raw.parse::<f64>() {
            Ok(length) if !length.is_finite() => {
                Err(self.error_at(start, &format!("branch length out of range '{raw}'")))
            }
            Ok(length) if length >= 0.0 => Ok(length),
            Ok(_) => Err(self.error_at(start, &format!("negative branch length '{raw}'"))),
            Err(_) => Err(self.error_at(start, &format!("invalid branch length '{raw}'"))),
        }
    }

    /// Skip whitespace and `[...]` comments.
    fn skip_blanks(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('[') => {
                    let start = self.pos;
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == ']' {
                            break;
                        }
                    }
                    if self.chars[self.pos - 1] != ']' || self.pos - start < 2 {
                        return Err(self.error_at(start, "unclosed comment"));
                    }
                }
                Some(']') => return Err(self.error("unmatched ']'")),
                _ => return Ok(()),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: &str) -> Error {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, position: usize, message: &str) -> Error {
        let from = position.saturating_sub(SNIPPET_RADIUS);
        let to = (position + SNIPPET_RADIUS).min(self.chars.len());
        let snippet = if self.chars.len() == self.text.len() {
            self.text[from..to].to_string()
        } else {
            self.chars[from..to].iter().collect()
        };
        Error::Format {
            message: message.to_string(),
            position,
            snippet,
        }
    }
}

/// Output options for [`to_newick_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NewickFormat {
    /// Round support values to this many decimals; `None` prints them exactly.
    pub support_decimals: Option<usize>,
}

/// Serialize a tree with default formatting.
///
/// ```
/// use rust_python_subset_support::newick::{parse, to_newick};
///
/// let text = "((A:0.1,B:0.2)95:0.3,C:0.4);";
/// assert_eq!(to_newick(&parse(text).unwrap()), text);
/// ```
pub fn to_newick(tree: &Tree) -> String {
    to_newick_with(tree, &NewickFormat::default())
}

/// Serialize a tree to a Newick string terminated by `;`.
///
/// Absent branch lengths and support values are omitted. Internal nodes
/// print their support when it is set, their name otherwise.
pub fn to_newick_with(tree: &Tree, format: &NewickFormat) -> String {
    enum Step {
        Open(NodeId),
        Close(NodeId),
        Comma,
    }

    let mut out = String::with_capacity(tree.size() * 12);
    let mut stack = vec![Step::Open(tree.root())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Comma => out.push(','),
            Step::Open(id) => {
                let Ok(node) = tree.get(&id) else { continue };
                if node.is_leaf() {
                    write_label(&mut out, node, format);
                    continue;
                }
                out.push('(');
                stack.push(Step::Close(id));
                for (k, child) in node.children.iter().enumerate().rev() {
                    stack.push(Step::Open(*child));
                    if k > 0 {
                        stack.push(Step::Comma);
                    }
                }
            }
            Step::Close(id) => {
                out.push(')');
                if let Ok(node) = tree.get(&id) {
                    write_label(&mut out, node, format);
                }
            }
        }
    }

    out.push(';');
    out
}

fn write_label(out: &mut String, node: &Node, format: &NewickFormat) {
    match (node.is_leaf(), node.support, &node.name) {
        (false, Some(support), _) => {
            // writing into a String cannot fail
            let _ = match format.support_decimals {
                Some(decimals) => write!(out, "{support:.decimals$}"),
                None => write!(out, "{support}"),
            };
        }
        (_, _, Some(name)) => out.push_str(&quote_label(name)),
        _ => {}
    }
    if let Some(length) = node.branch_length {
        let _ = write!(out, ":{length}");
    }
}

/// Quote a label if it contains characters with a meaning in Newick.
fn quote_label(name: &str) -> String {
    if !name.is_empty() && !name.chars().any(is_delimiter) {
        return name.to_string();
    }
    format!("'{}'", name.replace('\'', "''"))
}
