//! Path queries over the tree.
//!
//! A small XPath 1.0 location-path subset: absolute and relative paths,
//! `//`, `.` and `..`, the tree axes, name / `*` / `text()` / `comment()` /
//! `node()` tests and a handful of predicates. Results come back in document
//! order without duplicates.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use lax_common::warning::warn_once;
use strum_macros::{Display, EnumString};

use crate::NodeId;
use crate::error::DomError;
use crate::node::NodeType;
use crate::tree::DomTree;

/// Direction of a location step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Axis {
    /// Direct children.
    Child,
    /// Everything below.
    Descendant,
    /// The node and everything below.
    DescendantOrSelf,
    /// The parent, if any.
    Parent,
    /// Every ancestor, nearest first.
    Ancestor,
    /// The node and every ancestor.
    AncestorOrSelf,
    /// Later siblings.
    FollowingSibling,
    /// Earlier siblings, nearest first.
    PrecedingSibling,
    /// The node itself.
    #[strum(serialize = "self")]
    SelfAxis,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    Comment,
    Node,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    HasAttribute(String),
    AttributeEquals {
        name: String,
        value: String,
        negate: bool,
    },
    HasChild(String),
    ChildEquals(String, String),
    HasText,
    TextEquals(String),
    Contains(Operand, String),
    StartsWith(Operand, String),
    Not(Box<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(usize),
    Last,
    Condition(Condition),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

impl Step {
    const fn any(axis: Axis) -> Self {
        Self {
            axis,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

impl FromStr for Path {
    type Err = DomError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(expression)?;
        PathParser {
            tokens,
            pos: 0,
            end: expression.len(),
        }
        .parse()
    }
}

impl Path {
    /// Evaluate against `context`; results are in document order.
    #[must_use]
    pub fn evaluate(&self, tree: &DomTree, context: NodeId) -> Vec<NodeId> {
        let mut current = vec![if self.absolute { NodeId::ROOT } else { context }];
        let order = DocumentOrder::new(tree, context);
        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for &ctx in &current {
                let matched: Vec<NodeId> = axis_nodes(tree, ctx, step.axis)
                    .into_iter()
                    .filter(|&n| matches_test(tree, n, &step.test))
                    .collect();
                for node in apply_predicates(tree, matched, &step.predicates) {
                    if seen.insert(node) {
                        next.push(node);
                    }
                }
            }
            next.sort_by_key(|&n| order.key(n));
            current = next;
        }
        current
    }
}

/// Select every node matching `expression`, evaluated from `context`.
///
/// # Errors
///
/// Returns [`DomError::InvalidPath`] for malformed or unsupported expressions.
pub fn select(tree: &DomTree, context: NodeId, expression: &str) -> Result<Vec<NodeId>, DomError> {
    let _ = tree.node(context)?;
    Ok(expression.parse::<Path>()?.evaluate(tree, context))
}

/// The first node matching `expression` in document order.
///
/// # Errors
///
/// Returns [`DomError::InvalidPath`] for malformed or unsupported expressions.
pub fn select_single(
    tree: &DomTree,
    context: NodeId,
    expression: &str,
) -> Result<Option<NodeId>, DomError> {
    Ok(select(tree, context, expression)?.first().copied())
}

// -------------------------------------------------------------------------
// Lexer
// -------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Star,
    Eq,
    NotEq,
    DoubleColon,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Number(usize),
    Literal(String),
    Name(String),
}

fn invalid(offset: usize, reason: impl Into<String>) -> DomError {
    DomError::InvalidPath {
        offset,
        reason: reason.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, DomError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '/' if chars.next_if(|&(_, n)| n == '/').is_some() => Token::DoubleSlash,
            '/' => Token::Slash,
            '.' if chars.next_if(|&(_, n)| n == '.').is_some() => Token::DoubleDot,
            '.' => Token::Dot,
            '@' => Token::At,
            '*' => Token::Star,
            '=' => Token::Eq,
            ',' => Token::Comma,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            '!' if chars.next_if(|&(_, n)| n == '=').is_some() => Token::NotEq,
            ':' if chars.next_if(|&(_, n)| n == ':').is_some() => Token::DoubleColon,
            '\'' | '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, other)) => literal.push(other),
                        None => return Err(invalid(offset, "unterminated string literal")),
                    }
                }
                Token::Literal(literal)
            }
            c if c.is_ascii_digit() => {
                let mut value = c.to_digit(10).map_or(0, |d| d as usize);
                while let Some((_, d)) = chars.next_if(|&(_, n)| n.is_ascii_digit()) {
                    value = value
                        .saturating_mul(10)
                        .saturating_add(d.to_digit(10).map_or(0, |d| d as usize));
                }
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::from(c);
                while let Some((_, n)) =
                    chars.next_if(|&(_, n)| n.is_alphanumeric() || matches!(n, '_' | '-' | '.'))
                {
                    name.push(n);
                }
                Token::Name(name)
            }
            other => return Err(invalid(offset, format!("unexpected character '{other}'"))),
        };
        tokens.push((offset, token));
    }
    Ok(tokens)
}

// -------------------------------------------------------------------------
// Parser
// -------------------------------------------------------------------------

struct PathParser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl PathParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), DomError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(invalid(self.offset(), format!("expected {what}")))
        }
    }

    fn literal(&mut self) -> Result<String, DomError> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(value),
            _ => Err(invalid(self.offset(), "expected a quoted string")),
        }
    }

    fn name(&mut self) -> Result<String, DomError> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(name.to_lowercase()),
            _ => Err(invalid(self.offset(), "expected a name")),
        }
    }

    fn parse(mut self) -> Result<Path, DomError> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.peek().is_none() {
                    return Ok(Path {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::any(Axis::DescendantOrSelf));
                true
            }
            None => return Err(invalid(0, "empty path")),
            Some(_) => false,
        };

        loop {
            steps.push(self.step()?);
            match self.advance() {
                None => break,
                Some(Token::Slash) => {}
                Some(Token::DoubleSlash) => steps.push(Step::any(Axis::DescendantOrSelf)),
                Some(_) => {
                    self.pos -= 1;
                    return Err(invalid(self.offset(), "expected '/' or end of path"));
                }
            }
        }
        Ok(Path { absolute, steps })
    }

    fn step(&mut self) -> Result<Step, DomError> {
        if self.eat(&Token::Dot) {
            return Ok(Step::any(Axis::SelfAxis));
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step::any(Axis::Parent));
        }
        if self.peek() == Some(&Token::At) {
            return Err(invalid(self.offset(), "attribute steps are not supported"));
        }

        let mut axis = Axis::Child;
        if let (Some(Token::Name(name)), Some(Token::DoubleColon)) = (self.peek(), self.peek_at(1))
        {
            let offset = self.offset();
            axis = Axis::from_str(name)
                .map_err(|_| invalid(offset, format!("unknown axis '{name}'")))?;
            self.pos += 2;
        }

        let test = self.node_test()?;
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.predicate()?);
            self.expect(&Token::RightBracket, "']'")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, DomError> {
        if self.eat(&Token::Star) {
            return Ok(NodeTest::AnyElement);
        }
        let offset = self.offset();
        let name = self.name()?;
        if !self.eat(&Token::LeftParen) {
            return Ok(NodeTest::Name(name));
        }
        self.expect(&Token::RightParen, "')'")?;
        match name.as_str() {
            "text" => Ok(NodeTest::Text),
            "comment" => Ok(NodeTest::Comment),
            "node" => Ok(NodeTest::Node),
            other => Err(invalid(offset, format!("unknown node test '{other}()'"))),
        }
    }

    fn predicate(&mut self) -> Result<Predicate, DomError> {
        if let Some(Token::Number(n)) = self.peek() {
            let n = *n;
            self.pos += 1;
            return Ok(Predicate::Position(n));
        }
        if let (Some(Token::Name(name)), Some(Token::LeftParen)) = (self.peek(), self.peek_at(1))
            && name == "last"
        {
            self.pos += 2;
            self.expect(&Token::RightParen, "')'")?;
            return Ok(Predicate::Last);
        }
        Ok(Predicate::Condition(self.condition()?))
    }

    fn condition(&mut self) -> Result<Condition, DomError> {
        if self.eat(&Token::At) {
            let name = self.name()?;
            return Ok(if self.eat(&Token::Eq) {
                Condition::AttributeEquals {
                    name,
                    value: self.literal()?,
                    negate: false,
                }
            } else if self.eat(&Token::NotEq) {
                Condition::AttributeEquals {
                    name,
                    value: self.literal()?,
                    negate: true,
                }
            } else {
                Condition::HasAttribute(name)
            });
        }

        let offset = self.offset();
        let name = self.name()?;
        if !self.eat(&Token::LeftParen) {
            return Ok(if self.eat(&Token::Eq) {
                Condition::ChildEquals(name, self.literal()?)
            } else {
                Condition::HasChild(name)
            });
        }

        match name.as_str() {
            "text" => {
                self.expect(&Token::RightParen, "')'")?;
                Ok(if self.eat(&Token::Eq) {
                    Condition::TextEquals(self.literal()?)
                } else {
                    Condition::HasText
                })
            }
            "not" => {
                let inner = self.condition()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(Condition::Not(Box::new(inner)))
            }
            "contains" | "starts-with" => {
                let operand = self.operand()?;
                self.expect(&Token::Comma, "','")?;
                let value = self.literal()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(if name == "contains" {
                    Condition::Contains(operand, value)
                } else {
                    Condition::StartsWith(operand, value)
                })
            }
            other => {
                let _ = warn_once("Path", &format!("function {other}() is not supported"));
                Err(invalid(offset, format!("unsupported function '{other}()'")))
            }
        }
    }

    fn operand(&mut self) -> Result<Operand, DomError> {
        if self.eat(&Token::At) {
            return Ok(Operand::Attribute(self.name()?));
        }
        if self.eat(&Token::Dot) {
            return Ok(Operand::Text);
        }
        let offset = self.offset();
        if self.name()? == "text" {
            self.expect(&Token::LeftParen, "'('")?;
            self.expect(&Token::RightParen, "')'")?;
            return Ok(Operand::Text);
        }
        Err(invalid(offset, "expected @name, . or text()"))
    }
}

// -------------------------------------------------------------------------
// Evaluation
// -------------------------------------------------------------------------

fn axis_nodes(tree: &DomTree, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => tree.children(context).to_vec(),
        Axis::Descendant => tree.descendants(context).collect(),
        Axis::DescendantOrSelf => std::iter::once(context)
            .chain(tree.descendants(context))
            .collect(),
        Axis::Parent => tree.parent(context).into_iter().collect(),
        Axis::Ancestor => tree.ancestors(context).collect(),
        Axis::AncestorOrSelf => tree.ancestors_and_self(context).collect(),
        Axis::FollowingSibling => tree.following_siblings(context).collect(),
        Axis::PrecedingSibling => tree.preceding_siblings(context).collect(),
        Axis::SelfAxis => vec![context],
    }
}

fn matches_test(tree: &DomTree, id: NodeId, test: &NodeTest) -> bool {
    let Some(node) = tree.get(id) else {
        return false;
    };
    match (test, &node.node_type) {
        (NodeTest::Node, _)
        | (NodeTest::AnyElement, NodeType::Element(_))
        | (NodeTest::Text, NodeType::Text(_))
        | (NodeTest::Comment, NodeType::Comment(_)) => true,
        (NodeTest::Name(name), NodeType::Element(data)) => data.tag_name == *name,
        _ => false,
    }
}

/// Predicates filter the axis result in proximity order, one after another.
fn apply_predicates(tree: &DomTree, mut nodes: Vec<NodeId>, predicates: &[Predicate]) -> Vec<NodeId> {
    for predicate in predicates {
        nodes = match predicate {
            Predicate::Position(n) => n
                .checked_sub(1)
                .and_then(|i| nodes.get(i).copied())
                .into_iter()
                .collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::Condition(condition) => nodes
                .into_iter()
                .filter(|&n| holds(tree, n, condition))
                .collect(),
        };
    }
    nodes
}

fn operand_value(tree: &DomTree, id: NodeId, operand: &Operand) -> Option<String> {
    match operand {
        Operand::Attribute(name) => tree.attribute(id, name).map(str::to_string),
        Operand::Text => Some(tree.inner_text(id)),
    }
}

fn holds(tree: &DomTree, id: NodeId, condition: &Condition) -> bool {
    match condition {
        Condition::HasAttribute(name) => tree.attribute(id, name).is_some(),
        Condition::AttributeEquals {
            name,
            value,
            negate,
        } => tree
            .attribute(id, name)
            .is_some_and(|v| (v == value) != *negate),
        Condition::HasChild(name) => tree.element(id, name).is_some(),
        Condition::ChildEquals(name, value) => tree
            .elements(id, name)
            .into_iter()
            .any(|c| tree.inner_text(c) == *value),
        Condition::HasText => tree
            .children(id)
            .iter()
            .any(|&c| tree.as_text(c).is_some()),
        Condition::TextEquals(value) => tree
            .children(id)
            .iter()
            .any(|&c| tree.as_text(c) == Some(value.as_str())),
        Condition::Contains(operand, value) => {
            operand_value(tree, id, operand).is_some_and(|v| v.contains(value.as_str()))
        }
        Condition::StartsWith(operand, value) => {
            operand_value(tree, id, operand).is_some_and(|v| v.starts_with(value.as_str()))
        }
        Condition::Not(inner) => !holds(tree, id, inner),
    }
}

/// Pre-order rank of every node reachable from the root, plus the subtree
/// holding the context when it is detached.
struct DocumentOrder {
    rank: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    fn new(tree: &DomTree, context: NodeId) -> Self {
        let mut rank = HashMap::new();
        let top = tree.ancestors_and_self(context).last().unwrap_or(context);
        let mut roots = vec![NodeId::ROOT];
        if top != NodeId::ROOT {
            roots.push(top);
        }
        for root in roots {
            for id in std::iter::once(root).chain(tree.descendants(root)) {
                let next = rank.len();
                let _ = rank.entry(id).or_insert(next);
            }
        }
        Self { rank }
    }

    fn key(&self, id: NodeId) -> usize {
        self.rank.get(&id).copied().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_abbreviations() {
        let path: Path = "//div/..".parse().unwrap();
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(path.steps[1].test, NodeTest::Name("div".to_string()));
        assert_eq!(path.steps[2].axis, Axis::Parent);
    }

    #[test]
    fn test_parse_axis_names() {
        let path: Path = "following-sibling::li[last()]".parse().unwrap();
        assert_eq!(path.steps[0].axis, Axis::FollowingSibling);
        assert_eq!(path.steps[0].predicates, vec![Predicate::Last]);
        assert_eq!(Axis::SelfAxis.to_string(), "self");
    }

    #[test]
    fn test_parse_errors_carry_offset() {
        let err = "div[@id='x'".parse::<Path>().unwrap_err();
        assert!(matches!(err, DomError::InvalidPath { offset: 11, .. }), "{err:?}");
        assert!("bogus::div".parse::<Path>().is_err());
        assert!("div/@id".parse::<Path>().is_err());
        assert!("".parse::<Path>().is_err());
    }
}
