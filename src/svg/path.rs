//! Element path expressions for selecting template nodes
//!
//! Attribute descriptors select nodes with the ElementTree `findall` path
//! dialect, which is what existing `config.toml` files are written against:
//!
//! ```text
//! .//{http://www.w3.org/2000/svg}rect[@id='background']
//! ./{*}g/{*}path[2]
//! .//{*}g[@{http://www.inkscape.org/namespaces/inkscape}label='Layer 1']
//! ```

use std::str::FromStr;

use ariadne::{Color, Label, Report, ReportKind, Source};
use logos::Logos;
use thiserror::Error;

use super::tree::Element;

/// Byte range in a path expression
pub type Span = std::ops::Range<usize>;

/// Child indices leading from the root to a selected element
pub type Route = Vec<usize>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path syntax error at {span:?}: {message}")]
    Syntax { span: Span, message: String },
}

impl PathError {
    fn syntax(span: Span, message: impl Into<String>) -> Self {
        PathError::Syntax {
            span,
            message: message.into(),
        }
    }

    /// Format the error against the offending expression using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let PathError::Syntax { span, message } = self;
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(message)
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("//")]
    DoubleSlash,
    #[token("/")]
    Slash,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("@")]
    At,
    #[token("!=")]
    NotEquals,
    #[token("=")]
    Equals,
    #[token("-")]
    Minus,

    /// Clark-notation namespace, braces stripped
    #[regex(r"\{[^{}]*\}", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Namespace(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.\-]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Integer(usize),

    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    /// Any depth below the context, excluding the context itself
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceTest {
    Any,
    /// Only elements without a namespace
    None,
    Uri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTest {
    pub namespace: NamespaceTest,
    /// `None` matches any local name
    pub local: Option<String>,
}

impl NameTest {
    pub fn matches(&self, element: &Element) -> bool {
        let namespace_ok = match &self.namespace {
            NamespaceTest::Any => true,
            NamespaceTest::None => element.name.namespace.is_none(),
            NamespaceTest::Uri(uri) => element.name.namespace.as_deref() == Some(uri.as_str()),
        };
        namespace_ok
            && self
                .local
                .as_ref()
                .map_or(true, |local| *local == element.name.local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeName {
    pub namespace: Option<String>,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// 1-based index among siblings with the same name
    Index(usize),
    /// `last()` minus the given offset
    FromLast(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    HasAttribute(AttributeName),
    AttributeEquals(AttributeName, String),
    AttributeNotEquals(AttributeName, String),
    HasChild(NameTest),
    ChildText(NameTest, String),
    Text(String),
    Position(Position),
}

impl Predicate {
    /// `position` is 1-based among the `count` siblings with the same name
    fn holds(&self, element: &Element, position: usize, count: usize) -> bool {
        match self {
            Predicate::HasAttribute(name) => element
                .attribute_ns(name.namespace.as_deref(), &name.local)
                .is_some(),
            Predicate::AttributeEquals(name, value) => {
                element.attribute_ns(name.namespace.as_deref(), &name.local) == Some(value.as_str())
            }
            Predicate::AttributeNotEquals(name, value) => element
                .attribute_ns(name.namespace.as_deref(), &name.local)
                .is_some_and(|actual| actual != value.as_str()),
            Predicate::HasChild(test) => element.child_elements().any(|(_, c)| test.matches(c)),
            Predicate::ChildText(test, value) => element
                .child_elements()
                .any(|(_, c)| test.matches(c) && c.text_content() == *value),
            Predicate::Text(value) => element.text_content() == *value,
            Predicate::Position(Position::Index(index)) => position == *index,
            Predicate::Position(Position::FromLast(offset)) => position + offset == count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `.`
    Current,
    /// `..`
    Parent,
    Select {
        axis: Axis,
        test: NameTest,
        predicates: Vec<Predicate>,
    },
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    source: String,
    steps: Vec<Step>,
}

impl ElementPath {
    /// Compile a path expression
    pub fn parse(source: &str) -> Result<Self, PathError> {
        let mut tokens = Vec::new();
        for (token, span) in Token::lexer(source).spanned() {
            match token {
                Ok(token) => tokens.push((token, span)),
                Err(()) => {
                    let message = format!("unexpected input '{}'", &source[span.clone()]);
                    return Err(PathError::syntax(span, message));
                }
            }
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.len(),
        };
        let steps = parser.parse_path()?;
        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    /// The expression this path was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Routes of all elements selected from `root`, deduplicated
    pub fn select(&self, root: &Element) -> Vec<Route> {
        let mut context: Vec<Route> = vec![Vec::new()];

        for step in &self.steps {
            let mut next = Vec::new();
            for route in &context {
                match step {
                    Step::Current => next.push(route.clone()),
                    Step::Parent => {
                        if let Some((_, parent)) = route.split_last() {
                            next.push(parent.to_vec());
                        }
                    }
                    Step::Select {
                        axis,
                        test,
                        predicates,
                    } => {
                        if let Some(element) = root.element_at(route) {
                            let mut scratch = route.clone();
                            collect(
                                element,
                                &mut scratch,
                                *axis == Axis::Descendant,
                                test,
                                predicates,
                                &mut next,
                            );
                        }
                    }
                }
            }
            context = dedup(next);
        }

        context
    }

    /// All elements selected from `root`
    pub fn find_all<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        self.select(root)
            .iter()
            .filter_map(|route| root.element_at(route))
            .collect()
    }
}

impl FromStr for ElementPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn collect(
    parent: &Element,
    route: &mut Route,
    recursive: bool,
    test: &NameTest,
    predicates: &[Predicate],
    out: &mut Vec<Route>,
) {
    for (index, child) in parent.child_elements() {
        route.push(index);
        if test.matches(child) {
            let (position, count) = sibling_position(parent, index, child);
            if predicates.iter().all(|p| p.holds(child, position, count)) {
                out.push(route.clone());
            }
        }
        if recursive {
            collect(child, route, true, test, predicates, out);
        }
        route.pop();
    }
}

/// 1-based position of `child` among the children of `parent` sharing its
/// exact name, and the number of such children
fn sibling_position(parent: &Element, index: usize, child: &Element) -> (usize, usize) {
    let same_name: Vec<usize> = parent
        .child_elements()
        .filter(|(_, sibling)| {
            sibling.name.namespace == child.name.namespace && sibling.name.local == child.name.local
        })
        .map(|(i, _)| i)
        .collect();
    let position = same_name.iter().position(|&i| i == index).map_or(0, |p| p + 1);
    (position, same_name.len())
}

fn dedup(routes: Vec<Route>) -> Vec<Route> {
    let mut seen = std::collections::HashSet::new();
    routes
        .into_iter()
        .filter(|route| seen.insert(route.clone()))
        .collect()
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(token, _)| token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&self, message: impl Into<String>) -> PathError {
        PathError::syntax(self.span(), message)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), PathError> {
        if self.peek() == Some(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn parse_path(&mut self) -> Result<Vec<Step>, PathError> {
        if self.tokens.is_empty() {
            return Err(self.error("empty path expression"));
        }
        if matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            return Err(self.error("absolute paths are not supported, start the path with '.'"));
        }

        let mut steps = vec![self.parse_step(Axis::Child)?];
        while let Some(token) = self.peek() {
            let axis = match token {
                Token::Slash => Axis::Child,
                Token::DoubleSlash => Axis::Descendant,
                _ => return Err(self.error("expected '/' or '//' between steps")),
            };
            self.advance();
            if self.peek().is_none() {
                return Err(self.error("path ends with a separator"));
            }
            steps.push(self.parse_step(axis)?);
        }
        Ok(steps)
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Step, PathError> {
        let special = match self.peek() {
            Some(Token::Dot) => Some(Step::Current),
            Some(Token::DotDot) => Some(Step::Parent),
            _ => None,
        };
        if let Some(step) = special {
            if axis == Axis::Descendant {
                return Err(self.error("'//' must be followed by an element name or '*'"));
            }
            self.advance();
            return Ok(step);
        }

        let test = self.parse_name_test()?;
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::BracketOpen) {
            self.advance();
            predicates.push(self.parse_predicate()?);
            self.expect(Token::BracketClose, "']'")?;
        }
        Ok(Step::Select {
            axis,
            test,
            predicates,
        })
    }

    fn parse_name_test(&mut self) -> Result<NameTest, PathError> {
        let namespace = match self.peek() {
            Some(Token::Namespace(uri)) => {
                let uri = uri.clone();
                self.advance();
                Some(uri)
            }
            _ => None,
        };

        let local = match self.peek() {
            Some(Token::Name(name)) => Some(name.clone()),
            Some(Token::Star) => None,
            _ => return Err(self.error("expected an element name or '*'")),
        };
        self.advance();

        let namespace = match namespace.as_deref() {
            None if local.is_none() => NamespaceTest::Any,
            None | Some("") => NamespaceTest::None,
            Some("*") => NamespaceTest::Any,
            Some(uri) => NamespaceTest::Uri(uri.to_string()),
        };
        Ok(NameTest { namespace, local })
    }

    fn parse_attribute_name(&mut self) -> Result<AttributeName, PathError> {
        let namespace = match self.peek() {
            Some(Token::Namespace(uri)) => {
                let uri = uri.clone();
                self.advance();
                (!uri.is_empty()).then_some(uri)
            }
            _ => None,
        };
        match self.peek() {
            Some(Token::Name(name)) => {
                let local = name.clone();
                self.advance();
                Ok(AttributeName { namespace, local })
            }
            _ => Err(self.error("expected an attribute name")),
        }
    }

    fn parse_literal(&mut self) -> Result<String, PathError> {
        match self.peek() {
            Some(Token::Literal(value)) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error("expected a quoted string")),
        }
    }

    fn parse_integer(&mut self) -> Result<usize, PathError> {
        match self.peek() {
            Some(Token::Integer(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.error("expected an integer")),
        }
    }

    fn parse_predicate(&mut self) -> Result<Predicate, PathError> {
        match self.peek() {
            Some(Token::At) => {
                self.advance();
                let name = self.parse_attribute_name()?;
                match self.peek() {
                    Some(Token::Equals) => {
                        self.advance();
                        Ok(Predicate::AttributeEquals(name, self.parse_literal()?))
                    }
                    Some(Token::NotEquals) => {
                        self.advance();
                        Ok(Predicate::AttributeNotEquals(name, self.parse_literal()?))
                    }
                    _ => Ok(Predicate::HasAttribute(name)),
                }
            }
            Some(Token::Integer(0)) => Err(self.error("positions start at 1")),
            Some(Token::Integer(_)) => Ok(Predicate::Position(Position::Index(self.parse_integer()?))),
            Some(Token::Name(name))
                if name == "last" && self.peek_nth(1) == Some(&Token::ParenOpen) =>
            {
                self.advance();
                self.expect(Token::ParenOpen, "'('")?;
                self.expect(Token::ParenClose, "')'")?;
                let offset = if self.peek() == Some(&Token::Minus) {
                    self.advance();
                    self.parse_integer()?
                } else {
                    0
                };
                Ok(Predicate::Position(Position::FromLast(offset)))
            }
            Some(Token::Dot) => {
                self.advance();
                self.expect(Token::Equals, "'='")?;
                Ok(Predicate::Text(self.parse_literal()?))
            }
            Some(Token::Namespace(_) | Token::Name(_) | Token::Star) => {
                let test = self.parse_name_test()?;
                if self.peek() == Some(&Token::Equals) {
                    self.advance();
                    Ok(Predicate::ChildText(test, self.parse_literal()?))
                } else {
                    Ok(Predicate::HasChild(test))
                }
            }
            _ => Err(self.error("expected a predicate")),
        }
    }
}
