//! CSS selector subset.
//!
//! Supports what behavior configuration needs:
//!
//! - type (`button`), universal (`*`), id (`#toc`) and class (`.tabs`)
//! - attributes: `[data-tab]`, `=`, `^=`, `$=`, `*=`, `~=`
//! - descendant (` `) and child (`>`) combinators
//! - selector lists (`a, b`)
//!
//! Pseudo-classes and sibling combinators are rejected.

use std::fmt;
use std::str::FromStr;

/// Selector parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// Selector (or one of its list entries) is empty.
    #[error("empty selector in `{0}`")]
    Empty(String),
    /// Character not allowed at this position.
    #[error("unexpected {found:?} at offset {offset} in selector `{selector}`")]
    Unexpected {
        /// Full selector text.
        selector: String,
        /// Byte offset of the offending character.
        offset: usize,
        /// Offending character.
        found: char,
    },
    /// Input ended inside an attribute or string.
    #[error("unexpected end of selector `{0}`")]
    UnexpectedEnd(String),
}

/// Relation between a compound selector and the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

/// Attribute matching operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributeOp {
    /// `[name]`
    Exists,
    /// `[name="v"]`
    Equals(String),
    /// `[name^="v"]`
    Prefix(String),
    /// `[name$="v"]`
    Suffix(String),
    /// `[name*="v"]`
    Contains(String),
    /// `[name~="v"]`, whitespace-separated token match.
    Includes(String),
}

impl AttributeOp {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Self::Exists => true,
            Self::Equals(v) => value == v,
            Self::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            Self::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            Self::Contains(v) => !v.is_empty() && value.contains(v.as_str()),
            Self::Includes(v) => value.split_ascii_whitespace().any(|t| t == v),
        }
    }

    fn operator(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Exists => None,
            Self::Equals(v) => Some(("=", v)),
            Self::Prefix(v) => Some(("^=", v)),
            Self::Suffix(v) => Some(("$=", v)),
            Self::Contains(v) => Some(("*=", v)),
            Self::Includes(v) => Some(("~=", v)),
        }
    }
}

/// Sequence of simple selectors applying to one element (`a.nav[href]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, AttributeOp)>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches<S: Subject>(&self, subject: &S) -> bool {
        if let Some(tag) = &self.tag
            && tag != "*"
            && !subject.tag().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && subject.attribute("id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = subject.attribute("class").unwrap_or_default();
            let has_all = self
                .classes
                .iter()
                .all(|c| class_attr.split_ascii_whitespace().any(|t| t == c));
            if !has_all {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|(name, op)| op.matches(subject.attribute(name)))
    }
}

/// One compound selector and its relation to the previous step.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    combinator: Combinator,
    compound: Compound,
}

/// Parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<Step>>,
}

/// Element view used for matching.
pub(crate) trait Subject: Sized {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    /// Parent element; `None` at the top of the tree.
    fn parent(&self) -> Option<Self>;
}

impl Selector {
    /// Parse a selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] for empty input or unsupported syntax.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse()
    }

    pub(crate) fn matches<S: Subject>(&self, subject: &S) -> bool {
        self.alternatives
            .iter()
            .any(|steps| matches_step(steps, steps.len() - 1, subject))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_step<S: Subject>(steps: &[Step], idx: usize, subject: &S) -> bool {
    let step = &steps[idx];
    if !step.compound.matches(subject) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match step.combinator {
        Combinator::Child => subject
            .parent()
            .is_some_and(|parent| matches_step(steps, idx - 1, &parent)),
        Combinator::Descendant => {
            let mut current = subject.parent();
            while let Some(ancestor) = current {
                if matches_step(steps, idx - 1, &ancestor) {
                    return true;
                }
                current = ancestor.parent();
            }
            false
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for (name, op) in &self.attributes {
            match op.operator() {
                None => write!(f, "[{name}]")?,
                Some((operator, value)) => {
                    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[{name}{operator}\"{escaped}\"]")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, steps) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, step) in steps.iter().enumerate() {
                if j > 0 {
                    match step.combinator {
                        Combinator::Descendant => f.write_str(" ")?,
                        Combinator::Child => f.write_str(" > ")?,
                    }
                }
                write!(f, "{}", step.compound)?;
            }
        }
        Ok(())
    }
}

/// Hand-written recursive descent parser over the selector text.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_complex()?);
            match self.peek() {
                None => break,
                Some(',') => self.bump(),
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(Selector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Vec<Step>, SelectorError> {
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;
        self.skip_whitespace();

        loop {
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return match self.peek() {
                    None | Some(',') => Err(SelectorError::Empty(self.input.to_owned())),
                    Some(c) => Err(self.unexpected(c)),
                };
            }
            steps.push(Step {
                combinator,
                compound,
            });

            let had_space = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => return Ok(steps),
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.bump();
            compound.tag = Some("*".to_owned());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => return Ok(compound),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<(String, AttributeOp), SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op: fn(String) -> AttributeOp = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok((name, AttributeOp::Exists));
            }
            Some('=') => {
                self.bump();
                AttributeOp::Equals
            }
            Some(c @ ('^' | '$' | '*' | '~')) => {
                self.bump();
                self.expect('=')?;
                match c {
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    '*' => AttributeOp::Contains,
                    _ => AttributeOp::Includes,
                }
            }
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(self.end()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                self.parse_quoted(quote)?
            }
            Some(_) => self.parse_ident()?,
            None => return Err(self.end()),
        };
        self.skip_whitespace();
        self.expect(']')?;

        Ok((name, op(value)))
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.end()),
                Some('\\') => {
                    self.bump();
                    let Some(escaped) = self.peek() else {
                        return Err(self.end());
                    };
                    value.push(escaped);
                    self.bump();
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if start == self.pos {
            return match self.peek() {
                Some(c) => Err(self.unexpected(c)),
                None => Err(self.end()),
            };
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.unexpected(c)),
            None => Err(self.end()),
        }
    }

    /// Skip whitespace, returning whether any was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.input.to_owned(),
            offset: self.pos,
            found,
        }
    }

    fn end(&self) -> SelectorError {
        SelectorError::UnexpectedEnd(self.input.to_owned())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
