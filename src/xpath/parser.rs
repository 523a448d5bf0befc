//! XPath Parser
//!
//! Recursive descent parser for the supported XPath 1.0 subset. Abbreviations
//! are expanded here: `//` becomes `descendant-or-self::node()`, `.` and `..`
//! become `self::node()` and `parent::node()`, `@` the attribute axis.

use super::lexer::{tokenize, Token};
use crate::error::XPathError;

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Arithmetic(Box<Expr>, ArithmeticOp, Box<Expr>),
    /// Unary minus
    Negate(Box<Expr>),
    /// Union of two node-sets (|)
    Union(Box<Expr>, Box<Expr>),
    Number(f64),
    Literal(String),
    FunctionCall(String, Vec<Expr>),
    Path(LocationPath),
    /// Primary expression with predicates, optionally followed by a path
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Same comparison with the operands swapped
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
            op => op,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn abbreviated(axis: Axis) -> Self {
        Step {
            axis,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// Supported axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Result<Self, XPathError> {
        Ok(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfAxis,
            "attribute" => Axis::Attribute,
            "following" | "preceding" | "namespace" => {
                return Err(XPathError::Syntax(format!("unsupported axis: {name}")))
            }
            _ => return Err(XPathError::Syntax(format!("unknown axis: {name}"))),
        })
    }

    /// Reverse axes number their nodes nearest first
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*`
    Any,
    /// `local` or `prefix:local`
    Name { prefix: Option<String>, local: String },
    /// `prefix:*`
    PrefixWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

/// XPath parser over a token stream
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, XPathError> {
        Ok(Parser {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    /// Parse a complete expression
    pub fn parse(mut self) -> Result<Expr, XPathError> {
        if self.peek() == &Token::Eof {
            return Err(XPathError::Syntax("empty expression".to_string()));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            Token::Eof => Ok(expr),
            other => Err(XPathError::Syntax(format!("unexpected token {other:?}"))),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(XPathError::Syntax(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => CompareOp::Eq,
                Token::NotEq => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => CompareOp::Lt,
                Token::LtEq => CompareOp::LtEq,
                Token::Gt => CompareOp::Gt,
                Token::GtEq => CompareOp::GtEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => ArithmeticOp::Add,
                Token::Minus => ArithmeticOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Multiply => ArithmeticOp::Mul,
                Token::Div => ArithmeticOp::Div,
                Token::Mod => ArithmeticOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arithmetic(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_path()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Token::Slash => {
                self.advance();
                let steps = if self.starts_step() {
                    self.parse_relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            Token::DoubleSlash => {
                self.advance();
                let mut steps = vec![Step::abbreviated(Axis::DescendantOrSelf)];
                steps.extend(self.parse_relative_steps()?);
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            Token::Dollar | Token::LeftParen | Token::Literal(_) | Token::Number(_) | Token::FunctionName(_) => {
                self.parse_filter()
            }
            _ => Ok(Expr::Path(LocationPath {
                absolute: false,
                steps: self.parse_relative_steps()?,
            })),
        }
    }

    fn parse_filter(&mut self) -> Result<Expr, XPathError> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        match self.peek() {
            Token::Slash => {
                self.advance();
                steps = self.parse_relative_steps()?;
            }
            Token::DoubleSlash => {
                self.advance();
                steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                steps.extend(self.parse_relative_steps()?);
            }
            _ => {}
        }
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        match self.advance() {
            Token::Dollar => match self.advance() {
                Token::Name(name) => Err(XPathError::Variable(name)),
                other => Err(XPathError::Syntax(format!(
                    "expected variable name, found {other:?}"
                ))),
            },
            Token::LeftParen => {
                let inner = self.parse_or()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Token::Literal(s) => Ok(Expr::Literal(s)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::FunctionName(name) => {
                self.expect(&Token::LeftParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RightParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::RightParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::FunctionCall(name, args))
            }
            other => Err(XPathError::Syntax(format!("unexpected token {other:?}"))),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Token::Dot
                | Token::DoubleDot
                | Token::At
                | Token::Star
                | Token::Name(_)
                | Token::PrefixWildcard(_)
                | Token::NodeType(_)
                | Token::Axis(_)
        )
    }

    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Token::Slash => {
                    self.advance();
                }
                Token::DoubleSlash => {
                    self.advance();
                    steps.push(Step::abbreviated(Axis::DescendantOrSelf));
                }
                _ => return Ok(steps),
            }
            steps.push(self.parse_step()?);
        }
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step::abbreviated(Axis::SelfAxis));
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step::abbreviated(Axis::Parent));
        }

        let axis = match self.peek() {
            Token::At => {
                self.advance();
                Axis::Attribute
            }
            Token::Axis(name) => {
                let axis = Axis::from_name(name)?;
                self.advance();
                axis
            }
            _ => Axis::Child,
        };
        let node_test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.advance() {
            Token::Star => Ok(NodeTest::Any),
            Token::PrefixWildcard(prefix) => Ok(NodeTest::PrefixWildcard(prefix)),
            Token::Name(qname) => Ok(match qname.split_once(':') {
                Some((prefix, local)) => NodeTest::Name {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                },
                None => NodeTest::Name {
                    prefix: None,
                    local: qname,
                },
            }),
            Token::NodeType(kind) => {
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek() {
                        Token::Literal(target) => {
                            let target = target.clone();
                            self.advance();
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            other => Err(XPathError::Syntax(format!(
                "expected node test, found {other:?}"
            ))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }
}

/// Parse an XPath expression into its AST
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    Parser::new(input)?.parse()
}
