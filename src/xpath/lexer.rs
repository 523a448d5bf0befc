//! XPath Lexer
//!
//! Tokenizes XPath expressions. `*` and the operator names (`and`, `or`,
//! `mod`, `div`) are read as operators only when the previous token ends an
//! operand, as XPath 1.0 section 3.7 requires.

use crate::error::XPathError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Path operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |

    // Arithmetic and comparison
    Plus,     // +
    Minus,    // -
    Multiply, // * after an operand
    Eq,       // =
    NotEq,    // !=
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    And,      // and
    Or,       // or
    Mod,      // mod
    Div,      // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Dollar,       // $

    // Literals
    Number(f64),
    Literal(String),

    // Names
    Star,                  // * as a name test
    Name(String),          // NCName or prefix:local
    PrefixWildcard(String), // prefix:*
    FunctionName(String),  // name followed by (
    NodeType(String),      // node, text, comment, processing-instruction
    Axis(String),          // axis name, `::` consumed

    Eof,
}

impl Token {
    /// True when an operand must follow this token
    fn expects_operand(&self) -> bool {
        matches!(
            self,
            Token::At
                | Token::Axis(_)
                | Token::LeftParen
                | Token::LeftBracket
                | Token::Comma
                | Token::Dollar
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole expression; the result always ends with `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, XPathError> {
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            let token = self.next_token()?;
            self.tokens.push(token);
        }
        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.remaining().trim_start_matches(is_xpath_whitespace);
        self.pos = self.input.len() - rest.len();
    }

    /// Operator context: the previous token closed an operand
    fn operator_expected(&self) -> bool {
        self.tokens.last().is_some_and(|t| !t.expects_operand())
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn double(&mut self, token: Token) -> Token {
        self.pos += 2;
        token
    }

    fn next_token(&mut self) -> Result<Token, XPathError> {
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };
        let token = match c {
            '/' if self.peek_at(1) == Some('/') => self.double(Token::DoubleSlash),
            '/' => self.single(Token::Slash),
            '.' => match self.peek_at(1) {
                Some('.') => self.double(Token::DoubleDot),
                Some(d) if d.is_ascii_digit() => self.read_number(),
                _ => self.single(Token::Dot),
            },
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '=' => self.single(Token::Eq),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            '*' if self.operator_expected() => self.single(Token::Multiply),
            '*' => self.single(Token::Star),
            '!' if self.peek_at(1) == Some('=') => self.double(Token::NotEq),
            '<' if self.peek_at(1) == Some('=') => self.double(Token::LtEq),
            '<' => self.single(Token::Lt),
            '>' if self.peek_at(1) == Some('=') => self.double(Token::GtEq),
            '>' => self.single(Token::Gt),
            '"' | '\'' => self.read_literal(c)?,
            d if d.is_ascii_digit() => self.read_number(),
            c if is_name_start(c) => self.read_name()?,
            other => {
                return Err(XPathError::Syntax(format!(
                    "unexpected character '{other}' at offset {}",
                    self.pos
                )))
            }
        };
        Ok(token)
    }

    /// Digits ('.' Digits?)? | '.' Digits
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;
        for (i, c) in self.remaining().char_indices() {
            match c {
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => {
                    self.pos = start + i;
                    return Token::Number(self.input[start..self.pos].parse().unwrap_or(f64::NAN));
                }
            }
        }
        self.pos = self.input.len();
        Token::Number(self.input[start..].parse().unwrap_or(f64::NAN))
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let body = &self.remaining()[1..];
        match body.find(quote) {
            Some(end) => {
                let literal = body[..end].to_string();
                self.pos += end + 2;
                Ok(Token::Literal(literal))
            }
            None => Err(XPathError::Syntax(format!(
                "unterminated string literal at offset {}",
                self.pos
            ))),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .char_indices()
            .find(|&(i, c)| !(if i == 0 { is_name_start(c) } else { is_name_char(c) }))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        &rest[..end]
    }

    fn read_name(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        let name = self.read_ncname();

        if self.operator_expected() {
            return match name {
                "and" => Ok(Token::And),
                "or" => Ok(Token::Or),
                "mod" => Ok(Token::Mod),
                "div" => Ok(Token::Div),
                _ => Err(XPathError::Syntax(format!(
                    "expected operator, found '{name}' at offset {start}"
                ))),
            };
        }

        let after_ws = self.remaining().trim_start_matches(is_xpath_whitespace);
        if let Some(rest) = after_ws.strip_prefix("::") {
            self.pos = self.input.len() - rest.len();
            return Ok(Token::Axis(name.to_string()));
        }

        let mut qname = name.to_string();
        if self.peek() == Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.pos += 2;
                    return Ok(Token::PrefixWildcard(name.to_string()));
                }
                Some(c) if is_name_start(c) => {
                    self.pos += 1;
                    let local = self.read_ncname();
                    qname = format!("{name}:{local}");
                }
                _ => {
                    return Err(XPathError::Syntax(format!(
                        "malformed qualified name at offset {start}"
                    )))
                }
            }
        }

        let after_ws = self.remaining().trim_start_matches(is_xpath_whitespace);
        if after_ws.starts_with('(') {
            return Ok(match qname.as_str() {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(qname),
                _ => Token::FunctionName(qname),
            });
        }
        Ok(Token::Name(qname))
    }
}

/// Tokenize an expression
pub fn tokenize(input: &str) -> Result<Vec<Token>, XPathError> {
    Lexer::new(input).tokenize()
}

fn is_xpath_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_path() {
        let tokens = tokenize("//atom:link[@rel='self']/@href").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::DoubleSlash,
                Token::Name("atom:link".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("rel".to_string()),
                Token::Eq,
                Token::Literal("self".to_string()),
                Token::RightBracket,
                Token::Slash,
                Token::At,
                Token::Name("href".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_star_disambiguation() {
        let tokens = tokenize("* * 2").unwrap();
        assert_eq!(tokens[..3], [Token::Star, Token::Multiply, Token::Number(2.0)]);

        let tokens = tokenize("cmis:*").unwrap();
        assert_eq!(tokens[0], Token::PrefixWildcard("cmis".to_string()));

        let tokens = tokenize("@*").unwrap();
        assert_eq!(tokens[..2], [Token::At, Token::Star]);
    }

    #[test]
    fn test_operator_names() {
        let tokens = tokenize("div div div").unwrap();
        assert_eq!(
            tokens[..3],
            [
                Token::Name("div".to_string()),
                Token::Div,
                Token::Name("div".to_string())
            ]
        );

        let tokens = tokenize("count(a) mod 2 = 0 and true()").unwrap();
        assert!(tokens.contains(&Token::Mod));
        assert!(tokens.contains(&Token::And));
        assert!(tokens.contains(&Token::FunctionName("true".to_string())));
    }

    #[test]
    fn test_axes_and_node_types() {
        let tokens = tokenize("ancestor-or-self :: node()").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Axis("ancestor-or-self".to_string()),
                Token::NodeType("node".to_string()),
                Token::LeftParen,
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_dots() {
        let tokens = tokenize("../. 1.5 .25 3.").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::DoubleDot,
                Token::Slash,
                Token::Dot,
                Token::Number(1.5),
                Token::Number(0.25),
                Token::Number(3.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comparisons() {
        let tokens = tokenize("a!=b<=c>=d<e>f").unwrap();
        assert!(tokens.contains(&Token::NotEq));
        assert!(tokens.contains(&Token::LtEq));
        assert!(tokens.contains(&Token::GtEq));
        assert!(tokens.contains(&Token::Lt));
        assert!(tokens.contains(&Token::Gt));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("'open"), Err(XPathError::Syntax(_))));
        assert!(matches!(tokenize("a # b"), Err(XPathError::Syntax(_))));
        assert!(matches!(tokenize("a b"), Err(XPathError::Syntax(_))));
        assert!(matches!(tokenize("a:"), Err(XPathError::Syntax(_))));
        assert!(matches!(tokenize("a ! b"), Err(XPathError::Syntax(_))));
    }
}
