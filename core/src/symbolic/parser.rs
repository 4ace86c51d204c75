//! Expression parser for kinematic equations.
//!
//! Supports:
//! - Numbers (integers, floats, scientific notation)
//! - Symbols (`th_1`, `l_2`, `r_11`, `px`...)
//! - Arithmetic operators (+, -, *, /, ^)
//! - Parentheses for grouping
//! - Functions (sin, cos, tan, asin, acos, atan, atan2, sqrt, abs)
//! - The constant `pi`

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use super::expr::{BinaryOperator, Constant, Expr, Function, UnaryOperator};

/// Parse error with location info
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let pos = self.position;

        let Some(&c) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        if c.is_ascii_digit() || c == '.' {
            self.read_number()
        } else if c.is_ascii_alphabetic() || c == '_' {
            Ok(Token::Identifier(self.read_identifier()))
        } else {
            Err(ParseError {
                message: format!("Unexpected character: '{}'", c),
                position: pos,
            })
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.position += 1;
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, ParseError> {
        let pos = self.position;
        let mut num_str = String::new();
        let mut has_dot = false;

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // Scientific notation (1e10, 1.5e-3)
        if let Some(&c) = self.chars.peek() {
            if c == 'e' || c == 'E' {
                num_str.push(c);
                self.advance();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        num_str.push(sign);
                        self.advance();
                    }
                }
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        num_str.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        num_str.parse::<f64>().map(Token::Number).map_err(|_| ParseError {
            message: format!("Invalid number: '{}'", num_str),
            position: pos,
        })
    }

    fn read_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.lexer.position,
        }
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_additive()?;
        if self.current != Token::Eof {
            return Err(self.error(format!(
                "Unexpected token after expression: {:?}",
                self.current
            )));
        }
        Ok(expr)
    }

    // Additive: term (('+' | '-') term)*
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    // Multiplicative: power (('*' | '/') power)*
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;

        loop {
            let op = match &self.current {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_power()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    // Power: unary ('^' power)?  (right associative)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;

        if self.current == Token::Caret {
            self.advance()?;
            let exp = self.parse_power()?;
            Ok(Expr::binary(BinaryOperator::Pow, base, exp))
        } else {
            Ok(base)
        }
    }

    // Unary: '-' unary | primary
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.current == Token::Minus {
            self.advance()?;
            let operand = self.parse_unary()?;
            // Negative literals stay literals so printed numbers read back unchanged
            Ok(match operand {
                Expr::Number(n) => Expr::Number(-n),
                other => Expr::UnaryOp {
                    op: UnaryOperator::Neg,
                    operand: Box::new(other),
                },
            })
        } else {
            self.parse_primary()
        }
    }

    // Primary: number | symbol | constant | function_call | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match &self.current {
            Token::Number(n) => {
                let val = *n;
                self.advance()?;
                Ok(Expr::Number(val))
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;

                if self.current == Token::LParen {
                    let func = Function::from_name(&name)
                        .ok_or_else(|| self.error(format!("Unknown function: '{}'", name)))?;
                    self.advance()?; // consume '('
                    let args = self.parse_arguments()?;
                    if args.len() != func.arity() {
                        return Err(self.error(format!(
                            "{}() takes {} argument(s), got {}",
                            func.name(),
                            func.arity(),
                            args.len()
                        )));
                    }
                    return Ok(Expr::FnCall { func, args });
                }

                match name.as_str() {
                    "pi" | "PI" => Ok(Expr::Constant(Constant::Pi)),
                    _ => Ok(Expr::Symbol(name)),
                }
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_additive()?;
                if self.current != Token::RParen {
                    return Err(self.error("Expected ')'"));
                }
                self.advance()?;
                Ok(expr)
            }
            _ => Err(self.error(format!("Unexpected token: {:?}", self.current))),
        }
    }

    // Arguments: expr (',' expr)* ')'
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![self.parse_additive()?];
        while self.current == Token::Comma {
            self.advance()?;
            args.push(self.parse_additive()?);
        }
        if self.current != Token::RParen {
            return Err(self.error("Expected ')' after function arguments"));
        }
        self.advance()?; // consume ')'
        Ok(args)
    }
}

/// Parse an expression string into an AST
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError {
            message: "Empty expression".to_string(),
            position: 0,
        });
    }
    let mut parser = Parser::new(input)?;
    parser.parse()
}
