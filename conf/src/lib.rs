use std::error::Error;
use std::fmt;

use crate::lexer::{Token, Tokenizer};

pub mod lexer;

/// One node of a parsed configuration file: either a `name args… ;`
/// directive or a `name args… { … }` block. A bare `{ … }` block is kept
/// with an empty name; the consumer decides what it continues.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Directive {
        name: String,
        args: Vec<String>,
    },
    Block {
        name: String,
        args: Vec<String>,
        children: Vec<Item>,
    },
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Directive { name, .. } | Item::Block { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfError {
    UnexpectedToken(String),
    UnterminatedDirective(String),
    UnterminatedBlock(String),
    UnmatchedClose,
}

impl fmt::Display for ConfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfError::UnexpectedToken(token) => write!(f, "unexpected {}", token),
            ConfError::UnterminatedDirective(name) => {
                write!(f, "directive '{}' is missing its terminating ';'", name)
            }
            ConfError::UnterminatedBlock(name) => {
                write!(f, "block '{}' is missing its closing '}}'", name)
            }
            ConfError::UnmatchedClose => write!(f, "'}}' without a matching '{{'"),
        }
    }
}

impl Error for ConfError {}

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    lookahead: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut tokenizer = Tokenizer::new(source);
        let first = tokenizer.next_token();
        Self {
            tokenizer,
            lookahead: first,
        }
    }

    fn advance(&mut self) {
        self.lookahead = self.tokenizer.next_token();
    }

    pub fn parse(&mut self) -> Result<Vec<Item>, ConfError> {
        let items = self.parse_items()?;
        if self.lookahead == Token::CloseBrace {
            return Err(ConfError::UnmatchedClose);
        }
        Ok(items)
    }

    /// Parses items until EOF or a `}` belonging to the enclosing block.
    fn parse_items(&mut self) -> Result<Vec<Item>, ConfError> {
        let mut items = Vec::new();
        loop {
            match self.lookahead.clone() {
                Token::Eof | Token::CloseBrace => break,
                Token::OpenBrace => {
                    self.advance();
                    items.push(self.finish_block(String::new(), Vec::new())?);
                }
                Token::Semicolon => {
                    return Err(ConfError::UnexpectedToken(self.lookahead.describe()));
                }
                Token::Word(name) => {
                    self.advance();
                    items.push(self.parse_named(name)?);
                }
            }
        }
        Ok(items)
    }

    fn parse_named(&mut self, name: String) -> Result<Item, ConfError> {
        let mut args = Vec::new();
        loop {
            match self.lookahead.clone() {
                Token::Word(arg) => {
                    args.push(arg);
                    self.advance();
                }
                Token::Semicolon => {
                    self.advance();
                    return Ok(Item::Directive { name, args });
                }
                Token::OpenBrace => {
                    self.advance();
                    return self.finish_block(name, args);
                }
                Token::Eof | Token::CloseBrace => {
                    return Err(ConfError::UnterminatedDirective(name));
                }
            }
        }
    }

    fn finish_block(&mut self, name: String, args: Vec<String>) -> Result<Item, ConfError> {
        let children = self.parse_items()?;
        if self.lookahead != Token::CloseBrace {
            return Err(ConfError::UnterminatedBlock(name));
        }
        self.advance();
        Ok(Item::Block {
            name,
            args,
            children,
        })
    }
}

pub fn parse(source: &str) -> Result<Vec<Item>, ConfError> {
    Parser::new(source).parse()
}
