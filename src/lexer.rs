use thiserror::Error;

use crate::token::{self, Kind, Position, Token};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unknown token: {character} (at {position})")]
    IllegalCharacter { character: char, position: Position },
    #[error("unterminated string (at {position})")]
    UnterminatedString { position: Position },
}

pub type LexResult<T> = Result<T, LexError>;

/// Character-stream scanner producing a token sequence terminated by `Eof`.
///
/// The scanner never aborts: an illegal character or an unterminated string
/// yields an `Illegal` token carrying the diagnostic, and scanning resumes at
/// the next character. The recorded diagnostics are surfaced by `tokenize`.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    errors: Vec<LexError>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
            finished: false,
        }
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.current_position();
        let ch = match self.peek_char() {
            Some(ch) => ch,
            None => {
                self.finished = true;
                return Token::new(Kind::Eof, "", position);
            }
        };

        match ch {
            '=' => self.one_or_two_char_token(Kind::Assign, '=', Kind::Equal, position),
            '!' => self.one_or_two_char_token(Kind::Bang, '=', Kind::NotEqual, position),
            '<' => self.one_or_two_char_token(Kind::Less, '=', Kind::LessEqual, position),
            '>' => self.one_or_two_char_token(Kind::Greater, '=', Kind::GreaterEqual, position),
            '+' => self.single_char_token(Kind::Plus, position),
            '-' => self.single_char_token(Kind::Minus, position),
            '*' => self.single_char_token(Kind::Asterisk, position),
            '/' => self.single_char_token(Kind::Slash, position),
            ',' => self.single_char_token(Kind::Comma, position),
            ';' => self.single_char_token(Kind::Semicolon, position),
            '.' => self.single_char_token(Kind::Dot, position),
            '(' => self.single_char_token(Kind::LeftParen, position),
            ')' => self.single_char_token(Kind::RightParen, position),
            '{' => self.single_char_token(Kind::LeftBrace, position),
            '}' => self.single_char_token(Kind::RightBrace, position),
            '[' => self.single_char_token(Kind::LeftBracket, position),
            ']' => self.single_char_token(Kind::RightBracket, position),
            '"' => self.read_string(position),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(position),
            c if c.is_ascii_digit() => self.read_number(position),
            c => {
                self.consume_char();
                self.errors.push(LexError::IllegalCharacter {
                    character: c,
                    position,
                });
                Token::new(Kind::Illegal, c.to_string(), position)
            }
        }
    }

    fn single_char_token(&mut self, kind: Kind, position: Position) -> Token {
        let start = self.pos;
        self.consume_char();
        Token::new(kind, &self.input[start..self.pos], position)
    }

    fn one_or_two_char_token(
        &mut self,
        single: Kind,
        second: char,
        double: Kind,
        position: Position,
    ) -> Token {
        let start = self.pos;
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            Token::new(double, &self.input[start..self.pos], position)
        } else {
            Token::new(single, &self.input[start..self.pos], position)
        }
    }

    fn read_identifier(&mut self, position: Position) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_alphanumeric() || c == '_');
        let literal = &self.input[start..self.pos];
        Token::new(token::lookup_identifier(literal), literal, position)
    }

    /// One or more digits with an optional fraction. A dot not followed by a
    /// digit is left in place and lexes as its own token.
    fn read_number(&mut self, position: Position) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());

        if self.peek_char() == Some('.') && self.peek_next_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.consume_char();
            self.consume_while(|c| c.is_ascii_digit());
        }

        Token::new(Kind::Number, &self.input[start..self.pos], position)
    }

    /// Strings are delimited by `"` with no escape processing; they may span
    /// newlines. A missing closing quote consumes the rest of the input.
    fn read_string(&mut self, position: Position) -> Token {
        self.consume_char();
        let content_start = self.pos;
        self.consume_while(|c| c != '"');

        match self.peek_char() {
            Some('"') => {
                let literal = &self.input[content_start..self.pos];
                let token = Token::new(Kind::String, literal, position);
                self.consume_char();
                token
            }
            _ => {
                self.errors.push(LexError::UnterminatedString { position });
                Token::new(Kind::Illegal, "unterminated string", position)
            }
        }
    }

    fn skip_whitespace(&mut self) {
        self.consume_while(|c| c.is_whitespace());
    }

    fn consume_while<P>(&mut self, keep: P)
    where
        P: Fn(char) -> bool,
    {
        while let Some(c) = self.peek_char() {
            if !keep(c) {
                break;
            }
            self.consume_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        Some(self.next_token())
    }
}

/// Scans the whole input. The token sequence always ends with `Eof`; the
/// first illegal lexeme, if any, is reported as the scan's error after the
/// stream has been fully consumed.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    match lexer.errors().first() {
        Some(error) => Err(error.clone()),
        None => Ok(tokens),
    }
}
