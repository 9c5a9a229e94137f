//! Lexer for the shading language.
//!
//! The lexer converts source text into a stream of tokens. It stands in for
//! the preprocessor as far as positions go: `#line N "file"` directives
//! remap the logical `(file, line)` stamped on later tokens, and every other
//! directive line is skipped with a warning.

use crate::frontend::token::{Token, TokenKind, TokenValue};
use crate::utils::location::{Span, SourceLocation, SourcePos};
use crate::utils::errors::{LexerError, LexerErrorKind};
use unicode_xid::UnicodeXID;
use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;

/// A lexer for tokenizing source code.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Logical file name reported for tokens
    file: Rc<str>,
    /// Added to the physical line to get the logical line (`#line`)
    line_delta: isize,
    /// Skipped directives, reported as warnings by the parser
    warnings: Vec<(SourcePos, String)>,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str, filename: &str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            file: Rc::from(filename),
            line_delta: 0,
            warnings: Vec::new(),
            at_eof: false,
        }
    }

    /// The logical position of the current character.
    pub fn position(&self) -> SourcePos {
        let line = (self.line as isize + self.line_delta).max(0) as usize;
        SourcePos::new(Rc::clone(&self.file), line)
    }

    /// Drain warnings collected while skipping directives.
    pub fn take_warnings(&mut self) -> Vec<(SourcePos, String)> {
        std::mem::take(&mut self.warnings)
    }

    /// Get the current location.
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    /// Create a span from token start to current location.
    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    /// Peek at the current character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the next character (one ahead).
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    /// Consume and return the current character.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Whether only whitespace precedes the current position on this line.
    fn at_line_start(&self) -> bool {
        self.source[..self.offset]
            .rsplit('\n')
            .next()
            .map(|prefix| prefix.trim().is_empty())
            .unwrap_or(true)
    }

    /// Skip whitespace, comments and directive lines.
    fn skip_whitespace(&mut self) -> Result<(), LexerError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('#') if self.at_line_start() => {
                    self.directive()?;
                }
                Some('/') => {
                    if self.peek_next() == Some('/') {
                        // Line comment
                        while self.peek().is_some() && self.peek() != Some('\n') {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        // Block comment; these do not nest.
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some('*') if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                None => break,
                                _ => {}
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Handle one `#...` line.
    fn directive(&mut self) -> Result<(), LexerError> {
        self.mark_token_start();
        let pos = self.position();
        let source = self.source;
        let start = self.offset;
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
        }
        let text = source[start..self.offset].trim_start_matches('#').trim();
        let mut words = text.split_whitespace();
        match words.next() {
            Some("line") => {
                let number: usize = words
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| self.make_error("Malformed #line directive", LexerErrorKind::BadDirective))?;
                if let Some(name) = words.next() {
                    let name = name.trim_matches('"');
                    self.file = Rc::from(name);
                }
                // The line after the directive is `number`.
                self.line_delta = number as isize - (self.line as isize + 1);
            }
            Some("pragma") => {}
            _ => {
                self.warnings.push((pos, format!("Preprocessor directive ignored: #{}", text)));
            }
        }
        Ok(())
    }

    /// Create a token with the given kind.
    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        let line = (span.start_line as isize + self.line_delta).max(0) as usize;
        Token::new(kind, span, lexeme, SourcePos::new(Rc::clone(&self.file), line))
    }

    /// Create an error.
    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    fn eat_digits(&mut self, radix: u32) {
        while self.peek().map(|c| c.is_digit(radix)).unwrap_or(false) {
            self.advance();
        }
    }

    /// Scan a number literal. `first` has already been consumed.
    fn scan_number(&mut self, first: char) -> Result<Token, LexerError> {
        let digits_start = self.offset - first.len_utf8();

        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let hex_start = self.offset;
            self.eat_digits(16);
            let digits = &self.source[hex_start..self.offset];
            let value = u64::from_str_radix(digits, 16)
                .map_err(|_| self.make_error("Invalid hexadecimal literal", LexerErrorKind::InvalidNumber))?;
            while matches!(self.peek(), Some('u') | Some('U') | Some('l') | Some('L')) {
                self.advance();
            }
            return Ok(self.make_token(TokenKind::Integer).with_value(TokenValue::Int(value as i64)));
        }

        let mut is_float = first == '.';
        self.eat_digits(10);

        // Check for decimal point; "1." is a valid float literal.
        if !is_float && self.peek() == Some('.') {
            let after = self.peek_next();
            let swizzle_follows = after
                .map(|c| c.is_xid_start() && !matches!(c, 'e' | 'E' | 'f' | 'F' | 'h' | 'H'))
                .unwrap_or(false);
            if !swizzle_follows {
                is_float = true;
                self.advance();
                self.eat_digits(10);
            }
        }

        // Exponent (can appear with or without decimal point)
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if !self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return Err(self.make_error(
                    "Invalid floating-point exponent",
                    LexerErrorKind::InvalidNumber,
                ));
            }
            self.eat_digits(10);
        }

        let digits_end = self.offset;
        let text = &self.source[digits_start..digits_end];

        if matches!(self.peek(), Some('f') | Some('F') | Some('h') | Some('H')) {
            is_float = true;
            self.advance();
        } else if matches!(self.peek(), Some('l') | Some('L')) {
            self.advance();
        } else if !is_float && matches!(self.peek(), Some('u') | Some('U')) {
            self.advance();
        }

        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.make_error("Invalid float literal", LexerErrorKind::InvalidNumber))?;
            Ok(self.make_token(TokenKind::Float).with_value(TokenValue::Float(value)))
        } else {
            let value = if text.len() > 1 && text.starts_with('0') {
                u64::from_str_radix(&text[1..], 8)
            } else {
                text.parse::<u64>()
            }
            .map_err(|_| self.make_error("Invalid integer literal", LexerErrorKind::InvalidNumber))?;
            Ok(self.make_token(TokenKind::Integer).with_value(TokenValue::Int(value as i64)))
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().map(|c| c.is_xid_continue() || c == '_').unwrap_or(false) {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    /// Scan a string literal.
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        // Opening quote already consumed
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(self.make_error(
                            "Unterminated string literal",
                            LexerErrorKind::UnterminatedString,
                        ));
                    }
                }
                Some('\n') => {
                    return Err(self.make_error(
                        "Unterminated string literal (newline in string)",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
                Some(_) => {}
                None => {
                    return Err(self.make_error(
                        "Unterminated string literal",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
            }
        }

        Ok(self.make_token(TokenKind::String))
    }

    /// Pick between `op`, `op=` and (optionally) `opop`/`opop=` forms.
    fn operator(
        &mut self,
        c: char,
        single: TokenKind,
        assign: TokenKind,
        double: Option<(TokenKind, Option<TokenKind>)>,
    ) -> Token {
        if let Some((twice, twice_assign)) = double {
            if self.match_char(c) {
                if let Some(twice_assign) = twice_assign {
                    if self.match_char('=') {
                        return self.make_token(twice_assign);
                    }
                }
                return self.make_token(twice);
            }
        }
        if self.match_char('=') {
            self.make_token(assign)
        } else {
            self.make_token(single)
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace()?;
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        use TokenKind as K;
        let token = match c {
            // Single-character tokens
            '(' => self.make_token(K::LeftParen),
            ')' => self.make_token(K::RightParen),
            '[' => self.make_token(K::LeftBracket),
            ']' => self.make_token(K::RightBracket),
            '{' => self.make_token(K::LeftBrace),
            '}' => self.make_token(K::RightBrace),
            ',' => self.make_token(K::Comma),
            ';' => self.make_token(K::Semicolon),
            ':' => self.make_token(K::Colon),
            '?' => self.make_token(K::Question),
            '~' => self.make_token(K::Tilde),
            '.' => {
                if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    return self.scan_number('.');
                }
                self.make_token(K::Dot)
            }

            // Operators (potentially multi-character)
            '+' => self.operator('+', K::Plus, K::PlusEqual, Some((K::PlusPlus, None))),
            '-' => self.operator('-', K::Minus, K::MinusEqual, Some((K::MinusMinus, None))),
            '*' => self.operator('*', K::Star, K::StarEqual, None),
            '/' => self.operator('/', K::Slash, K::SlashEqual, None),
            '%' => self.operator('%', K::Percent, K::PercentEqual, None),
            '^' => self.operator('^', K::Caret, K::CaretEqual, None),
            '=' => self.operator('=', K::Equal, K::EqualEqual, None),
            '!' => self.operator('!', K::Bang, K::BangEqual, None),
            '&' => self.operator('&', K::Amp, K::AmpEqual, Some((K::AmpAmp, None))),
            '|' => self.operator('|', K::Pipe, K::PipeEqual, Some((K::PipePipe, None))),
            '<' => self.operator('<', K::Less, K::LessEqual, Some((K::LessLess, Some(K::LessLessEqual)))),
            '>' => self.operator(
                '>',
                K::Greater,
                K::GreaterEqual,
                Some((K::GreaterGreater, Some(K::GreaterGreaterEqual))),
            ),

            // String literals
            '"' => return self.scan_string(),

            // Numbers
            c if c.is_ascii_digit() => return self.scan_number(c),

            // Identifiers and keywords
            c if c.is_xid_start() || c == '_' => self.scan_identifier(),

            // Unknown character
            _ => {
                return Err(self.make_error(
                    &format!("Unexpected character: '{}'", c),
                    LexerErrorKind::UnexpectedChar,
                ))
            }
        };
        Ok(token)
    }

    /// Check if we've reached EOF.
    pub fn is_at_end(&self) -> bool {
        self.at_eof
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}
