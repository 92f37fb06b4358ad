//! Lexer for the source language's statement/expression grammar (§3a).
//!
//! Single-pass, one rune of lookahead beyond the current character; produces
//! a flat `Vec<Token>` terminated by `TokenKind::Eof`. Does not classify
//! primitive-type keywords (`int`, `uint32`, ...) specially — those are
//! ordinary identifiers until the parser places them in an `r_type` position.

use crate::char_stream::{is_identifier_continue, is_identifier_start, CharStream};
use crate::token::{keyword_kind, Token, TokenKind};
use rtlc_common::{CompileError, CompileResult, Position, Span};

pub struct Lexer<'a> {
    stream: CharStream<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { stream: CharStream::new(input) }
    }

    pub fn tokenize(input: &'a str) -> CompileResult<Vec<Token>> {
        Self::new(input).run()
    }

    fn run(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.stream.position();
            let Some(ch) = self.stream.current() else {
                tokens.push(Token::new(TokenKind::Eof, "", Span::single(start)));
                break;
            };

            let token = if is_identifier_start(ch) {
                self.lex_identifier_or_keyword(start)
            } else if ch.is_ascii_digit() {
                self.lex_number(start)?
            } else if ch == '"' {
                self.lex_string(start)?
            } else {
                self.lex_operator_or_delimiter(start)?
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) {
        loop {
            self.stream.skip_while(|ch| ch.is_whitespace());
            if self.stream.peek(0) == Some('/') && self.stream.peek(1) == Some('/') {
                self.stream.skip_while(|ch| ch != '\n');
                continue;
            }
            if self.stream.peek(0) == Some('/') && self.stream.peek(1) == Some('*') {
                self.stream.advance();
                self.stream.advance();
                while !self.stream.is_at_end() && !(self.stream.peek(0) == Some('*') && self.stream.peek(1) == Some('/')) {
                    self.stream.advance();
                }
                self.stream.advance();
                self.stream.advance();
                continue;
            }
            break;
        }
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.stream.position())
    }

    fn lex_identifier_or_keyword(&mut self, start: Position) -> Token {
        let text = self.stream.advance_while(is_identifier_continue);
        let span = self.span_from(start);
        match keyword_kind(&text) {
            Some(kind) => Token::new(kind, text, span),
            None => Token::new(TokenKind::Identifier, text, span),
        }
    }

    fn lex_number(&mut self, start: Position) -> CompileResult<Token> {
        if self.stream.peek(0) == Some('0') && matches!(self.stream.peek(1), Some('x') | Some('X')) {
            let mut text = String::new();
            text.push(self.stream.advance().unwrap());
            text.push(self.stream.advance().unwrap());
            text.push_str(&self.stream.advance_while(|ch| ch.is_ascii_hexdigit()));
            return Ok(Token::new(TokenKind::HexLiteral, text, self.span_from(start)));
        }

        let mut text = self.stream.advance_while(|ch| ch.is_ascii_digit());
        let mut is_float = false;
        if self.stream.peek(0) == Some('.') && self.stream.peek(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            text.push(self.stream.advance().unwrap());
            text.push_str(&self.stream.advance_while(|ch| ch.is_ascii_digit()));
        }
        let kind = if is_float { TokenKind::FloatLiteral } else { TokenKind::IntLiteral };
        Ok(Token::new(kind, text, self.span_from(start)))
    }

    /// Reads a double-quoted format-string literal for `fmt.Printf`-style
    /// calls. Recognizes `\"` and `\\` so an escaped quote can't terminate
    /// the literal early; every other escape passes through verbatim for
    /// the emitter to copy into the generated `$write` call.
    fn lex_string(&mut self, start: Position) -> CompileResult<Token> {
        let mut text = String::new();
        text.push(self.stream.advance().unwrap()); // opening quote
        loop {
            match self.stream.current() {
                None => return Err(CompileError::syntax("unterminated string literal", self.span_from(start))),
                Some('"') => {
                    text.push(self.stream.advance().unwrap());
                    break;
                }
                Some('\\') => {
                    text.push(self.stream.advance().unwrap());
                    if let Some(escaped) = self.stream.advance() {
                        text.push(escaped);
                    }
                }
                Some(ch) => {
                    text.push(ch);
                    self.stream.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::StringLiteral, text, self.span_from(start)))
    }

    fn lex_operator_or_delimiter(&mut self, start: Position) -> CompileResult<Token> {
        use TokenKind::*;
        let two_char = |s: &mut Self, text: &'static str, kind: TokenKind| -> Option<Token> {
            if s.stream.match_str(text) {
                Some(Token::new(kind, text, s.span_from(start)))
            } else {
                None
            }
        };

        for (text, kind) in [
            (":=", Define),
            ("==", Eq),
            ("!=", Ne),
            ("<=", Le),
            (">=", Ge),
            ("&&", AndAnd),
            ("||", OrOr),
            ("<<", Shl),
            (">>", Shr),
            ("++", PlusPlus),
            ("--", MinusMinus),
            ("<-", Arrow),
        ] {
            if let Some(tok) = two_char(self, text, kind) {
                return Ok(tok);
            }
        }

        let ch = self.stream.advance().unwrap();
        let kind = match ch {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,
            '%' => Percent,
            '=' => Assign,
            '<' => Lt,
            '>' => Gt,
            '&' => Amp,
            '|' => Pipe,
            '^' => Caret,
            '!' => Not,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ';' => Semicolon,
            ',' => Comma,
            ':' => Colon,
            '.' => Dot,
            other => {
                return Err(CompileError::syntax(format!("unrecognized character `{other}`"), self.span_from(start)));
            }
        };
        Ok(Token::new(kind, ch.to_string(), self.span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_a_function_header() {
        assert_eq!(
            kinds("func plusOne(i int) int {"),
            vec![
                TokenKind::Func,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::Identifier,
                TokenKind::LBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_assign_define_and_equal() {
        assert_eq!(kinds("= := =="), vec![TokenKind::Assign, TokenKind::Define, TokenKind::Eq, TokenKind::Eof]);
    }

    #[test]
    fn hex_literal_keeps_the_0x_prefix() {
        let tokens = Lexer::tokenize("0xFFAB").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::HexLiteral);
        assert_eq!(tokens[0].text, "0xFFAB");
    }

    #[test]
    fn skips_line_and_block_comments() {
        assert_eq!(kinds("i // trailing\n+ /* mid */ j"), vec![TokenKind::Identifier, TokenKind::Plus, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn less_than_does_not_swallow_a_following_minus() {
        assert_eq!(kinds("i < -1"), vec![TokenKind::Identifier, TokenKind::Lt, TokenKind::Minus, TokenKind::IntLiteral, TokenKind::Eof]);
    }

    #[test]
    fn channel_send_arrow_is_one_token() {
        assert_eq!(kinds("ch <- 1"), vec![TokenKind::Identifier, TokenKind::Arrow, TokenKind::IntLiteral, TokenKind::Eof]);
    }

    #[test]
    fn rejects_an_unrecognized_character() {
        assert!(Lexer::tokenize("i @ j").is_err());
    }

    #[test]
    fn string_literal_keeps_an_escaped_quote() {
        let tokens = Lexer::tokenize(r#""say \"hi\"""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, r#""say \"hi\"""#);
    }

    #[test]
    fn unterminated_string_literal_is_a_syntax_error() {
        assert!(Lexer::tokenize("\"abc").is_err());
    }
}
