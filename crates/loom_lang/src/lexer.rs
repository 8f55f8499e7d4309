//! Tokenizer for specification source.

use loom_core::{Diagnostic, Position};
use once_cell::sync::Lazy;
use regex::Regex;

static INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").expect("valid regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)([eE][+-]?[0-9]+)?$").expect("valid regex")
});
static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

/// Single-character operators that lex as identifiers
const OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "=", "<", ">", "!"];

/// Token payload
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// Quoted string, escapes resolved
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// `true` / `false`
    Bool(bool),
    /// Identifier or operator
    Ident(String),
}

/// A token and the line it started on
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Payload
    pub kind: TokenKind,
    /// One-based line
    pub line: usize,
}

/// Character-level scanner
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    file: Option<&'a str>,
    errors: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer; `file` is used only for diagnostics
    #[must_use]
    pub fn new(source: &'a str, file: Option<&'a str>) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            file,
            errors: Vec::new(),
        }
    }

    fn pos(&self, line: usize) -> Position {
        let pos = Position::line(line);
        match self.file {
            Some(file) => pos.with_file(file),
            None => pos,
        }
    }

    fn error(&mut self, line: usize, message: impl Into<String>) {
        let diag = Diagnostic::new(message).at(&self.pos(line));
        self.errors.push(diag);
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            let mut ahead = self.chars.clone();
            if ahead.next() == Some('/') && ahead.next() == Some('/') {
                while let Some(ch) = self.bump() {
                    if ch == '\n' {
                        break;
                    }
                }
                continue;
            }
            break;
        }
    }

    fn lex_string(&mut self, line: usize) -> Option<String> {
        let mut out = String::new();
        loop {
            match self.chars.peek().copied() {
                None | Some('\n') => {
                    self.error(line, "literal not terminated");
                    return None;
                }
                Some('"') => {
                    self.bump();
                    return Some(out);
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some(other @ ('"' | '\\')) => out.push(other),
                        Some(other) => {
                            self.error(line, format!("unknown escape sequence: \\{other}"));
                        }
                        None => {
                            self.error(line, "literal not terminated");
                            return None;
                        }
                    }
                }
                Some(ch) => {
                    self.bump();
                    out.push(ch);
                }
            }
        }
    }

    fn lex_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"') {
                break;
            }
            word.push(ch);
            self.bump();
        }
        word
    }

    fn classify(&mut self, word: String, line: usize) -> Option<TokenKind> {
        if INT.is_match(&word) {
            if let Ok(value) = word.parse::<i64>() {
                return Some(TokenKind::Int(value));
            }
        }
        if INT.is_match(&word) || FLOAT.is_match(&word) {
            return match word.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(TokenKind::Float(value)),
                _ => {
                    self.error(line, format!("bad element: {word}"));
                    None
                }
            };
        }
        match word.as_str() {
            "true" => return Some(TokenKind::Bool(true)),
            "false" => return Some(TokenKind::Bool(false)),
            _ => {}
        }
        if OPERATORS.contains(&word.as_str()) || IDENT.is_match(&word) {
            return Some(TokenKind::Ident(word));
        }
        if word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            self.error(line, format!("bad ident name: {word}"));
        } else {
            self.error(line, format!("bad element: {word}"));
        }
        None
    }

    /// Scan the whole input.
    ///
    /// # Errors
    ///
    /// Returns every scanner error, in source order.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Diagnostic>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws_and_comments();
            let line = self.line;
            let Some(&ch) = self.chars.peek() else {
                break;
            };
            let kind = match ch {
                '(' => {
                    self.bump();
                    Some(TokenKind::LParen)
                }
                ')' => {
                    self.bump();
                    Some(TokenKind::RParen)
                }
                '"' => {
                    self.bump();
                    self.lex_string(line).map(TokenKind::Str)
                }
                _ => {
                    let word = self.lex_word();
                    self.classify(word, line)
                }
            };
            if let Some(kind) = kind {
                tokens.push(Token { kind, line });
            }
        }

        if self.errors.is_empty() {
            Ok(tokens)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, None)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_atoms() {
        assert_eq!(
            kinds("(+ 1 -2 1.5 \"a b\" true math.Square)"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident("+".into()),
                TokenKind::Int(1),
                TokenKind::Int(-2),
                TokenKind::Float(1.5),
                TokenKind::Str("a b".into()),
                TokenKind::Bool(true),
                TokenKind::Ident("math.Square".into()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = Lexer::new("// header\n(a)\n  // trailing\n(b)", None)
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n""#),
            vec![TokenKind::Str("say \"hi\"\n".into())]
        );
    }

    #[test]
    fn test_number_edges() {
        assert_eq!(
            kinds("-9223372036854775808 99999999999999999999 -0.0"),
            vec![
                TokenKind::Int(i64::MIN),
                TokenKind::Float(1e20),
                TokenKind::Float(-0.0),
            ]
        );
        let errs = Lexer::new("1e400", None).tokenize().unwrap_err();
        assert_eq!(errs[0].to_string(), "1: bad element: 1e400");
    }

    #[test]
    fn test_errors_collected() {
        let errs = Lexer::new("(a \"open\n(b $ a..b)", None).tokenize().unwrap_err();
        let messages: Vec<String> = errs.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "1: literal not terminated",
                "2: bad element: $",
                "2: bad ident name: a..b",
            ]
        );
    }
}
