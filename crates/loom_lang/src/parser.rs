//! S-expression parser.

use crate::ast::Expr;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use loom_core::{Diagnostic, Position};

/// Deepest parenthesis nesting accepted in source
pub const MAX_NESTING: usize = 64;

/// Parse source text into its top-level forms.
///
/// `file` only decorates positions for diagnostics.
///
/// # Errors
///
/// Returns the scanner errors (joined by newlines when there are several),
/// an `unbalanced Parenthesis` error at the offending line, or `nesting too
/// deep` past [`MAX_NESTING`] open forms.
pub fn parse(source: &str, file: Option<&str>) -> Result<Vec<Expr>, ParseError> {
    let tokens = Lexer::new(source, file).tokenize().map_err(join_errors)?;
    let position = |line: usize| {
        let pos = Position::line(line);
        match file {
            Some(file) => pos.with_file(file),
            None => pos,
        }
    };

    // Open forms, innermost last.
    let mut stack: Vec<(Vec<Expr>, Position)> = Vec::new();
    let mut forms = Vec::new();

    for Token { kind, line } in tokens {
        let expr = match kind {
            TokenKind::LParen => {
                if stack.len() == MAX_NESTING {
                    return Err(ParseError::at("nesting too deep", &position(line)));
                }
                stack.push((Vec::new(), position(line)));
                continue;
            }
            TokenKind::RParen => match stack.pop() {
                Some((items, pos)) => Expr::Sexp { items, pos },
                None => {
                    return Err(ParseError::at("unbalanced Parenthesis", &position(line)));
                }
            },
            TokenKind::Str(s) => Expr::Str(s),
            TokenKind::Int(i) => Expr::Int(i),
            TokenKind::Float(x) => Expr::Float(x),
            TokenKind::Bool(b) => Expr::Bool(b),
            TokenKind::Ident(name) => Expr::Ident(name),
        };
        match stack.last_mut() {
            Some((items, _)) => items.push(expr),
            None => forms.push(expr),
        }
    }

    if let Some((_, pos)) = stack.pop() {
        return Err(ParseError::at("unbalanced Parenthesis", &pos));
    }
    Ok(forms)
}

fn join_errors(errors: Vec<Diagnostic>) -> ParseError {
    match <[Diagnostic; 1]>::try_from(errors) {
        Ok([only]) => ParseError(only),
        Err(errors) => {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ParseError(Diagnostic::new(joined.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(src: &str) -> String {
        parse(src, None)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_nested_forms() {
        assert_eq!(render("(a (b c) 1)\n\"x\""), "(a (b c) 1)\n\"x\"");
        assert_eq!(render("()"), "()");
        assert!(parse("", None).unwrap().is_empty());
    }

    #[test]
    fn test_positions() {
        let forms = parse("\n\n(a\n (b))", Some("f.spec")).unwrap();
        let Expr::Sexp { items, pos } = &forms[0] else {
            panic!("expected sexp");
        };
        assert_eq!(pos.to_string(), "f.spec:3");
        assert_eq!(items[1].pos().unwrap().line, 4);
    }

    #[test]
    fn test_unbalanced() {
        assert_eq!(
            parse("(a))", None).unwrap_err().to_string(),
            "1: unbalanced Parenthesis"
        );
        assert_eq!(
            parse("(a)\n\n(b (c)", Some("paren.spec")).unwrap_err().to_string(),
            "paren.spec:3: unbalanced Parenthesis"
        );
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "(list ".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&nested(MAX_NESTING), None).unwrap().len(), 1);
        assert_eq!(
            parse(&nested(MAX_NESTING + 1), Some("deep.spec")).unwrap_err().to_string(),
            "deep.spec:1: nesting too deep"
        );
        assert_eq!(
            parse(&nested(2000), None).unwrap_err().to_string(),
            "1: nesting too deep"
        );
    }

    #[test]
    fn test_scanner_errors_joined() {
        let err = parse("\"open\n$", None).unwrap_err();
        assert_eq!(err.to_string(), "1: literal not terminated\n2: bad element: $");
        let err = parse("$", None).unwrap_err();
        assert_eq!(err.to_string(), "1: bad element: $");
    }
}
