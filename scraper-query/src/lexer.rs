//! Token definitions for the query language

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("|")]
    Pipe,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("?")]
    Question,
    #[token("$")]
    Dollar,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("def")]
    Def,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Num(f64),
}

fn unescape(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// Tokenize a program, reporting the offending slice on lexical errors.
pub fn tokenize(prog: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(prog);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(format!("unexpected input at {:?}", lexer.slice()));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_beat_identifiers() {
        let tokens = tokenize("def definition").expect("lexes");
        assert_eq!(
            tokens,
            vec![Token::Def, Token::Ident("definition".to_string())]
        );
    }

    #[test]
    fn dot_dot_is_one_token() {
        let tokens = tokenize(".. | .a").expect("lexes");
        assert_eq!(
            tokens,
            vec![
                Token::DotDot,
                Token::Pipe,
                Token::Dot,
                Token::Ident("a".to_string())
            ]
        );
    }

    #[test]
    fn strings_unescape() {
        let tokens = tokenize(r#""a\"b\n""#).expect("lexes");
        assert_eq!(tokens, vec![Token::Str("a\"b\n".to_string())]);
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize(".a # trailing comment\n.b").expect("lexes");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(tokenize(".a ! .b").is_err());
    }
}
