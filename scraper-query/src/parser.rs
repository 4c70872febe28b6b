//! Recursive-descent parser for the query language

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Identity,
    Recurse,
    Literal(Value),
    Var(String),
    Field(Box<Ast>, String),
    Index(Box<Ast>, Box<Ast>),
    Iterate(Box<Ast>),
    Try(Box<Ast>),
    Pipe(Box<Ast>, Box<Ast>),
    Comma(Box<Ast>, Box<Ast>),
    BinOp(BinOp, Box<Ast>, Box<Ast>),
    Neg(Box<Ast>),
    Object(Vec<(String, Ast)>),
    Array(Option<Box<Ast>>),
    Call(String, Vec<Ast>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    And,
    Or,
}

/// Parse a program into its function definitions and main expression.
pub fn parse(tokens: &[Token]) -> Result<(HashMap<String, Ast>, Ast), String> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut funcs = HashMap::new();
    while parser.peek() == Some(&Token::Def) {
        let (name, body) = parser.func_def()?;
        funcs.insert(name, body);
    }
    let main = parser.pipe()?;
    if let Some(extra) = parser.peek() {
        return Err(format!("unexpected trailing token {:?}", extra));
    }
    Ok((funcs, main))
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?}, found end of input", expected)),
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            Some(token) => Err(format!("expected identifier, found {:?}", token)),
            None => Err("expected identifier, found end of input".to_string()),
        }
    }

    fn func_def(&mut self) -> Result<(String, Ast), String> {
        self.expect(&Token::Def)?;
        let name = self.ident()?;
        self.expect(&Token::Colon)?;
        let body = self.pipe()?;
        self.expect(&Token::Semi)?;
        Ok((name, body))
    }

    fn pipe(&mut self) -> Result<Ast, String> {
        let left = self.comma()?;
        if self.eat(&Token::Pipe) {
            let right = self.pipe()?;
            return Ok(Ast::Pipe(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn comma(&mut self) -> Result<Ast, String> {
        let mut expr = self.or_expr()?;
        while self.eat(&Token::Comma) {
            let right = self.or_expr()?;
            expr = Ast::Comma(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<Ast, String> {
        let mut expr = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            expr = Ast::BinOp(BinOp::Or, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Ast, String> {
        let mut expr = self.cmp_expr()?;
        while self.eat(&Token::And) {
            let right = self.cmp_expr()?;
            expr = Ast::BinOp(BinOp::And, Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn cmp_expr(&mut self) -> Result<Ast, String> {
        let left = self.add_expr()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.add_expr()?;
        Ok(Ast::BinOp(op, Box::new(left), Box::new(right)))
    }

    fn add_expr(&mut self) -> Result<Ast, String> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(expr),
            };
            self.pos += 1;
            let right = self.unary()?;
            expr = Ast::BinOp(op, Box::new(expr), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Ast, String> {
        if self.eat(&Token::Minus) {
            let inner = self.postfix()?;
            return Ok(Ast::Neg(Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Ast, String> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    // Only consume when a key follows; a bare `.` here would
                    // belong to the next expression.
                    match self.tokens.get(self.pos + 1) {
                        Some(Token::Ident(name)) => {
                            self.pos += 2;
                            expr = Ast::Field(Box::new(expr), name.clone());
                        }
                        Some(Token::Str(name)) => {
                            self.pos += 2;
                            expr = Ast::Field(Box::new(expr), name.clone());
                        }
                        _ => return Ok(expr),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    if self.eat(&Token::RBracket) {
                        expr = Ast::Iterate(Box::new(expr));
                    } else {
                        let index = self.pipe()?;
                        self.expect(&Token::RBracket)?;
                        expr = Ast::Index(Box::new(expr), Box::new(index));
                    }
                }
                Some(Token::Question) => {
                    self.pos += 1;
                    expr = Ast::Try(Box::new(expr));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Ast, String> {
        match self.next() {
            Some(Token::DotDot) => Ok(Ast::Recurse),
            Some(Token::Dot) => match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.pos += 1;
                    Ok(Ast::Field(Box::new(Ast::Identity), name))
                }
                Some(Token::Str(name)) => {
                    let name = name.clone();
                    self.pos += 1;
                    Ok(Ast::Field(Box::new(Ast::Identity), name))
                }
                _ => Ok(Ast::Identity),
            },
            Some(Token::Dollar) => Ok(Ast::Var(self.ident()?)),
            Some(Token::Str(text)) => Ok(Ast::Literal(json!(text))),
            Some(Token::Num(num)) => Ok(Ast::Literal(json!(num))),
            Some(Token::True) => Ok(Ast::Literal(json!(true))),
            Some(Token::False) => Ok(Ast::Literal(json!(false))),
            Some(Token::Null) => Ok(Ast::Literal(Value::Null)),
            Some(Token::LBracket) => {
                if self.eat(&Token::RBracket) {
                    return Ok(Ast::Array(None));
                }
                let inner = self.pipe()?;
                self.expect(&Token::RBracket)?;
                Ok(Ast::Array(Some(Box::new(inner))))
            }
            Some(Token::LBrace) => self.object(),
            Some(Token::LParen) => {
                let inner = self.pipe()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                if self.eat(&Token::LParen) {
                    let mut args = vec![self.pipe()?];
                    while self.eat(&Token::Semi) {
                        args.push(self.pipe()?);
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Ast::Call(name, args))
                } else {
                    Ok(Ast::Call(name, Vec::new()))
                }
            }
            Some(token) => Err(format!("unexpected token {:?}", token)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn object(&mut self) -> Result<Ast, String> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Ast::Object(entries));
        }
        loop {
            let key = match self.next() {
                Some(Token::Ident(name)) => name.clone(),
                Some(Token::Str(name)) => name.clone(),
                Some(token) => return Err(format!("expected object key, found {:?}", token)),
                None => return Err("expected object key, found end of input".to_string()),
            };
            let value = if self.eat(&Token::Colon) {
                self.or_expr()?
            } else {
                // {foo} shorthand for {foo: .foo}
                Ast::Field(Box::new(Ast::Identity), key.clone())
            };
            entries.push((key, value));
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBrace)?;
            return Ok(Ast::Object(entries));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_main(prog: &str) -> Ast {
        let tokens = tokenize(prog).expect("lexes");
        let (_, main) = parse(&tokens).expect("parses");
        main
    }

    #[test]
    fn field_chain() {
        assert_eq!(
            parse_main(".a.b"),
            Ast::Field(
                Box::new(Ast::Field(Box::new(Ast::Identity), "a".to_string())),
                "b".to_string()
            )
        );
    }

    #[test]
    fn bare_dot_then_iterate() {
        assert_eq!(parse_main(".[]"), Ast::Iterate(Box::new(Ast::Identity)));
    }

    #[test]
    fn comma_binds_tighter_than_pipe() {
        match parse_main(".a, .b | .c") {
            Ast::Pipe(left, _) => assert!(matches!(*left, Ast::Comma(_, _))),
            other => panic!("expected pipe, got {:?}", other),
        }
    }

    #[test]
    fn try_wraps_chain() {
        assert_eq!(
            parse_main(".a?"),
            Ast::Try(Box::new(Ast::Field(
                Box::new(Ast::Identity),
                "a".to_string()
            )))
        );
    }

    #[test]
    fn defs_are_collected() {
        let tokens = tokenize("def one: 1;\ndef two: 2;\none + two").expect("lexes");
        let (funcs, _) = parse(&tokens).expect("parses");
        assert_eq!(funcs.len(), 2);
        assert!(funcs.contains_key("one"));
    }

    #[test]
    fn object_shorthand() {
        assert_eq!(
            parse_main("{a}"),
            Ast::Object(vec![(
                "a".to_string(),
                Ast::Field(Box::new(Ast::Identity), "a".to_string())
            )])
        );
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let tokens = tokenize(".a )").expect("lexes");
        assert!(parse(&tokens).is_err());
    }
}
