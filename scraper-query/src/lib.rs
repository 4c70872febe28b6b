//! Embedded jq-style query engine
//!
//! The extraction stage and the variable engine run queries against the JSON
//! projection of a document tree. This crate implements the query subset they
//! rely on rather than binding an external evaluator:
//!
//! - path access (`.a.b`), optional access (`.a?`), quoted keys (`."a b"`)
//! - array iteration (`.[]`), indexing (`.[0]`, negative from the end)
//! - recursive descent (`..`)
//! - pipes (`|`) and sequencing (`,`)
//! - `select(f)`, `test(re)`, `from_entries`, `length`, `not`, `empty`
//! - comparisons, `+`/`-`, `and`/`or`
//! - object and array construction, literals
//! - variable references (`$name`) bound from the host
//! - zero-argument function definitions (`def name: body;`), typically
//!   injected through an extraction preamble
//!
//! Queries follow jq's stream model: every expression maps one input value to
//! zero or more output values. `Query::get_first` distinguishes "no output"
//! from "output was null", which the extraction stage relies on.
//!
//! Pipeline: `lexer` (logos tokens) → `parser` (recursive descent into a
//! small AST) → `eval` (tree-walking evaluation over `serde_json::Value`).

mod error;
mod eval;
mod lexer;
mod parser;

pub use error::QueryError;

use std::collections::HashMap;

use serde_json::Value;

use eval::Env;
use parser::Ast;

/// A compiled query with optional variable bindings.
#[derive(Debug, Clone)]
pub struct Query {
    prog: String,
    funcs: HashMap<String, Ast>,
    main: Ast,
    vars: HashMap<String, Value>,
}

impl Query {
    pub fn new(prog: &str) -> Result<Self, QueryError> {
        Self::with_vars(prog, HashMap::new())
    }

    pub fn with_vars(prog: &str, vars: HashMap<String, Value>) -> Result<Self, QueryError> {
        let tokens = lexer::tokenize(prog).map_err(|reason| QueryError::compile(reason, prog))?;
        let (funcs, main) =
            parser::parse(&tokens).map_err(|reason| QueryError::compile(reason, prog))?;
        Ok(Self {
            prog: prog.to_string(),
            funcs,
            main,
            vars,
        })
    }

    pub fn program(&self) -> &str {
        &self.prog
    }

    pub fn set_vars(&mut self, vars: HashMap<String, Value>) {
        self.vars = vars;
    }

    /// All outputs of the query for the given input.
    pub fn get_all(&self, input: &Value) -> Result<Vec<Value>, QueryError> {
        let env = Env::new(&self.funcs, &self.vars);
        let mut out = Vec::new();
        eval::eval(&self.main, input, &env, &mut out)
            .map_err(|reason| QueryError::eval(reason, &self.prog))?;
        Ok(out)
    }

    /// First output, or `None` when the query produced no output at all.
    pub fn get_first(&self, input: &Value) -> Result<Option<Value>, QueryError> {
        Ok(self.get_all(input)?.into_iter().next())
    }
}

/// A conjunction of queries used to filter candidate items.
#[derive(Debug, Clone)]
pub struct Filter {
    queries: Vec<Query>,
}

impl Filter {
    pub fn new<I, S>(progs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queries = progs
            .into_iter()
            .map(|prog| Query::new(prog.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// True when every query produces a truthy first output.
    pub fn matches_all(&self, data: &Value) -> Result<bool, QueryError> {
        Ok(self.unmatched(data)?.is_empty())
    }

    /// Program strings of the queries that failed to match.
    pub fn unmatched(&self, data: &Value) -> Result<Vec<&str>, QueryError> {
        let mut failed = Vec::new();
        for query in &self.queries {
            match query.get_first(data)? {
                Some(value) if eval::truthy(&value) => {}
                _ => failed.push(query.program()),
            }
        }
        Ok(failed)
    }

    /// Keep only items matching every query.
    pub fn retain(&self, items: Vec<Value>) -> Result<Vec<Value>, QueryError> {
        let mut kept = Vec::new();
        for item in items {
            if self.matches_all(&item)? {
                kept.push(item);
            }
        }
        Ok(kept)
    }
}
