//! Tree-walking evaluation with jq stream semantics

use std::cell::RefCell;
use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value};

use crate::parser::{Ast, BinOp};

pub struct Env<'e> {
    funcs: &'e HashMap<String, Ast>,
    vars: &'e HashMap<String, Value>,
    regex_cache: RefCell<HashMap<String, Regex>>,
}

impl<'e> Env<'e> {
    pub fn new(funcs: &'e HashMap<String, Ast>, vars: &'e HashMap<String, Value>) -> Self {
        Self {
            funcs,
            vars,
            regex_cache: RefCell::new(HashMap::new()),
        }
    }

    fn regex(&self, pattern: &str) -> Result<Regex, String> {
        if let Some(regex) = self.regex_cache.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex =
            Regex::new(pattern).map_err(|err| format!("bad regex {:?}: {}", pattern, err))?;
        self.regex_cache
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

/// jq truthiness: everything but `false` and `null`.
pub fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Structural equality with numeric comparison across integer/float forms.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| value_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|w| value_eq(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

pub fn eval(ast: &Ast, input: &Value, env: &Env, out: &mut Vec<Value>) -> Result<(), String> {
    match ast {
        Ast::Identity => out.push(input.clone()),
        Ast::Recurse => recurse(input, out),
        Ast::Literal(value) => out.push(value.clone()),
        Ast::Var(name) => match env.vars.get(name) {
            Some(value) => out.push(value.clone()),
            None => return Err(format!("undefined variable ${}", name)),
        },
        Ast::Field(source, name) => {
            let mut sources = Vec::new();
            eval(source, input, env, &mut sources)?;
            for value in sources {
                match value {
                    Value::Null => out.push(Value::Null),
                    Value::Object(mut map) => {
                        out.push(map.remove(name.as_str()).unwrap_or(Value::Null))
                    }
                    other => {
                        return Err(format!(
                            "cannot index {} with {:?}",
                            type_name(&other),
                            name
                        ))
                    }
                }
            }
        }
        Ast::Index(source, index) => {
            let mut sources = Vec::new();
            eval(source, input, env, &mut sources)?;
            let mut indexes = Vec::new();
            eval(index, input, env, &mut indexes)?;
            for value in &sources {
                for index_value in &indexes {
                    out.push(index_into(value, index_value)?);
                }
            }
        }
        Ast::Iterate(source) => {
            let mut sources = Vec::new();
            eval(source, input, env, &mut sources)?;
            for value in sources {
                match value {
                    Value::Array(items) => out.extend(items),
                    Value::Object(map) => out.extend(map.into_iter().map(|(_, v)| v)),
                    other => return Err(format!("cannot iterate over {}", type_name(&other))),
                }
            }
        }
        Ast::Try(inner) => {
            let mut attempt = Vec::new();
            if eval(inner, input, env, &mut attempt).is_ok() {
                out.extend(attempt);
            }
        }
        Ast::Pipe(left, right) => {
            let mut intermediate = Vec::new();
            eval(left, input, env, &mut intermediate)?;
            for value in intermediate {
                eval(right, &value, env, out)?;
            }
        }
        Ast::Comma(left, right) => {
            eval(left, input, env, out)?;
            eval(right, input, env, out)?;
        }
        Ast::BinOp(op, left, right) => {
            let mut lefts = Vec::new();
            eval(left, input, env, &mut lefts)?;
            let mut rights = Vec::new();
            eval(right, input, env, &mut rights)?;
            for l in &lefts {
                for r in &rights {
                    out.push(apply_binop(*op, l, r)?);
                }
            }
        }
        Ast::Neg(inner) => {
            let mut values = Vec::new();
            eval(inner, input, env, &mut values)?;
            for value in values {
                let num = value
                    .as_f64()
                    .ok_or_else(|| format!("cannot negate {}", type_name(&value)))?;
                out.push(number(-num));
            }
        }
        Ast::Object(entries) => {
            build_objects(entries, 0, &Map::new(), input, env, out)?;
        }
        Ast::Array(inner) => {
            let mut items = Vec::new();
            if let Some(inner) = inner {
                eval(inner, input, env, &mut items)?;
            }
            out.push(Value::Array(items));
        }
        Ast::Call(name, args) => call(name, args, input, env, out)?,
    }
    Ok(())
}

fn recurse(input: &Value, out: &mut Vec<Value>) {
    out.push(input.clone());
    match input {
        Value::Array(items) => {
            for item in items {
                recurse(item, out);
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                recurse(value, out);
            }
        }
        _ => {}
    }
}

fn index_into(value: &Value, index: &Value) -> Result<Value, String> {
    match (value, index) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Array(items), Value::Number(num)) => {
            let raw = num
                .as_f64()
                .ok_or_else(|| "invalid array index".to_string())? as i64;
            let idx = if raw < 0 { raw + items.len() as i64 } else { raw };
            if idx < 0 || idx as usize >= items.len() {
                Ok(Value::Null)
            } else {
                Ok(items[idx as usize].clone())
            }
        }
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key.as_str()).cloned().unwrap_or(Value::Null))
        }
        _ => Err(format!(
            "cannot index {} with {}",
            type_name(value),
            type_name(index)
        )),
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, String> {
    let result = match op {
        BinOp::Eq => Value::Bool(value_eq(left, right)),
        BinOp::Ne => Value::Bool(!value_eq(left, right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = compare(left, right)?;
            let holds = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Value::Bool(holds)
        }
        BinOp::Add => add_values(left, right)?,
        BinOp::Sub => {
            let (l, r) = both_numbers(left, right, "subtract")?;
            number(l - r)
        }
        BinOp::And => Value::Bool(truthy(left) && truthy(right)),
        BinOp::Or => Value::Bool(truthy(left) || truthy(right)),
    };
    Ok(result)
}

fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, String> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            let (l, r) = (l.as_f64().unwrap_or(f64::NAN), r.as_f64().unwrap_or(f64::NAN));
            l.partial_cmp(&r)
                .ok_or_else(|| "numbers are not comparable".to_string())
        }
        (Value::String(l), Value::String(r)) => Ok(l.cmp(r)),
        _ => Err(format!(
            "cannot compare {} with {}",
            type_name(left),
            type_name(right)
        )),
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
        (Value::Number(_), Value::Number(_)) => {
            let (l, r) = both_numbers(left, right, "add")?;
            Ok(number(l + r))
        }
        (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
        (Value::Array(l), Value::Array(r)) => {
            let mut items = l.clone();
            items.extend(r.iter().cloned());
            Ok(Value::Array(items))
        }
        (Value::Object(l), Value::Object(r)) => {
            let mut map = l.clone();
            for (key, value) in r {
                map.insert(key.clone(), value.clone());
            }
            Ok(Value::Object(map))
        }
        _ => Err(format!(
            "cannot add {} and {}",
            type_name(left),
            type_name(right)
        )),
    }
}

fn both_numbers(left: &Value, right: &Value, verb: &str) -> Result<(f64, f64), String> {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(format!(
            "cannot {} {} and {}",
            verb,
            type_name(left),
            type_name(right)
        )),
    }
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn build_objects(
    entries: &[(String, Ast)],
    position: usize,
    partial: &Map<String, Value>,
    input: &Value,
    env: &Env,
    out: &mut Vec<Value>,
) -> Result<(), String> {
    let Some((key, value_ast)) = entries.get(position) else {
        out.push(Value::Object(partial.clone()));
        return Ok(());
    };
    let mut values = Vec::new();
    eval(value_ast, input, env, &mut values)?;
    for value in values {
        let mut extended = partial.clone();
        extended.insert(key.clone(), value);
        build_objects(entries, position + 1, &extended, input, env, out)?;
    }
    Ok(())
}

fn call(
    name: &str,
    args: &[Ast],
    input: &Value,
    env: &Env,
    out: &mut Vec<Value>,
) -> Result<(), String> {
    match (name, args.len()) {
        ("select", 1) => {
            let mut conditions = Vec::new();
            eval(&args[0], input, env, &mut conditions)?;
            for condition in conditions {
                if truthy(&condition) {
                    out.push(input.clone());
                }
            }
        }
        ("test", 1) => {
            let subject = match input {
                Value::String(text) => text,
                other => return Err(format!("test() requires a string, got {}", type_name(other))),
            };
            let mut patterns = Vec::new();
            eval(&args[0], input, env, &mut patterns)?;
            for pattern in patterns {
                let Value::String(pattern) = pattern else {
                    return Err("test() requires a string pattern".to_string());
                };
                let regex = env.regex(&pattern)?;
                out.push(Value::Bool(regex.is_match(subject)));
            }
        }
        ("from_entries", 0) => {
            let Value::Array(entries) = input else {
                return Err(format!(
                    "from_entries requires an array, got {}",
                    type_name(input)
                ));
            };
            let mut map = Map::new();
            for entry in entries {
                let Value::Object(fields) = entry else {
                    return Err("from_entries requires objects as entries".to_string());
                };
                let key = fields
                    .get("key")
                    .or_else(|| fields.get("k"))
                    .or_else(|| fields.get("name"))
                    .ok_or_else(|| "entry without key".to_string())?;
                let key = match key {
                    Value::String(text) => text.clone(),
                    Value::Number(num) => num.to_string(),
                    other => return Err(format!("invalid entry key {}", type_name(other))),
                };
                let value = fields
                    .get("value")
                    .or_else(|| fields.get("v"))
                    .cloned()
                    .unwrap_or(Value::Null);
                map.insert(key, value);
            }
            out.push(Value::Object(map));
        }
        ("length", 0) => {
            let length = match input {
                Value::Null => 0,
                Value::String(text) => text.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => return Err(format!("{} has no length", type_name(other))),
            };
            out.push(Value::Number(length.into()));
        }
        ("not", 0) => out.push(Value::Bool(!truthy(input))),
        ("empty", 0) => {}
        (name, 0) if env.funcs.contains_key(name) => {
            let body = &env.funcs[name];
            eval(body, input, env, out)?;
        }
        (name, arity) => {
            return Err(format!("unknown function {}/{}", name, arity));
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
