// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::parser::{number, ArithOp, Builtin, CompareOp, Expr};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

pub type EvalResult<T> = Result<T, String>;

/// Largest array index an assignment may pad up to.
const MAX_ARRAY_INDEX: usize = 536_870_911;

/// One step of a location inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PathElem {
    Index(usize),
    Key(String),
}

type Located = (Vec<PathElem>, Value);

/// Evaluates `expr` against `input`, returning every output in order.
pub fn eval(expr: &Expr, input: &Value) -> EvalResult<Vec<Value>> {
    let mut out = Vec::new();
    eval_into(expr, input, &mut out)?;
    Ok(out)
}

/// Appends the outputs of `expr` to `out`. Outputs produced before an error
/// stay in `out`.
fn eval_into(expr: &Expr, input: &Value, out: &mut Vec<Value>) -> EvalResult<()> {
    match expr {
        Expr::Identity => out.push(input.clone()),
        Expr::Literal(value) => out.push(value.clone()),
        Expr::Index { target, index } => {
            let keys = eval(index, input)?;
            for_each_output(target, input, |value| {
                for key in &keys {
                    out.push(index_value(value, key)?);
                }
                Ok(())
            })?;
        }
        Expr::Iterate(target) => for_each_output(target, input, |value| {
            out.extend(iterate_value(value)?);
            Ok(())
        })?,
        Expr::Try(inner) => {
            let _ = eval_into(inner, input, out);
        }
        Expr::Pipe(lhs, rhs) => for_each_output(lhs, input, |value| eval_into(rhs, value, out))?,
        Expr::Comma(lhs, rhs) => {
            eval_into(lhs, input, out)?;
            eval_into(rhs, input, out)?;
        }
        Expr::Alternative(lhs, rhs) => {
            // Errors on the left count as no output.
            let mut candidates = Vec::new();
            let _ = eval_into(lhs, input, &mut candidates);
            let before = out.len();
            out.extend(candidates.into_iter().filter(is_truthy));
            if out.len() == before {
                eval_into(rhs, input, out)?;
            }
        }
        Expr::Compare { op, lhs, rhs } => {
            let rights = eval(rhs, input)?;
            let lefts = eval(lhs, input)?;
            for r in &rights {
                for l in &lefts {
                    out.push(Value::Bool(holds(*op, compare_values(l, r))));
                }
            }
        }
        Expr::Arith { op, lhs, rhs } => {
            let rights = eval(rhs, input)?;
            let lefts = eval(lhs, input)?;
            for r in &rights {
                for l in &lefts {
                    out.push(arith(*op, l, r)?);
                }
            }
        }
        Expr::Neg(inner) => {
            for value in eval(inner, input)? {
                match value {
                    Value::Number(n) => out.push(number(-to_f64(&n))),
                    other => return Err(format!("{} cannot be negated", type_name(&other))),
                }
            }
        }
        Expr::And(lhs, rhs) => for_each_output(lhs, input, |l| {
            if !is_truthy(l) {
                out.push(Value::Bool(false));
                return Ok(());
            }
            for r in eval(rhs, input)? {
                out.push(Value::Bool(is_truthy(&r)));
            }
            Ok(())
        })?,
        Expr::Or(lhs, rhs) => for_each_output(lhs, input, |l| {
            if is_truthy(l) {
                out.push(Value::Bool(true));
                return Ok(());
            }
            for r in eval(rhs, input)? {
                out.push(Value::Bool(is_truthy(&r)));
            }
            Ok(())
        })?,
        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            for c in eval(cond, input)? {
                match (is_truthy(&c), otherwise) {
                    (true, _) => eval_into(then, input, out)?,
                    (false, Some(otherwise)) => eval_into(otherwise, input, out)?,
                    (false, None) => out.push(input.clone()),
                }
            }
        }
        Expr::Assign { path, value } => {
            let paths = eval_paths(path, input, Vec::new())?;
            for v in eval(value, input)? {
                let mut doc = input.clone();
                for (p, _) in &paths {
                    set_path(&mut doc, p, v.clone())?;
                }
                out.push(doc);
            }
        }
        Expr::Update { path, update } => {
            let mut doc = input.clone();
            let mut removed = Vec::new();
            for (p, _) in eval_paths(path, input, Vec::new())? {
                let current = get_path(&doc, &p);
                match eval(update, &current)?.into_iter().next() {
                    Some(v) => set_path(&mut doc, &p, v)?,
                    None => removed.push(p),
                }
            }
            delete_paths(&mut doc, removed);
            out.push(doc);
        }
        Expr::Array(None) => out.push(Value::Array(Vec::new())),
        Expr::Array(Some(inner)) => out.push(Value::Array(eval(inner, input)?)),
        Expr::Object(entries) => out.extend(eval_object(entries, input)?),
        Expr::Builtin(builtin) => eval_builtin(builtin, input, out)?,
    }
    Ok(())
}

/// Runs `each` over the outputs of `expr`, then reports the error that cut
/// `expr` short, if any.
fn for_each_output<F>(expr: &Expr, input: &Value, mut each: F) -> EvalResult<()>
where
    F: FnMut(&Value) -> EvalResult<()>,
{
    let mut values = Vec::new();
    let status = eval_into(expr, input, &mut values);
    for value in &values {
        each(value)?;
    }
    status
}

fn eval_object(entries: &[(Expr, Expr)], input: &Value) -> EvalResult<Vec<Value>> {
    // Each entry may yield several keys or values; the result is their
    // cartesian product, as in jq.
    let mut objects = vec![Map::new()];

    for (key_expr, value_expr) in entries {
        let keys = eval(key_expr, input)?;
        let values = eval(value_expr, input)?;
        let mut next = Vec::with_capacity(objects.len() * keys.len() * values.len());

        for object in &objects {
            for key in &keys {
                let Value::String(key) = key else {
                    return Err(format!(
                        "Object keys must be strings, got {}",
                        type_name(key)
                    ));
                };
                for value in &values {
                    let mut object = object.clone();
                    object.insert(key.clone(), value.clone());
                    next.push(object);
                }
            }
        }
        objects = next;
    }

    Ok(objects.into_iter().map(Value::Object).collect())
}

fn eval_builtin(builtin: &Builtin, input: &Value, out: &mut Vec<Value>) -> EvalResult<()> {
    match builtin {
        Builtin::Empty => {}
        Builtin::Not => out.push(Value::Bool(!is_truthy(input))),
        Builtin::Select(cond) => {
            for c in eval(cond, input)? {
                if is_truthy(&c) {
                    out.push(input.clone());
                }
            }
        }
        Builtin::Has(key) => {
            for k in eval(key, input)? {
                out.push(Value::Bool(has_key(input, &k)?));
            }
        }
        Builtin::StartsWith(affix) | Builtin::EndsWith(affix) => {
            let name = match builtin {
                Builtin::StartsWith(_) => "startswith",
                _ => "endswith",
            };
            for a in eval(affix, input)? {
                let (Value::String(s), Value::String(a)) = (input, &a) else {
                    return Err(format!("{}() requires string inputs", name));
                };
                out.push(Value::Bool(match builtin {
                    Builtin::StartsWith(_) => s.starts_with(a.as_str()),
                    _ => s.ends_with(a.as_str()),
                }));
            }
        }
        Builtin::Error(None) => return Err(error_message(input)),
        Builtin::Error(Some(message)) => {
            if let Some(message) = eval(message, input)?.first() {
                return Err(error_message(message));
            }
        }
        Builtin::Keys => match input {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push(Value::Array(
                    keys.into_iter().map(|k| Value::String(k.clone())).collect(),
                ));
            }
            Value::Array(items) => out.push(Value::Array(
                (0..items.len()).map(Value::from).collect(),
            )),
            other => return Err(format!("{} has no keys", type_name(other))),
        },
        Builtin::Length => {
            let length = match input {
                Value::Null => Value::from(0),
                Value::Bool(_) => return Err("boolean has no length".to_string()),
                Value::Number(n) => number(to_f64(n).abs()),
                Value::String(s) => Value::from(s.chars().count()),
                Value::Array(items) => Value::from(items.len()),
                Value::Object(map) => Value::from(map.len()),
            };
            out.push(length);
        }
        Builtin::Type => out.push(Value::from(type_name(input))),
        Builtin::ToEntries => match input {
            Value::Object(map) => out.push(Value::Array(
                map.iter()
                    .map(|(k, v)| {
                        let mut entry = Map::new();
                        entry.insert("key".to_string(), Value::String(k.clone()));
                        entry.insert("value".to_string(), v.clone());
                        Value::Object(entry)
                    })
                    .collect(),
            )),
            other => return Err(format!("{} has no keys", type_name(other))),
        },
        Builtin::FromEntries => out.push(from_entries(input)?),
        Builtin::Add => {
            let mut sum = Value::Null;
            if !input.is_null() {
                for item in iterate_value(input)? {
                    sum = arith(ArithOp::Add, &sum, &item)?;
                }
            }
            out.push(sum);
        }
        Builtin::Sort => match input {
            Value::Array(items) => {
                let mut items = items.clone();
                items.sort_by(compare_values);
                out.push(Value::Array(items));
            }
            other => {
                return Err(format!(
                    "{} cannot be sorted, as it is not an array",
                    type_name(other)
                ))
            }
        },
        Builtin::Del(paths_expr) => {
            let paths = eval_paths(paths_expr, input, Vec::new())?
                .into_iter()
                .map(|(path, _)| path)
                .collect();
            let mut output = input.clone();
            delete_paths(&mut output, paths);
            out.push(output);
        }
    }
    Ok(())
}

fn from_entries(input: &Value) -> EvalResult<Value> {
    let Value::Array(entries) = input else {
        return Err(format!("Cannot iterate over {}", type_name(input)));
    };

    let mut object = Map::new();
    for entry in entries {
        let Value::Object(entry) = entry else {
            return Err(format!("Cannot index {} with \"key\"", type_name(entry)));
        };
        let key = ["key", "k", "name", "Name", "K", "Key"]
            .iter()
            .find_map(|field| entry.get(*field).filter(|v| !v.is_null()));
        let key = match key {
            Some(Value::String(k)) => k.clone(),
            Some(other) => other.to_string(),
            None => return Err("Cannot use null (null) as object key".to_string()),
        };
        let value = ["value", "v", "Value", "V"]
            .iter()
            .find_map(|field| entry.get(*field))
            .cloned()
            .unwrap_or(Value::Null);
        object.insert(key, value);
    }
    Ok(Value::Object(object))
}

fn has_key(input: &Value, key: &Value) -> EvalResult<bool> {
    match (input, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.contains_key(k)),
        (Value::Array(items), Value::Number(n)) => {
            let n = to_f64(n);
            Ok(n >= 0.0 && (n as usize) < items.len())
        }
        _ => Err(format!(
            "Cannot check whether {} has a {} key",
            type_name(input),
            type_name(key)
        )),
    }
}

fn error_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => format!("{} (not a string)", other),
    }
}

fn eval_paths(expr: &Expr, input: &Value, base: Vec<PathElem>) -> EvalResult<Vec<Located>> {
    let mut out = Vec::new();
    paths_into(expr, input, base, &mut out)?;
    Ok(out)
}

/// Evaluates a path expression, yielding each designated location together
/// with the value currently stored there.
fn paths_into(
    expr: &Expr,
    input: &Value,
    base: Vec<PathElem>,
    out: &mut Vec<Located>,
) -> EvalResult<()> {
    match expr {
        Expr::Identity => out.push((base, input.clone())),
        Expr::Index { target, index } => {
            let keys = eval(index, input)?;
            for (path, value) in eval_paths(target, input, base)? {
                for key in &keys {
                    let child = index_value(&value, key)?;
                    let elem = match key {
                        Value::String(k) => PathElem::Key(k.clone()),
                        _ => match path_index(&value, key) {
                            Some(i) => PathElem::Index(i),
                            // Before the start of the array: nothing to address.
                            None => continue,
                        },
                    };
                    let mut child_path = path.clone();
                    child_path.push(elem);
                    out.push((child_path, child));
                }
            }
        }
        Expr::Iterate(target) => {
            for (path, value) in eval_paths(target, input, base)? {
                match &value {
                    Value::Array(items) => {
                        for (i, item) in items.iter().enumerate() {
                            let mut child_path = path.clone();
                            child_path.push(PathElem::Index(i));
                            out.push((child_path, item.clone()));
                        }
                    }
                    Value::Object(map) => {
                        for (k, item) in map {
                            let mut child_path = path.clone();
                            child_path.push(PathElem::Key(k.clone()));
                            out.push((child_path, item.clone()));
                        }
                    }
                    other => return Err(format!("Cannot iterate over {}", type_name(other))),
                }
            }
        }
        Expr::Try(inner) => {
            let _ = paths_into(inner, input, base, out);
        }
        Expr::Pipe(lhs, rhs) => {
            for (path, value) in eval_paths(lhs, input, base)? {
                paths_into(rhs, &value, path, out)?;
            }
        }
        Expr::Comma(lhs, rhs) => {
            paths_into(lhs, input, base.clone(), out)?;
            paths_into(rhs, input, base, out)?;
        }
        Expr::Alternative(lhs, rhs) => {
            let mut candidates = Vec::new();
            let _ = paths_into(lhs, input, base.clone(), &mut candidates);
            let before = out.len();
            out.extend(candidates.into_iter().filter(|(_, v)| is_truthy(v)));
            if out.len() == before {
                paths_into(rhs, input, base, out)?;
            }
        }
        Expr::If {
            cond,
            then,
            otherwise,
        } => {
            for c in eval(cond, input)? {
                match (is_truthy(&c), otherwise) {
                    (true, _) => paths_into(then, input, base.clone(), out)?,
                    (false, Some(otherwise)) => paths_into(otherwise, input, base.clone(), out)?,
                    (false, None) => out.push((base.clone(), input.clone())),
                }
            }
        }
        Expr::Builtin(Builtin::Empty) => {}
        Expr::Builtin(Builtin::Select(cond)) => {
            for c in eval(cond, input)? {
                if is_truthy(&c) {
                    out.push((base.clone(), input.clone()));
                }
            }
        }
        _ => return Err("Invalid path expression".to_string()),
    }
    Ok(())
}

fn get_path(root: &Value, path: &[PathElem]) -> Value {
    let mut current = root;
    for elem in path {
        let next = match (elem, current) {
            (PathElem::Key(k), Value::Object(map)) => map.get(k),
            (PathElem::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Stores `value` at `path`, creating objects and arrays through `null`.
fn set_path(root: &mut Value, path: &[PathElem], value: Value) -> EvalResult<()> {
    let mut current = root;
    for elem in path {
        if current.is_null() {
            *current = match elem {
                PathElem::Key(_) => Value::Object(Map::new()),
                PathElem::Index(_) => Value::Array(Vec::new()),
            };
        }
        current = match (elem, current) {
            (PathElem::Key(k), Value::Object(map)) => map.entry(k.clone()).or_insert(Value::Null),
            (PathElem::Index(i), Value::Array(items)) => {
                if *i > MAX_ARRAY_INDEX {
                    return Err("Array index too large".to_string());
                }
                if *i >= items.len() {
                    items.resize(*i + 1, Value::Null);
                }
                &mut items[*i]
            }
            (PathElem::Key(k), other) => {
                return Err(format!("Cannot index {} with \"{}\"", type_name(other), k))
            }
            (PathElem::Index(_), other) => {
                return Err(format!("Cannot index {} with number", type_name(other)))
            }
        };
    }
    *current = value;
    Ok(())
}

fn delete_paths(root: &mut Value, mut paths: Vec<Vec<PathElem>>) {
    paths.sort();
    paths.dedup();
    // Deepest and highest-index locations first so earlier removals do not
    // shift the ones still pending.
    for path in paths.iter().rev() {
        delete_path(root, path);
    }
}

fn delete_path(root: &mut Value, path: &[PathElem]) {
    let Some((last, parents)) = path.split_last() else {
        *root = Value::Null;
        return;
    };

    let mut current = root;
    for elem in parents {
        let next = match (elem, current) {
            (PathElem::Key(k), Value::Object(map)) => map.get_mut(k),
            (PathElem::Index(i), Value::Array(items)) => items.get_mut(*i),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return,
        }
    }

    match (last, current) {
        (PathElem::Key(k), Value::Object(map)) => {
            map.remove(k);
        }
        (PathElem::Index(i), Value::Array(items)) if *i < items.len() => {
            items.remove(*i);
        }
        _ => {}
    }
}

fn index_value(value: &Value, key: &Value) -> EvalResult<Value> {
    match (value, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
        (Value::Null, Value::String(_)) | (Value::Null, Value::Number(_)) => Ok(Value::Null),
        (Value::Array(items), Value::Number(_)) => Ok(resolve_index(value, key)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null)),
        (Value::Object(_), Value::Number(_)) => Err("Cannot index object with number".to_string()),
        (_, Value::String(k)) => Err(format!(
            "Cannot index {} with \"{}\"",
            type_name(value),
            k
        )),
        _ => Err(format!(
            "Cannot index {} with {}",
            type_name(value),
            type_name(key)
        )),
    }
}

/// Resolves a possibly negative numeric index against an array's length.
fn resolve_index(value: &Value, key: &Value) -> Option<usize> {
    let len = match value {
        Value::Array(items) => items.len() as i64,
        _ => return None,
    };
    let raw = key.as_f64()?.floor() as i64;
    let idx = if raw < 0 { len + raw } else { raw };
    (0..len).contains(&idx).then_some(idx as usize)
}

/// Like [`resolve_index`], but positions past the end (or inside `null`)
/// stay addressable so assignment can grow the array.
fn path_index(value: &Value, key: &Value) -> Option<usize> {
    let raw = key.as_f64()?.floor() as i64;
    match value {
        Value::Array(items) if raw < 0 => {
            let idx = items.len() as i64 + raw;
            (idx >= 0).then_some(idx as usize)
        }
        Value::Array(_) | Value::Null if raw >= 0 => Some(raw as usize),
        _ => None,
    }
}

fn iterate_value(value: &Value) -> EvalResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(format!("Cannot iterate over {}", type_name(other))),
    }
}

fn arith(op: ArithOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match (op, l, r) {
        (ArithOp::Add, Value::Null, other) | (ArithOp::Add, other, Value::Null) => {
            Ok(other.clone())
        }
        (_, Value::Number(a), Value::Number(b)) => numeric(op, to_f64(a), to_f64(b)),
        (ArithOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (ArithOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        (ArithOp::Add, Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            merged.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(Value::Object(merged))
        }
        (ArithOp::Sub, Value::Array(a), Value::Array(b)) => Ok(Value::Array(
            a.iter()
                .filter(|item| !b.iter().any(|x| compare_values(item, x) == Ordering::Equal))
                .cloned()
                .collect(),
        )),
        (ArithOp::Mul, Value::Object(a), Value::Object(b)) => Ok(Value::Object(deep_merge(a, b))),
        (ArithOp::Div, Value::String(a), Value::String(b)) => Ok(Value::Array(split(a, b))),
        _ => Err(format!(
            "{} and {} cannot be {}",
            type_name(l),
            type_name(r),
            match op {
                ArithOp::Add => "added",
                ArithOp::Sub => "subtracted",
                ArithOp::Mul => "multiplied",
                ArithOp::Div | ArithOp::Mod => "divided",
            }
        )),
    }
}

fn numeric(op: ArithOp, a: f64, b: f64) -> EvalResult<Value> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div | ArithOp::Mod if b == 0.0 || (op == ArithOp::Mod && b as i64 == 0) => {
            return Err(format!(
                "{} and {} cannot be divided because the divisor is zero",
                number(a),
                number(b)
            ))
        }
        ArithOp::Div => a / b,
        ArithOp::Mod => ((a as i64) % (b as i64)) as f64,
    };
    Ok(number(result))
}

fn deep_merge(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = a.clone();
    for (k, v) in b {
        let value = match (merged.get(k), v) {
            (Some(Value::Object(left)), Value::Object(right)) => {
                Value::Object(deep_merge(left, right))
            }
            _ => v.clone(),
        };
        merged.insert(k.clone(), value);
    }
    merged
}

fn split(s: &str, separator: &str) -> Vec<Value> {
    if s.is_empty() {
        return Vec::new();
    }
    if separator.is_empty() {
        return s.chars().map(|c| Value::String(c.to_string())).collect();
    }
    s.split(separator)
        .map(|part| Value::String(part.to_string()))
        .collect()
}

fn holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

/// jq ordering: null < false < true < numbers < strings < arrays < objects.
/// Numbers compare by value, so `2` and `2.0` are equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => to_f64(x)
            .partial_cmp(&to_f64(y))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => {
            let mut x_keys: Vec<&String> = x.keys().collect();
            let mut y_keys: Vec<&String> = y.keys().collect();
            x_keys.sort();
            y_keys.sort();
            x_keys.cmp(&y_keys).then_with(|| {
                x_keys
                    .iter()
                    .map(|k| compare_values(&x[k.as_str()], &y[k.as_str()]))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

fn to_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::parser::parse;
    use serde_json::json;

    fn run(filter: &str, input: Value) -> EvalResult<Vec<Value>> {
        eval(&parse(filter).unwrap(), &input)
    }

    fn deployment() -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "web",
                "namespace": "default",
                "uid": "1234",
                "labels": {"app": "web"}
            },
            "spec": {
                "replicas": 2,
                "template": {
                    "spec": {
                        "containers": [
                            {"name": "web", "image": "nginx:1.25"},
                            {"name": "sidecar", "image": "envoy:1.30"}
                        ]
                    }
                }
            },
            "status": {"readyReplicas": 2}
        })
    }

    #[test]
    fn test_identity_preserves_document() {
        assert_eq!(run(".", deployment()).unwrap(), vec![deployment()]);
    }

    #[test]
    fn test_field_access() {
        assert_eq!(run(".metadata.name", deployment()).unwrap(), vec![json!("web")]);
        assert_eq!(run(".missing.deeper", deployment()).unwrap(), vec![Value::Null]);
    }

    #[test]
    fn test_iterate_and_index() {
        assert_eq!(
            run(".spec.template.spec.containers[].image", deployment()).unwrap(),
            vec![json!("nginx:1.25"), json!("envoy:1.30")]
        );
        assert_eq!(
            run(".spec.template.spec.containers[-1].name", deployment()).unwrap(),
            vec![json!("sidecar")]
        );
        assert_eq!(
            run(".spec.template.spec.containers[5]", deployment()).unwrap(),
            vec![Value::Null]
        );
    }

    #[test]
    fn test_type_errors_and_optional() {
        assert!(run(".metadata.name.first", deployment()).is_err());
        assert!(run(".metadata[0]", deployment()).is_err());
        assert!(run(".status.readyReplicas[]", deployment()).is_err());
        assert_eq!(
            run(".metadata.name.first?", deployment()).unwrap(),
            Vec::<Value>::new()
        );
    }

    #[test]
    fn test_object_construction() {
        let out = run(
            "{kind, name: .metadata.name, (.metadata.name): .spec.replicas}",
            deployment(),
        )
        .unwrap();
        assert_eq!(out, vec![json!({"kind": "Deployment", "name": "web", "web": 2})]);
    }

    #[test]
    fn test_object_cartesian_product() {
        let out = run("{image: .spec.template.spec.containers[].image}", deployment()).unwrap();
        assert_eq!(
            out,
            vec![json!({"image": "nginx:1.25"}), json!({"image": "envoy:1.30"})]
        );
    }

    #[test]
    fn test_array_construction_and_length() {
        assert_eq!(
            run("[.spec.template.spec.containers[].name] | length", deployment()).unwrap(),
            vec![json!(2)]
        );
        assert_eq!(run("[]", deployment()).unwrap(), vec![json!([])]);
    }

    #[test]
    fn test_del_fields() {
        let out = run("del(.status, .metadata.uid)", deployment()).unwrap();
        let doc = &out[0];
        assert!(doc.get("status").is_none());
        assert!(doc["metadata"].get("uid").is_none());
        assert_eq!(doc["metadata"]["name"], json!("web"));
    }

    #[test]
    fn test_del_with_select() {
        let out = run(
            "del(.spec.template.spec.containers[] | select(.name == \"sidecar\"))",
            deployment(),
        )
        .unwrap();
        assert_eq!(
            out[0]["spec"]["template"]["spec"]["containers"],
            json!([{"name": "web", "image": "nginx:1.25"}])
        );
    }

    #[test]
    fn test_del_multiple_array_elements() {
        let out = run("del(.[0, 2])", json!([1, 2, 3, 4])).unwrap();
        assert_eq!(out, vec![json!([2, 4])]);
    }

    #[test]
    fn test_del_missing_path_is_noop() {
        let out = run("del(.metadata.annotations.x)", deployment()).unwrap();
        assert_eq!(out, vec![deployment()]);
    }

    #[test]
    fn test_keys_and_select() {
        assert_eq!(
            run(".metadata | keys", deployment()).unwrap(),
            vec![json!(["labels", "name", "namespace", "uid"])]
        );
        assert_eq!(
            run("select(.kind == \"Service\")", deployment()).unwrap(),
            Vec::<Value>::new()
        );
        assert_eq!(
            run(".kind != \"Service\" | not", deployment()).unwrap(),
            vec![json!(false)]
        );
    }

    #[test]
    fn test_comma_yields_all() {
        assert_eq!(
            run(".kind, .metadata.name", deployment()).unwrap(),
            vec![json!("Deployment"), json!("web")]
        );
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(
            run("select(.x == 2) | .x", json!({"x": 2.0})).unwrap(),
            vec![json!(2.0)]
        );
        assert_eq!(run("2 != 2.0", json!(null)).unwrap(), vec![json!(false)]);
        assert_eq!(
            run(".a == .b", json!({"a": [1, {"n": 3}], "b": [1.0, {"n": 3.0}]})).unwrap(),
            vec![json!(true)]
        );
        assert_eq!(
            run(".a == .b", json!({"a": {"n": 1}, "b": {"n": 1, "m": 1}})).unwrap(),
            vec![json!(false)]
        );
    }

    #[test]
    fn test_ordering_comparisons() {
        assert_eq!(
            run(".spec.replicas > 1, .spec.replicas <= 1", deployment()).unwrap(),
            vec![json!(true), json!(false)]
        );
        assert_eq!(
            run("[null, true, false, 1, \"a\", [], {}] | sort", json!(null)).unwrap(),
            vec![json!([null, false, true, 1, "a", [], {}])]
        );
        assert_eq!(run("\"a\" < \"b\"", json!(null)).unwrap(), vec![json!(true)]);
    }

    #[test]
    fn test_try_keeps_outputs_before_error() {
        assert_eq!(run("[(1, error)?]", json!({})).unwrap(), vec![json!([1])]);
        assert_eq!(
            run("[(.a, .b.c, .a)?]", json!({"a": 1, "b": "x"})).unwrap(),
            vec![json!([1])]
        );
        assert_eq!(
            run("[((1, error) | . + 1)?]", json!({})).unwrap(),
            vec![json!([2])]
        );
        assert_eq!(
            run("[.[] | (1 / .)?]", json!([1, 0, 2])).unwrap(),
            vec![json!([1, 0.5])]
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(run("error(\"boom\")", json!(null)).unwrap_err(), "boom");
        assert_eq!(
            run("error", json!({"a": 1})).unwrap_err(),
            "{\"a\":1} (not a string)"
        );
    }

    #[test]
    fn test_alternative() {
        assert_eq!(
            run(".metadata.annotations // {}", deployment()).unwrap(),
            vec![json!({})]
        );
        assert_eq!(
            run(".metadata.labels // {}", deployment()).unwrap(),
            vec![json!({"app": "web"})]
        );
        assert_eq!(
            run("(false, null, 1, 2) // 3", json!(null)).unwrap(),
            vec![json!(1), json!(2)]
        );
        assert_eq!(
            run(".metadata.name.first // \"none\"", deployment()).unwrap(),
            vec![json!("none")]
        );
    }

    #[test]
    fn test_map_and_map_values() {
        assert_eq!(
            run(".spec.template.spec.containers | map(.name)", deployment()).unwrap(),
            vec![json!(["web", "sidecar"])]
        );
        assert_eq!(
            run("map_values(. * 10)", json!({"a": 1, "b": 2})).unwrap(),
            vec![json!({"a": 10, "b": 20})]
        );
        assert_eq!(
            run("map_values(empty)", json!([1, 2])).unwrap(),
            vec![json!([])]
        );
    }

    #[test]
    fn test_has() {
        assert_eq!(
            run(".metadata | has(\"uid\"), has(\"annotations\")", deployment()).unwrap(),
            vec![json!(true), json!(false)]
        );
        assert_eq!(
            run("has(1), has(5)", json!([1, 2])).unwrap(),
            vec![json!(true), json!(false)]
        );
        assert!(run(".metadata.name | has(\"a\")", deployment()).is_err());
    }

    #[test]
    fn test_entries() {
        assert_eq!(
            run(".metadata.labels | to_entries", deployment()).unwrap(),
            vec![json!([{"key": "app", "value": "web"}])]
        );
        assert_eq!(
            run(
                "from_entries",
                json!([{"name": "a", "value": 1}, {"k": "b", "v": 2}, {"key": 3}])
            )
            .unwrap(),
            vec![json!({"a": 1, "b": 2, "3": null})]
        );
        assert_eq!(
            run(
                ".metadata.annotations |= with_entries(select(.key | startswith(\"kubectl.\") | not))",
                json!({"metadata": {"annotations": {
                    "kubectl.kubernetes.io/last-applied-configuration": "{}",
                    "team": "payments"
                }}})
            )
            .unwrap(),
            vec![json!({"metadata": {"annotations": {"team": "payments"}}})]
        );
    }

    #[test]
    fn test_assignment() {
        let out = run(".metadata.labels.team = \"payments\"", deployment()).unwrap();
        assert_eq!(
            out[0]["metadata"]["labels"],
            json!({"app": "web", "team": "payments"})
        );

        let out = run(".spec.replicas |= . + 1", deployment()).unwrap();
        assert_eq!(out[0]["spec"]["replicas"], json!(3));

        assert_eq!(
            run(".a[2] = 1", json!({})).unwrap(),
            vec![json!({"a": [null, null, 1]})]
        );
        assert_eq!(
            run(".a = (1, 2)", json!({})).unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
        assert!(run(".a.b = 1", json!({"a": "text"})).is_err());
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            run(".spec.replicas * 2 - 1", deployment()).unwrap(),
            vec![json!(3)]
        );
        assert_eq!(run("10 % 3, -(1 + 1)", json!(null)).unwrap(), vec![json!(1), json!(-2)]);
        assert_eq!(
            run(".kind + \"/\" + .metadata.name", deployment()).unwrap(),
            vec![json!("Deployment/web")]
        );
        assert_eq!(
            run("[1, 2, 3] - [2], {a: 1} + {b: 2}, null + 1", json!(null)).unwrap(),
            vec![json!([1, 3]), json!({"a": 1, "b": 2}), json!(1)]
        );
        assert_eq!(
            run("{a: {b: 1, c: 2}} * {a: {b: 3}}", json!(null)).unwrap(),
            vec![json!({"a": {"b": 3, "c": 2}})]
        );
        assert_eq!(
            run("\"a,b\" / \",\"", json!(null)).unwrap(),
            vec![json!(["a", "b"])]
        );
        assert!(run("1 / 0", json!(null)).is_err());
        assert!(run("{} - 1", json!(null)).is_err());
    }

    #[test]
    fn test_and_or() {
        assert_eq!(
            run(".kind == \"Deployment\" and .spec.replicas >= 2", deployment()).unwrap(),
            vec![json!(true)]
        );
        assert_eq!(
            run(".missing or .kind == \"Service\"", deployment()).unwrap(),
            vec![json!(false)]
        );
        assert_eq!(run("true or error", json!(null)).unwrap(), vec![json!(true)]);
    }

    #[test]
    fn test_if_then_else() {
        let filter = "if .kind == \"Secret\" then del(.data) elif .kind == \"Deployment\" then {kind} else . end";
        assert_eq!(run(filter, deployment()).unwrap(), vec![json!({"kind": "Deployment"})]);
        assert_eq!(
            run(filter, json!({"kind": "Secret", "data": {"a": "b"}})).unwrap(),
            vec![json!({"kind": "Secret"})]
        );
        assert_eq!(
            run("if .kind == \"Service\" then 1 end", json!({"kind": "Pod"})).unwrap(),
            vec![json!({"kind": "Pod"})]
        );
        assert_eq!(
            run("del(if .keep then .tmp else .all end)", json!({"keep": true, "tmp": 1, "all": 2}))
                .unwrap(),
            vec![json!({"keep": true, "all": 2})]
        );
    }

    #[test]
    fn test_type_add_and_affixes() {
        assert_eq!(
            run("[.kind, .spec, .spec.replicas, null] | map(type)", deployment()).unwrap(),
            vec![json!(["string", "object", "number", "null"])]
        );
        assert_eq!(run("add", json!([1, 2, 3])).unwrap(), vec![json!(6)]);
        assert_eq!(run("add", json!([])).unwrap(), vec![Value::Null]);
        assert_eq!(
            run(".metadata.name | startswith(\"we\"), endswith(\"x\")", deployment()).unwrap(),
            vec![json!(true), json!(false)]
        );
        assert!(run("startswith(\"a\")", json!(1)).is_err());
    }
}
