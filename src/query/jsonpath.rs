//! Built-in JSONPath evaluator over `serde_json` values.
//!
//! Supported: `$`, `.name`, `['name']`, `[n]` (negative counts from the end),
//! `[*]`, `.*`, `..name`, `..*`, unions `[a,b]`, slices `[start:end]` and
//! filters `[?(@.path op literal)]` / `[?(@.path)]`.

use serde_json::Value;

use super::{EvalError, JsonPathEvaluator};

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Name(String),
    Index(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    path: Vec<Key>,
    condition: Option<(Op, Literal)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Keys(Vec<Key>),
    Wildcard,
    Slice(Option<i64>, Option<i64>),
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Child(Selector),
    Descendant(Selector),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPath;

impl JsonPathEvaluator for JsonPath {
    fn evaluate(&self, expr: &str, document: &str) -> Result<Vec<Value>, EvalError> {
        let segments = PathParser::new(expr).parse()?;
        let root: Value = serde_json::from_str(document)
            .map_err(|e| EvalError::InvalidDocument(e.to_string()))?;
        let mut current = vec![&root];
        for segment in &segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    Segment::Child(selector) => select(selector, value, &mut next),
                    Segment::Descendant(selector) => {
                        for node in descendants(value) {
                            select(selector, node, &mut next);
                        }
                    }
                }
            }
            current = next;
        }
        Ok(current.into_iter().cloned().collect())
    }
}

/// `value` and every nested value, in document order.
fn descendants(value: &Value) -> Vec<&Value> {
    let mut nodes = vec![value];
    let mut index = 0;
    while index < nodes.len() {
        let node = nodes[index];
        let children: Vec<&Value> = match node {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };
        nodes.splice(index + 1..index + 1, children);
        index += 1;
    }
    nodes
}

fn children(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn lookup<'a>(value: &'a Value, key: &Key) -> Option<&'a Value> {
    match (value, key) {
        (Value::Object(map), Key::Name(name)) => map.get(name),
        (Value::Array(items), Key::Index(index)) => {
            let len = items.len() as i64;
            let index = if *index < 0 { len + index } else { *index };
            usize::try_from(index).ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

fn select<'a>(selector: &Selector, value: &'a Value, out: &mut Vec<&'a Value>) {
    match selector {
        Selector::Keys(keys) => out.extend(keys.iter().filter_map(|key| lookup(value, key))),
        Selector::Wildcard => out.extend(children(value)),
        Selector::Slice(start, end) => {
            if let Value::Array(items) = value {
                let len = items.len() as i64;
                let clamp = |bound: i64| {
                    let bound = if bound < 0 { len + bound } else { bound };
                    bound.clamp(0, len) as usize
                };
                let start = clamp(start.unwrap_or(0));
                let end = clamp(end.unwrap_or(len));
                if start < end {
                    out.extend(items[start..end].iter());
                }
            }
        }
        Selector::Filter(filter) => out.extend(
            children(value)
                .into_iter()
                .filter(|child| filter.matches(child)),
        ),
    }
}

impl Filter {
    fn matches(&self, value: &Value) -> bool {
        let mut target = Some(value);
        for key in &self.path {
            target = target.and_then(|v| lookup(v, key));
        }
        match (target, &self.condition) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some((op, expected))) => compare(actual, *op, expected),
        }
    }
}

fn compare(actual: &Value, op: Op, expected: &Literal) -> bool {
    use std::cmp::Ordering;
    let ordering = match (actual, expected) {
        (Value::Number(a), Literal::Number(b)) => a.as_f64().and_then(|a| a.partial_cmp(b)),
        (Value::String(a), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Literal::Bool(b)) if a == b => Some(Ordering::Equal),
        (Value::Null, Literal::Null) => Some(Ordering::Equal),
        _ => None,
    };
    match (op, ordering) {
        (Op::Eq, Some(o)) => o == Ordering::Equal,
        (Op::Ne, o) => o != Some(Ordering::Equal),
        (Op::Lt, Some(o)) => o == Ordering::Less,
        (Op::Le, Some(o)) => o != Ordering::Greater,
        (Op::Gt, Some(o)) => o == Ordering::Greater,
        (Op::Ge, Some(o)) => o != Ordering::Less,
        (_, None) => false,
    }
}

struct PathParser<'a> {
    expr: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            expr,
            chars: expr.chars().collect(),
            pos: 0,
        }
    }

    fn invalid(&self) -> EvalError {
        EvalError::InvalidExpression(self.expr.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        let matches = self.pos + len <= self.chars.len()
            && self.chars[self.pos..self.pos + len].iter().copied().eq(s.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    fn expect(&mut self, c: char) -> Result<(), EvalError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse(mut self) -> Result<Vec<Segment>, EvalError> {
        self.expect('$')?;
        let mut segments = Vec::new();
        while self.peek().is_some() {
            if self.eat_str("..") {
                let selector = if self.peek() == Some('[') {
                    self.bracket()?
                } else {
                    self.member()?
                };
                segments.push(Segment::Descendant(selector));
            } else if self.eat('.') {
                segments.push(Segment::Child(self.member()?));
            } else if self.peek() == Some('[') {
                segments.push(Segment::Child(self.bracket()?));
            } else {
                return Err(self.invalid());
            }
        }
        Ok(segments)
    }

    fn name(&mut self) -> Result<String, EvalError> {
        let name = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$');
        if name.is_empty() {
            return Err(self.invalid());
        }
        Ok(name)
    }

    fn member(&mut self) -> Result<Selector, EvalError> {
        if self.eat('*') {
            return Ok(Selector::Wildcard);
        }
        Ok(Selector::Keys(vec![Key::Name(self.name()?)]))
    }

    fn quoted(&mut self) -> Result<Option<String>, EvalError> {
        let Some(quote) = self.peek().filter(|c| *c == '\'' || *c == '"') else {
            return Ok(None);
        };
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.invalid()),
                Some('\\') => {
                    self.pos += 1;
                    value.extend(self.peek());
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Some(value));
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn integer(&mut self) -> Result<Option<i64>, EvalError> {
        let start = self.pos;
        self.eat('-');
        let digits = self.read_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            self.pos = start;
            return Ok(None);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse().map(Some).map_err(|_| self.invalid())
    }

    fn bracket(&mut self) -> Result<Selector, EvalError> {
        self.expect('[')?;
        self.skip_spaces();
        let selector = if self.eat('*') {
            Selector::Wildcard
        } else if self.eat('?') {
            self.expect('(')?;
            let filter = self.filter()?;
            self.skip_spaces();
            self.expect(')')?;
            Selector::Filter(filter)
        } else {
            let first = self.integer()?;
            if self.eat(':') {
                let end = self.integer()?;
                Selector::Slice(first, end)
            } else {
                let mut keys = Vec::new();
                let mut pending = first.map(Key::Index);
                loop {
                    let key = match pending.take() {
                        Some(key) => key,
                        None => match self.quoted()? {
                            Some(name) => Key::Name(name),
                            None => Key::Index(self.integer()?.ok_or_else(|| self.invalid())?),
                        },
                    };
                    keys.push(key);
                    self.skip_spaces();
                    if !self.eat(',') {
                        break;
                    }
                    self.skip_spaces();
                }
                Selector::Keys(keys)
            }
        };
        self.skip_spaces();
        self.expect(']')?;
        Ok(selector)
    }

    fn filter(&mut self) -> Result<Filter, EvalError> {
        self.skip_spaces();
        self.expect('@')?;
        let mut path = Vec::new();
        loop {
            if self.eat('.') {
                path.push(Key::Name(self.name()?));
            } else if self.peek() == Some('[') {
                self.pos += 1;
                let key = match self.quoted()? {
                    Some(name) => Key::Name(name),
                    None => Key::Index(self.integer()?.ok_or_else(|| self.invalid())?),
                };
                self.expect(']')?;
                path.push(key);
            } else {
                break;
            }
        }
        self.skip_spaces();
        if self.peek() == Some(')') {
            return Ok(Filter {
                path,
                condition: None,
            });
        }
        let op = [
            ("==", Op::Eq),
            ("!=", Op::Ne),
            ("<=", Op::Le),
            (">=", Op::Ge),
            ("<", Op::Lt),
            (">", Op::Gt),
        ]
        .into_iter()
        .find(|(text, _)| self.eat_str(text))
        .map(|(_, op)| op)
        .ok_or_else(|| self.invalid())?;
        self.skip_spaces();
        let literal = self.literal()?;
        Ok(Filter {
            path,
            condition: Some((op, literal)),
        })
    }

    fn literal(&mut self) -> Result<Literal, EvalError> {
        if let Some(text) = self.quoted()? {
            return Ok(Literal::String(text));
        }
        for (keyword, literal) in [
            ("true", Literal::Bool(true)),
            ("false", Literal::Bool(false)),
            ("null", Literal::Null),
        ] {
            if self.eat_str(keyword) {
                return Ok(literal);
            }
        }
        let number = self.read_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
        number
            .parse::<f64>()
            .map(Literal::Number)
            .map_err(|_| self.invalid())
    }
}
