//! kubectl's JSONPath dialect, as far as `--sort-by`, `-o jsonpath` and `custom-columns` need it.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum JsonPathError {
    #[error(
        "unexpected path string, expected a 'name1.name2' or '.name1.name2' or '{{name1.name2}}' or '{{.name1.name2}}'"
    )]
    UnexpectedPath,

    #[error("error parsing jsonpath {template}, {reason}")]
    Parse { template: String, reason: String },
}

/// Accept the loose spellings kubectl allows for a single field path and return the canonical
/// `{.a.b}` template.
pub fn relaxed_expression(path: &str) -> Result<String, JsonPathError> {
    static RELAXED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\{\.?([^{}]+)\}$|^\.?([^{}]+)$").expect("static regex"));

    if path.is_empty() {
        return Ok(String::new());
    }
    let captures = RELAXED.captures(path).ok_or(JsonPathError::UnexpectedPath)?;
    let field = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str())
        .ok_or(JsonPathError::UnexpectedPath)?;

    Ok(format!("{{.{field}}}"))
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Path(Vec<Segment>),
    Range { path: Vec<Segment>, body: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Union(Vec<String>),
    Recursive(Option<String>),
    Wildcard,
    Index(i64),
    Slice(Option<i64>, Option<i64>),
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    left: Vec<Segment>,
    condition: Option<(CmpOp, Operand)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(Value),
    Path(Vec<Segment>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    template: String,
    nodes: Vec<Node>,
}

impl JsonPath {
    pub fn parse(template: &str) -> Result<Self, JsonPathError> {
        let err = |reason: &str| JsonPathError::Parse {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        // one frame per open range; the bottom frame is the template itself
        let mut stack: Vec<(Option<Vec<Segment>>, Vec<Node>)> = vec![(None, Vec::new())];
        let mut rest = template;

        while !rest.is_empty() {
            let Some(open) = rest.find('{') else {
                push_text(&mut stack, rest);
                break;
            };
            push_text(&mut stack, &rest[..open]);

            let close = find_action_end(&rest[open..]).ok_or_else(|| err("unclosed action"))?;
            let action = rest[open + 1..open + close].trim();
            rest = &rest[open + close + 1..];

            if action == "end" {
                if stack.len() == 1 {
                    return Err(err("not in range, nothing to end"));
                }
                if let Some((Some(path), body)) = stack.pop() {
                    if let Some((_, nodes)) = stack.last_mut() {
                        nodes.push(Node::Range { path, body });
                    }
                }
            } else if let Some(range) = action.strip_prefix("range ") {
                let path = parse_path(range.trim()).map_err(|r| err(&r))?;
                stack.push((Some(path), Vec::new()));
            } else if action.starts_with('"') {
                let literal = parse_quoted(action).map_err(|r| err(&r))?;
                push_text(&mut stack, &literal);
            } else {
                let path = parse_path(action).map_err(|r| err(&r))?;
                if let Some((_, nodes)) = stack.last_mut() {
                    nodes.push(Node::Path(path));
                }
            }
        }

        if stack.len() != 1 {
            return Err(err("range without end"));
        }
        let nodes = stack.pop().map(|(_, nodes)| nodes).unwrap_or_default();

        Ok(Self {
            template: template.to_string(),
            nodes,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the template against `data`.
    pub fn execute(&self, data: &Value) -> String {
        let mut out = String::new();
        render(&self.nodes, data, data, &mut out);
        out
    }

    /// Every value the template's path actions select, in order. Literal text is ignored.
    pub fn find<'a>(&self, data: &'a Value) -> Vec<&'a Value> {
        let mut found = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Path(path) => found.extend(eval(path, data, data)),
                Node::Range { path, .. } => found.extend(eval(path, data, data)),
                Node::Text(_) => {}
            }
        }
        found
    }
}

fn push_text(stack: &mut [(Option<Vec<Segment>>, Vec<Node>)], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some((_, nodes)) = stack.last_mut() {
        match nodes.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(text),
            _ => nodes.push(Node::Text(text.to_string())),
        }
    }
}

/// Offset of the `}` closing the action that starts at `s[0] == '{'`, skipping quoted text.
fn find_action_end(s: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '}' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn parse_quoted(s: &str) -> Result<String, String> {
    let mut chars = s.chars();
    let quote = chars.next().ok_or("empty literal")?;
    let mut out = String::new();
    let mut closed = false;
    while let Some(c) = chars.next() {
        if c == quote {
            closed = true;
            break;
        }
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => return Err("unterminated escape".into()),
            }
        } else {
            out.push(c);
        }
    }
    if !closed || chars.next().is_some() {
        return Err(format!("invalid literal {s}"));
    }
    Ok(out)
}

fn parse_path(s: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;

    if matches!(chars.first(), Some('$') | Some('@')) {
        i = 1;
    }

    while i < chars.len() {
        match chars[i] {
            '.' if chars.get(i + 1) == Some(&'.') => {
                i += 2;
                if chars.get(i) == Some(&'*') {
                    i += 1;
                    segments.push(Segment::Recursive(None));
                } else {
                    let (name, next) = read_ident(&chars, i);
                    if name.is_empty() {
                        return Err(format!("missing field name after '..' in {s}"));
                    }
                    segments.push(Segment::Recursive(Some(name)));
                    i = next;
                }
            }
            '.' => {
                i += 1;
                match chars.get(i) {
                    Some('*') => {
                        segments.push(Segment::Wildcard);
                        i += 1;
                    }
                    Some('[') | None => {}
                    Some(_) => {
                        let (name, next) = read_ident(&chars, i);
                        if name.is_empty() {
                            return Err(format!("invalid field at position {i} in {s}"));
                        }
                        segments.push(Segment::Field(name));
                        i = next;
                    }
                }
            }
            '[' => {
                let end = find_bracket_end(&chars, i).ok_or_else(|| format!("unterminated [ in {s}"))?;
                let inner: String = chars[i + 1..end].iter().collect();
                segments.push(parse_bracket(inner.trim())?);
                i = end + 1;
            }
            c if c.is_whitespace() => return Err(format!("unexpected space in {s}")),
            _ => {
                let (name, next) = read_ident(&chars, i);
                segments.push(Segment::Field(name));
                i = next;
            }
        }
    }

    Ok(segments)
}

fn read_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let mut name = String::new();
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                name.push(chars[i + 1]);
                i += 2;
            }
            '.' | '[' => break,
            c if c.is_whitespace() => break,
            c => {
                name.push(c);
                i += 1;
            }
        }
    }
    (name, i)
}

fn find_bracket_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0;
    let mut quote = None;
    for (offset, &c) in chars[start..].iter().enumerate() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(start + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn parse_bracket(inner: &str) -> Result<Segment, String> {
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Some(expr) = inner.strip_prefix("?(").and_then(|e| e.strip_suffix(')')) {
        return parse_filter(expr.trim()).map(Segment::Filter);
    }
    if inner.starts_with('\'') || inner.starts_with('"') {
        let names = split_outside_quotes(inner, ',')
            .into_iter()
            .map(|n| parse_quoted(n.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(match names.len() {
            1 => Segment::Field(names.into_iter().next().unwrap_or_default()),
            _ => Segment::Union(names),
        });
    }
    if inner.contains(':') {
        let mut parts = inner.split(':');
        let start = parse_bound(parts.next())?;
        let end = parse_bound(parts.next())?;
        return Ok(Segment::Slice(start, end));
    }
    inner
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| format!("invalid array index {inner}"))
}

fn parse_bound(part: Option<&str>) -> Result<Option<i64>, String> {
    match part.map(str::trim) {
        None | Some("") => Ok(None),
        Some(n) => n
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("invalid slice bound {n}")),
    }
}

fn split_outside_quotes(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == sep => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_filter(expr: &str) -> Result<Filter, String> {
    const OPS: [(&str, CmpOp); 6] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    let mut quote = None;
    for (i, c) in expr.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => continue,
            None if c == '\'' || c == '"' => quote = Some(c),
            None => {
                for (token, op) in OPS {
                    if expr[i..].starts_with(token) {
                        let left = parse_path(expr[..i].trim())?;
                        let right = parse_operand(expr[i + token.len()..].trim())?;
                        return Ok(Filter {
                            left,
                            condition: Some((op, right)),
                        });
                    }
                }
            }
        }
    }

    Ok(Filter {
        left: parse_path(expr)?,
        condition: None,
    })
}

fn parse_operand(s: &str) -> Result<Operand, String> {
    if s.starts_with('\'') || s.starts_with('"') {
        return parse_quoted(s).map(|v| Operand::Literal(Value::String(v)));
    }
    if s.starts_with('@') || s.starts_with('$') {
        return parse_path(s).map(Operand::Path);
    }
    serde_json::from_str::<Value>(s)
        .map(Operand::Literal)
        .map_err(|_| format!("invalid filter operand {s}"))
}

fn render(nodes: &[Node], root: &Value, current: &Value, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Path(path) => {
                let rendered: Vec<String> = eval(path, root, current)
                    .into_iter()
                    .map(value_to_text)
                    .collect();
                out.push_str(&rendered.join(" "));
            }
            Node::Range { path, body } => {
                for value in eval(path, root, current) {
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                render(body, root, item, out);
                            }
                        }
                        other => render(body, root, other, out),
                    }
                }
            }
        }
    }
}

/// How a selected value is printed: strings raw, everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn eval<'a>(path: &[Segment], root: &'a Value, current: &'a Value) -> Vec<&'a Value> {
    let mut values = vec![current];
    for segment in path {
        let mut next = Vec::new();
        for value in values {
            step(segment, root, value, &mut next);
        }
        values = next;
    }
    values
}

fn step<'a>(segment: &Segment, root: &'a Value, value: &'a Value, out: &mut Vec<&'a Value>) {
    match segment {
        Segment::Field(name) => out.extend(value.get(name.as_str())),
        Segment::Union(names) => {
            for name in names {
                out.extend(value.get(name.as_str()));
            }
        }
        Segment::Wildcard => match value {
            Value::Object(map) => out.extend(map.values()),
            Value::Array(items) => out.extend(items.iter()),
            _ => {}
        },
        Segment::Index(index) => {
            if let Value::Array(items) = value {
                let len = items.len() as i64;
                let idx = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&idx) {
                    out.push(&items[idx as usize]);
                }
            }
        }
        Segment::Slice(start, end) => {
            if let Value::Array(items) = value {
                let len = items.len() as i64;
                let clamp = |b: i64| if b < 0 { (len + b).max(0) } else { b.min(len) };
                let from = start.map(clamp).unwrap_or(0);
                let to = end.map(clamp).unwrap_or(len);
                if from < to {
                    out.extend(items[from as usize..to as usize].iter());
                }
            }
        }
        Segment::Recursive(name) => descend(name.as_deref(), value, out),
        Segment::Filter(filter) => {
            let candidates: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            out.extend(candidates.into_iter().filter(|c| matches_filter(filter, root, c)));
        }
    }
}

fn descend<'a>(name: Option<&str>, value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if name.map_or(true, |n| n == key) {
                    out.push(child);
                }
                descend(name, child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                if name.is_none() {
                    out.push(item);
                }
                descend(name, item, out);
            }
        }
        _ => {}
    }
}

fn matches_filter(filter: &Filter, root: &Value, candidate: &Value) -> bool {
    let left = eval(&filter.left, root, candidate);
    let Some((op, operand)) = &filter.condition else {
        return left.iter().any(|v| !matches!(v, Value::Null | Value::Bool(false)));
    };

    let right: Vec<&Value> = match operand {
        Operand::Literal(v) => vec![v],
        Operand::Path(p) => eval(p, root, candidate),
    };

    left.iter()
        .any(|l| right.iter().any(|r| compare(*op, l, r)))
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .zip(r.as_f64())
            .and_then(|(l, r)| l.partial_cmp(&r)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (l, r) if l == r => Some(Ordering::Equal),
        _ => None,
    };

    match (op, ordering) {
        (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Ne, None) => true,
        (CmpOp::Lt, Some(o)) => o == Ordering::Less,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
        (_, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn clusters() -> Value {
        json!({
            "kind": "List",
            "items": [
                {
                    "metadata": {"name": "east", "labels": {"cloud": "Amazon", "name.io/zone": "a"}},
                    "status": {
                        "conditions": [
                            {"type": "ManagedClusterJoined", "status": "True"},
                            {"type": "ManagedClusterConditionAvailable", "status": "Unknown"}
                        ],
                        "capacity": {"cpu": 16}
                    }
                },
                {
                    "metadata": {"name": "west", "labels": {"cloud": "Azure"}},
                    "status": {
                        "conditions": [
                            {"type": "ManagedClusterConditionAvailable", "status": "True"}
                        ],
                        "capacity": {"cpu": 8}
                    }
                }
            ]
        })
    }

    fn run(template: &str) -> String {
        JsonPath::parse(template).unwrap().execute(&clusters())
    }

    #[test]
    fn relaxed_spellings_normalise() {
        for spelling in ["metadata.name", ".metadata.name", "{metadata.name}", "{.metadata.name}"] {
            assert_eq!(relaxed_expression(spelling).unwrap(), "{.metadata.name}");
        }
        assert_eq!(relaxed_expression("").unwrap(), "");
        assert_eq!(
            relaxed_expression("{.a}{.b}").unwrap_err(),
            JsonPathError::UnexpectedPath
        );
    }

    #[test]
    fn wildcard_results_join_with_spaces() {
        assert_eq!(run("{.items[*].metadata.name}"), "east west");
    }

    #[test]
    fn text_and_literals_pass_through() {
        assert_eq!(run("first={.items[0].metadata.name}{\"\\n\"}"), "first=east\n");
    }

    #[test]
    fn range_renders_body_per_item() {
        assert_eq!(
            run("{range .items[*]}{.metadata.name}:{.status.capacity.cpu};{end}"),
            "east:16;west:8;"
        );
    }

    #[test]
    fn filters_select_matching_elements() {
        assert_eq!(
            run(r#"{.items[*].status.conditions[?(@.type=="ManagedClusterConditionAvailable")].status}"#),
            "Unknown True"
        );
        assert_eq!(
            run("{.items[?(@.status.capacity.cpu > 10)].metadata.name}"),
            "east"
        );
    }

    #[test]
    fn index_slice_and_negative_index() {
        assert_eq!(run("{.items[-1].metadata.name}"), "west");
        assert_eq!(run("{.items[0:1].metadata.name}"), "east");
        assert_eq!(run("{.items[5].metadata.name}"), "");
    }

    #[test]
    fn quoted_and_escaped_keys() {
        assert_eq!(run("{.items[0].metadata.labels['name.io/zone']}"), "a");
        assert_eq!(run(r"{.items[0].metadata.labels.name\.io/zone}"), "a");
    }

    #[test]
    fn recursive_descent_finds_nested_keys() {
        assert_eq!(run("{..cpu}"), "16 8");
    }

    #[test]
    fn non_strings_render_as_json() {
        assert_eq!(run("{.items[1].status.capacity}"), r#"{"cpu":8}"#);
    }

    #[test]
    fn missing_keys_render_nothing() {
        assert_eq!(run("{.nope.still}"), "");
    }

    #[test]
    fn find_returns_selected_values() {
        let data = clusters();
        let path = JsonPath::parse("{.items[*].metadata.name}").unwrap();

        assert_eq!(path.find(&data), vec![&json!("east"), &json!("west")]);
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(JsonPath::parse("{.items").is_err());
        assert!(JsonPath::parse("{range .items[*]}{.x}").is_err());
        assert!(JsonPath::parse("{end}").is_err());
        assert!(JsonPath::parse("{.items[abc]}").is_err());
    }
}
