// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload templates.
//!
//! A [`ValueTemplate`] turns a stringified value into an outbound payload.
//! Templates are literal text with `{{ ... }}` expression blocks. An
//! expression names a variable and may pipe it through filters:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `value` | The input string |
//! | `value_json` | The input parsed as JSON, undefined if it does not parse |
//! | `value_json.key`, `value_json['key']`, `value_json[0]` | A member of it |
//!
//! | Filter | Effect |
//! |--------|--------|
//! | `float` | Converts to a floating point number (`0.0` if impossible) |
//! | `int` | Converts to an integer, truncating (`0` if impossible) |
//! | `round(n)` | Rounds half away from zero to `n` decimals (default 0) |
//! | `upper`, `lower`, `trim` | String transforms |
//! | `default('x')` | Replaces an undefined value |
//!
//! Undefined values render as the empty string. Rendering never fails; all
//! errors are reported when the template is parsed.
//!
//! # Examples
//!
//! ```
//! use mqtt_thermostat::template::ValueTemplate;
//!
//! let template = ValueTemplate::parse(r#"{"setpoint": {{ value | float }}}"#).unwrap();
//! assert_eq!(template.render("23"), r#"{"setpoint": 23.0}"#);
//!
//! let template = ValueTemplate::parse("{{ value_json.temp | round(1) }}").unwrap();
//! assert_eq!(template.render(r#"{"temp": 21.46}"#), "21.5");
//! ```

use std::fmt;

use serde_json::{Number, Value};

use crate::error::TemplateError;

/// A compiled payload template.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTemplate {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
struct Expression {
    variable: Variable,
    filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
enum Variable {
    Value,
    ValueJson(Vec<PathStep>),
}

#[derive(Debug, Clone, PartialEq)]
enum PathStep {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Float,
    Int,
    Round(i32),
    Upper,
    Lower,
    Trim,
    Default(String),
}

impl ValueTemplate {
    /// Compiles a template.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if an expression block is unclosed or empty,
    /// names an unknown variable or filter, or has a malformed argument.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let open = offset + start;
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                return Err(TemplateError::Unclosed { offset: open });
            };

            let body = after_open[..end].trim();
            if body.is_empty() {
                return Err(TemplateError::EmptyExpression { offset: open });
            }
            segments.push(Segment::Expression(parse_expression(body)?));

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Returns the template source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template against a stringified value.
    #[must_use]
    pub fn render(&self, value: &str) -> String {
        let value_json = serde_json::from_str::<Value>(value).ok();
        let mut out = String::with_capacity(self.source.len() + value.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expression(expression) => {
                    let evaluated = expression.evaluate(value, value_json.as_ref());
                    out.push_str(&stringify(evaluated.as_ref()));
                }
            }
        }
        out
    }
}

impl fmt::Display for ValueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for ValueTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Expression {
    /// Evaluates to `None` when the result is undefined.
    fn evaluate(&self, value: &str, value_json: Option<&Value>) -> Option<Value> {
        let mut current = match &self.variable {
            Variable::Value => Some(Value::String(value.to_string())),
            Variable::ValueJson(path) => value_json.and_then(|json| lookup(json, path)).cloned(),
        };
        for filter in &self.filters {
            current = filter.apply(current);
        }
        current
    }
}

impl Filter {
    fn apply(&self, input: Option<Value>) -> Option<Value> {
        match self {
            Self::Float => Some(float_value(to_f64(input.as_ref()))),
            Self::Int => Some(Value::Number(Number::from(to_i64(input.as_ref())))),
            Self::Round(precision) => {
                let factor = 10f64.powi(*precision);
                let rounded = (to_f64(input.as_ref()) * factor).round() / factor;
                Some(float_value(rounded))
            }
            Self::Upper => Some(Value::String(stringify(input.as_ref()).to_uppercase())),
            Self::Lower => Some(Value::String(stringify(input.as_ref()).to_lowercase())),
            Self::Trim => Some(Value::String(stringify(input.as_ref()).trim().to_string())),
            Self::Default(fallback) => input.or_else(|| Some(Value::String(fallback.clone()))),
        }
    }
}

fn lookup<'a>(json: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    path.iter().try_fold(json, |node, step| match (step, node) {
        (PathStep::Key(key), Value::Object(map)) => map.get(key),
        (PathStep::Key(key), Value::Array(items)) => {
            key.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        (PathStep::Index(i), Value::Array(items)) => items.get(*i),
        (PathStep::Index(i), Value::Object(map)) => map.get(&i.to_string()),
        _ => None,
    })
}

fn to_f64(input: Option<&Value>) -> f64 {
    let parsed = match input {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn to_i64(input: Option<&Value>) -> i64 {
    match input {
        Some(Value::Number(n)) => n
            .as_i64()
            .unwrap_or_else(|| n.as_f64().map_or(0, |f| f.trunc() as i64)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().unwrap_or_else(|_| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map_or(0, |f| f.trunc() as i64)
            })
        }
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or_else(|| Value::Number(Number::from(0)), Value::Number)
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::Null) => "None".to_string(),
        Some(other) => other.to_string(),
    }
}

fn parse_expression(body: &str) -> Result<Expression, TemplateError> {
    let mut parts = split_pipes(body).into_iter();
    let variable = parse_variable(parts.next().unwrap_or_default().trim())?;
    let filters = parts
        .map(|part| parse_filter(part.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expression { variable, filters })
}

/// Splits on `|` outside quoted strings.
fn split_pipes(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '|') => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_variable(text: &str) -> Result<Variable, TemplateError> {
    if text == "value" {
        return Ok(Variable::Value);
    }
    let Some(mut rest) = text.strip_prefix("value_json") else {
        return Err(TemplateError::UnknownVariable(text.to_string()));
    };

    let mut path = Vec::new();
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let len = after_dot
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after_dot.len());
            if len == 0 {
                return Err(TemplateError::InvalidArgument(text.to_string()));
            }
            path.push(PathStep::Key(after_dot[..len].to_string()));
            rest = &after_dot[len..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let Some(close) = after_bracket.find(']') else {
                return Err(TemplateError::InvalidArgument(text.to_string()));
            };
            let inner = after_bracket[..close].trim();
            let step = match unquote(inner) {
                Some(key) => PathStep::Key(key.to_string()),
                None => PathStep::Index(
                    inner
                        .parse()
                        .map_err(|_| TemplateError::InvalidArgument(text.to_string()))?,
                ),
            };
            path.push(step);
            rest = &after_bracket[close + 1..];
        } else {
            return Err(TemplateError::UnknownVariable(text.to_string()));
        }
    }
    Ok(Variable::ValueJson(path))
}

fn parse_filter(text: &str) -> Result<Filter, TemplateError> {
    let (name, argument) = match text.find('(') {
        Some(open) => {
            let Some(inner) = text[open + 1..].strip_suffix(')') else {
                return Err(TemplateError::InvalidArgument(text.to_string()));
            };
            (text[..open].trim(), Some(inner.trim()))
        }
        None => (text, None),
    };

    let no_argument = |filter: Filter| match argument {
        None | Some("") => Ok(filter),
        Some(_) => Err(TemplateError::InvalidArgument(text.to_string())),
    };

    match name {
        "float" => no_argument(Filter::Float),
        "int" => no_argument(Filter::Int),
        "upper" => no_argument(Filter::Upper),
        "lower" => no_argument(Filter::Lower),
        "trim" => no_argument(Filter::Trim),
        "round" => match argument {
            None | Some("") => Ok(Filter::Round(0)),
            Some(arg) => arg
                .parse::<i32>()
                .ok()
                .filter(|p| (0..=15).contains(p))
                .map(Filter::Round)
                .ok_or_else(|| TemplateError::InvalidArgument(text.to_string())),
        },
        "default" | "d" => argument
            .and_then(unquote)
            .map(|fallback| Filter::Default(fallback.to_string()))
            .ok_or_else(|| TemplateError::InvalidArgument(text.to_string())),
        other => Err(TemplateError::UnknownFilter(other.to_string())),
    }
}

fn unquote(text: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        text.strip_prefix(q)
            .and_then(|inner| inner.strip_suffix(q))
            .filter(|_| text.len() >= 2)
    })
}
