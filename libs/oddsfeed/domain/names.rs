//! Market and outcome name templates
//!
//! Placeholders:
//!
//! | form | result |
//! |---|---|
//! | `{X}` | value of specifier X |
//! | `{!X}` | ordinal of X |
//! | `{X+c}`, `{X-c}` | X plus or minus the constant c |
//! | `{!X+c}` | ordinal of the sum |
//! | `{+X}`, `{-X}` | X (or -X) with an explicit sign |
//! | `{%X}` | full name of the player whose id is X |
//! | `{$event}` | fixture name |
//! | `{$competitorN}` | name of the Nth competitor of the fixture |
//!
//! Placeholders that cannot be resolved are left in place.

use super::entities::{Fixture, Player};
use super::market::Specifiers;
use crate::error::DecodeError;
use std::collections::HashMap;

const MAX_DEPTH: usize = 4;

/// Lookup tables for placeholders that reference other entities
#[derive(Debug, Default, Clone, Copy)]
pub struct NameContext<'a> {
    pub players: Option<&'a HashMap<u64, Player>>,
    pub fixture: Option<&'a Fixture>,
}

/// Expand every placeholder of `template`
pub fn interpolate(
    template: &str,
    specifiers: &Specifiers,
    ctx: &NameContext<'_>,
) -> Result<String, DecodeError> {
    expand(template, specifiers, ctx, 0)
}

fn expand(
    template: &str,
    specifiers: &Specifiers,
    ctx: &NameContext<'_>,
    depth: usize,
) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        let inner = &rest[open + 1..close];
        match resolve(template, inner, specifiers, ctx, depth)? {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve(
    template: &str,
    inner: &str,
    specifiers: &Specifiers,
    ctx: &NameContext<'_>,
    depth: usize,
) -> Result<Option<String>, DecodeError> {
    let mut chars = inner.chars();
    let Some(first) = chars.next() else {
        return Ok(None);
    };
    let tail = &inner[first.len_utf8()..];

    match first {
        '!' => {
            let Some(value) = evaluate(template, tail, specifiers)? else {
                return Ok(None);
            };
            if value.fract() != 0.0 {
                return Err(bad(template, format!("{} is not an integer", value)));
            }
            Ok(Some(ordinal(value as i64)))
        }
        '%' => {
            let Some(raw) = specifiers.get(tail) else {
                return Ok(None);
            };
            let id: u64 = raw
                .parse()
                .map_err(|_| bad(template, format!("bad player id {:?}", raw)))?;
            Ok(ctx
                .players
                .and_then(|players| players.get(&id))
                .map(|p| if p.full_name.is_empty() { p.name.clone() } else { p.full_name.clone() }))
        }
        '$' => {
            let Some(fixture) = ctx.fixture else {
                return Ok(None);
            };
            if tail == "event" {
                return Ok(Some(fixture.display_name()));
            }
            let Some(n) = tail.strip_prefix("competitor") else {
                return Ok(None);
            };
            let n: usize = n
                .parse()
                .map_err(|_| bad(template, format!("bad competitor index {:?}", n)))?;
            let Some(competitor) = n.checked_sub(1).and_then(|i| fixture.competitors.get(i)) else {
                return Ok(None);
            };
            if depth + 1 >= MAX_DEPTH {
                return Ok(Some(competitor.name.clone()));
            }
            expand(&competitor.name, specifiers, ctx, depth + 1).map(Some)
        }
        '+' | '-' if tail.chars().next().is_some_and(|c| !c.is_ascii_digit()) => {
            let Some(raw) = specifiers.get(tail) else {
                return Ok(None);
            };
            let value = number(template, raw)?;
            let value = if first == '-' { -value } else { value };
            Ok(Some(signed(value)))
        }
        _ => {
            if split_arithmetic(inner).is_none() {
                return Ok(specifiers.get(inner).cloned());
            }
            Ok(evaluate(template, inner, specifiers)?.map(format_number))
        }
    }
}

/// `X`, `X+c` or `X-c` as a number; `None` when X is not a specifier
fn evaluate(template: &str, expr: &str, specifiers: &Specifiers) -> Result<Option<f64>, DecodeError> {
    let (key, delta) = match split_arithmetic(expr) {
        Some((key, op, constant)) => {
            let c: i64 = constant
                .parse()
                .map_err(|_| bad(template, format!("bad constant {:?}", constant)))?;
            (key, if op == '-' { -(c as f64) } else { c as f64 })
        }
        None => (expr, 0.0),
    };
    match specifiers.get(key) {
        Some(raw) => Ok(Some(number(template, raw)? + delta)),
        None => Ok(None),
    }
}

fn split_arithmetic(expr: &str) -> Option<(&str, char, &str)> {
    expr.char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, op)| (&expr[..i], op, &expr[i + 1..]))
}

fn number(template: &str, raw: &str) -> Result<f64, DecodeError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| bad(template, format!("bad number {:?}", raw)))
}

fn bad(template: &str, reason: String) -> DecodeError {
    DecodeError::BadTemplate {
        template: template.to_string(),
        reason,
    }
}

fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", value)
    } else {
        format_number(value)
    }
}

/// 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, ..., 21st
pub fn ordinal(n: i64) -> String {
    let abs = n.unsigned_abs();
    let suffix = match (abs % 10, abs % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
