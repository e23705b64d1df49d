//! Store-side evaluation of the expression micro-DSL.
//!
//! # Responsibility
//! - Apply `SET`/`REMOVE` update expressions to an item.
//! - Evaluate condition/filter expressions against an item.
//! - Resolve `#name` and `:value` placeholders.
//!
//! # Invariants
//! - Malformed expressions and unresolved placeholders fail with a
//!   `ValidationException`-coded error; they never partially apply.
//! - The repository layer never calls into this module; expressions stay
//!   opaque until they reach a concrete store client.

use crate::model::{Item, Value};
use crate::store::{codes, StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid field name regex"));
static NAME_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[A-Za-z_][A-Za-z0-9_]*$").expect("valid name placeholder regex"));
static VALUE_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:[A-Za-z_][A-Za-z0-9_]*$").expect("valid value placeholder regex"));
static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(attribute_exists|attribute_not_exists|contains)\s*\(([^()]*)\)$")
        .expect("valid condition function regex")
});
static COMPARISON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s*(<>|=)\s*(\S+)$").expect("valid comparison regex"));

/// Placeholder lookup context shared by update and condition evaluation.
pub struct ExpressionContext<'a> {
    values: &'a BTreeMap<String, Value>,
    names: &'a BTreeMap<String, String>,
}

impl<'a> ExpressionContext<'a> {
    pub fn new(
        values: &'a BTreeMap<String, Value>,
        names: &'a BTreeMap<String, String>,
    ) -> Self {
        Self { values, names }
    }

    /// Resolves a field token: either a `#placeholder` or a literal name.
    fn resolve_field(&self, token: &str) -> StoreResult<String> {
        let token = token.trim();
        if NAME_PLACEHOLDER_RE.is_match(token) {
            return match self.names.get(token) {
                Some(field) => Ok(field.clone()),
                None => Err(validation(format!(
                    "attribute name placeholder `{token}` is not defined"
                ))),
            };
        }
        if FIELD_NAME_RE.is_match(token) {
            return Ok(token.to_string());
        }
        Err(validation(format!("invalid field token `{token}`")))
    }

    /// Resolves a `:placeholder` value token.
    fn resolve_value(&self, token: &str) -> StoreResult<&'a Value> {
        let token = token.trim();
        if !VALUE_PLACEHOLDER_RE.is_match(token) {
            return Err(validation(format!(
                "expected a `:placeholder` value token, got `{token}`"
            )));
        }
        self.values.get(token).ok_or_else(|| {
            validation(format!("attribute value placeholder `{token}` is not defined"))
        })
    }
}

fn validation(message: String) -> StoreError {
    StoreError::new(codes::VALIDATION_ERROR, message)
}

/// Applies a `SET`/`REMOVE` update expression to `item` in place.
///
/// Returns only the attributes the expression set to a new value, matching
/// the store's "updated new" return shape; removed attributes are omitted.
pub fn apply_update(
    item: &mut Item,
    expression: &str,
    ctx: &ExpressionContext<'_>,
) -> StoreResult<Item> {
    let clauses = split_clauses(expression)?;
    // Stage every action before mutating so a late parse error cannot
    // leave the item half-updated.
    let mut sets: Vec<(String, Value)> = Vec::new();
    let mut removes: Vec<String> = Vec::new();

    for (keyword, body) in clauses {
        match keyword {
            UpdateKeyword::Set => {
                for action in split_comma(&body) {
                    let (field_token, value_token) = action.split_once('=').ok_or_else(|| {
                        validation(format!("SET action `{action}` is missing `=`"))
                    })?;
                    let field = ctx.resolve_field(field_token)?;
                    let value = ctx.resolve_value(value_token)?.clone();
                    sets.push((field, value));
                }
            }
            UpdateKeyword::Remove => {
                for action in split_comma(&body) {
                    removes.push(ctx.resolve_field(&action)?);
                }
            }
        }
    }

    let mut updated = Item::new();
    for (field, value) in sets {
        item.set(field.clone(), value.clone());
        updated.set(field, value);
    }
    for field in removes {
        item.remove(&field);
    }
    Ok(updated)
}

/// Evaluates a condition expression against an optionally present item.
///
/// An absent item fails `attribute_exists`, satisfies
/// `attribute_not_exists`, and fails every value predicate.
pub fn eval_condition(
    item: Option<&Item>,
    expression: &str,
    ctx: &ExpressionContext<'_>,
) -> StoreResult<bool> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(validation("condition expression is empty".to_string()));
    }

    if let Some(inner) = strip_outer_parens(expression) {
        return eval_condition(item, inner, ctx);
    }

    let terms = split_top_level_and(expression);
    if terms.len() > 1 {
        for term in terms {
            if !eval_condition(item, term, ctx)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    eval_term(item, expression, ctx)
}

/// Evaluates a filter expression against a present item.
pub fn eval_filter(item: &Item, expression: &str, ctx: &ExpressionContext<'_>) -> StoreResult<bool> {
    eval_condition(Some(item), expression, ctx)
}

fn eval_term(item: Option<&Item>, term: &str, ctx: &ExpressionContext<'_>) -> StoreResult<bool> {
    if let Some(captures) = FUNCTION_RE.captures(term) {
        let function = &captures[1];
        let arguments: Vec<&str> = captures[2].split(',').map(str::trim).collect();
        return match (function, arguments.as_slice()) {
            ("attribute_exists", [field_token]) => {
                let field = ctx.resolve_field(field_token)?;
                Ok(item.is_some_and(|item| item.get(&field).is_some()))
            }
            ("attribute_not_exists", [field_token]) => {
                let field = ctx.resolve_field(field_token)?;
                Ok(!item.is_some_and(|item| item.get(&field).is_some()))
            }
            ("contains", [field_token, value_token]) => {
                let field = ctx.resolve_field(field_token)?;
                let needle = ctx.resolve_value(value_token)?;
                let Some(needle) = needle.as_text() else {
                    return Err(validation(format!(
                        "contains() operand `{value_token}` must be text"
                    )));
                };
                Ok(item
                    .and_then(|item| item.get(&field))
                    .is_some_and(|value| value.contains(needle)))
            }
            _ => Err(validation(format!(
                "wrong number of arguments for `{function}` in `{term}`"
            ))),
        };
    }

    if let Some(captures) = COMPARISON_RE.captures(term) {
        let field = ctx.resolve_field(&captures[1])?;
        let expected = ctx.resolve_value(&captures[3])?;
        let actual = item.and_then(|item| item.get(&field));
        // Comparisons against an absent attribute evaluate false for
        // either operator, per store comparator semantics.
        return Ok(match (&captures[2], actual) {
            (_, None) => false,
            ("=", Some(actual)) => actual == expected,
            ("<>", Some(actual)) => actual != expected,
            _ => unreachable!("comparison regex admits only = and <>"),
        });
    }

    Err(validation(format!("unsupported condition term `{term}`")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateKeyword {
    Set,
    Remove,
}

fn split_clauses(expression: &str) -> StoreResult<Vec<(UpdateKeyword, String)>> {
    let mut clauses: Vec<(UpdateKeyword, String)> = Vec::new();

    for word in expression.split_whitespace() {
        let keyword = if word.eq_ignore_ascii_case("set") {
            Some(UpdateKeyword::Set)
        } else if word.eq_ignore_ascii_case("remove") {
            Some(UpdateKeyword::Remove)
        } else {
            None
        };

        match keyword {
            Some(keyword) => {
                if clauses.iter().any(|(existing, _)| *existing == keyword) {
                    return Err(validation(format!(
                        "duplicate `{word}` clause in update expression"
                    )));
                }
                clauses.push((keyword, String::new()));
            }
            None => match clauses.last_mut() {
                Some((_, body)) => {
                    if !body.is_empty() {
                        body.push(' ');
                    }
                    body.push_str(word);
                }
                None => {
                    return Err(validation(format!(
                        "update expression must start with SET or REMOVE, got `{word}`"
                    )));
                }
            },
        }
    }

    if clauses.is_empty() {
        return Err(validation("update expression is empty".to_string()));
    }
    for (keyword, body) in &clauses {
        if body.trim().is_empty() {
            return Err(validation(format!("{keyword:?} clause has no actions")));
        }
    }
    Ok(clauses)
}

fn split_comma(body: &str) -> Vec<String> {
    body.split(',')
        .map(|action| action.trim().to_string())
        .filter(|action| !action.is_empty())
        .collect()
}

/// Strips one pair of parentheses when they enclose the whole expression.
fn strip_outer_parens(expression: &str) -> Option<&str> {
    let stripped = expression.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for ch in stripped.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    // The leading and trailing parens do not pair up.
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(stripped.trim())
}

/// Splits on `AND` keywords outside parentheses.
fn split_top_level_and(expression: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut term_start = 0usize;
    let bytes = expression.as_bytes();
    let mut index = 0usize;

    while index < bytes.len() {
        match bytes[index] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'a' | b'A' if depth == 0 => {
                let rest = &bytes[index..];
                let preceded_by_space = index > 0 && bytes[index - 1].is_ascii_whitespace();
                let followed = rest.len() >= 4
                    && rest[..3].eq_ignore_ascii_case(b"and")
                    && rest[3].is_ascii_whitespace();
                if preceded_by_space && followed {
                    terms.push(expression[term_start..index].trim());
                    index += 4;
                    term_start = index;
                    continue;
                }
            }
            _ => {}
        }
        index += 1;
    }

    terms.push(expression[term_start..].trim());
    terms.into_iter().filter(|term| !term.is_empty()).collect()
}
