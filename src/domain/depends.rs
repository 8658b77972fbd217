use indexmap::IndexMap;
use serde_json::Value;

use super::value::{is_truthy, loosely_equal};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid depends_on expression '{expression}': {reason}")]
pub struct DependsOnError {
    pub expression: String,
    pub reason: String,
}

/// A parsed `depends_on` rule.
///
/// Accepted forms: `field`, `!field`, `eval:doc.field`, `eval:!doc.field`,
/// `eval:doc.field == literal` and `eval:doc.field != literal`, where the
/// literal is a quoted string, a number, `true`, `false` or `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum DependsOn {
    Truthy(String),
    Falsy(String),
    Equals(String, Value),
    NotEquals(String, Value),
}

impl DependsOn {
    pub fn parse(expression: &str) -> Result<Self, DependsOnError> {
        let fail = |reason: &str| DependsOnError {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = expression.trim();
        let (body, is_eval) = match trimmed.strip_prefix("eval:") {
            Some(rest) => (rest.trim(), true),
            None => (trimmed, false),
        };
        if body.is_empty() {
            return Err(fail("empty expression"));
        }

        if let Some((left, negated, right)) = split_comparison(body) {
            if !is_eval {
                return Err(fail("comparisons require the 'eval:' prefix"));
            }
            let key = field_reference(left.trim(), true).ok_or_else(|| fail("expected doc.<field>"))?;
            let literal = parse_literal(right.trim()).ok_or_else(|| fail("unsupported literal"))?;
            return Ok(if negated {
                DependsOn::NotEquals(key, literal)
            } else {
                DependsOn::Equals(key, literal)
            });
        }

        let (negated, reference) = match body.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, body),
        };
        let key = field_reference(reference, is_eval).ok_or_else(|| fail("expected a field name"))?;
        Ok(if negated {
            DependsOn::Falsy(key)
        } else {
            DependsOn::Truthy(key)
        })
    }

    pub fn key(&self) -> &str {
        match self {
            DependsOn::Truthy(key)
            | DependsOn::Falsy(key)
            | DependsOn::Equals(key, _)
            | DependsOn::NotEquals(key, _) => key,
        }
    }

    /// True when the dependent field should be shown.
    pub fn evaluate(&self, values: &IndexMap<String, Value>) -> bool {
        let current = values.get(self.key()).unwrap_or(&Value::Null);
        match self {
            DependsOn::Truthy(_) => is_truthy(current),
            DependsOn::Falsy(_) => !is_truthy(current),
            DependsOn::Equals(_, literal) => loosely_equal(current, literal),
            DependsOn::NotEquals(_, literal) => !loosely_equal(current, literal),
        }
    }
}

/// Splits at the first `==` or `!=` that is not inside a quoted literal.
/// The flag is true for `!=`.
fn split_comparison(body: &str) -> Option<(&str, bool, &str)> {
    let mut quote = None;
    for (idx, ch) in body.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None => {
                let rest = &body[idx..];
                if rest.starts_with("!=") {
                    return Some((&body[..idx], true, &body[idx + 2..]));
                }
                if rest.starts_with("==") {
                    return Some((&body[..idx], false, &body[idx + 2..]));
                }
            }
        }
    }
    None
}

fn field_reference(raw: &str, is_eval: bool) -> Option<String> {
    let name = if is_eval { raw.strip_prefix("doc.")? } else { raw };
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    valid.then(|| name.to_string())
}

fn parse_literal(raw: &str) -> Option<Value> {
    match raw {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    for quote in ['\'', '"'] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(Value::String(inner.to_string()));
        }
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>().ok().map(Value::from)
}
