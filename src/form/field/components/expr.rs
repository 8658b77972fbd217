//! Arithmetic typed into numeric inputs as `=<expression>`.

/// Unary signs and parentheses combined.
const MAX_DEPTH: usize = 64;

/// Evaluate `+ - * /`, unary minus, parentheses and decimal literals.
pub(crate) fn evaluate(source: &str) -> Result<f64, String> {
    let mut parser = ExprParser {
        chars: source.chars().filter(|ch| !ch.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    if parser.chars.is_empty() {
        return Err("empty expression".to_string());
    }
    let value = parser.expression()?;
    if let Some(ch) = parser.peek() {
        return Err(format!("unexpected '{ch}' at position {}", parser.pos));
    }
    if !value.is_finite() {
        return Err("expression does not evaluate to a finite number".to_string());
    }
    Ok(value)
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        self.pos += 1;
        ch
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(sign @ ('-' | '+')) => {
                self.pos += 1;
                let value = self.nested(Self::factor)?;
                Ok(if sign == '-' { -value } else { value })
            }
            Some('(') => {
                self.pos += 1;
                let value = self.nested(Self::expression)?;
                match self.bump() {
                    Some(')') => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.number(),
            Some(ch) => Err(format!("unexpected '{ch}' at position {}", self.pos)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn nested(&mut self, inner: fn(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let value = inner(self);
        self.depth -= 1;
        value
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || ch == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{literal}'"))
    }
}
