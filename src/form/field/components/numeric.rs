use std::sync::Arc;

use serde_json::Value;

use crate::domain::{FieldDescriptor, value_to_string};
use crate::form::error::ParseError;
use crate::record::Record;
use crate::settings::FormatSettings;

use super::base::{ValueFormatter, ValueParser};
use super::expr;
use super::helpers::group_digits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericMode {
    Int,
    Float,
    Currency,
    Percent,
}

impl NumericMode {
    fn precision(self, descriptor: &FieldDescriptor, format: &FormatSettings) -> usize {
        let precision = match self {
            NumericMode::Int => 0,
            NumericMode::Currency => descriptor.precision.unwrap_or(format.currency_precision),
            NumericMode::Float | NumericMode::Percent => {
                descriptor.precision.unwrap_or(format.float_precision)
            }
        };
        usize::from(precision)
    }

    fn finish(
        self,
        number: f64,
        descriptor: &FieldDescriptor,
        format: &FormatSettings,
    ) -> Result<Value, ParseError> {
        match self {
            NumericMode::Int => {
                let whole = number.trunc();
                // i64::MAX as f64 rounds up to 2^63, which is already out of range.
                if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
                    return Err(ParseError::new(
                        &descriptor.key,
                        format!("{number} is out of range for an integer"),
                    ));
                }
                Ok(Value::from(whole as i64))
            }
            _ => {
                let factor = 10f64.powi(self.precision(descriptor, format) as i32);
                Ok(Value::from((number * factor).round() / factor))
            }
        }
    }
}

/// Numeric input: `=` expressions are evaluated, everything else is read up
/// to the first character that cannot belong to a number.
#[derive(Debug, Clone)]
pub struct NumberParser {
    mode: NumericMode,
    format: Arc<FormatSettings>,
}

impl NumberParser {
    pub fn new(mode: NumericMode, format: Arc<FormatSettings>) -> Self {
        Self { mode, format }
    }

    /// The numeric prefix of `text`, separators normalized.
    fn leading_number(&self, text: &str) -> Option<String> {
        let mut cleaned = text.trim().to_string();
        if self.mode == NumericMode::Currency {
            cleaned = cleaned.replace(self.format.currency_symbol.as_str(), "");
        }
        if let Some(group) = self.format.group_separator {
            cleaned = cleaned.replace(group, "");
        }
        if self.format.decimal_separator != '.' {
            cleaned = cleaned.replace(self.format.decimal_separator, ".");
        }
        let cleaned = cleaned.trim();

        let mut end = 0;
        let mut seen_digit = false;
        let mut seen_point = false;
        for (idx, ch) in cleaned.char_indices() {
            match ch {
                '-' | '+' if idx == 0 => {}
                '0'..='9' => seen_digit = true,
                '.' if !seen_point => seen_point = true,
                _ => break,
            }
            end = idx + ch.len_utf8();
        }
        if !seen_digit {
            return None;
        }
        Some(cleaned[..end].trim_end_matches('.').to_string())
    }
}

impl ValueParser for NumberParser {
    fn parse(&self, descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        let number = match raw {
            Value::Null => return Ok(Value::Null),
            Value::Bool(flag) => f64::from(u8::from(*flag)),
            Value::Number(num) => {
                if self.mode == NumericMode::Int {
                    if let Some(int) = num.as_i64() {
                        return Ok(Value::from(int));
                    }
                    if let Some(int) = num.as_u64() {
                        return Ok(Value::from(int));
                    }
                }
                match num.as_f64() {
                    Some(number) => number,
                    None => return Ok(Value::Null),
                }
            }
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                if let Some(source) = trimmed.strip_prefix('=') {
                    expr::evaluate(source)
                        .map_err(|reason| ParseError::new(&descriptor.key, reason))?
                } else {
                    let Some(literal) = self.leading_number(trimmed) else {
                        return Ok(Value::Null);
                    };
                    if self.mode == NumericMode::Int && !literal.contains('.') {
                        if let Ok(int) = literal.parse::<i64>() {
                            return Ok(Value::from(int));
                        }
                        if let Ok(int) = literal.parse::<u64>() {
                            return Ok(Value::from(int));
                        }
                    }
                    match literal.parse::<f64>() {
                        Ok(number) => number,
                        Err(_) => return Ok(Value::Null),
                    }
                }
            }
            other => {
                return Err(ParseError::new(
                    &descriptor.key,
                    format!("cannot read a number from {other}"),
                ));
            }
        };
        self.mode.finish(number, descriptor, &self.format)
    }
}

#[derive(Debug, Clone)]
pub struct NumberFormatter {
    mode: NumericMode,
    format: Arc<FormatSettings>,
}

impl NumberFormatter {
    pub fn new(mode: NumericMode, format: Arc<FormatSettings>) -> Self {
        Self { mode, format }
    }

    fn format_number(&self, descriptor: &FieldDescriptor, number: f64) -> String {
        let precision = self.mode.precision(descriptor, &self.format);
        let fixed = format!("{:.*}", precision, number.abs());
        let (whole, fraction) = match fixed.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (fixed.as_str(), None),
        };
        let mut out = String::new();
        let is_zero = fixed.chars().all(|ch| ch == '0' || ch == '.');
        if number.is_sign_negative() && !is_zero {
            out.push('-');
        }
        out.push_str(&group_digits(whole, self.format.group_separator));
        if let Some(fraction) = fraction {
            out.push(self.format.decimal_separator);
            out.push_str(fraction);
        }
        out
    }

    /// Integers are grouped from their exact digits, never through `f64`.
    fn format_integer(&self, value: &Value) -> Option<String> {
        let digits = match value.as_i64() {
            Some(int) => int.to_string(),
            None => value.as_u64()?.to_string(),
        };
        let (sign, magnitude) = match digits.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", digits.as_str()),
        };
        Some(format!(
            "{sign}{}",
            group_digits(magnitude, self.format.group_separator)
        ))
    }

    fn render(&self, descriptor: &FieldDescriptor, value: &Value) -> Option<String> {
        if self.mode == NumericMode::Int
            && let Some(text) = self.format_integer(value)
        {
            return Some(text);
        }
        value
            .as_f64()
            .map(|number| self.format_number(descriptor, number))
    }
}

impl ValueFormatter for NumberFormatter {
    fn format_for_input(&self, descriptor: &FieldDescriptor, value: &Value) -> String {
        self.render(descriptor, value)
            .unwrap_or_else(|| value_to_string(value))
    }

    fn format_for_display(
        &self,
        descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        let Some(formatted) = self.render(descriptor, value) else {
            return String::new();
        };
        match self.mode {
            NumericMode::Currency => format!("{} {formatted}", self.format.currency_symbol),
            NumericMode::Percent => format!("{formatted}%"),
            NumericMode::Int | NumericMode::Float => formatted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use serde_json::json;

    fn parser(mode: NumericMode) -> NumberParser {
        NumberParser::new(mode, Arc::new(FormatSettings::default()))
    }

    fn formatter(mode: NumericMode) -> NumberFormatter {
        NumberFormatter::new(mode, Arc::new(FormatSettings::default()))
    }

    fn field(kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor::new("amount", kind)
    }

    #[test]
    fn int_keeps_leading_digits() {
        let field = field(FieldKind::Int);
        let parser = parser(NumericMode::Int);
        assert_eq!(parser.parse(&field, &json!("12abc")).unwrap(), json!(12));
        assert_eq!(parser.parse(&field, &json!("1,234")).unwrap(), json!(1234));
        assert_eq!(parser.parse(&field, &json!("-7.9")).unwrap(), json!(-7));
        assert_eq!(parser.parse(&field, &json!("abc")).unwrap(), Value::Null);
        assert_eq!(parser.parse(&field, &json!("  ")).unwrap(), Value::Null);
        assert_eq!(parser.parse(&field, &json!(true)).unwrap(), json!(1));
    }

    #[test]
    fn int_keeps_every_digit_of_large_values() {
        let field = field(FieldKind::Int);
        let parser = parser(NumericMode::Int);
        let big = json!(9007199254740993i64);
        assert_eq!(parser.parse(&field, &big).unwrap(), big);
        assert_eq!(
            parser.parse(&field, &json!("9,007,199,254,740,993")).unwrap(),
            big
        );
        assert_eq!(
            parser.parse(&field, &json!("18446744073709551615")).unwrap(),
            json!(u64::MAX)
        );
        let text = formatter(NumericMode::Int).format_for_input(&field, &big);
        assert_eq!(text, "9,007,199,254,740,993");
        assert_eq!(parser.parse(&field, &json!(text)).unwrap(), big);
        assert_eq!(
            formatter(NumericMode::Int).format_for_display(&field, &json!(-1200), None),
            "-1,200"
        );
    }

    #[test]
    fn int_rejects_values_beyond_its_range() {
        let field = field(FieldKind::Int);
        let parser = parser(NumericMode::Int);
        let err = parser
            .parse(&field, &json!("=99999999999*99999999999"))
            .unwrap_err();
        assert!(err.message.contains("out of range"), "{err}");
        assert!(parser.parse(&field, &json!(1e30)).is_err());
        assert!(parser.parse(&field, &json!("123456789012345678901234")).is_err());
    }

    #[test]
    fn expressions_are_evaluated_or_fail() {
        let field = field(FieldKind::Int);
        let parser = parser(NumericMode::Int);
        assert_eq!(parser.parse(&field, &json!("=2*(3+4)")).unwrap(), json!(14));
        let err = parser.parse(&field, &json!("=2*(3+")).unwrap_err();
        assert_eq!(err.key, "amount");
    }

    #[test]
    fn float_rounds_to_precision() {
        let field = field(FieldKind::Float).with_precision(2);
        let parser = parser(NumericMode::Float);
        assert_eq!(parser.parse(&field, &json!("3.14159")).unwrap(), json!(3.14));
        assert_eq!(parser.parse(&field, &json!(2.006)).unwrap(), json!(2.01));
    }

    #[test]
    fn currency_strips_symbol_and_separators() {
        let field = field(FieldKind::Currency);
        let parser = parser(NumericMode::Currency);
        assert_eq!(
            parser.parse(&field, &json!("$ 1,234.567")).unwrap(),
            json!(1234.57)
        );
    }

    #[test]
    fn european_separators_are_honoured() {
        let format = FormatSettings {
            group_separator: Some('.'),
            decimal_separator: ',',
            ..FormatSettings::default()
        };
        let field = field(FieldKind::Float).with_precision(2);
        let parser = NumberParser::new(NumericMode::Float, Arc::new(format.clone()));
        assert_eq!(parser.parse(&field, &json!("1.234,5")).unwrap(), json!(1234.5));
        let formatter = NumberFormatter::new(NumericMode::Float, Arc::new(format));
        assert_eq!(formatter.format_for_input(&field, &json!(1234.5)), "1.234,50");
    }

    #[test]
    fn display_adds_symbols() {
        let currency = field(FieldKind::Currency);
        assert_eq!(
            formatter(NumericMode::Currency).format_for_display(&currency, &json!(-1234.5), None),
            "$ -1,234.50"
        );
        let percent = field(FieldKind::Percent).with_precision(1);
        assert_eq!(
            formatter(NumericMode::Percent).format_for_display(&percent, &json!(12.5), None),
            "12.5%"
        );
        let int = field(FieldKind::Int);
        assert_eq!(
            formatter(NumericMode::Int).format_for_display(&int, &Value::Null, None),
            ""
        );
    }

    #[test]
    fn input_text_parses_back_to_the_same_value() {
        let field = field(FieldKind::Float);
        let value = json!(1234.5);
        let text = formatter(NumericMode::Float).format_for_input(&field, &value);
        assert_eq!(text, "1,234.500");
        assert_eq!(parser(NumericMode::Float).parse(&field, &json!(text)).unwrap(), value);
    }
}
