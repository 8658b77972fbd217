use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Locale-ish formatting rules shared by every control of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatSettings {
    pub group_separator: Option<char>,
    pub decimal_separator: char,
    pub float_precision: u8,
    pub currency_precision: u8,
    pub currency_symbol: String,
    /// `dd`, `mm` and `yyyy` placeholders, e.g. `dd-mm-yyyy`.
    pub date_format: String,
    pub check_true_label: Cow<'static, str>,
    pub check_false_label: Cow<'static, str>,
    pub search_delay_ms: u64,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            group_separator: Some(','),
            decimal_separator: '.',
            float_precision: 3,
            currency_precision: 2,
            currency_symbol: "$".to_string(),
            date_format: "dd-mm-yyyy".to_string(),
            check_true_label: Cow::Borrowed("Yes"),
            check_false_label: Cow::Borrowed("No"),
            search_delay_ms: 300,
        }
    }
}

impl FormatSettings {
    /// The configured date format as a `chrono` pattern. Literal `%` signs
    /// are escaped.
    pub fn chrono_date_pattern(&self) -> String {
        self.date_format
            .replace('%', "%%")
            .replace("yyyy", "%Y")
            .replace("mm", "%m")
            .replace("dd", "%d")
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let settings: Self =
            serde_json::from_value(value.clone()).context("failed to decode format settings")?;
        settings.check_date_format()?;
        Ok(settings)
    }

    pub fn check_date_format(&self) -> Result<()> {
        let pattern = self.chrono_date_pattern();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            bail!("date_format '{}' is not a usable date pattern", self.date_format);
        }
        Ok(())
    }
}

/// Construction-time options for controls, in the builder style of the
/// rest of the crate.
#[derive(Debug, Clone)]
pub struct ControlOptions {
    pub(crate) format: Arc<FormatSettings>,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            format: Arc::new(FormatSettings::default()),
        }
    }
}

impl ControlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FormatSettings) -> Self {
        self.format = Arc::new(format);
        self
    }

    pub fn with_currency_symbol(self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        self.map_format(|mut format| {
            format.currency_symbol = symbol;
            format
        })
    }

    pub fn with_currency_precision(self, precision: u8) -> Self {
        self.map_format(|mut format| {
            format.currency_precision = precision;
            format
        })
    }

    pub fn with_float_precision(self, precision: u8) -> Self {
        self.map_format(|mut format| {
            format.float_precision = precision;
            format
        })
    }

    pub fn with_separators(self, group: Option<char>, decimal: char) -> Self {
        self.map_format(|mut format| {
            format.group_separator = group;
            format.decimal_separator = decimal;
            format
        })
    }

    pub fn with_date_format(self, date_format: impl Into<String>) -> Self {
        let date_format = date_format.into();
        self.map_format(|mut format| {
            format.date_format = date_format;
            format
        })
    }

    pub fn with_check_labels(
        self,
        true_label: impl Into<Cow<'static, str>>,
        false_label: impl Into<Cow<'static, str>>,
    ) -> Self {
        let true_label = true_label.into();
        let false_label = false_label.into();
        self.map_format(|mut format| {
            format.check_true_label = true_label;
            format.check_false_label = false_label;
            format
        })
    }

    pub fn with_search_delay(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.map_format(|mut format| {
            format.search_delay_ms = millis;
            format
        })
    }

    pub fn format(&self) -> Arc<FormatSettings> {
        Arc::clone(&self.format)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.format.search_delay_ms)
    }

    fn map_format(mut self, map: impl FnOnce(FormatSettings) -> FormatSettings) -> Self {
        let updated = map((*self.format).clone());
        self.format = Arc::new(updated);
        self
    }
}
