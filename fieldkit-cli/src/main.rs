use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use unicode_width::UnicodeWidthStr;

use fieldkit::io::{
    DocumentFormat, OutputDestination, OutputOptions, emit_document, load_descriptors, load_links,
    load_record, load_settings,
};
use fieldkit::{
    ControlOptions, ControlRegistry, ControlView, DisplayStatus, FormContext, FormLayout,
    PermissionSet, RecordStore,
};

const DEFAULT_DOCTYPE: &str = "Record";
const WRAP_WIDTH: usize = 72;

#[derive(Debug, Parser)]
#[command(
    name = "fieldkit",
    version,
    about = "Render a record's fields and apply edits through the control pipeline"
)]
struct Cli {
    /// Field descriptors: file path, inline payload, or "-" for stdin
    #[arg(short = 'f', long = "fields", value_name = "SPEC")]
    fields: String,

    /// Record document: file path, inline payload, or "-" for stdin
    #[arg(short = 'r', long = "record", value_name = "SPEC")]
    record: Option<String>,

    /// Link targets keyed by doctype then name, used to validate Link fields
    #[arg(short = 'l', long = "links", value_name = "SPEC")]
    links: Option<String>,

    /// Format settings (separators, precision, currency, date format)
    #[arg(long = "settings", value_name = "SPEC")]
    settings: Option<String>,

    /// Commit a value, in order. Values are read as JSON, falling back to text
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", action = ArgAction::Append)]
    sets: Vec<String>,

    /// Grant read permission only
    #[arg(long = "read-only")]
    read_only: bool,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Emit compact JSON/TOML rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut diagnostics = DiagnosticCollector::default();
    let stdin_specs = [
        Some(cli.fields.as_str()),
        cli.record.as_deref(),
        cli.links.as_deref(),
        cli.settings.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|spec| *spec == "-")
    .count();
    if stdin_specs > 1 {
        diagnostics.push_input("stdin", "only one input can be read from stdin");
    }
    let edits = parse_edits(&cli.sets, &mut diagnostics);
    let output = build_output_options(&cli, &mut diagnostics);
    diagnostics.into_result()?;

    let (contents, format) = load_text(&cli.fields, "fields")?;
    let document = load_descriptors(&contents, format).map_err(|err| eyre!("{err:#}"))?;
    let doctype = document.doctype.clone().unwrap_or_else(|| DEFAULT_DOCTYPE.to_string());

    let mut options = ControlOptions::new();
    if let Some(spec) = cli.settings.as_deref() {
        let (contents, format) = load_text(spec, "settings")?;
        let settings = load_settings(&contents, format).map_err(|err| eyre!("{err:#}"))?;
        options = options.with_format(settings);
    }
    let mut registry = ControlRegistry::new(options);
    if let Some(spec) = cli.links.as_deref() {
        let (contents, format) = load_text(spec, "links")?;
        let links = load_links(&contents, format).map_err(|err| eyre!("{err:#}"))?;
        registry = registry.with_link_validator(Arc::new(links));
    }
    let permissions = if cli.read_only {
        PermissionSet::read_only()
    } else {
        PermissionSet::full()
    };
    let ctx = FormContext::new(registry).with_permissions(Arc::new(permissions));

    let layout = match cli.record.as_deref() {
        Some(spec) => {
            let (contents, format) = load_text(spec, "record")?;
            let record =
                load_record(&contents, format, &doctype).map_err(|err| eyre!("{err:#}"))?;
            let store = Arc::new(RecordStore::new());
            let shared = store.insert(record);
            FormLayout::for_record(document.fields, shared, store, &ctx).await?
        }
        None => FormLayout::new(document.fields, &ctx)?,
    };
    layout.refresh();

    for (key, value) in edits {
        let outcome = layout
            .set_value(&key, value)
            .await
            .wrap_err_with(|| format!("failed to set '{key}'"))?;
        tracing::debug!(field = %key, ?outcome, "edit applied");
    }

    let views = layout.refresh();
    eprint!("{}", render_form(&views));
    let missing: Vec<String> = layout
        .missing_mandatory()
        .into_iter()
        .map(|field| field.display_label())
        .collect();
    if !missing.is_empty() {
        eprintln!("missing mandatory: {}", missing.join(", "));
    }

    emit_document(&layout.to_document(), &output).map_err(|err| eyre!("{err:#}"))?;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_edits(raw: &[String], diagnostics: &mut DiagnosticCollector) -> Vec<(String, Value)> {
    let mut edits = Vec::new();
    for item in raw {
        match item.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                let value = serde_json::from_str::<Value>(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                edits.push((key.trim().to_string(), value));
            }
            _ => diagnostics.push_input("set", format!("expected KEY=VALUE, got '{item}'")),
        }
    }
    edits
}

/// One line per visible field: status marker, aligned label, value.
fn render_form(views: &[ControlView]) -> String {
    let visible: Vec<&ControlView> = views.iter().filter(|view| !view.hidden).collect();
    let width = visible
        .iter()
        .map(|view| view.label.width())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for view in visible {
        let marker = match (view.status, view.mandatory_highlight, view.invalid) {
            (_, _, true) => '!',
            (_, true, _) => '*',
            (DisplayStatus::Write, _, _) => '>',
            _ => ' ',
        };
        let value = match (&view.input, &view.display) {
            (Some(input), _) => input.value.clone(),
            (None, Some(display)) => plain_text(display),
            (None, None) => String::new(),
        };
        let pad = " ".repeat(width - view.label.width());
        let indent = " ".repeat(width + 4);
        let options = textwrap::Options::new(WRAP_WIDTH).subsequent_indent(&indent);
        let wrapped = textwrap::wrap(&value, options).join("\n");
        let _ = writeln!(out, "{marker} {}{pad}  {wrapped}", view.label);
    }
    out
}

/// Terminal-friendly text from display markup.
fn plain_text(markup: &str) -> String {
    let with_breaks = markup.replace("<br>", "\n");
    let mut text = String::with_capacity(with_breaks.len());
    let mut in_tag = false;
    for ch in with_breaks.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn load_text(spec: &str, label: &str) -> Result<(String, DocumentFormat)> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return Ok((contents, DocumentFormat::default()));
    }
    let trimmed = spec.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok((spec.to_string(), DocumentFormat::Json));
    }
    let path = PathBuf::from(spec);
    let format = DocumentFormat::from_path(&path).unwrap_or_default();
    match read_from_source(&InputSource::File(path.clone())) {
        Ok(contents) => Ok((contents, format)),
        Err(err) if is_not_found(&err) => {
            tracing::debug!(label, "no such file, reading {label} as inline content");
            Ok((spec.to_string(), format))
        }
        Err(err) => Err(err.wrap_err(format!("failed to load {label} from {}", path.display()))),
    }
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

fn is_not_found(err: &Report) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}

fn build_output_options(cli: &Cli, diagnostics: &mut DiagnosticCollector) -> OutputOptions {
    let mut destinations = Vec::new();
    for raw in &cli.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
        } else if raw == "-" {
            destinations.push(OutputDestination::Stdout);
        } else {
            destinations.push(OutputDestination::file(raw));
        }
    }
    if destinations.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }

    let mut format: Option<DocumentFormat> = None;
    for destination in &destinations {
        let OutputDestination::File(path) = destination else {
            continue;
        };
        match (DocumentFormat::from_path(path), format) {
            (None, _) => diagnostics.push_output(format!(
                "cannot infer format from output file {}; use .json/.yaml/.toml",
                path.display()
            )),
            (Some(found), Some(existing)) if found != existing => {
                diagnostics.push_output(format!(
                    "output file {} uses {found} but other destinations use {existing}; align extensions",
                    path.display()
                ))
            }
            (Some(found), _) => format = Some(found),
        }
    }
    let format = format
        .or_else(|| {
            cli.record
                .as_deref()
                .and_then(|spec| DocumentFormat::from_path(Path::new(spec)))
        })
        .unwrap_or_default();

    OutputOptions::new(format)
        .with_pretty(!cli.no_pretty)
        .with_destinations(destinations)
}
