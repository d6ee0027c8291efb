//! Minimal CLI: shape → (doc | check | normalize)
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use json_shape::decode::DEFAULT_MAX_DEPTH;
use json_shape::doc::DEFAULT_INDENT;
use json_shape::{DecodeOptions, Dyn, Schema, Shape, WireValue, decode_with, documentation, encode, wire};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// document, validate and normalize JSON against a declarative shape
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print a human-readable outline of the shape
    Doc(DocOut),
    /// decode every input document and report the ones that don't fit
    Check(CheckRun),
    /// decode then re-encode every input document into canonical form
    Normalize(NormalizeOut),
}

#[derive(Args, Debug, Clone)]
struct ShapeSettings {
    /// JSON shape descriptor
    #[arg(long, short)]
    shape: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct DecodeSettings {
    /// deepest nesting of records, sums and lists accepted
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// reject record objects carrying undeclared keys
    #[arg(long, default_value_t = false)]
    deny_unknown_fields: bool,
}

#[derive(clap::Parser, Debug)]
struct DocOut {
    #[command(flatten)]
    shape_settings: ShapeSettings,

    /// root name (defaults to the shape file's stem)
    #[arg(long)]
    name: Option<String>,

    /// print the document tree as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// spaces per nesting level
    #[arg(long, default_value_t = DEFAULT_INDENT)]
    indent: usize,
}

#[derive(clap::Parser, Debug)]
struct CheckRun {
    #[command(flatten)]
    shape_settings: ShapeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    shape_settings: ShapeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    decode_settings: DecodeSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// pretty-print each document
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

/// One input document and where it came from. Unparsable documents are kept
/// so they can be reported alongside the rest.
struct Loaded {
    label: String,
    value: Result<WireValue>,
}

/// Result of checking one document.
struct Outcome {
    label: String,
    error: Option<String>,
}

enum Source {
    Stdin,
    File(PathBuf),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ShapeSettings {
    fn load(&self) -> Result<Schema<Dyn>> {
        let path = self.shape.display();
        let bytes = std::fs::read(&self.shape).with_context(|| format!("failed to read shape file {path}"))?;
        let shape = Shape::from_json_slice(&bytes).with_context(|| format!("invalid shape file {path}"))?;
        let schema = shape.compile().with_context(|| format!("malformed shape in {path}"))?;
        tracing::debug!(shape = %path, ?schema, "compiled shape");
        Ok(schema)
    }

    fn default_name(&self) -> String {
        self.shape
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "Root".to_string())
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Loaded>> {
        let sources = resolve_file_path_patterns(&self.input)?;
        tracing::debug!(count = sources.len(), ndjson = self.ndjson, "resolved inputs");
        let mut loaded = Vec::new();
        for source in sources {
            let (label, text) = match source {
                Source::Stdin => {
                    let mut text = String::new();
                    std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
                    ("<stdin>".to_string(), text)
                }
                Source::File(path) => {
                    let label = path.to_string_lossy().to_string();
                    let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read source file {label}"))?;
                    (label, text)
                }
            };
            if self.ndjson {
                for (line_number, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{label}:{}", line_number + 1);
                    let value = wire::parse_str(line).context("failed to parse JSON");
                    loaded.push(Loaded { label, value });
                }
            } else {
                let value = wire::parse_str(&text).context("failed to parse JSON source file");
                loaded.push(Loaded { label, value });
            }
        }
        Ok(loaded)
    }
}

impl DecodeSettings {
    fn options(&self) -> DecodeOptions {
        DecodeOptions {
            max_depth: self.max_depth,
            deny_unknown_fields: self.deny_unknown_fields,
        }
    }
}

impl DocOut {
    fn render(&self) -> Result<String> {
        let schema = self.shape_settings.load()?;
        let name = self.name.clone().unwrap_or_else(|| self.shape_settings.default_name());
        let document = documentation(&name, &schema);
        if self.json {
            Ok(format!("{}\n", serde_json::to_string_pretty(&document)?))
        } else {
            Ok(document.render_with(self.indent))
        }
    }
}

impl CheckRun {
    fn outcomes(&self) -> Result<Vec<Outcome>> {
        let schema = self.shape_settings.load()?;
        let options = self.decode_settings.options();
        let documents = self.input_settings.load()?;

        // schemas are immutable and shared read-only across workers
        let outcomes = documents
            .par_iter()
            .map(|document| {
                let error = match &document.value {
                    Ok(value) => decode_with(&schema, value, &options).err().map(|error| error.to_string()),
                    Err(error) => Some(format!("{error:#}")),
                };
                Outcome { label: document.label.clone(), error }
            })
            .collect();
        Ok(outcomes)
    }
}

impl NormalizeOut {
    fn normalized(&self) -> Result<String> {
        let schema = self.shape_settings.load()?;
        let options = self.decode_settings.options();
        let documents = self.input_settings.load()?;

        let normalized = documents
            .par_iter()
            .map(|document| -> Result<String> {
                let value = match &document.value {
                    Ok(value) => value,
                    Err(error) => bail!("failed to read {}: {error:#}", document.label),
                };
                let value = decode_with(&schema, value, &options)
                    .with_context(|| format!("failed to decode {}", document.label))?;
                let encoded = encode(&schema, &value);
                if self.pretty {
                    Ok(wire::to_string_pretty(&encoded)?)
                } else {
                    Ok(wire::to_string(&encoded))
                }
            })
            .collect::<Result<Vec<String>>>()?;

        let mut output = normalized.join("\n");
        output.push('\n');
        Ok(output)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Doc(target) => {
                print!("{}", target.render()?);
                Ok(())
            }
            Command::Check(target) => {
                let outcomes = target.outcomes()?;
                let mut failed = 0usize;
                for Outcome { label, error } in &outcomes {
                    match error {
                        None => println!("{} {label}", "ok".green()),
                        Some(error) => {
                            failed += 1;
                            println!("{} {label}: {error}", "failed".red());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} documents failed", outcomes.len());
                }
                Ok(())
            }
            Command::Normalize(target) => {
                let output = target.normalized()?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &output).with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    print!("{output}");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<Source>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(Source::File(entry?));
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }

    Ok(out)
}
