use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use config::{Config, Environment, File};
use pgr_datatypes::{ColumnRenderer, DatatypeRegistry, FieldDescriptor, RegistryOptions};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Render PostgreSQL column definitions from a JSON schema
#[derive(Parser, Debug)]
#[command(name = "pgr_coldef")]
#[command(about = "Render PostgreSQL column definitions from schema fields", long_about = None)]
struct Args {
    /// JSON file holding an array of fields (`-` reads stdin)
    schema: String,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Suffix appended to array types
    #[arg(long)]
    array_suffix: Option<String>,

    /// Quote column names (`--quote-identifiers=false` turns it off)
    #[arg(short, long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    quote_identifiers: Option<bool>,

    /// Add NOT NULL to columns with a DEFAULT clause
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    not_null_with_default: Option<bool>,

    /// Report problems with the registered datatypes before rendering
    #[arg(long)]
    check: bool,

    /// Config file (replaces the default search paths)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Lines,
    Table,
    Json,
}

/// Renderer configuration
#[derive(Debug, Deserialize)]
struct CliConfig {
    #[serde(default = "default_format")]
    format: OutputFormat,
    #[serde(flatten)]
    registry: RegistryOptions,
}

const fn default_format() -> OutputFormat { OutputFormat::Lines }

impl CliConfig {
    /// Load configuration with priority: CLI args > ENV > config file > defaults
    fn load(args: &Args) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // 1. Config file: explicit path, or the first default path that exists
        if let Some(path) = &args.config {
            builder = builder.add_source(File::from(path.as_path()));
            debug!("Loading config from: {}", path.display());
        } else if let Some(path) = config_paths().into_iter().find(|p| p.exists()) {
            debug!("Loading config from: {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        // 2. Environment variables (PGR_COLDEF_*)
        builder = builder.add_source(Environment::with_prefix("PGR_COLDEF").try_parsing(true));

        let mut config: Self = builder.build()?.try_deserialize()?;

        // 3. CLI args override everything
        if let Some(format) = args.format {
            config.format = format;
        }
        if let Some(suffix) = &args.array_suffix {
            config.registry.array_suffix.clone_from(suffix);
        }
        if let Some(quote) = args.quote_identifiers {
            config.registry.quote_identifiers = quote;
        }
        if let Some(not_null) = args.not_null_with_default {
            config.registry.not_null_with_default = not_null;
        }

        Ok(config)
    }
}

fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/pgr/pgr_coldef.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pgr").join("pgr_coldef.toml"));
    }
    paths.push(PathBuf::from("./pgr_coldef.toml"));
    // Later paths are more specific
    paths.reverse();
    paths
}

#[derive(Debug, Serialize)]
struct RenderedColumn<'a> {
    path: &'a str,
    #[serde(rename = "type")]
    logical_type: &'a str,
    array: bool,
    definition: String,
}

fn read_schema(source: &str) -> Result<Vec<FieldDescriptor>, Box<dyn std::error::Error>> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(Path::new(source))?
    };

    Ok(serde_json::from_str(&text)?)
}

fn print_columns(format: OutputFormat, columns: &[RenderedColumn<'_>]) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Lines => {
            for column in columns {
                println!("{}", column.definition);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Column", "Type", "Definition"]);
            for column in columns {
                let logical_type = if column.array {
                    format!("{}[]", column.logical_type)
                } else {
                    column.logical_type.to_string()
                };
                table.add_row(vec![column.path.to_string(), logical_type, column.definition.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(columns)?),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let args = Args::parse();
    let config = CliConfig::load(&args)?;
    let registry = DatatypeRegistry::from_options(&config.registry);

    if args.check {
        let problems = registry.validate();
        if !problems.is_empty() {
            for problem in &problems {
                eprintln!("✗ {problem}");
            }
            return Err(format!("{} datatype problem(s) found", problems.len()).into());
        }
        eprintln!("✓ {} datatypes registered, no problems", registry.len());
    }

    let fields = read_schema(&args.schema)?;
    info!("Rendering {} field(s) from {}", fields.len(), args.schema);

    let definitions = ColumnRenderer::render_columns(&registry, &fields)?;
    let columns: Vec<RenderedColumn<'_>> = fields
        .iter()
        .zip(definitions)
        .map(|(field, definition)| RenderedColumn {
            path: &field.path,
            logical_type: &field.logical_type,
            array: field.array,
            definition,
        })
        .collect();

    print_columns(config.format, &columns)?;
    Ok(())
}
