use clap::{Parser, Subcommand, ValueEnum};
use sheetgen::config::{ProjectConfig, SortStrategy, CONFIG_FILE};
use sheetgen::persist::RAW_DOCUMENT;
use sheetgen::{extract_to, Compiler, EmitContext, Workbook};
use std::path::{Path, PathBuf};
use std::process;

/// sheetgen: compile a spreadsheet schema into model, route and emission documents
#[derive(Parser)]
#[command(name = "sheetgen", version, about)]
struct Cli {
    /// Path to the project config file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Output format for command results
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Bounded,
    Topological,
}

impl From<SortArg> for SortStrategy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Bounded => SortStrategy::BoundedPasses,
            SortArg::Topological => SortStrategy::Topological,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Extract a downloaded workbook into the raw schema document
    Extract {
        /// Workbook file (.json, .yaml, .xlsx, .ods, ...)
        workbook: PathBuf,
        /// Directory to write raw.json into (default: output_dir from config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Compile a raw schema document into schema, routes and manifest documents
    Compile {
        /// Raw schema document (default: <out-dir>/raw.json)
        #[arg(long)]
        raw: Option<PathBuf>,
        #[command(flatten)]
        options: CompileOptions,
    },

    /// Extract and compile in one run
    Build {
        /// Workbook file (.json, .yaml, .xlsx, .ods, ...)
        workbook: PathBuf,
        #[command(flatten)]
        options: CompileOptions,
    },

    /// Show models in emission order with their imports and routes
    Routes {
        /// Directory holding the compiled documents (default: output_dir from config)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// List the sheets of a workbook and whether each is a model sheet
    Sheets {
        /// Workbook file (.json, .yaml, .xlsx, .ods, ...)
        workbook: PathBuf,
    },

    /// List the registered domain types
    Types,
}

#[derive(clap::Args)]
struct CompileOptions {
    /// Directory to write the documents into (default: output_dir from config)
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Import path of the generated application module
    #[arg(long)]
    module_path: Option<String>,
    /// Model ordering strategy
    #[arg(long)]
    sort: Option<SortArg>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // Machine-readable error on stderr
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let project = ProjectConfig::load(&cli.config)?.with_env();

    match cli.command {
        Command::Extract { workbook, out_dir } => {
            let dir = out_dir.unwrap_or_else(|| PathBuf::from(project.output_dir()));
            let (extraction, path) = extract_to(&workbook, &dir)?;
            let models: usize = extraction.schema.packages.values().map(|m| m.len()).sum();
            print_output(
                &serde_json::json!({
                    "ok": true,
                    "written": path.display().to_string(),
                    "packages": extraction.schema.packages.keys().collect::<Vec<_>>(),
                    "models": models,
                    "partials": extraction.partials.partials.keys().collect::<Vec<_>>(),
                }),
                &cli.format,
            )?;
        }

        Command::Compile { raw, options } => {
            let dir = out_dir(&project, &options);
            let raw = raw.unwrap_or_else(|| dir.join(RAW_DOCUMENT));
            let compiler = compiler(project, &options)?;
            let compilation = compiler.compile_file(&raw)?;
            report_compilation(&compilation, &dir, &cli.format)?;
        }

        Command::Build { workbook, options } => {
            let dir = out_dir(&project, &options);
            let compiler = compiler(project, &options)?;
            let (extraction, _) = extract_to(&workbook, &dir)?;
            let compilation = compiler.compile(&extraction)?;
            report_compilation(&compilation, &dir, &cli.format)?;
        }

        Command::Routes { out_dir } => {
            let dir = out_dir.unwrap_or_else(|| PathBuf::from(project.output_dir()));
            let context = EmitContext::load(&dir)?;
            let models: Vec<_> = context
                .models()
                .map(|model| {
                    serde_json::json!({
                        "model": format!("{}.{}", model.manifest.package, model.manifest.model),
                        "file": format!("{}/{}", model.manifest.package, model.manifest.file_stem),
                        "imports": model.manifest.imports,
                        "primary_key": model.manifest.primary_key,
                        "routes": model.routes,
                    })
                })
                .collect();
            print_output(
                &serde_json::json!({
                    "module_path": context.manifest.module_path,
                    "models": models,
                }),
                &cli.format,
            )?;
        }

        Command::Sheets { workbook } => {
            let workbook = Workbook::open(&workbook)?;
            let sheets: Vec<_> = workbook
                .sheets
                .iter()
                .map(|sheet| {
                    serde_json::json!({
                        "name": sheet.name,
                        "rows": sheet.rows.len(),
                        "model_sheet": sheet.is_model_sheet(),
                    })
                })
                .collect();
            print_output(&serde_json::Value::Array(sheets), &cli.format)?;
        }

        Command::Types => {
            let registry = sheetgen::TypeRegistry::standard()?;
            let types: serde_json::Map<_, _> = registry
                .entries()
                .map(|(name, domain_type)| {
                    let descriptor = domain_type.descriptor();
                    (
                        name.to_string(),
                        serde_json::json!({
                            "type": descriptor.base(),
                            "length": descriptor.length(),
                            "import": domain_type.import(),
                        }),
                    )
                })
                .collect();
            print_output(&serde_json::Value::Object(types), &cli.format)?;
        }
    }

    Ok(())
}

fn out_dir(project: &ProjectConfig, options: &CompileOptions) -> PathBuf {
    options
        .out_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(project.output_dir()))
}

fn compiler(
    mut project: ProjectConfig,
    options: &CompileOptions,
) -> Result<Compiler, Box<dyn std::error::Error>> {
    if let Some(module_path) = &options.module_path {
        project.module_path = Some(module_path.clone());
    }
    if let Some(sort) = options.sort {
        project.sort = Some(sort.into());
    }
    Ok(Compiler::new(project.compiler_config()?)?)
}

fn report_compilation(
    compilation: &sheetgen::Compilation,
    dir: &Path,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = compilation.write(dir)?;
    print_output(
        &serde_json::json!({
            "ok": true,
            "written": written.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "order": compilation.order(),
            "diagnostics": compilation.diagnostics,
        }),
        format,
    )
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}
