mod logger;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use expense_form::{FormLayout, GeneratorConfig, LayoutPreset, ReimbursementRecord};
use logger::StderrLogger;
use pdf_merge::inspect::{
    ComparisonView, ContentStreamsView, DeepView, DetailedView, SizesView, SummaryView,
};
use pdf_merge::{MergeOptions, RepairPolicy, RepairStrategy, TargetSize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Invoice used by the repair experiments when no path is given
const DEFAULT_INVOICE: &str = "京东发票.pdf";

/// Reference form the generated one is compared against
const REFERENCE_FORM: &str = "费用报销单_2025-11-07_08-31-27.pdf";

#[derive(Parser)]
#[command(name = "expdf", about = "Expense reimbursement PDF tools", version)]
struct Cli {
    /// More log output (-v debug, -vv trace); EXPDF_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a reimbursement form
    Generate {
        /// Output file
        #[arg(default_value = "generated-receipt.pdf")]
        output: PathBuf,

        /// Record JSON file (defaults to the built-in sample)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Layout preset
        #[arg(long, default_value = "a4-portrait", value_enum)]
        layout: LayoutArg,

        /// Layout JSON file, overrides --layout
        #[arg(long)]
        layout_file: Option<PathBuf>,

        /// Generator config JSON file (fonts, background, QR size)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Rendering backend
        #[arg(long, default_value = "pdf", value_enum)]
        backend: BackendArg,

        /// Browser executable for the browser backend
        #[arg(long)]
        browser: Option<PathBuf>,

        /// Browser timeout in seconds
        #[arg(long, default_value = "60")]
        browser_timeout: u64,
    },

    /// Merge PDFs, optionally normalizing every page to one size
    Merge {
        /// Target page size
        #[arg(long, default_value = "original", value_enum)]
        size: SizeArg,

        /// Keep scaled content at the bottom-left instead of centering it
        #[arg(long)]
        no_center: bool,

        /// Fail on pages without a content stream instead of repairing them
        #[arg(long)]
        strict: bool,

        /// Output PDF file
        output: PathBuf,

        /// Input PDF files, in order
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },

    /// Print page sizes and content statistics
    Inspect {
        path: PathBuf,

        /// Include content stream and resource details
        #[arg(long)]
        detailed: bool,
    },

    /// Print page sizes and paper classes
    CheckSize {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Print content stream details for every page
    CheckContent { path: PathBuf },

    /// Compare two PDFs page by page (size, drawing, fonts, XObjects)
    Compare {
        #[arg(default_value = REFERENCE_FORM)]
        reference: PathBuf,

        #[arg(default_value = "generated-receipt.pdf")]
        candidate: PathBuf,
    },

    /// Print the raw structure of every page
    DeepInspect {
        #[arg(default_value = DEFAULT_INVOICE)]
        path: PathBuf,
    },

    /// Re-embed every page into a fresh document (<stem>-fixed.pdf)
    Extract {
        #[arg(default_value = DEFAULT_INVOICE)]
        path: PathBuf,
    },

    /// Try the repair strategies in order until one works
    Fix {
        #[arg(default_value = DEFAULT_INVOICE)]
        path: PathBuf,
    },

    /// Save, reload and copy a document, reporting content at each step
    ReloadTest {
        #[arg(default_value = DEFAULT_INVOICE)]
        path: PathBuf,
    },

    /// Overlay a coordinate grid on a template image
    Grid {
        template: PathBuf,

        /// Output PDF file (defaults to <stem>-grid.pdf)
        output: Option<PathBuf>,
    },

    /// Generate the sample form and merge it with the sample invoice
    Demo,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    A4Portrait,
    A4Landscape,
    A5Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Vector PDF
    Pdf,
    /// Standalone HTML page
    Html,
    /// HTML printed to PDF by a headless browser
    Browser,
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    A4,
    B4,
    Original,
}

impl From<LayoutArg> for LayoutPreset {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::A4Portrait => Self::A4Portrait,
            LayoutArg::A4Landscape => Self::A4Landscape,
            LayoutArg::A5Landscape => Self::A5Landscape,
        }
    }
}

impl From<SizeArg> for TargetSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::A4 => Self::A4,
            SizeArg::B4 => Self::B4,
            SizeArg::Original => Self::Original,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = StderrLogger::new(StderrLogger::level_from(cli.verbose)).init() {
        eprintln!("Failed to install logger: {}", e);
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            output,
            data,
            layout,
            layout_file,
            config,
            backend,
            browser,
            browser_timeout,
        } => {
            let record = match data {
                Some(path) => ReimbursementRecord::load(&path)
                    .await
                    .with_context(|| format!("Failed to load record {}", path.display()))?,
                None => ReimbursementRecord::sample(),
            };
            for discrepancy in record.audit() {
                log::warn!("Record inconsistency: {}", discrepancy);
            }

            let layout = match layout_file {
                Some(path) => FormLayout::load(&path)
                    .await
                    .with_context(|| format!("Failed to load layout {}", path.display()))?,
                None => LayoutPreset::from(layout).layout(),
            };
            let config = match config {
                Some(path) => GeneratorConfig::load(&path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => GeneratorConfig::default(),
            };

            let metrics = match backend {
                BackendArg::Pdf => {
                    expense_form::generate_pdf(&record, &layout, &config, &output).await?
                }
                BackendArg::Html => {
                    expense_form::generate_html(&record, &layout, &config, &output).await?
                }
                BackendArg::Browser => {
                    expense_form::generate_browser_pdf(
                        &record,
                        &layout,
                        &config,
                        &output,
                        browser.as_deref(),
                        Some(Duration::from_secs(browser_timeout)),
                    )
                    .await?
                }
            };

            println!(
                "Generated form → {} ({} rows, {} blank)",
                output.display(),
                metrics.data_rows,
                metrics.filler_rows
            );
        }

        Commands::Merge {
            size,
            no_center,
            strict,
            output,
            inputs,
        } => {
            let options = MergeOptions {
                target_size: size.into(),
                center: !no_center,
                repair: if strict {
                    RepairPolicy::Strict
                } else {
                    RepairPolicy::SubstituteEmptyContent
                },
            };
            merge(&inputs, &output, &options).await?;
        }

        Commands::Inspect { path, detailed } => {
            let report = inspect(&path).await?;
            if detailed {
                print!("{}", DetailedView(&report));
            } else {
                print!("{}", SummaryView(&report));
            }
        }

        Commands::CheckSize { paths } => {
            check_sizes(&paths, &mut std::io::stdout()).await?;
        }

        Commands::CheckContent { path } => {
            let report = inspect(&path).await?;
            print!("{}", ContentStreamsView(&report));
        }

        Commands::Compare {
            reference,
            candidate,
        } => {
            ensure_exists(&reference).await?;
            ensure_exists(&candidate).await?;
            let comparison = pdf_merge::compare_files(&reference, &candidate)
                .await
                .context("Failed to compare documents")?;
            print!("{}", ComparisonView(&comparison));
        }

        Commands::DeepInspect { path } => {
            let report = inspect(&path).await?;
            print!("{}", DeepView(&report));
        }

        Commands::Extract { path } => {
            let bytes = read_existing(&path).await?;
            let fixed = tokio::task::spawn_blocking(move || pdf_merge::repair::reembed_pages(&bytes))
                .await??;

            let output = sibling(&path, "-fixed");
            tokio::fs::write(&output, &fixed).await?;
            println!("Wrote {}", output.display());

            let report = pdf_merge::inspect_file(&output).await?;
            print!("{}", ContentStreamsView(&report));
        }

        Commands::Fix { path } => {
            let bytes = read_existing(&path).await?;
            let report = tokio::task::spawn_blocking(move || {
                pdf_merge::repair_document(&bytes, &RepairStrategy::DEFAULT_ORDER)
            })
            .await??;

            for attempt in &report.attempts {
                match &attempt.outcome {
                    Ok(()) => println!("{}: succeeded", attempt.strategy.name()),
                    Err(message) => println!("{}: failed ({})", attempt.strategy.name(), message),
                }
            }

            let suffix = match report.strategy {
                RepairStrategy::Reembed => "-fixed",
                RepairStrategy::Resave => "-resaved",
            };
            let output = sibling(&path, suffix);
            tokio::fs::write(&output, &report.bytes).await?;
            println!("Wrote {}", output.display());
            if !report.all_pages_have_content {
                println!("Warning: some pages still have no content stream");
            }
        }

        Commands::ReloadTest { path } => {
            let bytes = read_existing(&path).await?;
            let probe =
                tokio::task::spawn_blocking(move || pdf_merge::reload_probe(&bytes)).await??;

            println!("Pages: {}", probe.pages);
            println!(
                "1. Original: {}/{} pages with content",
                probe.original_with_content, probe.pages
            );
            println!(
                "2. After save and reload: {}/{} pages with content",
                probe.reloaded_with_content, probe.pages
            );
            println!(
                "3. After copying into a new document: {}/{} pages with content",
                probe.merged_with_content, probe.pages
            );

            let output = sibling(&path, "-reload-merged");
            tokio::fs::write(&output, &probe.merged_bytes).await?;
            println!("Wrote {}", output.display());
        }

        Commands::Grid { template, output } => {
            ensure_exists(&template).await?;
            let output = output.unwrap_or_else(|| sibling(&template, "-grid"));
            let (width, height) = expense_form::render_grid(&template, &output).await?;
            println!(
                "Grid for {}x{} template → {}",
                width,
                height,
                output.display()
            );
        }

        Commands::Demo => demo().await?,
    }

    Ok(())
}

async fn merge(inputs: &[PathBuf], output: &Path, options: &MergeOptions) -> Result<()> {
    let report = pdf_merge::merge_pdfs(inputs, output, options).await?;

    for (path, pages) in &report.merged {
        println!("  {} ({} pages)", path.display(), pages);
    }
    for path in &report.skipped {
        println!("  {} (missing, skipped)", path.display());
    }
    if report.repaired_pages > 0 {
        println!("  {} pages had no content and were left blank", report.repaired_pages);
    }
    println!(
        "Merged {} pages ({}) → {}",
        report.total_pages,
        options.target_size.name(),
        report.output.display()
    );
    Ok(())
}

/// Write page sizes for every path, reporting unreadable files and moving
/// on. Returns the number of files that could not be read.
async fn check_sizes(paths: &[PathBuf], out: &mut impl Write) -> Result<usize> {
    let mut failed = 0;
    for path in paths {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            writeln!(out, "File not found: {}\n", path.display())?;
            failed += 1;
            continue;
        }
        match pdf_merge::inspect_file(path).await {
            Ok(report) => writeln!(out, "{}", SizesView(&report))?,
            Err(e) => {
                log::error!("Failed to read {}: {}", path.display(), e);
                writeln!(out, "Error reading {}: {}\n", path.display(), e)?;
                failed += 1;
            }
        }
    }
    Ok(failed)
}

async fn demo() -> Result<()> {
    let form = PathBuf::from("demo-报销单.pdf");
    let record = ReimbursementRecord::sample();
    expense_form::generate_pdf(
        &record,
        &FormLayout::default(),
        &GeneratorConfig::default(),
        &form,
    )
    .await?;
    println!("1. Generated {}", form.display());

    let inputs = [form.clone(), PathBuf::from(DEFAULT_INVOICE)];

    println!("2. Merging at original size");
    merge(&inputs, Path::new("demo-合并结果.pdf"), &MergeOptions::default()).await?;

    println!("3. Merging onto A4");
    let options = MergeOptions {
        target_size: TargetSize::A4,
        ..Default::default()
    };
    merge(&inputs, Path::new("demo-合并结果-A4.pdf"), &options).await?;

    Ok(())
}

async fn ensure_exists(path: &Path) -> Result<()> {
    if !tokio::fs::try_exists(path).await? {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

async fn read_existing(path: &Path) -> Result<Vec<u8>> {
    ensure_exists(path).await?;
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn inspect(path: &Path) -> Result<pdf_merge::PdfReport> {
    ensure_exists(path).await?;
    pdf_merge::inspect_file(path)
        .await
        .with_context(|| format!("Failed to inspect {}", path.display()))
}

/// `dir/name.pdf` → `dir/name{suffix}.pdf`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!("{}{}.pdf", stem, suffix))
}
