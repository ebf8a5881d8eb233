//! CLI binary for pdf2candidates.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, prints the candidate table and writes the workbook.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2candidates::{
    check_toolchain, convert, export, extract_text, inspect, DegreePolicy, ExtractionConfig,
    ExtractionProgressCallback, PageMarker, PageSegmentationMode, PageSelection, ProgressCallback,
    RasterizerKind, RecognizerKind, ToolStatus, Toolchain,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const NO_CANDIDATES: &str = "No candidates found. Try another file.";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page. Pages may finish out of
/// order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking OCR toolchain…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reading");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running OCR on {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.page_elapsed(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, candidates: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        let mark = if failed == 0 { green("✔") } else { yellow("⚠") };
        eprintln!(
            "{} {} pages read ({} failed), {} candidates",
            mark,
            bold(&(total_pages - failed.min(total_pages)).to_string()),
            failed,
            bold(&candidates.to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract candidates and write candidates.xlsx
  pdf2candidates search-results.pdf

  # Choose the output file and OCR language
  pdf2candidates --lang ita+eng search-results.pdf -o shortlist.xlsx

  # Higher DPI, automatic page segmentation, pages 2-5
  pdf2candidates --dpi 300 --psm 3 --pages 2-5 search-results.pdf

  # Keep the OCR text for inspection
  pdf2candidates --dump-text ocr.txt search-results.pdf

  # Re-run the parser on saved OCR text (no OCR toolchain needed)
  pdf2candidates --from-text ocr.txt

  # Transcribe with a vision model instead of tesseract
  pdf2candidates --recognizer vision --provider openai --model gpt-4.1-mini scan.pdf

  # Is tesseract / poppler installed?
  pdf2candidates --check-toolchain

ENVIRONMENT VARIABLES:
  PDF2CANDIDATES_TESSERACT    Path to the tesseract executable
  PDF2CANDIDATES_POPPLER_DIR  Directory holding pdftoppm and pdfinfo
  PDFIUM_LIB_PATH             libpdfium (file or directory) for --rasterizer pdfium
  OPENAI_API_KEY              API key for --recognizer vision (or ANTHROPIC_API_KEY, ...)
  RUST_LOG                    Override log filtering (e.g. pdf2candidates=debug)
"#;

/// Extract candidate records from scanned PDF listings.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2candidates",
    version,
    about = "Extract candidate records from scanned PDF listings via OCR",
    long_about = "Rasterise each page of a PDF, run OCR on it, and parse the text into \
name / title / company / location / industry records. Prints a table and writes an xlsx workbook.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file (or OCR text file with --from-text).
    #[arg(required_unless_present = "check_toolchain")]
    input: Option<PathBuf>,

    /// Workbook to write.
    #[arg(short, long, env = "PDF2CANDIDATES_OUTPUT", default_value = export::XLSX_FILE_NAME)]
    output: PathBuf,

    /// Rendering DPI. Default: 200.
    #[arg(long, env = "PDF2CANDIDATES_DPI")]
    dpi: Option<u32>,

    /// Tesseract page segmentation mode (0–13). Default: 6, a single block of text.
    #[arg(long, env = "PDF2CANDIDATES_PSM", default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,

    /// OCR language(s), e.g. eng or ita+eng.
    #[arg(long, env = "PDF2CANDIDATES_LANG")]
    lang: Option<String>,

    /// Page rasteriser.
    #[arg(long, env = "PDF2CANDIDATES_RASTERIZER", value_enum, default_value = "poppler")]
    rasterizer: RasterizerArg,

    /// Text recognizer.
    #[arg(long, env = "PDF2CANDIDATES_RECOGNIZER", value_enum, default_value = "tesseract")]
    recognizer: RecognizerArg,

    /// Vision model ID (with --recognizer vision).
    #[arg(long, env = "PDF2CANDIDATES_MODEL")]
    model: Option<String>,

    /// Vision provider: openai, anthropic, gemini, ollama, … (with --recognizer vision).
    #[arg(long, env = "PDF2CANDIDATES_PROVIDER")]
    provider: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2CANDIDATES_PAGES", default_value = "all")]
    pages: String,

    /// When a name line must carry a connection degree ("- 1°").
    #[arg(long, env = "PDF2CANDIDATES_DEGREE_POLICY", value_enum, default_value = "auto")]
    degree_policy: DegreePolicyArg,

    /// Join pages without `--- Page N ---` markers.
    #[arg(long, env = "PDF2CANDIDATES_NO_PAGE_MARKERS")]
    no_page_markers: bool,

    /// Phrase removed from OCR text before parsing (repeatable). Default: "Mostra tutto".
    #[arg(long = "noise", env = "PDF2CANDIDATES_NOISE", value_delimiter = ',')]
    noise: Vec<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CANDIDATES_PASSWORD")]
    password: Option<String>,

    /// Seconds tesseract may spend on one page.
    #[arg(long, env = "PDF2CANDIDATES_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Pages recognised at once.
    #[arg(short, long, env = "PDF2CANDIDATES_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Print JSON to stdout instead of the table.
    #[arg(long, env = "PDF2CANDIDATES_JSON")]
    json: bool,

    /// Also write the concatenated OCR text to this file.
    #[arg(long, env = "PDF2CANDIDATES_DUMP_TEXT")]
    dump_text: Option<PathBuf>,

    /// Treat INPUT as OCR text and only run the parser.
    #[arg(long)]
    from_text: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Report whether the rasteriser and recognizer can run, then exit.
    #[arg(long)]
    check_toolchain: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CANDIDATES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "PDF2CANDIDATES_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2CANDIDATES_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterizerArg {
    Poppler,
    Pdfium,
}

impl From<RasterizerArg> for RasterizerKind {
    fn from(v: RasterizerArg) -> Self {
        match v {
            RasterizerArg::Poppler => RasterizerKind::Poppler,
            RasterizerArg::Pdfium => RasterizerKind::Pdfium,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RecognizerArg {
    Tesseract,
    Vision,
}

impl From<RecognizerArg> for RecognizerKind {
    fn from(v: RecognizerArg) -> Self {
        match v {
            RecognizerArg::Tesseract => RecognizerKind::Tesseract,
            RecognizerArg::Vision => RecognizerKind::Vision,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DegreePolicyArg {
    Optional,
    Required,
    Auto,
}

impl From<DegreePolicyArg> for DegreePolicy {
    fn from(v: DegreePolicyArg) -> Self {
        match v {
            DegreePolicyArg::Optional => DegreePolicy::Optional,
            DegreePolicyArg::Required => DegreePolicy::Required,
            DegreePolicyArg::Auto => DegreePolicy::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for everything.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && !cli.from_text
        && !cli.inspect_only
        && !cli.check_toolchain;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Toolchain probe ──────────────────────────────────────────────────
    if cli.check_toolchain {
        let report = check_toolchain(&config).await;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            print_status("Rasterizer", &report.rasterizer);
            print_status("Recognizer", &report.recognizer);
        }
        if !report.is_ready() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input file is required")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Parse saved OCR text ─────────────────────────────────────────────
    let records = if cli.from_text {
        let text = tokio::fs::read_to_string(&input)
            .await
            .with_context(|| format!("Failed to read OCR text from {}", input.display()))?;
        let records = extract_text(&text, &config);
        if cli.json {
            println!("{}", export::to_json(&records)?);
        }
        records
    } else {
        let output = convert(&input, &config)
            .await
            .context("Extraction failed")?;

        if let Some(ref path) = cli.dump_text {
            tokio::fs::write(path, &output.raw_text)
                .await
                .with_context(|| format!("Failed to write OCR text to {}", path.display()))?;
        }
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?
            );
        } else if !cli.quiet && !show_progress {
            eprintln!(
                "Read {}/{} pages in {}ms",
                output.stats.processed_pages,
                output.stats.processed_pages + output.stats.failed_pages,
                output.stats.total_duration_ms
            );
        }
        output.records
    };

    // ── Present and export ───────────────────────────────────────────────
    if records.is_empty() {
        eprintln!("{} {}", red("✘"), NO_CANDIDATES);
        return Ok(());
    }

    if !cli.json {
        print!("{}", export::render_table(&records));
    }

    export::write_xlsx(&records, &cli.output)
        .await
        .context("Failed to write workbook")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} candidates  →  {}",
            green("✔"),
            records.len(),
            bold(&cli.output.display().to_string()),
        );
    }

    Ok(())
}

fn print_status(role: &str, status: &ToolStatus) {
    let mark = if status.available {
        green("✓")
    } else {
        red("✗")
    };
    println!(
        "{} {:<11} {:<10} {}",
        mark,
        role,
        bold(&status.name),
        dim(&status.detail)
    );
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let marker = if cli.no_page_markers {
        PageMarker::None
    } else {
        PageMarker::Numbered
    };

    let mut builder = ExtractionConfig::builder()
        .toolchain(Toolchain::from_env())
        .psm(PageSegmentationMode::from_number(cli.psm))
        .rasterizer(cli.rasterizer.into())
        .recognizer(cli.recognizer.into())
        .concurrency(cli.concurrency)
        .ocr_timeout_secs(cli.ocr_timeout)
        .pages(pages)
        .page_marker(marker)
        .degree_policy(cli.degree_policy.into());

    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(ref lang) = cli.lang {
        builder = builder.language(lang);
    }
    if !cli.noise.is_empty() {
        builder = builder.noise_phrases(cli.noise.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_pages_forms() {
        assert!(matches!(parse_pages("ALL").unwrap(), PageSelection::All));
        assert!(matches!(parse_pages("4").unwrap(), PageSelection::Single(4)));
        assert!(matches!(
            parse_pages("2-5").unwrap(),
            PageSelection::Range(2, 5)
        ));
        match parse_pages("1, 3,5").unwrap() {
            PageSelection::Set(p) => assert_eq!(p, vec![1, 3, 5]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("first").is_err());
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "pdf2candidates",
            "scan.pdf",
            "--psm",
            "3",
            "--dpi",
            "300",
            "--degree-policy",
            "required",
            "--no-page-markers",
            "--noise",
            "Show all,Vedi tutto",
            "--ocr-timeout",
            "45",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.psm, PageSegmentationMode::Auto);
        assert_eq!(config.effective_dpi(), 300);
        assert_eq!(config.grammar.degree_policy, DegreePolicy::Required);
        assert!(matches!(config.page_marker, PageMarker::None));
        assert_eq!(config.grammar.noise_phrases, ["Show all", "Vedi tutto"]);
        assert_eq!(config.ocr_timeout_secs, 45);
        assert_eq!(cli.output, PathBuf::from(export::XLSX_FILE_NAME));
    }
}
