//! twolight CLI - derive a light `.tmTheme` from a dark one.

use std::path::PathBuf;
use std::time::Instant;

use camino::Utf8PathBuf;
use facet::Facet;
use facet_args as args;
use miette::{Result, miette};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use twolight::{ConversionReport, ConvertOptions, DEFAULT_NEAREST_THRESHOLD, ThemeConverter};

/// Convert a dark TextMate theme into its light variant.
///
/// Colours are remapped through the dark and light palette blocks of a Vim
/// colorscheme (`if &background ==# 'dark'` ... `else` ... `endif`).
#[derive(Debug, Facet)]
struct Args {
    /// Input dark theme (.tmTheme)
    #[facet(args::named, rename = "in")]
    input: PathBuf,

    /// Vim colorscheme providing the dark/light palette
    #[facet(args::named)]
    vim: PathBuf,

    /// Output light theme (.tmTheme)
    #[facet(args::named)]
    out: PathBuf,

    /// Output theme name (default: TwoLight)
    #[facet(args::named, default)]
    name: Option<String>,

    /// Output semanticClass (default: theme.light.two_light)
    #[facet(args::named, default)]
    semantic_class: Option<String>,

    /// Largest RGB distance for a nearest-colour match (default: 50)
    #[facet(args::named, default)]
    nearest_threshold: Option<f64>,

    /// Skip the scope selector fix-ups
    #[facet(args::named, default)]
    no_patch: bool,

    /// Print every nearest/unchanged colour remap with its rule and key
    #[facet(args::named, default)]
    log_non_exact: bool,

    /// Show debug logging
    #[facet(args::named, args::short = 'v', default)]
    verbose: bool,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }))
    .ok();

    let args: Args = facet_args::from_std_args().unwrap_or_else(|e| {
        if let Some(text) = e.help_text() {
            println!("{text}");
            std::process::exit(0);
        }
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    });

    init_tracing(args.verbose);

    let options = options_from_args(&args)?;
    let log_non_exact = args.log_non_exact;

    eprintln!(
        "{} {} -> {}",
        "twolight".green().bold(),
        options.input,
        options.output
    );

    let start = Instant::now();
    let report = ThemeConverter::new(options.clone()).run()?;
    let elapsed = start.elapsed();

    print_report(&report, log_non_exact);
    eprintln!(
        "\n  {} Wrote {} ({} bytes) in {:.2}s",
        "✓".green(),
        options.output.cyan(),
        report.bytes_written,
        elapsed.as_secs_f64()
    );

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "twolight=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn options_from_args(args: &Args) -> Result<ConvertOptions> {
    let utf8 = |flag: &str, path: &PathBuf| {
        Utf8PathBuf::from_path_buf(path.clone())
            .map_err(|p| miette!("--{flag} path is not valid UTF-8: {}", p.display()))
    };

    let mut options = ConvertOptions::new(
        utf8("in", &args.input)?,
        utf8("vim", &args.vim)?,
        utf8("out", &args.out)?,
    );
    if let Some(name) = &args.name {
        options.name = name.clone();
    }
    if let Some(class) = &args.semantic_class {
        options.semantic_class = class.clone();
    }
    let threshold = args.nearest_threshold.unwrap_or(DEFAULT_NEAREST_THRESHOLD);
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(miette!(
            "--nearest-threshold must be a non-negative number, got {threshold}"
        ));
    }
    options.nearest_threshold = threshold;
    options.patch_scopes = !args.no_patch;
    Ok(options)
}

fn print_report(report: &ConversionReport, log_non_exact: bool) {
    let applied = &report.applied;
    eprintln!("{}", "Results:".bold());
    eprintln!(
        "  {} rules, {} palette roles, {} scope patches",
        report.rules.to_string().cyan(),
        report.palette_roles.to_string().cyan(),
        report.patch_edits.to_string().cyan()
    );
    eprintln!(
        "  {} exact, {} nearest, {} unchanged, {} invalid colours",
        applied.exact.to_string().green(),
        applied.nearest.to_string().yellow(),
        applied.unchanged.to_string().red(),
        applied.invalid.to_string().dimmed()
    );

    if log_non_exact && !applied.events.is_empty() {
        eprintln!("\n{}", "Non-exact remaps:".bold());
        for event in &applied.events {
            eprintln!(
                "  {}\t{}\t{}\t{} -> {}",
                event.mode.as_str(),
                event.path,
                event.key,
                event.old,
                event.new
            );
        }
    }

    if !report.warnings.is_empty() {
        eprintln!(
            "\n  {} {} colour(s) have no palette equivalent and were kept:",
            "Warning:".yellow(),
            report.warnings.len()
        );
        for warning in &report.warnings {
            eprintln!("    {warning}");
        }
    }
}
