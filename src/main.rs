use clap::{ArgAction, Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod diagnostics;
mod graph;
mod pins;
mod render;
mod spec;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "rpm-depend")]
#[command(version, about = "Generate Makefile dependencies from RPM spec files", long_about = None)]
struct Cli {
    /// Spec files to include in the graph.
    #[arg(value_name = "SPEC", required = true)]
    specs: Vec<PathBuf>,

    /// Directory containing pin overlays.
    #[arg(short = 'P', long, value_name = "DIR")]
    pins_dir: Option<PathBuf>,

    /// Local path to the repositories.
    #[arg(short = 'r', long, value_name = "DIR", default_value = "repos", alias = "repos_path")]
    repos_path: String,

    /// Don't check that package name matches spec file name.
    #[arg(long = "no-package-name-check", action = ArgAction::SetFalse)]
    check_package_names: bool,

    /// --define='MACRO EXPR' defines MACRO with value EXPR.
    #[arg(short = 'D', long = "define", value_name = "'MACRO EXPR'")]
    defines: Vec<String>,

    /// Set rpmbuild toplevel directory [deprecated].
    #[arg(short = 't', long, value_name = "DIR")]
    topdir: Option<String>,

    /// Distribution tag used in RPM file names [deprecated].
    #[arg(short = 'd', long, value_name = "DIST")]
    dist: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Make)]
    format: Format,

    /// More logging on stderr (repeat for more).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Make,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Nothing reaches stdout unless the whole graph was built.
    let output = match run(&cli) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{}", diagnostics::error_line(&err));
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
        eprintln!("error: write output: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<String> {
    // 1) Macros. A malformed define stops everything before any spec is read.
    let defines = spec::parse_defines(&cli.defines)?;
    let (defines, mut prelude) =
        spec::with_deprecated(defines, cli.topdir.as_deref(), cli.dist.as_deref());

    let opts = spec::SpecOptions {
        check_package_name: cli.check_package_names,
        defines,
        repos_path: cli.repos_path.clone(),
    };
    let load = |path: &Path| spec::RpmSpec::load(path, &opts);

    // 2) Pins, then the requested specs with pins applied.
    let overlay = pins::PinOverlay::load(cli.pins_dir.as_deref(), &load)?;
    let resolution = pins::resolve(&cli.specs, &overlay, &load)?;
    prelude.extend(resolution.notices);

    tracing::info!(
        "{} specs, {} pins",
        resolution.specs.len(),
        overlay.len()
    );
    tracing::debug!(
        "spec order: {}",
        resolution.specs.file_names().collect::<Vec<_>>().join(" ")
    );

    // 3) Provides index and graph.
    let index = graph::ProvidesIndex::build(&resolution.specs)?;
    let graph = graph::build_graph(&prelude, &resolution.specs, &index)?;
    tracing::info!(
        "{} provided symbols, {} edges",
        index.len(),
        graph.edges().count()
    );

    // 4) Render.
    match cli.format {
        Format::Make => Ok(render::render_make(&graph)),
        Format::Json => render::render_json(&graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn repeated_defines_keep_order() {
        let cli = Cli::try_parse_from([
            "rpm-depend",
            "-D",
            "dist .el7",
            "--define",
            "_topdir /tmp",
            "a.spec",
        ])
        .unwrap();
        assert_eq!(cli.defines, vec!["dist .el7", "_topdir /tmp"]);
        assert!(cli.check_package_names);
        assert_eq!(cli.repos_path, "repos");
    }

    #[test]
    fn name_check_flag_disables_check() {
        let cli = Cli::try_parse_from(["rpm-depend", "--no-package-name-check", "a.spec"]).unwrap();
        assert!(!cli.check_package_names);
    }

    #[test]
    fn at_least_one_spec_is_required() {
        assert!(Cli::try_parse_from(["rpm-depend"]).is_err());
    }
}
