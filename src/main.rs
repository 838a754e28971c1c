use clap::{Parser, ValueEnum};
use config_template::fs_utils::{
    InPlaceOutput, create_output, is_stdin, open_source, read_source, same_file,
};
use config_template::{
    DEFAULT_MAX_INCLUDE_DEPTH, Delimiters, ExpandConfig, Expander, FsResolver, Result, SinkSet,
    TemplateError, find_directives,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directive:
  {{file "path/to/file"}}   - Replaced by the contents of path/to/file
  Paths may contain letters, digits, spaces and _ . - / \ < > | : ( ) & ;
  Included files are expanded too. A directive naming a missing file is an error.
  Includes may nest 64 levels deep by default (--max-depth, --no-depth-limit).

Examples:
  # Expand a template into a file
  config-template app.tmpl.yaml app.yaml
  # Expand into several files and echo to the screen
  config-template app.tmpl.yaml out/a.yaml out/b.yaml --print
  # Expand a template in place
  config-template app.yaml --overwrite
  # Read the template from stdin, print to stdout
  cat app.tmpl.yaml | config-template -
  # Use %file "..."% directives instead
  config-template app.tmpl app.conf --pattern % %
  # Resolve relative paths against another directory
  config-template app.tmpl.yaml app.yaml --base-dir ./parts
  # List directives in a template
  config-template app.tmpl.yaml --list=json
  # Check every referenced file exists
  config-template app.tmpl.yaml --dry-run
"#;

/// Merge file contents into a template.
#[derive(Parser, Debug)]
#[command(
    name = "config-template",
    version,
    author = "https://vnteamopen.com",
    about = "A tool to merge file contents into a template. Embedded pattern is {{file \"\"}}",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Template file to expand. Use '-' for stdin.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output files (defaults to stdout when none are given and --overwrite is off)
    #[arg(value_name = "OUTPUTS")]
    outputs: Vec<PathBuf>,

    /// Replace INPUT with its expanded content
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// Also print the expanded content to stdout
    #[arg(short, long)]
    print: bool,

    /// Delimiters wrapping `file "<path>"`, e.g. --pattern '<<' '>>'
    #[arg(long, num_args = 2, value_names = ["OPEN", "CLOSE"])]
    pattern: Vec<String>,

    /// Base directory for resolving relative directive paths
    #[arg(short, long, value_name = "DIR", env = "CONFIG_TEMPLATE_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Refuse directive paths that escape the base directory
    #[arg(long)]
    confine: bool,

    /// Maximum include nesting depth
    #[arg(short = 'd', long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_INCLUDE_DEPTH)]
    max_depth: usize,

    /// Remove the include nesting limit
    #[arg(long, conflicts_with = "max_depth")]
    no_depth_limit: bool,

    /// Check that referenced files exist without writing any output
    #[arg(long, conflicts_with = "list")]
    dry_run: bool,

    /// List directives in the template (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain", conflicts_with = "dry_run")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// Simple list of directive paths
    Plain,
    /// Detailed information about each directive
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize, Deserialize)]
struct DirectiveInfo {
    path: String,
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let config = build_config(&cli);
    let result = if cli.dry_run {
        dry_run(&cli, &config)
    } else if let Some(list_format) = cli.list {
        list_directives(&cli, list_format, &config)
    } else {
        expand(&cli, &config)
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> ExpandConfig {
    let delimiters = if cli.pattern.is_empty() {
        Delimiters::default()
    } else {
        Delimiters::from_pair(&cli.pattern)
    };

    ExpandConfig {
        delimiters,
        base_dir: cli.base_dir.clone(),
        confine_to_base: cli.confine,
        max_include_depth: (!cli.no_depth_limit).then_some(cli.max_depth),
    }
}

fn expand(cli: &Cli, config: &ExpandConfig) -> Result<()> {
    let reading_stdin = is_stdin(&cli.input);
    if cli.overwrite && reading_stdin {
        return Err(TemplateError::StdinOverwrite);
    }

    let source_name = if reading_stdin {
        "<stdin>".to_string()
    } else {
        cli.input.display().to_string()
    };
    info!("Reading template from {source_name}");
    let source: Box<dyn Read> = if reading_stdin {
        Box::new(io::stdin().lock())
    } else {
        Box::new(open_source(&cli.input)?)
    };

    // An output naming the input must not truncate it before it is read
    let (input_outputs, outputs): (Vec<&PathBuf>, Vec<&PathBuf>) = cli
        .outputs
        .iter()
        .partition(|output| !reading_stdin && same_file(output, &cli.input));
    if !input_outputs.is_empty() {
        info!("Output names the input, writing it in place");
    }

    let mut sinks = SinkSet::new();
    let in_place = if cli.overwrite || !input_outputs.is_empty() {
        let (file, in_place) = InPlaceOutput::create(&cli.input)?;
        sinks.push(source_name.clone(), file);
        Some(in_place)
    } else {
        None
    };
    for output in outputs {
        sinks.push(output.display().to_string(), create_output(output)?);
    }
    if cli.print || sinks.is_empty() {
        sinks.push_stdout();
    }
    debug!(sinks = ?sinks, "writing expanded output");

    Expander::from_config(config).expand(source, &source_name, &mut sinks)?;
    sinks.finish()?;

    if let Some(in_place) = in_place {
        in_place.persist()?;
    }

    info!("Processing complete!");
    Ok(())
}

fn dry_run(cli: &Cli, config: &ExpandConfig) -> Result<()> {
    info!("Performing dry run - validating directives...");

    let template = read_source(&cli.input)?;
    let directives = find_directives(&template, &config.delimiters);
    let resolver = FsResolver::new(config.base_dir.clone(), config.confine_to_base);

    let mut valid_count = 0;
    let mut invalid_count = 0;

    for directive in &directives {
        match resolver.locate(&directive.path) {
            Ok(p) if p.is_file() => {
                info!("✓ {} -> {}", directive.path, p.display());
                valid_count += 1;
            }
            Ok(p) => {
                warn!("✗ {} -> {} (not found)", directive.path, p.display());
                invalid_count += 1;
            }
            Err(e) => {
                error!("✗ {} -> Error: {}", directive.path, e);
                invalid_count += 1;
            }
        }
    }

    println!("\nSummary: {} directives found", directives.len());
    if valid_count > 0 {
        println!("  ✓ {valid_count} valid");
    }
    if invalid_count > 0 {
        println!("  ✗ {invalid_count} invalid");
        return Err(TemplateError::UnresolvedDirectives {
            count: invalid_count,
            total: directives.len(),
        });
    }

    Ok(())
}

fn list_directives(cli: &Cli, format: ListFormat, config: &ExpandConfig) -> Result<()> {
    debug!("Listing template directives...");

    let template = read_source(&cli.input)?;
    let directives = find_directives(&template, &config.delimiters);
    let resolver = FsResolver::new(config.base_dir.clone(), config.confine_to_base);

    let infos: Vec<DirectiveInfo> = directives
        .into_iter()
        .map(|directive| {
            let mut info = DirectiveInfo {
                path: directive.path,
                start: directive.start,
                end: directive.end,
                resolved: None,
                exists: None,
                size: None,
                error: None,
            };
            match resolver.locate(&info.path) {
                Ok(p) => {
                    info.exists = Some(p.is_file());
                    info.size = std::fs::metadata(&p)
                        .ok()
                        .filter(|m| m.is_file())
                        .map(|m| m.len());
                    info.resolved = Some(p.display().to_string());
                }
                Err(e) => info.error = Some(e.to_string()),
            }
            info
        })
        .collect();

    match format {
        ListFormat::Plain => {
            for info in &infos {
                println!("{}", info.path);
            }
        }
        ListFormat::Detailed => {
            for info in &infos {
                println!("Directive: {}", info.path);
                println!("  Position: {}..{}", info.start, info.end);
                if let Some(resolved) = &info.resolved {
                    println!("  Path: {resolved}");
                }
                if let Some(exists) = info.exists {
                    println!("  Exists: {}", if exists { "yes" } else { "no" });
                }
                if let Some(size) = info.size {
                    println!("  Size: {size} bytes");
                }
                if let Some(error) = &info.error {
                    println!("  Error: {error}");
                }
                println!();
            }
        }
        ListFormat::Json => {
            let json = serde_json::to_string_pretty(&infos)?;
            println!("{json}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_outputs_and_flags() {
        let cli = Cli::try_parse_from([
            "config-template",
            "in.tmpl",
            "a.txt",
            "b.txt",
            "--print",
            "--pattern",
            "<<",
            ">>",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("in.tmpl"));
        assert_eq!(cli.outputs, [PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert!(cli.print);
        assert!(!cli.overwrite);

        let config = build_config(&cli);
        assert_eq!(config.delimiters, Delimiters::new("<<", ">>"));
        assert_eq!(config.max_include_depth, Some(DEFAULT_MAX_INCLUDE_DEPTH));
    }

    #[test]
    fn test_cli_default_config() {
        let cli = Cli::try_parse_from(["config-template", "in.tmpl", "--no-depth-limit"]).unwrap();
        let config = build_config(&cli);
        assert_eq!(config.delimiters, Delimiters::default());
        assert_eq!(config.max_include_depth, None);
        assert!(cli.outputs.is_empty());
    }

    #[test]
    fn test_cli_pattern_needs_two_values() {
        assert!(Cli::try_parse_from(["config-template", "in.tmpl", "--pattern", "%"]).is_err());
    }

    fn cli_for(args: &[&Path]) -> Cli {
        let mut argv = vec![PathBuf::from("config-template")];
        argv.extend(args.iter().map(|p| p.to_path_buf()));
        Cli::try_parse_from(argv).unwrap()
    }

    fn write_template(dir: &Path) -> PathBuf {
        fs::write(dir.join("inc.txt"), "INC\n").unwrap();
        let template = dir.join("t.tmpl");
        fs::write(
            &template,
            format!("x {{{{file \"{}\"}}}} y", dir.join("inc.txt").display()),
        )
        .unwrap();
        template
    }

    #[test]
    fn test_output_naming_input_is_written_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let template = write_template(temp_dir.path());

        let cli = cli_for(&[&template, &template]);
        expand(&cli, &build_config(&cli)).unwrap();
        assert_eq!(fs::read_to_string(&template).unwrap(), "x INC\n y");
    }

    #[test]
    fn test_output_naming_input_alongside_other_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let template = write_template(temp_dir.path());
        let other = temp_dir.path().join("out.txt");
        let alias = temp_dir.path().join(".").join("t.tmpl");

        let cli = cli_for(&[&template, &other, &alias]);
        expand(&cli, &build_config(&cli)).unwrap();
        assert_eq!(fs::read_to_string(&template).unwrap(), "x INC\n y");
        assert_eq!(fs::read_to_string(&other).unwrap(), "x INC\n y");
    }

    #[test]
    fn test_failed_expansion_keeps_input_output() {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("t.tmpl");
        fs::write(&template, "{{file \"/no/such/file\"}}").unwrap();

        let cli = cli_for(&[&template, &template]);
        assert!(expand(&cli, &build_config(&cli)).is_err());
        assert_eq!(
            fs::read_to_string(&template).unwrap(),
            "{{file \"/no/such/file\"}}"
        );
    }

    #[test]
    fn test_dry_run_reports_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let template = write_template(temp_dir.path());
        let cli = cli_for(&[&template, Path::new("--dry-run")]);
        dry_run(&cli, &build_config(&cli)).unwrap();

        let broken = temp_dir.path().join("broken.tmpl");
        fs::write(&broken, "{{file \"inc.txt\"}} {{file \"/no/such/file\"}}").unwrap();
        let cli = Cli::try_parse_from([
            OsStr::new("config-template"),
            broken.as_os_str(),
            OsStr::new("--dry-run"),
            OsStr::new("--base-dir"),
            temp_dir.path().as_os_str(),
        ])
        .unwrap();
        let err = dry_run(&cli, &build_config(&cli)).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnresolvedDirectives { count: 1, total: 2 }
        ));
    }

    #[test]
    fn test_cli_list_default_format() {
        let cli = Cli::try_parse_from(["config-template", "in.tmpl", "--list"]).unwrap();
        assert_eq!(cli.list, Some(ListFormat::Plain));
        assert!(Cli::try_parse_from(["config-template", "in.tmpl", "--list", "--dry-run"]).is_err());
    }
}
