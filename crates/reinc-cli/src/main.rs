use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use log::{debug, info, warn, LevelFilter};
use reinc_core::{preset, ReincConfig, Replacer, ReplacerConfig};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "reinc", author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: reinc.yml in $XDG_CONFIG_HOME/reinc or .)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rules file (default: reinc-replacer.yml)
    #[arg(short, long)]
    replacer: Option<PathBuf>,

    /// Built-in rule preset (sh, c), used when no rules file is given
    #[arg(short, long)]
    preset: Option<String>,

    /// Output file, committed only if every input expands (stdout if not provided)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum nesting depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Refuse to include files outside this directory
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Debug output
    #[arg(long)]
    debug: bool,

    /// Input files; `-` or no argument reads stdin
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let level = log_level(&cli, &config);
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(level.to_string()));
    if let Some(unknown) = unknown_log_level(&config) {
        warn!("Ignoring unknown log level {:?}", unknown);
    }
    debug!("{:?}", config);

    let rules = replacer_config(&cli, &config)?;
    let replacer = build_replacer(&rules, &config)?;

    write_output(&replacer, &cli.inputs, config.output.as_deref())
}

/// Config file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<ReincConfig> {
    let config = ReincConfig::discover(cli.config.as_deref())
        .context("Failed to load config file")?
        .merge_env();
    Ok(apply_flags(config, cli))
}

fn apply_flags(mut config: ReincConfig, cli: &Cli) -> ReincConfig {
    if let Some(replacer) = &cli.replacer {
        config.replacer = replacer.clone();
    }
    if let Some(name) = &cli.preset {
        config.preset = Some(name.clone());
    }
    if let Some(output) = &cli.output {
        config.output = Some(output.clone());
    }
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(root) = &cli.root_dir {
        config.root_dir = Some(root.clone());
    }
    config
}

fn log_level(cli: &Cli, config: &ReincConfig) -> LevelFilter {
    if cli.debug {
        return LevelFilter::Debug;
    }
    if cli.verbose {
        return LevelFilter::Info;
    }
    config
        .log_level
        .as_deref()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// A configured level that `log_level` had to fall back from.
fn unknown_log_level(config: &ReincConfig) -> Option<&str> {
    config
        .log_level
        .as_deref()
        .filter(|level| level.parse::<LevelFilter>().is_err())
}

/// An explicit `--replacer` wins, then a preset, then the default rules file.
fn replacer_config(cli: &Cli, config: &ReincConfig) -> Result<ReplacerConfig> {
    if cli.replacer.is_none() {
        if let Some(name) = &config.preset {
            info!("Using preset: {}", name);
            return Ok(preset(name)?);
        }
    }

    info!("Reading rules from {}", config.replacer.display());
    ReplacerConfig::from_file(&config.replacer)
        .with_context(|| format!("Failed to load rules from {}", config.replacer.display()))
}

fn build_replacer(rules: &ReplacerConfig, config: &ReincConfig) -> Result<Replacer> {
    let mut replacer = Replacer::from_config(rules)
        .context("Invalid rule")?
        .with_max_depth(config.max_depth);

    if let Some(root) = &config.root_dir {
        debug!("Sandbox root: {}", root.display());
        replacer = replacer.with_root_dir(root);
    }

    Ok(replacer)
}

/// Expand every input into stdout or, atomically, into `output`.
fn write_output(replacer: &Replacer, inputs: &[PathBuf], output: Option<&Path>) -> Result<()> {
    match output {
        Some(dest) => {
            let dir = match dest.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let mut tmp = tempfile::Builder::new()
                .prefix("reinc-")
                .tempfile_in(dir)
                .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

            {
                let mut writer = BufWriter::new(tmp.as_file_mut());
                process_inputs(replacer, inputs, &mut writer)?;
                writer.flush().context("Failed to write output")?;
            }

            tmp.persist(dest)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            info!("Output written to {}", dest.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            process_inputs(replacer, inputs, &mut writer)?;
            writer.flush().context("Failed to write output")?;
        }
    }
    Ok(())
}

fn process_inputs<W: Write>(
    replacer: &Replacer,
    inputs: &[PathBuf],
    writer: &mut W,
) -> Result<()> {
    if inputs.is_empty() {
        return process(replacer, Path::new("-"), writer);
    }
    for input in inputs {
        process(replacer, input, writer)?;
    }
    Ok(())
}

fn process<W: Write>(replacer: &Replacer, input: &Path, writer: &mut W) -> Result<()> {
    if input == Path::new("-") {
        info!("Reading from stdin");
        replacer
            .replace(io::stdin().lock(), writer)
            .context("Failed to expand stdin")?;
    } else {
        info!("Processing {}", input.display());
        let consumed = replacer
            .replace_file(input, writer)
            .with_context(|| format!("Failed to expand {}", input.display()))?;
        debug!("Consumed {} bytes from {}", consumed, input.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("reinc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&["-p", "sh", "-o", "out.sh", "--max-depth", "4", "-v", "a.sh", "b.sh"]);
        assert_eq!(cli.preset.as_deref(), Some("sh"));
        assert_eq!(cli.output, Some(PathBuf::from("out.sh")));
        assert_eq!(cli.max_depth, Some(4));
        assert!(cli.verbose);
        assert_eq!(cli.inputs, vec![PathBuf::from("a.sh"), PathBuf::from("b.sh")]);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&["-r", "rules.json", "--root-dir", "/srv"]);
        let config = apply_flags(ReincConfig::default().with_max_depth(9), &cli);
        assert_eq!(config.replacer, PathBuf::from("rules.json"));
        assert_eq!(config.root_dir, Some(PathBuf::from("/srv")));
        assert_eq!(config.max_depth, 9);
    }

    #[test]
    fn test_log_level() {
        let config = ReincConfig::default().with_log_level("error");
        assert_eq!(log_level(&parse(&["--debug"]), &config), LevelFilter::Debug);
        assert_eq!(log_level(&parse(&["-v"]), &config), LevelFilter::Info);
        assert_eq!(log_level(&parse(&[]), &config), LevelFilter::Error);
        assert_eq!(log_level(&parse(&[]), &ReincConfig::default()), LevelFilter::Warn);
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_warn() {
        let config = ReincConfig::default().with_log_level("loud");
        assert_eq!(log_level(&parse(&[]), &config), LevelFilter::Warn);
        assert_eq!(unknown_log_level(&config), Some("loud"));

        let known = ReincConfig::default().with_log_level("info");
        assert_eq!(unknown_log_level(&known), None);
        assert_eq!(unknown_log_level(&ReincConfig::default()), None);
    }

    #[test]
    fn test_preset_used_without_explicit_replacer() {
        let cli = parse(&[]);
        let config = ReincConfig::default().with_preset("c");
        let rules = replacer_config(&cli, &config).unwrap();
        assert_eq!(rules, preset("c").unwrap());
    }

    #[test]
    fn test_explicit_replacer_beats_preset() {
        let dir = tempfile::tempdir().unwrap();
        let rules_path = dir.path().join("rules.yml");
        fs::write(&rules_path, "rules:\n  - pattern: '@(\\w+)'\n    path_format: $1\n").unwrap();

        let cli = parse(&["-r", rules_path.to_str().unwrap(), "-p", "sh"]);
        let config = apply_flags(ReincConfig::default(), &cli);
        let rules = replacer_config(&cli, &config).unwrap();
        assert_eq!(rules.rules.len(), 1);
        assert_eq!(rules.rules[0].pattern, r"@(\w+)");
    }

    #[test]
    fn test_unknown_preset() {
        let cli = parse(&[]);
        let config = ReincConfig::default().with_preset("cobol");
        assert!(replacer_config(&cli, &config).is_err());
    }

    #[test]
    fn test_output_file_is_committed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inc.h"), "int x;").unwrap();
        let input = dir.path().join("main.c");
        fs::write(&input, "#include \"inc.h\"\nint main;\n").unwrap();
        let dest = dir.path().join("out.c");

        let replacer = build_replacer(&preset("c").unwrap(), &ReincConfig::default()).unwrap();
        write_output(&replacer, &[input], Some(&dest)).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "int x;\nint main;\n");
    }

    #[test]
    fn test_failed_run_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "fine").unwrap();
        let dest = dir.path().join("out.txt");
        fs::write(&dest, "previous").unwrap();

        let rules = ReplacerConfig::new(vec![reinc_core::RuleConfig::new(r"@(\w+)", "$1")]);
        let replacer = build_replacer(&rules, &ReincConfig::default()).unwrap();
        let missing = dir.path().join("missing.txt");

        assert!(write_output(&replacer, &[good, missing], Some(&dest)).is_err());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");
    }
}
