mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use pcapscope_core::{
    AnalysisOptions, DecodeOptions, FilterSpec, InputInfo, OuiTable, PacketRecord, PayloadMode,
    REPORT_VERSION, StatsConfig, ToolInfo, TrafficStats,
};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pcap", "pcapng", "cap"];

#[derive(Parser, Debug)]
#[command(name = "pcapscope")]
#[command(version = long_version())]
#[command(
    about = "Offline traffic statistics for PCAP/PCAPNG captures.",
    long_about = None,
    after_help = "Examples:\n  pcapscope pcap analyse capture.pcapng -o report.json\n  pcapscope pcap analyze capture.pcap --stdout --pretty\n  pcapscope pcap packets capture.pcap --protocol TCP --port 443 --stdout"
)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true, value_parser = logging::parse_log_level)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs (offline-first).
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Decode a capture and write the aggregate statistics report as JSON.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  pcapscope pcap analyse capture.pcapng -o report.json\n  pcapscope pcap analyze capture.pcap --stdout --top 20"
    )]
    Analyse {
        /// Path to a .pcap, .pcapng or .cap file (a glob matching one file is accepted)
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        decode: DecodeArgs,

        /// Rows kept in the top address, port and vendor tables
        #[arg(long, default_value_t = StatsConfig::default().top_n)]
        top: usize,
    },
    /// Decode a capture and write the packets selected by a filter as JSON.
    #[command(
        after_help = "Examples:\n  pcapscope pcap packets capture.pcap --protocol UDP --stdout\n  pcapscope pcap packets capture.pcap --filter filter.json --with-stats -o packets.json"
    )]
    Packets {
        /// Path to a .pcap, .pcapng or .cap file (a glob matching one file is accepted)
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        decode: DecodeArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Include aggregate statistics over the matched packets
        #[arg(long)]
        with_stats: bool,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Vendor table in Wireshark `manuf` format, merged over the built-in one
    #[arg(long, value_name = "FILE")]
    vendors: Option<PathBuf>,

    /// Render payloads that are not valid UTF-8 as hex instead of lossy text
    #[arg(long)]
    strict_payload: bool,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// JSON filter document; individual flags override its fields
    #[arg(long, value_name = "FILE")]
    filter: Option<PathBuf>,

    /// Source IP contains this text
    #[arg(long)]
    src_ip: Option<String>,

    /// Destination IP contains this text
    #[arg(long)]
    dst_ip: Option<String>,

    /// Source MAC contains this text (case-insensitive)
    #[arg(long)]
    src_mac: Option<String>,

    /// Destination MAC contains this text (case-insensitive)
    #[arg(long)]
    dst_mac: Option<String>,

    /// Exact protocol label: TCP, UDP, IP(<n>) or Other
    #[arg(long)]
    protocol: Option<String>,

    /// Either transport port equals this value
    #[arg(long)]
    port: Option<u16>,

    /// Minimum frame length in bytes
    #[arg(long)]
    length_min: Option<u64>,

    /// Maximum frame length in bytes
    #[arg(long)]
    length_max: Option<u64>,

    /// Earliest capture time (ISO-8601, naive values are UTC)
    #[arg(long)]
    time_start: Option<String>,

    /// Latest capture time (ISO-8601, naive values are UTC)
    #[arg(long)]
    time_end: Option<String>,
}

impl FilterArgs {
    fn into_spec(self) -> Result<FilterSpec, CliError> {
        let mut spec = match self.filter.as_ref() {
            Some(path) => load_filter(path)?,
            None => FilterSpec::default(),
        };
        override_field(&mut spec.src_ip_contains, self.src_ip);
        override_field(&mut spec.dst_ip_contains, self.dst_ip);
        override_field(&mut spec.src_mac_contains, self.src_mac);
        override_field(&mut spec.dst_mac_contains, self.dst_mac);
        override_field(&mut spec.protocol, self.protocol);
        override_field(&mut spec.port, self.port);
        override_field(&mut spec.length_min, self.length_min);
        override_field(&mut spec.length_max, self.length_max);
        override_field(&mut spec.time_start, self.time_start);
        override_field(&mut spec.time_end, self.time_end);

        spec.validate().map_err(|err| {
            CliError::new(
                format!("invalid filter: {err}"),
                Some("times are ISO-8601 (e.g. 2024-01-01T12:00:00Z); --length-min must not exceed --length-max".to_string()),
            )
        })?;
        Ok(spec)
    }
}

fn override_field<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.log_level);

    let result = match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Analyse {
                input,
                output,
                decode,
                top,
            } => cmd_pcap_analyse(input, output, decode, top),
            PcapCommands::Packets {
                input,
                output,
                decode,
                filter,
                with_stats,
            } => cmd_pcap_packets(input, output, decode, filter, with_stats),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

/// Output of `pcap packets`.
#[derive(Debug, Serialize)]
struct PacketsReport<'a> {
    report_version: u32,
    tool: ToolInfo,
    input: InputInfo,
    filter: &'a FilterSpec,
    packets_total: u64,
    packets_matched: u64,
    packets: &'a [PacketRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<TrafficStats>,
}

/// Input and output locations after validation.
struct Target {
    input: PathBuf,
    report: Option<PathBuf>,
}

fn cmd_pcap_analyse(
    input: PathBuf,
    output: OutputArgs,
    decode: DecodeArgs,
    top: usize,
) -> Result<(), CliError> {
    let target = prepare_target(&input, &output)?;
    let vendors = load_vendors(decode.vendors.as_deref())?;
    let options = AnalysisOptions {
        decode: decode_options(&decode),
        stats: StatsConfig {
            top_n: top,
            ..StatsConfig::default()
        },
    };

    let rep = pcapscope_core::analyze_pcap_file_with(&target.input, &vendors, &options)
        .context("PCAP/PCAPNG analysis failed")?;
    let json = serialize_json(&rep, output.pretty, output.compact)?;
    emit(&target, &output, json, "report")
}

fn cmd_pcap_packets(
    input: PathBuf,
    output: OutputArgs,
    decode: DecodeArgs,
    filter: FilterArgs,
    with_stats: bool,
) -> Result<(), CliError> {
    let target = prepare_target(&input, &output)?;
    let spec = filter.into_spec()?;
    let vendors = load_vendors(decode.vendors.as_deref())?;

    let input_bytes = fs::metadata(&target.input)
        .with_context(|| format!("Failed to read input file: {}", target.input.display()))?
        .len();
    let packets =
        pcapscope_core::decode_trace_with(&target.input, &vendors, decode_options(&decode))
            .context("PCAP/PCAPNG decoding failed")?;
    let matched = pcapscope_core::filter_packets(&packets, &spec);
    info!("{} of {} packets matched", matched.len(), packets.len());

    let stats = with_stats.then(|| {
        pcapscope_core::compute_stats_with(&matched, &StatsConfig::default(), &vendors)
    });
    let rep = PacketsReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo::current(),
        input: InputInfo {
            path: target.input.display().to_string(),
            bytes: input_bytes,
        },
        filter: &spec,
        packets_total: packets.len() as u64,
        packets_matched: matched.len() as u64,
        packets: &matched,
        stats,
    };
    let json = serialize_json(&rep, output.pretty, output.compact)?;
    emit(&target, &output, json, "packets")
}

fn decode_options(decode: &DecodeArgs) -> DecodeOptions {
    DecodeOptions {
        payload: if decode.strict_payload {
            PayloadMode::Strict
        } else {
            PayloadMode::Lossy
        },
    }
}

fn load_vendors(path: Option<&Path>) -> Result<OuiTable, CliError> {
    let mut table = OuiTable::builtin();
    if let Some(path) = path {
        let custom = OuiTable::load(path).map_err(|err| {
            CliError::new(
                format!("failed to load vendor table {}: {err}", path.display()),
                Some("expected lines like '00:50:56<TAB>VMware'".to_string()),
            )
        })?;
        debug!("loaded {} vendor prefixes from {}", custom.len(), path.display());
        table.merge(custom);
    }
    Ok(table)
}

fn load_filter(path: &Path) -> Result<FilterSpec, CliError> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter file: {}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            format!("invalid filter file {}: {err}", path.display()),
            Some("expected a JSON object such as {\"protocol\": \"TCP\", \"port\": 443}".to_string()),
        )
    })
}

fn prepare_target(input: &Path, output: &OutputArgs) -> Result<Target, CliError> {
    let resolved_input = resolve_input_path(input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;

    let report = if output.stdout {
        None
    } else {
        Some(output.report.clone().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap, .pcapng or .cap file".to_string()),
        ));
    }

    Ok(Target {
        input: resolved_input,
        report,
    })
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent),
        _ => fs::canonicalize("."),
    };
    // A directory that does not exist yet cannot contain the input.
    let Ok(report_dir) = report_dir else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_json<T: Serialize>(value: &T, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn emit(target: &Target, output: &OutputArgs, json: String, what: &str) -> Result<(), CliError> {
    let Some(report) = target.report.as_ref() else {
        print!("{}", json);
        return Ok(());
    };

    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(report, json)
        .with_context(|| format!("Failed to write {what}: {}", report.display()))?;

    if !output.quiet {
        eprintln!("OK: {what} written -> {}", report.display());
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap, .pcapng or .cap file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap, .pcapng or .cap file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap, .pcapng or .cap".to_string()),
        ));
    }
    if matches.len() > 1 {
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches); matches: {}",
            pattern,
            matches.len(),
            matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(
            message,
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("PCAPSCOPE_BUILD_COMMIT"),
        ", ",
        env!("PCAPSCOPE_BUILD_DATE"),
        ")"
    )
}
