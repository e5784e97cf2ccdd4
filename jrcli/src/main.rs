//! jrcli - command line client for the JasperServer repository service
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use jrclient::{
    JasperConfigExt, OutputFormat, ParameterValue, ReportArgs, ReportClient, ReportParams,
};
use jrconfig::Config;
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jrcli")]
#[command(about = "Browse and run reports on a JasperServer repository", long_about = None)]
struct Cli {
    /// Repository service URL (the WSDL URL is accepted)
    #[arg(long, env = "JRCLIENT_URL")]
    url: Option<String>,

    #[arg(short, long, env = "JRCLIENT_USERNAME")]
    username: Option<String>,

    #[arg(short, long, env = "JRCLIENT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Call timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Configuration directory
    #[arg(long)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a repository folder
    List {
        /// Folder path (repository root by default)
        #[arg(default_value = "")]
        path: String,
        /// Only show report units
        #[arg(long)]
        reports_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Describe a report unit
    Get {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Run a report and save the result
    Run {
        path: String,
        /// PDF, JRPRINT, HTML, XLS, XML, CSV or RTF (configured default otherwise)
        #[arg(short, long)]
        format: Option<String>,
        /// Report parameter; repeat a name to pass a list
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        /// Extra runReport argument
        #[arg(long = "arg", value_name = "NAME=VALUE", value_parser = parse_key_val)]
        args: Vec<(String, String)>,
        /// Output file (`<report name>.<ext>` by default)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save the server settings given on the command line
    Configure {
        /// Default format of `run`
        #[arg(short, long)]
        format: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config_dir.as_deref().unwrap_or(""))
        .context("Failed to load configuration")?;
    init_logging(&config);

    if let Commands::Configure { format } = &cli.command {
        return configure(&cli, format.as_deref(), &config);
    }

    let client = build_client(&cli, &config)?;

    match cli.command {
        Commands::List {
            path,
            reports_only,
            json,
        } => list(&client, &path, reports_only, json),
        Commands::Get { path, json } => get(&client, &path, json),
        Commands::Run {
            path,
            format,
            params,
            args,
            output,
        } => {
            let format = match format {
                Some(f) => f,
                None => config.get_jasper_default_format()?.to_string(),
            };
            run(&client, &path, &format, params, args, output)
        }
        Commands::Configure { .. } => Ok(()),
    }
}

fn init_logging(config: &Config) {
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| jrconfig::DEFAULT_LOG_MIN_LEVEL.to_string());

    // RUST_LOG prend le pas sur la configuration
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn build_client(cli: &Cli, config: &Config) -> Result<ReportClient> {
    let url = match &cli.url {
        Some(url) => url.clone(),
        None => config.get_jasper_endpoint()?,
    };
    let username = match &cli.username {
        Some(u) => u.clone(),
        None => config.get_username()?,
    };
    let password = match &cli.password {
        Some(p) => p.clone(),
        None => config.get_password()?,
    };
    let timeout = match cli.timeout {
        Some(0) => bail!("--timeout must be positive"),
        Some(secs) => Duration::from_secs(secs),
        None => config.get_jasper_timeout()?,
    };

    ReportClient::builder(url.as_str())
        .credentials(username, password)
        .timeout(timeout)
        .build()
        .with_context(|| format!("Cannot connect to {}", url))
}

/// Writes the given settings to the configuration file; the password is
/// stored encrypted.
fn configure(cli: &Cli, format: Option<&str>, config: &Config) -> Result<()> {
    if let Some(url) = &cli.url {
        jrclient::endpoint_from_url(url).with_context(|| format!("Invalid URL {}", url))?;
        config.set_server_url(url)?;
    }
    if let Some(username) = &cli.username {
        config.set_username(username)?;
    }
    if let Some(password) = &cli.password {
        config
            .set_password(password)
            .context("Cannot encrypt the password")?;
    }
    match cli.timeout {
        Some(0) => bail!("--timeout must be positive"),
        Some(secs) => config.set_jasper_timeout(Duration::from_secs(secs))?,
        None => {}
    }
    if let Some(format) = format {
        let format: OutputFormat = format
            .parse()
            .map_err(|f| anyhow::anyhow!("Unsupported format: {}", f))?;
        config.set_jasper_default_format(format)?;
    }

    info!(file = %config.config_file(), "Configuration saved");
    println!("{}", config.config_file());
    Ok(())
}

fn list(client: &ReportClient, path: &str, reports_only: bool, json: bool) -> Result<()> {
    let entries = if reports_only {
        client.list_reports(path)
    } else {
        client.list(path)
    }
    .with_context(|| format!("Failed to list {:?}", path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<16} {:<48} {}",
            entry.resource_type,
            entry.id,
            entry.label.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn get(client: &ReportClient, path: &str, json: bool) -> Result<()> {
    let detail = client
        .get(path)
        .with_context(|| format!("Failed to describe {}", path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{} ({})", detail.descriptor.id, detail.name);
    if let Some(label) = &detail.descriptor.label {
        println!("  label:       {}", label);
    }
    if let Some(description) = &detail.descriptor.description {
        println!("  description: {}", description);
    }
    if let Some(jrxml) = &detail.jrxml_path {
        println!("  jrxml:       {}", jrxml);
    }

    if !detail.controls.is_empty() {
        println!("Input controls:");
        for control in &detail.controls {
            println!(
                "  {:<24} {:<12} {}",
                control.name,
                format!("{:?}", control.control_type),
                control.label.as_deref().unwrap_or("")
            );
        }
    }

    if !detail.parameters.is_empty() {
        println!("Parameters:");
        for parameter in &detail.parameters {
            println!(
                "  {:<24} {:<12} {}",
                parameter.name,
                format!("{:?}", parameter.value_type),
                parameter.default_value_expression.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

fn run(
    client: &ReportClient,
    path: &str,
    format: &str,
    params: Vec<(String, String)>,
    args: Vec<(String, String)>,
    output: Option<PathBuf>,
) -> Result<()> {
    let params = collect_params(params);
    let args: ReportArgs = args.into_iter().collect();

    let report = client
        .run(path, format, &params, &args)
        .with_context(|| format!("Failed to run {}", path))?;

    let Some(part) = report.report_part() else {
        bail!("The server returned no report for {}", path);
    };

    let output = output.unwrap_or_else(|| default_output(path, report.format()));
    std::fs::write(&output, &part.data)
        .with_context(|| format!("Cannot write {}", output.display()))?;

    info!(file = %output.display(), size = part.data.len(), "Report saved");
    println!("{}", output.display());
    Ok(())
}

/// Repeated names become list parameters.
fn collect_params(pairs: Vec<(String, String)>) -> ReportParams {
    let mut params = ReportParams::new();
    for (name, value) in pairs {
        match params.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                params.insert(name, ParameterValue::Single(value));
            }
        }
    }
    params
}

fn default_output(path: &str, format: OutputFormat) -> PathBuf {
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("report");
    PathBuf::from(format!("{}.{}", name, format.extension()))
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid NAME=VALUE: no `=` found in `{}`", s))?;
    if name.is_empty() {
        return Err(format!("invalid NAME=VALUE: empty name in `{}`", s));
    }
    Ok((name.to_string(), value.to_string()))
}
