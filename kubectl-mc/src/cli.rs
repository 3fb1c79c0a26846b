use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use hohkube::{ClientConfig, Overrides};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::HttpHubApi;
use crate::get::GetOptions;
use crate::printers::PrintFlags;

#[derive(Parser, Debug)]
#[clap(
    name = "kubectl-mc",
    version,
    about = "Work with the managed clusters of a multicluster hub through the hub-of-hubs API"
)]
pub struct Cli {
    #[clap(flatten)]
    pub connection: ConnectionFlags,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// How to reach the hub, on top of what the kubeconfig says.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionFlags {
    /// Path to the kubeconfig file to use
    #[clap(long, global = true, value_parser)]
    pub kubeconfig: Option<PathBuf>,

    /// The name of the kubeconfig context to use
    #[clap(long, global = true)]
    pub context: Option<String>,

    /// The name of the kubeconfig cluster to use
    #[clap(long, global = true)]
    pub cluster: Option<String>,

    /// The name of the kubeconfig user to use
    #[clap(long, global = true)]
    pub user: Option<String>,

    /// Bearer token for authentication to the hub
    #[clap(long, global = true)]
    pub token: Option<String>,

    /// The address and port of the hub's Kubernetes API server
    #[clap(short = 's', long, global = true)]
    pub server: Option<String>,

    /// How long to wait for the response (e.g. 1s, 2m, 3h). Zero means no timeout
    #[clap(long, global = true, value_parser = parse_request_timeout)]
    pub request_timeout: Option<Duration>,

    /// Log level verbosity
    #[clap(short = 'v', long = "v", global = true, default_value_t = 0, value_parser)]
    pub verbosity: u8,
}

impl ConnectionFlags {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.user.clone(),
            server: self.server.clone(),
            token: self.token.clone(),
        }
    }

    pub fn client_config(&self) -> hohkube::Result<ClientConfig> {
        let kubeconfig = hohkube::load(self.kubeconfig.as_deref())?;
        kubeconfig.resolve(&self.overrides())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout.filter(|t| !t.is_zero())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display managed clusters
    #[clap(visible_aliases = &["list", "ps"])]
    Get(GetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Only listing every cluster is supported
    #[clap(value_name = "NAME")]
    pub names: Vec<String>,

    /// Output format. One of: custom-columns=...|json|jsonpath=...|name|wide|yaml
    #[clap(short, long)]
    pub output: Option<String>,

    /// Template string to use when -o=jsonpath
    #[clap(long)]
    pub template: Option<String>,

    /// Sort list types using this field specification, a JSONPath expression like '{.metadata.name}'
    #[clap(long)]
    pub sort_by: Option<String>,

    /// When using the default or custom-column output format, don't print headers
    #[clap(long)]
    pub no_headers: bool,

    /// When printing, show all labels as the last column
    #[clap(long)]
    pub show_labels: bool,

    /// If present, list the resource type for the requested object(s)
    #[clap(long)]
    pub show_kind: bool,

    /// Label keys to present as columns, e.g. -L cloud,vendor
    #[clap(short = 'L', long, value_delimiter = ',')]
    pub label_columns: Vec<String>,

    /// Selector (label query) to filter on, e.g. -l vendor=OpenShift
    #[clap(short = 'l', long)]
    pub selector: Option<String>,

    /// Selector (field query) to filter on, e.g. --field-selector metadata.name=east
    #[clap(long)]
    pub field_selector: Option<String>,

    /// Ask the server for columns. Set to false to print plain names and ages
    #[clap(
        long,
        value_parser,
        action = ArgAction::Set,
        default_value = "true",
        default_missing_value = "true",
        min_values = 0,
        require_equals = true
    )]
    pub server_print: bool,

    /// Succeed quietly if there is nothing to list
    #[clap(long)]
    pub ignore_not_found: bool,

    /// After listing, watch for changes. Lists once; the hub-of-hubs API has no watch
    #[clap(short, long)]
    pub watch: bool,

    /// Output watch event objects when --watch is used
    #[clap(long)]
    pub output_watch_events: bool,
}

impl GetArgs {
    pub fn into_options(self) -> GetOptions {
        let mut opts = GetOptions::default();
        opts.print_flags = PrintFlags {
            output: self.output.unwrap_or_default(),
            template: self.template,
            sort_by: self.sort_by,
            no_headers: self.no_headers,
            show_labels: self.show_labels,
            show_kind: self.show_kind,
            label_columns: self.label_columns,
        };
        opts.names = self.names;
        opts.label_selector = self.selector;
        opts.field_selector = self.field_selector;
        opts.server_print = self.server_print;
        opts.ignore_not_found = self.ignore_not_found;
        opts.watch = self.watch;
        opts.output_watch_events = self.output_watch_events;
        opts
    }
}

static TIMEOUT_PARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)(ms|h|m|s)").expect("static regex"));
static TIMEOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+(?:ms|h|m|s))+$").expect("static regex"));

/// `0`, `30` (seconds), or a duration such as `30s`, `2m`, `1h30m`.
pub fn parse_request_timeout(raw: &str) -> Result<Duration, String> {
    let invalid = || {
        "invalid timeout value. Timeout must be a single integer in seconds, or an integer followed by a corresponding time unit (e.g. 1s | 2m | 3h)".to_string()
    };

    if let Ok(seconds) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    if !TIMEOUT.is_match(raw) {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    for part in TIMEOUT_PARTS.captures_iter(raw) {
        let n: u64 = part[1].parse().map_err(|_| invalid())?;
        let step = match &part[2] {
            "ms" => Some(Duration::from_millis(n)),
            "s" => Some(Duration::from_secs(n)),
            "m" => n.checked_mul(60).map(Duration::from_secs),
            _ => n.checked_mul(3600).map(Duration::from_secs),
        };
        total = step
            .and_then(|step| total.checked_add(step))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err_out = stderr.lock();

    match cli.command {
        None => {
            Cli::command().write_help(&mut out)?;
            writeln!(out)?;
        }
        Some(Command::Get(args)) => {
            let mut opts = args.into_options();
            let client = cli
                .connection
                .client_config()
                .context("unable to load the hub connection from the kubeconfig")?;

            opts.complete(&client, &mut err_out)?;
            opts.validate()?;
            let api = HttpHubApi::new(cli.connection.timeout());
            opts.run(&api, &mut out, &mut err_out)?;
        }
    }
    Ok(())
}
