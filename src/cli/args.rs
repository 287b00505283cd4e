//! CLI argument definitions using clap

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::constants::ENV_VAR_ENV;
use crate::models::RequestSpec;
use crate::network::ExecOptions;
use crate::output::RenderOptions;
use crate::template::parse_vars;

/// reqo - curl, but with projects & saved calls
#[derive(Parser, Debug)]
#[command(name = "reqo", version, about, long_about = "\
reqo is a friendly HTTP client that groups requests into projects, \
supports environments, reusable header sets and saved aliases.")]
pub struct Cli {
    /// Use the global project with this name instead of the current one
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project (in the current directory or ~/.reqo/projects)
    Init {
        name: String,
        /// Store the project in ~/.reqo/projects
        #[arg(long)]
        global: bool,
    },
    /// Mark a global project as active for the current directory
    Use { name: String },
    /// Read/write global configuration (~/.reqo/config.yaml)
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage environments of the current project
    #[command(subcommand)]
    Env(EnvCommand),
    /// Manage reusable header sets of the current project
    #[command(subcommand)]
    Header(HeaderCommand),
    /// Manage and run saved calls
    #[command(subcommand)]
    Call(CallCommand),
    /// Perform an ad-hoc request; METHOD defaults to GET
    Req(ReqArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// Add or replace an environment
    Add {
        name: String,
        #[arg(long)]
        base_url: String,
        /// Header applied to every request in this environment
        #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
        headers: Vec<String>,
    },
    /// List environments
    List,
    /// Remove an environment
    Rm { name: String },
    /// Set the project's default environment
    Default { name: String },
}

#[derive(Subcommand, Debug)]
pub enum HeaderCommand {
    /// Replace (or create) a header set
    Set {
        #[arg(long)]
        name: String,
        #[arg(required = true, value_name = "KEY: VALUE")]
        lines: Vec<String>,
    },
    /// List header sets
    List,
    /// Remove a header set
    Rm { name: String },
}

#[derive(Subcommand, Debug)]
pub enum CallCommand {
    /// Create or replace a saved call
    Create(CreateCallArgs),
    /// List saved calls
    List,
    /// Remove a saved call
    Rm { alias: String },
    /// Execute a saved call with optional overrides
    #[command(visible_alias = "exec")]
    Run {
        alias: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// `call <ALIAS> [run flags]`, same as `call run`
    #[command(external_subcommand)]
    Alias(Vec<String>),
}

/// Flags following the `call <ALIAS>` shorthand
#[derive(Parser, Debug)]
#[command(name = "call", no_binary_name = true)]
struct AliasRun {
    alias: String,
    #[command(flatten)]
    run: RunArgs,
}

/// Parse the tokens captured by [`CallCommand::Alias`]
pub fn parse_alias_run(tokens: Vec<String>) -> Result<(String, RunArgs), clap::Error> {
    let AliasRun { alias, run } = AliasRun::try_parse_from(tokens)?;
    Ok((alias, run))
}

#[derive(Args, Debug)]
pub struct CreateCallArgs {
    pub alias: String,
    pub method: String,
    pub path: String,
    /// Header set applied whenever the call runs
    #[arg(long = "use-headers", value_name = "SET")]
    pub use_headers: Option<String>,
    /// Short description
    #[arg(long)]
    pub desc: Option<String>,
    /// JSON body or @file
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw body or @file
    #[arg(long)]
    pub data: Option<String>,
    /// Multipart form field (k=v, v=@file uploads a file)
    #[arg(long, value_parser = parse_key_val, value_name = "KEY=VALUE")]
    pub form: Vec<(String, String)>,
    /// Header saved with the call
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,
    /// Query parameter saved with the call
    #[arg(long, value_parser = parse_key_val, value_name = "KEY=VALUE")]
    pub query: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ReqArgs {
    /// HTTP method, or the path when no second argument follows
    pub first: String,
    /// Path or absolute URL
    pub second: Option<String>,
    #[command(flatten)]
    pub run: RunArgs,
}

impl ReqArgs {
    /// Split the positionals into (method, path)
    pub fn method_and_path(&self) -> (String, String) {
        let is_method = crate::models::HttpMethod::parse(&self.first).is_some();
        match &self.second {
            Some(path) if is_method => (self.first.to_uppercase(), path.clone()),
            _ => ("GET".to_string(), self.first.clone()),
        }
    }
}

/// Flags shared by everything that sends a request
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Extra header
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
    pub headers: Vec<String>,
    /// Extra query parameter
    #[arg(long, value_name = "KEY=VALUE")]
    pub query: Vec<String>,
    /// Environment to use
    #[arg(long, env = ENV_VAR_ENV)]
    pub env: Option<String>,
    /// Print the equivalent curl command and exit
    #[arg(long)]
    pub as_curl: bool,
    /// Show response headers
    #[arg(short = 'i', long)]
    pub include: bool,
    /// Output the raw body
    #[arg(long)]
    pub raw: bool,
    /// jq expression applied to the JSON response
    #[arg(long, value_name = "EXPR")]
    pub jq: Option<String>,
    /// Overall timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Number of retries on failure
    #[arg(long)]
    pub retries: Option<u32>,
    /// Maximum redirect hops to follow
    #[arg(long)]
    pub max_redirects: Option<usize>,
    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    pub insecure: bool,
    /// Template variable
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,
    /// JSON body or @file
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw body or @file
    #[arg(long)]
    pub data: Option<String>,
    /// Multipart form field (k=v, v=@file uploads a file)
    #[arg(long, value_parser = parse_key_val, value_name = "KEY=VALUE")]
    pub form: Vec<(String, String)>,
}

impl RunArgs {
    /// Layer this invocation's overrides on top of `spec`
    pub fn apply(&self, spec: &mut RequestSpec, default_env: Option<&str>) {
        spec.headers.extend(self.headers.iter().cloned());
        spec.query_params.extend(self.query.iter().cloned());
        spec.vars = parse_vars(&self.vars);
        spec.env_name = self
            .env
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| default_env.map(str::to_string));
        spec.json_body = self.json.clone();
        spec.raw_body = self.data.clone();
        spec.form_fields = self.form.iter().cloned().collect::<BTreeMap<_, _>>();
    }

    pub fn exec_options(&self, defaults: ExecOptions) -> ExecOptions {
        ExecOptions {
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retries: self.retries.unwrap_or(defaults.retries),
            max_redirects: self.max_redirects.unwrap_or(defaults.max_redirects),
            insecure: self.insecure || defaults.insecure,
            ..defaults
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_headers: self.include,
            raw_output: self.raw,
            filter: self.jq.clone(),
        }
    }
}

/// Parse a `key=value` token
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))
}
