//! Command handlers - project bookkeeping and request execution

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context as _};

use crate::cli::args::{
    self, CallCommand, Command, ConfigCommand, CreateCallArgs, EnvCommand, HeaderCommand, ReqArgs,
    RunArgs,
};
use crate::config::Config;
use crate::errors::ReqoError;
use crate::models::{BodySpec, Call, Environment, RequestSpec};
use crate::storage::{self, ProjectStore};
use crate::{compose, curl, network, output};

/// Where a command runs from
#[derive(Clone, Debug)]
pub struct Context {
    pub cwd: PathBuf,
    /// `-p/--project`
    pub project: Option<String>,
    pub config_path: PathBuf,
}

impl Context {
    fn open_store(&self) -> anyhow::Result<ProjectStore> {
        let root = storage::resolve_root(self.project.as_deref(), &self.cwd)?;
        Ok(ProjectStore::open(root)?)
    }

    fn config(&self) -> anyhow::Result<Config> {
        Config::load(&self.config_path).context("loading config")
    }
}

/// Runs `command` and returns the process exit code
pub async fn dispatch<W: Write>(command: Command, ctx: &Context, out: &mut W) -> anyhow::Result<i32> {
    match command {
        Command::Init { name, global } => init(&name, global, ctx, out)?,
        Command::Use { name } => {
            storage::set_current(&ctx.cwd, &name)?;
            writeln!(out, "Project {} set for {}", name, ctx.cwd.display())?;
        }
        Command::Config(cmd) => config(cmd, ctx, out)?,
        Command::Env(cmd) => env(cmd, ctx, out)?,
        Command::Header(cmd) => header(cmd, ctx, out)?,
        Command::Call(cmd) => return call(cmd, ctx, out).await,
        Command::Req(args) => return run_adhoc(&args, ctx, out).await,
    }
    Ok(0)
}

fn init<W: Write>(name: &str, global: bool, ctx: &Context, out: &mut W) -> anyhow::Result<()> {
    let root = if global {
        storage::global_project_root(name)
    } else {
        ctx.cwd.clone()
    };
    if storage::project_file(&root).exists() {
        bail!("a project already exists at {}", root.display());
    }
    storage::save(&root, &storage::new_project(name))?;
    tracing::info!(name, root = %root.display(), "Initialized project");
    writeln!(out, "Initialized project {} at {}", name, root.display())?;
    Ok(())
}

fn config<W: Write>(cmd: ConfigCommand, ctx: &Context, out: &mut W) -> anyhow::Result<()> {
    let mut config = ctx.config()?;
    match cmd {
        ConfigCommand::Get { key } => match config.get(&key) {
            Some(value) => writeln!(out, "{} = {}", key, value)?,
            None => writeln!(out, "{} is not set", key)?,
        },
        ConfigCommand::Set { key, value } => {
            config.set(key.as_str(), value.as_str());
            // reject values the executor could not use
            config.exec_defaults()?;
            config.save()?;
            writeln!(out, "{} = {}", key, value)?;
        }
    }
    Ok(())
}

fn env<W: Write>(cmd: EnvCommand, ctx: &Context, out: &mut W) -> anyhow::Result<()> {
    let mut store = ctx.open_store()?;
    let project = &mut store.project;
    match cmd {
        EnvCommand::Add {
            name,
            base_url,
            headers,
        } => {
            let mut env = Environment::new(base_url);
            env.headers = headers;
            project.environments.insert(name.clone(), env);
            if project.default_env.is_empty() {
                project.default_env = name.clone();
            }
            store.save()?;
            writeln!(out, "Environment {} saved", name)?;
        }
        EnvCommand::List => {
            writeln!(out, "Environments:")?;
            for (name, env) in &project.environments {
                let marker = if *name == project.default_env { " (default)" } else { "" };
                writeln!(out, "  {}{} → {}", name, marker, env.base_url)?;
            }
        }
        EnvCommand::Rm { name } => {
            if project.environments.remove(&name).is_none() {
                return Err(ReqoError::UnknownEnvironment(name).into());
            }
            if project.default_env == name {
                project.default_env.clear();
            }
            store.save()?;
            writeln!(out, "Environment {} removed", name)?;
        }
        EnvCommand::Default { name } => {
            if !project.environments.contains_key(&name) {
                return Err(ReqoError::UnknownEnvironment(name).into());
            }
            project.default_env = name.clone();
            store.save()?;
            writeln!(out, "Default environment is now {}", name)?;
        }
    }
    Ok(())
}

fn header<W: Write>(cmd: HeaderCommand, ctx: &Context, out: &mut W) -> anyhow::Result<()> {
    let mut store = ctx.open_store()?;
    let project = &mut store.project;
    match cmd {
        HeaderCommand::Set { name, lines } => {
            if let Some(bad) = lines.iter().find(|l| !l.contains(':')) {
                return Err(ReqoError::MalformedHeader(bad.clone()).into());
            }
            project.header_sets.insert(name.clone(), lines);
            store.save()?;
            writeln!(out, "Header set {} saved", name)?;
        }
        HeaderCommand::List => {
            if project.header_sets.is_empty() {
                writeln!(out, "No header sets found.")?;
                return Ok(());
            }
            writeln!(out, "Header Sets:")?;
            for (name, lines) in &project.header_sets {
                writeln!(out, "  {}:", name)?;
                for line in lines {
                    writeln!(out, "    {}", line)?;
                }
            }
        }
        HeaderCommand::Rm { name } => {
            if project.header_sets.remove(&name).is_none() {
                return Err(ReqoError::UnknownHeaderSet(name).into());
            }
            store.save()?;
            writeln!(out, "Header set {} removed", name)?;
        }
    }
    Ok(())
}

async fn call<W: Write>(cmd: CallCommand, ctx: &Context, out: &mut W) -> anyhow::Result<i32> {
    let mut store = ctx.open_store()?;
    match cmd {
        CallCommand::Run { alias, run } => return run_call(&alias, &run, &store, ctx, out).await,
        CallCommand::Alias(tokens) => {
            let (alias, run) = args::parse_alias_run(tokens)?;
            return run_call(&alias, &run, &store, ctx, out).await;
        }
        CallCommand::Create(args) => {
            let alias = args.alias.clone();
            let call = saved_call(args, &store)?;
            writeln!(out, "Saved call {}: {} {}", alias, call.method, call.path)?;
            store.project.calls.insert(alias, call);
            store.save()?;
        }
        CallCommand::List => {
            let calls = &store.project.calls;
            if calls.is_empty() {
                writeln!(out, "No saved calls found.")?;
                return Ok(0);
            }
            writeln!(out, "Saved Calls:")?;
            for (alias, call) in calls {
                write!(out, "  {}: {} {}", alias, call.method, call.path)?;
                if !call.description.is_empty() {
                    write!(out, " ({})", call.description)?;
                }
                if let Some(set) = &call.use_header_set {
                    write!(out, " [uses: {}]", set)?;
                }
                if let Some(label) = call.body_label() {
                    write!(out, " {}", label)?;
                }
                writeln!(out)?;
            }
        }
        CallCommand::Rm { alias } => {
            if store.project.calls.remove(&alias).is_none() {
                return Err(unknown_call(&alias, &store).into());
            }
            store.save()?;
            writeln!(out, "Removed call {}", alias)?;
        }
    }
    Ok(0)
}

fn saved_call(args: CreateCallArgs, store: &ProjectStore) -> anyhow::Result<Call> {
    let method = crate::models::HttpMethod::parse(&args.method)
        .ok_or_else(|| ReqoError::InvalidMethod(args.method.clone()))?;
    if let Some(set) = args.use_headers.as_deref() {
        if !store.project.header_sets.contains_key(set) {
            return Err(ReqoError::UnknownHeaderSet(set.to_string()).into());
        }
    }

    let body = BodySpec {
        json: args.json,
        raw: args.data,
        form: args.form.into_iter().collect(),
    };
    Ok(Call {
        method: method.to_string(),
        path: args.path,
        headers: args.headers,
        query: args.query.into_iter().collect(),
        body: (!body.is_empty()).then_some(body),
        use_header_set: args.use_headers,
        description: args.desc.unwrap_or_default(),
        last_used: None,
    })
}

fn unknown_call(alias: &str, store: &ProjectStore) -> ReqoError {
    ReqoError::UnknownCall {
        alias: alias.to_string(),
        project: store.project.name.clone(),
    }
}

async fn run_call<W: Write>(
    alias: &str,
    run: &RunArgs,
    store: &ProjectStore,
    ctx: &Context,
    out: &mut W,
) -> anyhow::Result<i32> {
    let call = store
        .project
        .calls
        .get(alias)
        .ok_or_else(|| unknown_call(alias, store))?;
    tracing::debug!(alias, method = %call.method, path = %call.path, "Running saved call");
    let spec = RequestSpec::from_call(call);
    send(spec, run, store, ctx, out).await
}

async fn run_adhoc<W: Write>(args: &ReqArgs, ctx: &Context, out: &mut W) -> anyhow::Result<i32> {
    let store = ctx.open_store()?;
    let (method, path) = args.method_and_path();
    send(RequestSpec::new(method, path), &args.run, &store, ctx, out).await
}

/// Compose, then either print the curl form or execute and render
async fn send<W: Write>(
    mut spec: RequestSpec,
    run: &RunArgs,
    store: &ProjectStore,
    ctx: &Context,
    out: &mut W,
) -> anyhow::Result<i32> {
    let config = ctx.config()?;
    run.apply(&mut spec, config.env());

    let request = compose::build(&store.project, &spec)?;
    if run.as_curl {
        writeln!(out, "{}", curl::to_shell_command(&request))?;
        return Ok(0);
    }

    let options = run.exec_options(config.exec_defaults()?);
    let response = network::execute(&request, &options).await?;
    let status = response.status();
    output::render(response, out, &run.render_options()).await?;
    Ok(exit_code(status))
}

/// 0 for success, otherwise the status class (3, 4 or 5)
pub fn exit_code(status: reqwest::StatusCode) -> i32 {
    if status.is_success() {
        0
    } else {
        i32::from(status.as_u16() / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use clap::Parser;

    struct Fixture {
        _dir: tempfile::TempDir,
        ctx: Context,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            cwd: dir.path().to_path_buf(),
            project: None,
            config_path: dir.path().join("config.yaml"),
        };
        Fixture { _dir: dir, ctx }
    }

    async fn run(ctx: &Context, args: &[&str]) -> anyhow::Result<(i32, String)> {
        let cli = Cli::try_parse_from(std::iter::once("reqo").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        let code = dispatch(cli.command, ctx, &mut out).await?;
        Ok((code, String::from_utf8(out)?))
    }

    #[tokio::test]
    async fn test_init_then_list_envs() {
        let fx = fixture();
        let (_, out) = run(&fx.ctx, &["init", "demo"]).await.unwrap();
        assert!(out.starts_with("Initialized project demo at "));

        run(&fx.ctx, &["env", "add", "prod", "--base-url", "https://api.example.com"])
            .await
            .unwrap();
        let (_, out) = run(&fx.ctx, &["env", "list"]).await.unwrap();
        assert_eq!(
            out,
            "Environments:\n  default (default) → \n  prod → https://api.example.com\n"
        );

        assert!(run(&fx.ctx, &["init", "demo"]).await.is_err());
    }

    #[tokio::test]
    async fn test_header_sets() {
        let fx = fixture();
        run(&fx.ctx, &["init", "demo"]).await.unwrap();
        run(&fx.ctx, &["header", "set", "--name", "auth", "Authorization: Bearer ${TOKEN}"])
            .await
            .unwrap();
        let (_, out) = run(&fx.ctx, &["header", "list"]).await.unwrap();
        assert!(out.contains("  auth:\n    Authorization: Bearer ${TOKEN}\n"));

        run(&fx.ctx, &["header", "rm", "auth"]).await.unwrap();
        let err = run(&fx.ctx, &["header", "rm", "auth"]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReqoError>(),
            Some(ReqoError::UnknownHeaderSet(_))
        ));
    }

    #[tokio::test]
    async fn test_call_create_list_and_curl() {
        let fx = fixture();
        run(&fx.ctx, &["init", "demo"]).await.unwrap();
        run(&fx.ctx, &["env", "add", "default", "--base-url", "https://api.example.com"])
            .await
            .unwrap();
        run(
            &fx.ctx,
            &[
                "call", "create", "new-user", "post", "/users", "--json", r#"{"name":"${name}"}"#,
                "--desc", "create a user",
            ],
        )
        .await
        .unwrap();

        let (_, out) = run(&fx.ctx, &["call", "list"]).await.unwrap();
        assert_eq!(
            out,
            "Saved Calls:\n  new-user: POST /users (create a user) [JSON body]\n"
        );

        let (code, out) = run(
            &fx.ctx,
            &["call", "run", "new-user", "--var", "name=Ann", "--as-curl"],
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            out,
            "curl -X POST -H \"Content-Type: application/json\" --data-raw '{\"name\":\"Ann\"}' 'https://api.example.com/users'\n"
        );
    }

    #[tokio::test]
    async fn test_call_shorthand_runs_alias() {
        let fx = fixture();
        run(&fx.ctx, &["init", "demo"]).await.unwrap();
        run(&fx.ctx, &["env", "add", "default", "--base-url", "https://api.example.com"])
            .await
            .unwrap();
        run(&fx.ctx, &["call", "create", "user", "GET", "/users/${id}"])
            .await
            .unwrap();

        let (code, out) = run(&fx.ctx, &["call", "user", "--var", "id=7", "--as-curl"])
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(out, "curl -X GET 'https://api.example.com/users/7'\n");
    }

    #[tokio::test]
    async fn test_unknown_call() {
        let fx = fixture();
        run(&fx.ctx, &["init", "demo"]).await.unwrap();
        let err = run(&fx.ctx, &["call", "run", "nope"]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReqoError>(),
            Some(ReqoError::UnknownCall { .. })
        ));
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let fx = fixture();
        run(&fx.ctx, &["config", "set", "retries", "3"]).await.unwrap();
        let (_, out) = run(&fx.ctx, &["config", "get", "retries"]).await.unwrap();
        assert_eq!(out, "retries = 3\n");
        assert!(run(&fx.ctx, &["config", "set", "timeout", "soon"]).await.is_err());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(reqwest::StatusCode::OK), 0);
        assert_eq!(exit_code(reqwest::StatusCode::NO_CONTENT), 0);
        assert_eq!(exit_code(reqwest::StatusCode::NOT_FOUND), 4);
        assert_eq!(exit_code(reqwest::StatusCode::BAD_GATEWAY), 5);
    }
}
