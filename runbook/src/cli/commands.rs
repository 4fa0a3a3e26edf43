//! CLI command execution.
//!
//! Every view goes through the route guard before any request is made; the
//! API client enforces the 401 contract on its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use crate::api::{ApiClient, ApiError};
use crate::config::Config;
use crate::models::{DevLoginRequest, EnvVarInfo};
use crate::router::{Navigation, Route, RouteGuard};
use crate::session::{FileStorage, SessionStore};

use super::args::{Cli, Commands};

/// Everything a command needs, wired once per invocation.
struct Console {
    client: ApiClient,
    guard: RouteGuard,
    session: Arc<SessionStore>,
}

impl Console {
    fn new(config: &Config) -> Self {
        let storage = Arc::new(FileStorage::new(&config.state_dir));
        let session = Arc::new(SessionStore::load(storage));
        Self {
            client: ApiClient::new(&config.api_url, &config.dev_login_url, Arc::clone(&session)),
            guard: RouteGuard::new(Arc::clone(&session)),
            session,
        }
    }

    /// Enter a view, following guard redirects, and render it.
    async fn navigate(&self, target: Route) -> Result<()> {
        let route = self.guard.resolve(target);
        tracing::debug!(route = route.name(), path = %route, "entering view");
        match route {
            Route::Runbooks => self.show_runbooks().await,
            Route::Runbook { filename } => self.show_runbook(&filename).await,
            Route::Login { redirect } => Err(login_required(redirect.as_deref())),
            Route::Root => Ok(()),
        }
    }

    /// Check that an action inside `target` is allowed.
    fn require(&self, target: Route) -> Result<()> {
        match self.guard.before_each(target) {
            Navigation::Proceed(_) => Ok(()),
            Navigation::Redirect(Route::Login { redirect }) => {
                Err(login_required(redirect.as_deref()))
            }
            Navigation::Redirect(route) => bail!("Navigation redirected to {route}"),
        }
    }

    async fn login(
        &self,
        request: DevLoginRequest,
        redirect: Option<String>,
        force: bool,
    ) -> Result<()> {
        let redirect = parse_redirect(redirect.as_deref())?;

        if force {
            self.session.clear_session();
        }

        let target = Route::Login {
            redirect: redirect.as_ref().map(Route::path),
        };
        if let Navigation::Redirect(route) = self.guard.before_each(target) {
            let subject = self.session.snapshot().subject.unwrap_or_default();
            println!("Already signed in as {subject}. Use --force to sign in again.");
            return self.navigate(redirect.unwrap_or(route)).await;
        }

        let login = self
            .client
            .dev_login(&request)
            .await
            .context("Login failed")?;
        self.session.set_session(&login);

        println!("Signed in as {}", login.subject);
        if !login.roles.is_empty() {
            println!("Roles: {}", login.roles.join(", "));
        }

        match redirect {
            Some(route) => self.navigate(route).await,
            None => Ok(()),
        }
    }

    fn status(&self) {
        if !self.session.is_authenticated() {
            println!("Not signed in.");
            return;
        }
        let session = self.session.snapshot();
        println!(
            "Signed in as {}",
            session.subject.as_deref().unwrap_or("(unknown)")
        );
        if session.roles.is_empty() {
            println!("Roles:   -");
        } else {
            println!("Roles:   {}", session.roles.join(", "));
        }
        match session.expires_at {
            Some(expires_at) => println!("Expires: {}", expires_at.to_rfc3339()),
            None => println!("Expires: never"),
        }
    }

    async fn show_runbooks(&self) -> Result<()> {
        let runbooks = self
            .client
            .list_runbooks()
            .await
            .map_err(|e| api_failure(e, "list runbooks"))?;

        if runbooks.is_empty() {
            println!("No runbooks found.");
            return Ok(());
        }

        println!("{:<32} {:<32} {}", "FILENAME", "NAME", "PATH");
        println!("{}", "-".repeat(80));
        for runbook in runbooks {
            println!(
                "{:<32} {:<32} {}",
                runbook.filename, runbook.name, runbook.path
            );
        }
        Ok(())
    }

    async fn show_runbook(&self, filename: &str) -> Result<()> {
        let runbook = self
            .client
            .get_runbook(filename)
            .await
            .map_err(|e| api_failure(e, &format!("load {filename}")))?;

        println!("# {} ({})", runbook.name, runbook.filename);
        println!();
        println!("{}", runbook.content);
        Ok(())
    }

    async fn show_env(&self, filename: &str) -> Result<()> {
        self.require(runbook_route(filename))?;
        let env = self
            .client
            .required_env(filename)
            .await
            .map_err(|e| api_failure(e, &format!("load environment for {filename}")))?;

        print_env_section("Required", &env.required);
        print_env_section("Available", &env.available);
        print_env_section("Missing", &env.missing);
        Ok(())
    }

    async fn validate(&self, filename: &str, env_vars: &BTreeMap<String, String>) -> Result<()> {
        self.require(runbook_route(filename))?;
        let result = self
            .client
            .validate_runbook(filename, env_vars)
            .await
            .map_err(|e| api_failure(e, &format!("validate {filename}")))?;

        print_messages("Error", &result.errors);
        print_messages("Warning", &result.warnings);

        if !result.errors.is_empty() {
            bail!("{filename} failed validation");
        }
        println!("{filename} is valid.");
        Ok(())
    }

    async fn execute(&self, filename: &str, env_vars: &BTreeMap<String, String>) -> Result<()> {
        self.require(runbook_route(filename))?;
        let result = self
            .client
            .execute_runbook(filename, env_vars)
            .await
            .map_err(|e| api_failure(e, &format!("execute {filename}")))?;

        if let Some(code) = result.return_code {
            println!("Return code: {code}");
        }
        if let Some(stdout) = result.stdout.as_deref().filter(|s| !s.is_empty()) {
            println!("\nStdout:\n{stdout}");
        }
        if let Some(stderr) = result.stderr.as_deref().filter(|s| !s.is_empty()) {
            println!("\nStderr:\n{stderr}");
        }
        print_messages("Error", &result.errors);
        print_messages("Warning", &result.warnings);
        if let Some(link) = &result.viewer_link {
            println!("\nViewer: {link}");
        }

        if !result.success {
            bail!("Execution of {filename} failed");
        }
        println!("\nExecution completed successfully.");
        Ok(())
    }
}

fn runbook_route(filename: &str) -> Route {
    Route::Runbook {
        filename: filename.to_string(),
    }
}

/// Validate a `--redirect` path before any session change is made.
fn parse_redirect(redirect: Option<&str>) -> Result<Option<Route>> {
    redirect
        .map(|path| Route::parse(path).with_context(|| format!("Unknown redirect path: {path}")))
        .transpose()
}

fn login_required(redirect: Option<&str>) -> anyhow::Error {
    match redirect {
        Some(path) => anyhow!("Not signed in. Run `runbook login --redirect {path}` to continue."),
        None => anyhow!("Not signed in. Run `runbook login` first."),
    }
}

/// Attach a user-facing explanation to an API error.
fn api_failure(err: ApiError, action: &str) -> anyhow::Error {
    if err.is_unauthorized() {
        return anyhow::Error::new(err)
            .context("Session rejected by the backend and cleared. Run `runbook login` again.");
    }
    anyhow::Error::new(err).context(format!("Failed to {action}"))
}

fn print_env_section(title: &str, vars: &[EnvVarInfo]) {
    println!("{title}:");
    if vars.is_empty() {
        println!("  -");
    }
    for var in vars {
        if var.description.is_empty() {
            println!("  {}", var.name);
        } else {
            println!("  {:<24} {}", var.name, var.description);
        }
    }
}

fn print_messages(label: &str, messages: &[String]) {
    for message in messages {
        println!("{label}: {message}");
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::resolve(&cli)?;
    tracing::debug!(api_url = %config.api_url, state_dir = %config.state_dir.display(), "configuration resolved");
    let console = Console::new(&config);

    match cli.command {
        Commands::Login {
            subject,
            roles,
            redirect,
            force,
        } => {
            let request = DevLoginRequest {
                subject,
                roles: (!roles.is_empty()).then_some(roles),
            };
            console.login(request, redirect, force).await
        }
        Commands::Logout => {
            console.session.clear_session();
            println!("Signed out.");
            Ok(())
        }
        Commands::Status => {
            console.status();
            Ok(())
        }
        Commands::List => console.navigate(Route::Runbooks).await,
        Commands::Show { filename } => console.navigate(runbook_route(&filename)).await,
        Commands::Env { filename } => console.show_env(&filename).await,
        Commands::Validate { filename, env } => {
            let env_vars: BTreeMap<_, _> = env.into_iter().collect();
            console.validate(&filename, &env_vars).await
        }
        Commands::Execute { filename, env } => {
            let env_vars: BTreeMap<_, _> = env.into_iter().collect();
            console.execute(&filename, &env_vars).await
        }
        Commands::Open { path } => {
            let route = Route::parse(&path).with_context(|| format!("Unknown path: {path}"))?;
            console.navigate(route).await
        }
    }
}
