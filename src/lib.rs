pub mod config;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod http;
pub mod mapper;
pub mod printer;
pub mod profile;
pub mod prompt;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{ConfigStore, YamlConfigStore};
use environment::{Env, ProcessEnv};
use error::AppError;
use gateway::{Gateway, GatewayError, PlatformGateway};
use crate::http::{Client, HttpBackend, ReqwestBackend};
use indicatif::{ProgressBar, ProgressStyle};
use mapper::CurlCommandRequest;
use profile::{AwsIam, Profile, ProfileController, Trust};
use prompt::{Prompter, TerminalPrompter};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "opensearch-cli")]
#[command(author, version, about = "Command line interface for OpenSearch clusters", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.opensearch-cli/config.yaml, or OPENSEARCH_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    /// Profile to use (default: OPENSEARCH_PROFILE, then 'default')
    #[arg(short, long, global = true)]
    pub profile: Option<String>,
    /// Log gateway activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the named connection profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Call any cluster REST API
    #[command(subcommand)]
    Curl(CurlCommand),
    /// Print a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Name used in failure messages, e.g. `curl get`
    pub fn name(&self) -> &'static str {
        match self {
            Command::Profile(ProfileCommand::Create(_)) => "profile create",
            Command::Profile(ProfileCommand::Delete { .. }) => "profile delete",
            Command::Profile(ProfileCommand::List { .. }) => "profile list",
            Command::Curl(CurlCommand::Get(_)) => "curl get",
            Command::Curl(CurlCommand::Put(_)) => "curl put",
            Command::Curl(CurlCommand::Post(_)) => "curl post",
            Command::Curl(CurlCommand::Delete(_)) => "curl delete",
            Command::Curl(CurlCommand::Patch(_)) => "curl patch",
            Command::Completion { .. } => "completion",
        }
    }
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Create a new profile
    Create(CreateProfileArgs),
    /// Delete one or more profiles
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List profile names
    List {
        /// Show user name and endpoint as well
        #[arg(short = 'l', long = "long")]
        long: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthType {
    Disabled,
    Basic,
    AwsIam,
}

#[derive(Args, Debug, Clone)]
pub struct CreateProfileArgs {
    #[arg(short, long)]
    pub name: String,
    /// Cluster endpoint including protocol, e.g. https://localhost:9200
    #[arg(short, long)]
    pub endpoint: String,
    #[arg(short, long, value_enum, default_value_t = AuthType::Basic)]
    pub auth_type: AuthType,
    /// Basic auth user, asked for when missing
    #[arg(short, long)]
    pub user: Option<String>,
    /// Basic auth password, asked for without echo when missing
    #[arg(long)]
    pub password: Option<String>,
    /// AWS profile whose credentials sign requests; blank uses the AWS_*
    /// environment variables. Asked for when missing.
    #[arg(long)]
    pub aws_profile: Option<String>,
    /// AWS service name used when signing
    #[arg(long, default_value = "es")]
    pub aws_service: String,
    /// Retry attempts on transient failures (OPENSEARCH_MAX_RETRY overrides)
    #[arg(short, long, default_value_t = 3)]
    pub max_retry: u32,
    /// Request timeout in seconds, 0 for none (OPENSEARCH_TIMEOUT overrides)
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,
    #[arg(long)]
    pub ca_cert: Option<String>,
    #[arg(long)]
    pub client_cert: Option<String>,
    #[arg(long)]
    pub client_key: Option<String>,
}

impl CreateProfileArgs {
    /// Builds the profile, asking `prompter` for credentials the flags left out.
    pub fn into_profile(self, prompter: &mut dyn Prompter) -> Result<Profile, AppError> {
        let mut profile = Profile {
            name: self.name,
            endpoint: self.endpoint,
            max_retry: Some(self.max_retry),
            timeout: Some(self.timeout),
            ..Default::default()
        };
        match self.auth_type {
            AuthType::Disabled => {}
            AuthType::Basic => {
                profile.user_name = match self.user.filter(|user| !user.trim().is_empty()) {
                    Some(user) => user,
                    None => prompt::required(prompter, "Username", false)?,
                };
                profile.password = match self.password.filter(|password| !password.is_empty()) {
                    Some(password) => password,
                    None => prompt::required(prompter, "Password", true)?,
                };
            }
            AuthType::AwsIam => {
                let aws_profile = match self.aws_profile {
                    Some(name) => name,
                    None => prompter.text(
                        "AWS profile name (leave blank to use credentials from environment variables)",
                    )?,
                };
                profile.aws_iam = Some(AwsIam {
                    profile_name: aws_profile.trim().to_string(),
                    service_name: self.aws_service,
                });
            }
        }
        if self.ca_cert.is_some() || self.client_cert.is_some() || self.client_key.is_some() {
            profile.certificate = Some(Trust {
                ca_file_path: self.ca_cert,
                client_certificate_path: self.client_cert,
                client_key_path: self.client_key,
            });
        }
        Ok(profile)
    }
}

#[derive(Subcommand)]
pub enum CurlCommand {
    /// GET request
    Get(CurlArgs),
    /// PUT request
    Put(CurlArgs),
    /// POST request
    Post(CurlArgs),
    /// DELETE request
    Delete(CurlArgs),
    /// PATCH request
    Patch(CurlArgs),
}

impl CurlCommand {
    pub fn into_request(self) -> CurlCommandRequest {
        let (action, args) = match self {
            CurlCommand::Get(args) => ("GET", args),
            CurlCommand::Put(args) => ("PUT", args),
            CurlCommand::Post(args) => ("POST", args),
            CurlCommand::Delete(args) => ("DELETE", args),
            CurlCommand::Patch(args) => ("PATCH", args),
        };
        CurlCommandRequest {
            action: action.to_string(),
            path: args.path,
            query_params: args.query_params,
            headers: args.headers,
            data: args.data,
            pretty: args.pretty,
            output_format: args.output_format,
            output_filter_path: args.filter_path,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct CurlArgs {
    /// URL path for the REST API endpoint, e.g. _cat/indices
    #[arg(short = 'P', long)]
    pub path: String,
    /// URL query parameters, e.g. "v=true&s=index"
    #[arg(short, long, default_value = "")]
    pub query_params: String,
    /// JSON body, or @file to send a file verbatim
    #[arg(short, long, default_value = "")]
    pub data: String,
    /// Headers as "name: value; name: value"
    #[arg(short = 'H', long, default_value = "")]
    pub headers: String,
    /// Ask the cluster to format the response
    #[arg(long)]
    pub pretty: bool,
    /// Response format, e.g. yaml, cbor, smile
    #[arg(short, long, default_value = "")]
    pub output_format: String,
    /// Response filter, e.g. took,hits.hits._id
    #[arg(short, long, default_value = "")]
    pub filter_path: String,
}

/// Shows a spinner on stderr while `future` runs.
pub async fn run_with_spinner<F, T>(message: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    let style_result = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner} {msg}");

    match style_result {
        Ok(style) => pb.set_style(style),
        Err(_) => {
            pb.set_style(ProgressStyle::default_spinner());
        }
    }

    let result = future.await;
    pb.finish_and_clear();
    result
}

/// Everything a command handler needs, passed in explicitly
pub struct App<S: ConfigStore> {
    profiles: ProfileController<S>,
    env: Arc<dyn Env>,
    profile_name: Option<String>,
}

impl<S: ConfigStore> App<S> {
    pub fn new(store: S, env: Arc<dyn Env>, profile_name: Option<String>) -> Self {
        Self {
            profiles: ProfileController::with_env(store, env.clone()),
            env,
            profile_name,
        }
    }

    pub fn profiles(&self) -> &ProfileController<S> {
        &self.profiles
    }

    pub fn handle_profile(
        &self,
        command: ProfileCommand,
        prompter: &mut dyn Prompter,
    ) -> Result<(), AppError> {
        match command {
            ProfileCommand::Create(args) => {
                let profile = args.into_profile(prompter)?;
                let name = profile.name.clone();
                self.profiles.create(profile)?;
                println!("Profile {name} is saved successfully.");
            }
            ProfileCommand::Delete { names } => {
                self.profiles.delete(&names)?;
            }
            ProfileCommand::List { long } => {
                let profiles = self.profiles.list()?;
                if profiles.is_empty() {
                    return Err(profile::ProfileError::NoneConfigured.into());
                }
                printer::print_profiles(&profiles, long);
            }
        }
        Ok(())
    }

    /// Profile for a cluster command, with environment overrides applied.
    pub fn resolve_profile(&self) -> Result<Profile, AppError> {
        let resolved = self.profiles.resolve(self.profile_name.as_deref())?;
        match resolved {
            Some(profile) => {
                debug!(profile = %profile.name, "using profile");
                Ok(profile.with_env_overrides(self.env.as_ref()))
            }
            None => Profile::from_env(self.env.as_ref()).ok_or(AppError::NoProfile),
        }
    }

    pub fn platform_gateway<B: HttpBackend + Send + Sync>(
        &self,
        client: Client<B>,
    ) -> Result<PlatformGateway<B>, AppError> {
        let profile = self.resolve_profile()?;
        let gateway = Gateway::with_env(profile, client, self.env.clone())?;
        Ok(PlatformGateway::new(gateway))
    }

    /// Runs a `curl` command. A cluster error response is printed like a
    /// normal answer and does not fail the command.
    pub async fn handle_curl<B: HttpBackend + Send + Sync>(
        &self,
        gateway: &PlatformGateway<B>,
        command: CurlCommand,
    ) -> Result<(), AppError> {
        let request = mapper::map(command.into_request())?;
        let message = format!("{} {}", request.action, request.path);
        match run_with_spinner(&message, gateway.curl(request)).await {
            Ok(body) => printer::print_body(&body),
            Err(GatewayError::Request(err)) => printer::print_request_error(&err),
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }
}

/// Writes the completion script for `shell`.
pub fn write_completion(shell: Shell, out: &mut dyn io::Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
}

/// Executes a parsed command line against the real environment.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    if let Command::Completion { shell } = cli.command {
        write_completion(shell, &mut io::stdout());
        return Ok(());
    }
    let env: Arc<dyn Env> = Arc::new(ProcessEnv);
    let path = config::resolve_config_path(cli.config.as_deref(), env.as_ref())?;
    debug!(path = %path.display(), "using config file");
    let app = App::new(YamlConfigStore::new(path), env, cli.profile);
    match cli.command {
        Command::Profile(command) => app.handle_profile(command, &mut TerminalPrompter),
        Command::Curl(command) => {
            let client = Client::new(ReqwestBackend::new()?);
            let gateway = app.platform_gateway(client)?;
            app.handle_curl(&gateway, command).await
        }
        Command::Completion { .. } => Ok(()),
    }
}
