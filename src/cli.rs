//! Command-line surface
//!
//! The fixed part (connection, actions, LDAP, API keys) is derived with clap.
//! Resource field flags are generated at startup from the union schema of
//! each resource kind, so adding a field to a schema adds its flag.

use crate::artifactory::client::ArtifactoryClient;
use crate::artifactory::security::{self, LdapSetting};
use crate::config::{Config, ConnectionOverrides};
use crate::error::ProvisionError;
use crate::provision::{
    apply_suffix, apply_suffix_to_references, Bucket, BulkOperation, IdempotencyGuard, Manifest,
    ManifestRunner, Outcome, RegistryApi, RunReport,
};
use crate::resource::{coerce, FieldSchema, FieldType, Params, ResourceKind, ResourceVariant, SchemaRegistry};
use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::Level;

/// Provision Artifactory repositories, users, groups and permissions
#[derive(Parser, Debug)]
#[command(name = "artprov", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags; `ARTIFACTORY_*` environment variables override them
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Artifactory server URL
    #[arg(long, global = true)]
    pub artifactory_url: Option<String>,

    #[arg(long, global = true)]
    pub artifactory_username: Option<String>,

    #[arg(long, global = true)]
    pub artifactory_password: Option<String>,

    /// API key, used instead of username/password
    #[arg(long, global = true)]
    pub artifactory_api_key: Option<String>,

    /// Context path Artifactory is served under
    #[arg(long, global = true)]
    pub artifactory_redirect: Option<String>,
}

impl From<&ConnectionArgs> for ConnectionOverrides {
    fn from(args: &ConnectionArgs) -> Self {
        Self {
            url: args.artifactory_url.clone(),
            username: args.artifactory_username.clone(),
            password: args.artifactory_password.clone(),
            api_key: args.artifactory_api_key.clone(),
            redirect: args.artifactory_redirect.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage local, remote and virtual repositories
    Repo(ResourceArgs),
    /// Manage users
    User(ResourceArgs),
    /// Manage groups
    Group(ResourceArgs),
    /// Manage permission targets
    Permission(ResourceArgs),
    /// Configure LDAP and import LDAP groups
    Ldap {
        #[command(subcommand)]
        action: LdapAction,
    },
    /// Manage API keys
    Apikey {
        #[command(subcommand)]
        action: ApiKeyAction,
    },
    /// Show or save the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Commands {
    /// Resource kind handled by a resource subcommand
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Repo(_) => Some(ResourceKind::Repository),
            Self::User(_) => Some(ResourceKind::User),
            Self::Group(_) => Some(ResourceKind::Group),
            Self::Permission(_) => Some(ResourceKind::Permission),
            _ => None,
        }
    }
}

/// Subcommand name of each resource kind
pub fn subcommand_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Repository => "repo",
        ResourceKind::User => "user",
        ResourceKind::Group => "group",
        ResourceKind::Permission => "permission",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Create,
    Update,
    Delete,
    BulkCreate,
    BulkUpdate,
    BulkDelete,
}

impl Action {
    /// Operation applied, and whether it runs over a manifest
    fn operation(self) -> (BulkOperation, bool) {
        match self {
            Self::Create => (BulkOperation::Create, false),
            Self::Update => (BulkOperation::Update, false),
            Self::Delete => (BulkOperation::Delete, false),
            Self::BulkCreate => (BulkOperation::Create, true),
            Self::BulkUpdate => (BulkOperation::Update, true),
            Self::BulkDelete => (BulkOperation::Delete, true),
        }
    }
}

/// Fixed arguments of a resource subcommand
#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    pub action: Action,

    /// Repository type: local, remote or virtual
    #[arg(long = "type")]
    pub variant: Option<String>,

    /// Appended to every key (and permission repository reference)
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub suffix: String,

    /// Manifest file for bulk actions
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum LdapAction {
    /// Write an LDAP setting into the system configuration
    Configure(LdapArgs),
    /// Import LDAP groups that are not Artifactory groups yet
    ImportGroup {
        /// LDAP group setting to import from
        #[arg(long)]
        ldap_group_name: String,

        /// Comma-separated LDAP group names
        #[arg(long, value_delimiter = ',', required = true)]
        ldap_group_list: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LdapArgs {
    /// Name of the LDAP setting
    #[arg(long)]
    pub name: String,
    /// LDAP URL
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub search_filter: String,
    #[arg(long, default_value = "")]
    pub search_base: String,
    /// LDAP binding account
    #[arg(long)]
    pub manager_dn: String,
    #[arg(long)]
    pub manager_password: String,
    #[arg(long)]
    pub email_attribute: String,
    #[arg(long)]
    pub group_name: String,
    #[arg(long)]
    pub group_search_base: String,
    #[arg(long)]
    pub group_name_attribute: String,
    #[arg(long)]
    pub group_member_attribute: String,
    #[arg(long)]
    pub group_filter: String,
    #[arg(long)]
    pub description_attribute: String,
}

impl From<LdapArgs> for LdapSetting {
    fn from(args: LdapArgs) -> Self {
        Self {
            name: args.name,
            url: args.url,
            search_filter: args.search_filter,
            search_base: args.search_base,
            manager_dn: args.manager_dn,
            manager_password: args.manager_password,
            email_attribute: args.email_attribute,
            group_name: args.group_name,
            group_search_base: args.group_search_base,
            group_name_attribute: args.group_name_attribute,
            group_member_attribute: args.group_member_attribute,
            group_filter: args.group_filter,
            description_attribute: args.description_attribute,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ApiKeyAction {
    /// Show the API key of the authenticated user
    Get,
    /// Create an API key, generated unless given
    Create {
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Revoke the own API key, or another user's
    Revoke {
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the persisted configuration, secrets masked
    Show,
    /// Persist the connection flags given on this command line
    Save,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parsed command line: fixed arguments plus schema-driven resource fields
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    /// Resource fields supplied as flags, by field name
    pub params: Params,
}

/// Full command with resource field flags generated from `registry`
pub fn command(registry: &SchemaRegistry) -> Command {
    let mut command = Cli::command();
    for kind in ResourceKind::ALL {
        let fields = registry.union_schema(kind);
        command = command.mut_subcommand(subcommand_name(kind), |sub| {
            fields.iter().fold(sub, |sub, field| sub.arg(field_arg(field)))
        });
    }
    command
}

fn field_arg(field: &FieldSchema) -> Arg {
    let help = field
        .help
        .clone()
        .unwrap_or_else(|| format!("{} ({})", field.name.replace('_', " "), field.field_type));

    let arg = Arg::new(field.name.clone())
        .long(field.name.replace('_', "-"))
        .value_name(field.field_type.as_str().to_uppercase())
        .help(help);

    match field.field_type {
        // `--flag` alone means true
        FieldType::Bool => arg.num_args(0..=1).default_missing_value("true"),
        _ => arg,
    }
}

/// Parse the process arguments, exiting on usage errors
pub fn parse(registry: &SchemaRegistry) -> Invocation {
    match try_parse_from(registry, std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    }
}

pub fn try_parse_from<I, T>(registry: &SchemaRegistry, args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command(registry).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;

    let params = match (cli.command.resource_kind(), matches.subcommand()) {
        (Some(kind), Some((_, sub))) => field_params(registry, kind, sub),
        _ => Params::new(),
    };

    Ok(Invocation { cli, params })
}

fn field_params(registry: &SchemaRegistry, kind: ResourceKind, matches: &ArgMatches) -> Params {
    registry
        .union_schema(kind)
        .into_iter()
        .filter_map(|field| {
            let value = matches.get_one::<String>(&field.name)?;
            Some((field.name, Value::String(value.clone())))
        })
        .collect()
}

// =============================================================================
// Dispatch
// =============================================================================

/// Run a resource subcommand, returning the JSON to print
///
/// Bulk failures are returned as the error, after logging the partial report.
pub async fn execute_resource<A: RegistryApi + ?Sized>(
    api: &A,
    registry: &SchemaRegistry,
    kind: ResourceKind,
    args: &ResourceArgs,
    params: &Params,
) -> Result<Value> {
    let (operation, bulk) = args.action.operation();
    if bulk {
        let report = execute_bulk(api, registry, kind, args, operation).await?;
        return Ok(report_json(&report));
    }

    let mut params = params.clone();
    let key_field = key_field(registry, kind)?;
    let raw_key = match params.get(&key_field.name).filter(|v| !v.is_null()) {
        Some(raw) => coerce(&key_field, raw)?,
        None => Value::Null,
    };
    let key = match raw_key.as_str() {
        Some(key) if !key.is_empty() => apply_suffix(key, &args.suffix),
        _ if operation == BulkOperation::Create => {
            return Err(ProvisionError::MissingRequiredField {
                variant: variant_for(kind, args)?,
                field: key_field.name,
            }
            .into())
        }
        _ => bail!("{} {} needs --{}", kind, operation, key_field.name),
    };
    apply_suffix_to_references(kind, &mut params, &args.suffix);

    let guard = IdempotencyGuard::new(api, registry);
    let outcome = match operation {
        BulkOperation::Create => guard.ensure_created(variant_for(kind, args)?, &key, &params).await?,
        BulkOperation::Update => guard.update(kind, &key, &params).await?,
        BulkOperation::Delete => guard.ensure_deleted(kind, &key).await?,
    };
    Ok(outcome_json(&outcome))
}

async fn execute_bulk<A: RegistryApi + ?Sized>(
    api: &A,
    registry: &SchemaRegistry,
    kind: ResourceKind,
    args: &ResourceArgs,
    operation: BulkOperation,
) -> Result<RunReport> {
    let buckets: &[Bucket] = match kind {
        ResourceKind::Repository => &Bucket::REPOSITORIES,
        ResourceKind::Permission => &[Bucket::Permissions],
        _ => bail!("Bulk actions are only available for repositories and permissions"),
    };
    let path = args
        .path
        .as_ref()
        .context("Bulk actions need a manifest: pass --path")?;
    let manifest = Manifest::load(path)?;
    tracing::info!(
        "Bulk {} of {} entries from {}",
        operation,
        manifest.entry_count(buckets),
        path.display()
    );

    let runner = ManifestRunner::new(api, registry)
        .with_suffix(args.suffix.clone())
        .with_buckets(buckets);
    match runner.run(&manifest, operation).await {
        Ok(report) => Ok(report),
        Err(aborted) => {
            println!("{}", serde_json::to_string_pretty(&report_json(&aborted.partial))?);
            Err(aborted.into())
        }
    }
}

/// Key field shared by every variant of `kind`
fn key_field(registry: &SchemaRegistry, kind: ResourceKind) -> Result<FieldSchema> {
    let variant = kind.variants()[0];
    let schema = registry.get_schema(variant)?;
    schema
        .field(&schema.key_field)
        .cloned()
        .with_context(|| format!("{} schema has no key field '{}'", kind, schema.key_field))
}

fn variant_for(kind: ResourceKind, args: &ResourceArgs) -> Result<ResourceVariant> {
    if let Some(variant) = kind.sole_variant() {
        return Ok(variant);
    }
    let tag = args
        .variant
        .as_deref()
        .with_context(|| format!("{} needs --type (one of: local, remote, virtual)", kind))?;
    let variant: ResourceVariant = tag.parse()?;
    if variant.kind() != kind {
        bail!("--type {} is not a {} variant", tag, kind);
    }
    Ok(variant)
}

pub fn outcome_json(outcome: &Outcome) -> Value {
    json!({"changed": outcome.changed, "msg": outcome.message})
}

pub fn report_json(report: &RunReport) -> Value {
    json!({"changed": report.changed, "msg": report.messages()})
}

/// Run an LDAP subcommand
pub async fn execute_ldap(client: &ArtifactoryClient, action: LdapAction) -> Result<Value> {
    let outcome = match action {
        LdapAction::Configure(args) => security::configure_ldap(client, &args.into()).await?,
        LdapAction::ImportGroup {
            ldap_group_name,
            ldap_group_list,
        } => security::import_ldap_groups(client, &ldap_group_name, &ldap_group_list).await?,
    };
    Ok(outcome_json(&outcome))
}

/// Run an API key subcommand
pub async fn execute_apikey(client: &ArtifactoryClient, action: ApiKeyAction) -> Result<Value> {
    let outcome = match action {
        ApiKeyAction::Get => {
            let key = security::get_api_key(client).await?;
            Outcome::unchanged(key.unwrap_or_default())
        }
        ApiKeyAction::Create { api_key } => security::create_api_key(client, api_key.as_deref()).await?,
        ApiKeyAction::Revoke { user } => security::revoke_api_key(client, user.as_deref()).await?,
    };
    Ok(outcome_json(&outcome))
}

/// Run a config subcommand
pub fn execute_config(action: ConfigAction, connection: &ConnectionArgs) -> Result<Value> {
    let mut config = Config::load()?;
    match action {
        ConfigAction::Show => {
            let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
            Ok(json!({
                "path": Config::config_path(),
                "url": config.url,
                "username": config.username,
                "password": mask(&config.password),
                "api_key": mask(&config.api_key),
                "redirect": config.redirect,
                "timeout_secs": config.timeout_secs,
            }))
        }
        ConfigAction::Save => {
            config.merge(&connection.into());
            let path = config.save()?;
            Ok(json!({"changed": true, "msg": format!("Configuration saved to {}", path.display())}))
        }
    }
}
