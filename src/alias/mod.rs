//! Alias resolution, validation, and the local/remote connection check.
//!
//! A pull targets one alias from the WP-CLI registry. Resolution picks the
//! alias by name (adding the `@` sigil when missing) or falls back to the
//! configured default. Validation turns the registry entry into an
//! [`Environment`] only when both `ssh` and `path` are declared, and the
//! connection check confirms that the local home URL is the expected one and
//! that the remote home URL differs from it.

use thiserror::Error;
use tracing::debug;

use crate::context::RunContext;
use crate::runner::{CommandError, CommandLine, CommandRunner, ExecContext, OnFailure, WpCli};

mod registry;

pub use registry::{AliasRecord, AliasRegistry};

/// Prefix carried by every alias name.
pub const ALIAS_SIGIL: char = '@';

/// Errors raised while resolving or validating an alias.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AliasError {
    /// Raised when the registry holds no aliases at all.
    #[error("no environments configured: add aliases to wp-cli.yml")]
    NoAliases,
    /// Raised when an explicitly requested alias is not registered.
    #[error("alias {name} not found")]
    NotFound {
        /// Normalised name that was looked up.
        name: String,
    },
    /// Raised when no alias was requested and the default is not registered.
    #[error("please specify an environment: wp-sync pull <alias> (default {default} is not registered)")]
    NoDefault {
        /// Default alias that was looked up.
        default: String,
    },
    /// Raised when an alias lacks a required connection attribute.
    #[error("alias {alias} does not have `{field}` configuration")]
    MissingField {
        /// Alias being validated.
        alias: String,
        /// Attribute that is absent or blank.
        field: &'static str,
    },
    /// Raised when the alias list cannot be parsed.
    #[error("failed to parse alias list: {0}")]
    Registry(String),
    /// Raised when the local home URL differs from the expected one.
    #[error("local URL does not match expected configuration: expected {expected}, found {actual}")]
    LocalUrlMismatch {
        /// Expected local home URL.
        expected: String,
        /// Home URL reported by the local site.
        actual: String,
    },
    /// Raised when the alias reports the same home URL as the local site.
    #[error("remote URL equals local URL ({url}): check the alias configuration")]
    RemoteUrlMatchesLocal {
        /// Shared home URL.
        url: String,
    },
    /// Raised when the alias reports no home URL.
    #[error("remote home URL reported by {alias} is empty")]
    EmptyRemoteUrl {
        /// Alias that was queried.
        alias: String,
    },
    /// Raised when a command needed by the check fails.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// An alias that passed validation and can receive commands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Environment {
    /// Sigil-prefixed alias name.
    pub name: String,
    /// Transport descriptor such as `user@host`.
    pub connection: String,
    /// Application root on the remote host.
    pub remote_path: String,
}

impl Environment {
    /// Remote location in `connection:path` form.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}:{}", self.connection, self.remote_path)
    }

    /// The `--ssh` global argument routing WP-CLI to this environment.
    #[must_use]
    pub fn ssh_arg(&self) -> String {
        format!("--ssh={}", self.location())
    }
}

/// Home URLs confirmed by [`check_connection`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SiteUrls {
    /// Home URL of the local site.
    pub local: String,
    /// Home URL of the remote site; replaced by `local` after import.
    pub remote: String,
}

/// Registry entry selected by [`resolve`], not yet validated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AliasEntry {
    /// Sigil-prefixed alias name.
    pub name: String,
    /// Attributes declared for the alias.
    pub record: AliasRecord,
}

/// Adds the alias sigil when `name` lacks it.
///
/// # Examples
///
/// ```
/// # use wp_sync::alias::normalize_alias;
/// assert_eq!(normalize_alias("production"), "@production");
/// assert_eq!(normalize_alias("@staging"), "@staging");
/// ```
#[must_use]
pub fn normalize_alias(name: &str) -> String {
    if name.starts_with(ALIAS_SIGIL) {
        name.to_owned()
    } else {
        format!("{ALIAS_SIGIL}{name}")
    }
}

/// Selects the alias to pull from.
///
/// A requested name is normalised and must exist. Without one, the default
/// alias is used when registered.
///
/// # Errors
///
/// Returns [`AliasError::NoAliases`] for an empty registry,
/// [`AliasError::NotFound`] for an unknown requested alias, and
/// [`AliasError::NoDefault`] when nothing was requested and the default is
/// not registered.
pub fn resolve(
    requested: Option<&str>,
    registry: &AliasRegistry,
    default: &str,
) -> Result<AliasEntry, AliasError> {
    if registry.is_empty() {
        return Err(AliasError::NoAliases);
    }

    let requested_name = requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(normalize_alias);

    if let Some(name) = requested_name {
        let Some(record) = registry.get(&name).cloned() else {
            return Err(AliasError::NotFound { name });
        };
        return Ok(AliasEntry { name, record });
    }

    registry
        .get(default)
        .cloned()
        .map(|record| AliasEntry {
            name: default.to_owned(),
            record,
        })
        .ok_or_else(|| AliasError::NoDefault {
            default: default.to_owned(),
        })
}

/// Checks that the alias declares both `ssh` and `path`.
///
/// # Errors
///
/// Returns [`AliasError::MissingField`] naming the first absent attribute.
pub fn validate(entry: AliasEntry) -> Result<Environment, AliasError> {
    let AliasEntry { name, record } = entry;
    let Some(connection) = non_blank(record.ssh) else {
        return Err(AliasError::MissingField {
            alias: name,
            field: "ssh",
        });
    };
    let Some(remote_path) = non_blank(record.path) else {
        return Err(AliasError::MissingField {
            alias: name,
            field: "path",
        });
    };

    Ok(Environment {
        name,
        connection,
        remote_path,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Loads the alias registry from the local WP-CLI configuration.
///
/// # Errors
///
/// Returns [`AliasError::Command`] when `wp cli alias list` fails and
/// [`AliasError::Registry`] when its output cannot be parsed.
pub fn load_registry<R: CommandRunner>(
    wp: &WpCli<R>,
    ctx: &mut RunContext,
) -> Result<AliasRegistry, AliasError> {
    let command = CommandLine::new(["cli", "alias", "list", "--format=json"]);
    let payload = wp.run(ctx, &command, ExecContext::Local, OnFailure::Abort)?;
    let registry = AliasRegistry::from_json(&payload)?;
    debug!(aliases = registry.len(), "loaded alias registry");
    Ok(registry)
}

/// Compares the local and remote home URLs.
///
/// The local home URL must equal `expected_local`, or the local `WP_HOME`
/// constant when no expectation is supplied. The remote home URL, read
/// through the environment on `ctx`, must be non-empty and differ from the
/// local one.
///
/// # Errors
///
/// Returns [`AliasError::LocalUrlMismatch`],
/// [`AliasError::EmptyRemoteUrl`], [`AliasError::RemoteUrlMatchesLocal`], or
/// [`AliasError::Command`] when a query fails.
pub fn check_connection<R: CommandRunner>(
    wp: &WpCli<R>,
    ctx: &mut RunContext,
    expected_local: Option<&str>,
) -> Result<SiteUrls, AliasError> {
    let home = CommandLine::new(["option", "get", "home"]);

    let expected = match expected_local {
        Some(url) => url.trim().to_owned(),
        None => {
            // Evaluated at runtime: Bedrock defines it outside wp-config.php.
            let wp_home = CommandLine::new(["eval", "echo WP_HOME;"]);
            wp.run(ctx, &wp_home, ExecContext::Local, OnFailure::Abort)?
                .trim()
                .to_owned()
        }
    };

    let local = wp
        .run(ctx, &home, ExecContext::Local, OnFailure::Abort)?
        .trim()
        .to_owned();
    if local != expected {
        return Err(AliasError::LocalUrlMismatch {
            expected,
            actual: local,
        });
    }

    let remote = wp
        .run(ctx, &home, ExecContext::Remote, OnFailure::Abort)?
        .trim()
        .to_owned();
    if remote.is_empty() {
        let alias = ctx
            .environment()
            .map_or_else(String::new, |environment| environment.name.clone());
        return Err(AliasError::EmptyRemoteUrl { alias });
    }
    if remote == local {
        return Err(AliasError::RemoteUrlMatchesLocal { url: remote });
    }

    Ok(SiteUrls { local, remote })
}
