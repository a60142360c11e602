//! Console commands and helpers contributed by the extension manifest.

use crate::error::{AppError, ConfigError};
use crate::odm::{DocumentManager, SOFT_DELETE_FLAG};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DOCUMENT_MANAGER_HELPER: &str = "documentManager";
pub const ACTIVE_USER_HELPER: &str = "activeUser";

#[derive(Clone)]
pub enum Helper {
    DocumentManager(Arc<DocumentManager>),
    Value(Value),
}

/// Helpers available to every command, by name.
#[derive(Clone, Default)]
pub struct HelperSet {
    helpers: BTreeMap<String, Helper>,
}

impl HelperSet {
    pub fn set(&mut self, name: impl Into<String>, helper: Helper) {
        self.helpers.insert(name.into(), helper);
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.helpers.keys().map(String::as_str).collect()
    }

    pub fn document_manager(&self) -> Result<Arc<DocumentManager>, ConfigError> {
        match self.helpers.get(DOCUMENT_MANAGER_HELPER) {
            Some(Helper::DocumentManager(dm)) => Ok(dm.clone()),
            _ => Err(ConfigError::MissingService(DOCUMENT_MANAGER_HELPER.to_string())),
        }
    }
}

#[async_trait]
pub trait CliCommand: Send + Sync {
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    fn command(&self) -> Command {
        Command::new(self.name()).about(self.help())
    }

    async fn execute(&self, args: &ArgMatches, helpers: &HelperSet) -> Result<String, AppError>;
}

#[derive(Clone, Default)]
pub struct CliRegistry {
    commands: BTreeMap<&'static str, Arc<dyn CliCommand>>,
    helpers: HelperSet,
}

impl CliRegistry {
    pub fn new() -> Self {
        CliRegistry::default()
    }

    pub fn add_commands(&mut self, commands: impl IntoIterator<Item = Arc<dyn CliCommand>>) {
        for c in commands {
            self.commands.insert(c.name(), c);
        }
    }

    pub fn helper_set(&self) -> &HelperSet {
        &self.helpers
    }

    pub fn helper_set_mut(&mut self) -> &mut HelperSet {
        &mut self.helpers
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CliCommand>> {
        self.commands.get(name)
    }

    /// Run a command from argv, where `argv[0]` is the command name.
    pub async fn run(&self, argv: &[String]) -> Result<String, AppError> {
        let name = argv
            .first()
            .ok_or_else(|| AppError::BadRequest("no command given".into()))?;
        let command = self
            .get(name)
            .ok_or_else(|| AppError::BadRequest(format!("unknown command '{}'", name)))?;
        let matches = command
            .command()
            .try_get_matches_from(argv)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        tracing::info!(command = %name, "running command");
        command.execute(&matches, &self.helpers).await
    }
}

/// Prints the enabled extensions, one per line.
pub struct ExtensionsListCommand {
    pub extensions: Vec<String>,
}

#[async_trait]
impl CliCommand for ExtensionsListCommand {
    fn name(&self) -> &'static str {
        "extensions:list"
    }

    fn help(&self) -> &'static str {
        "List the enabled document extensions"
    }

    async fn execute(&self, _args: &ArgMatches, _helpers: &HelperSet) -> Result<String, AppError> {
        Ok(self.extensions.join("\n"))
    }
}

/// Permanently removes documents whose soft-delete flag is set.
pub struct SoftDeletePurgeCommand;

#[async_trait]
impl CliCommand for SoftDeletePurgeCommand {
    fn name(&self) -> &'static str {
        "soft-delete:purge"
    }

    fn help(&self) -> &'static str {
        "Remove soft-deleted documents of a class"
    }

    fn command(&self) -> Command {
        Command::new(self.name()).about(self.help()).arg(
            Arg::new("class")
                .long("class")
                .required(true)
                .help("Document class to purge"),
        )
    }

    async fn execute(&self, args: &ArgMatches, helpers: &HelperSet) -> Result<String, AppError> {
        let class = args
            .get_one::<String>("class")
            .ok_or_else(|| AppError::BadRequest("--class is required".into()))?;
        let dm = helpers.document_manager()?;
        let meta = dm.class_metadata(class)?;
        let flags: Vec<String> = meta
            .fields_with_annotation(SOFT_DELETE_FLAG)
            .map(|f| f.name.clone())
            .collect();
        if flags.is_empty() {
            return Err(AppError::BadRequest(format!("{} has no soft-delete flag", class)));
        }
        let mut purged = 0;
        for flag in flags {
            purged += dm
                .create_query_builder(class)?
                .equals(flag, Value::Bool(true))
                .remove()
                .await?;
        }
        Ok(format!("purged {} documents of {}", purged, class))
    }
}
