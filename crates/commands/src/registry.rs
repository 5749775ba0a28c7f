//! Name/alias lookup for registered commands.

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    command::CommandDef,
    error::{Error, Result},
};

/// Registered commands, keyed by name and alias.
///
/// Every name and alias maps to exactly one command. Registration happens at
/// startup; the registry is then shared read-only behind an `Arc`.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: Vec<Arc<CommandDef>>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    case_insensitive: bool,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CommandRegistry {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            commands: Vec::new(),
            by_name: HashMap::new(),
            by_alias: HashMap::new(),
            case_insensitive,
        }
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    fn normalize(&self, key: &str) -> String {
        if self.case_insensitive {
            key.to_lowercase()
        } else {
            key.to_string()
        }
    }

    fn owner_of(&self, key: &str) -> Option<&str> {
        self.by_name
            .get(key)
            .or_else(|| self.by_alias.get(key))
            .and_then(|&idx| self.commands.get(idx))
            .map(|def| def.name.as_str())
    }

    /// Add a command. On any collision nothing is inserted.
    pub fn register(&mut self, def: CommandDef) -> Result<Arc<CommandDef>> {
        if def.name.is_empty() || def.name.contains(char::is_whitespace) {
            return Err(Error::invalid_definition(format!(
                "command name `{}` must be a single non-empty word",
                def.name
            )));
        }

        let mut keys: Vec<String> = Vec::with_capacity(def.aliases.len() + 1);
        for raw in def.keys() {
            if raw.is_empty() || raw.contains(char::is_whitespace) {
                return Err(Error::invalid_definition(format!(
                    "alias `{raw}` of `{}` must be a single non-empty word",
                    def.name
                )));
            }
            let key = self.normalize(raw);
            if keys.contains(&key) {
                return Err(Error::duplicate(key, &def.name));
            }
            if let Some(owner) = self.owner_of(&key) {
                return Err(Error::duplicate(key, owner));
            }
            keys.push(key);
        }

        let idx = self.commands.len();
        let mut keys = keys.into_iter();
        if let Some(name_key) = keys.next() {
            self.by_name.insert(name_key, idx);
        }
        for alias_key in keys {
            self.by_alias.insert(alias_key, idx);
        }

        debug!(command = %def.name, aliases = ?def.aliases, "command registered");
        let def = Arc::new(def);
        self.commands.push(Arc::clone(&def));
        Ok(def)
    }

    /// Look `token` up as a name first, then as an alias.
    pub fn resolve(&self, token: &str) -> Option<Arc<CommandDef>> {
        if token.is_empty() {
            return None;
        }
        let key = self.normalize(token);
        self.by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .and_then(|&idx| self.commands.get(idx))
            .cloned()
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDef>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
