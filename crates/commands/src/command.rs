//! Command definitions.

use std::{fmt, future::Future, sync::Arc};

use {
    async_trait::async_trait,
    ivebot_channels::{ConversationKind, MessageHandle, Payload},
};

use crate::{context::CommandContext, permission::Requirement};

/// Produces the response of a command that cannot be known in advance.
///
/// Returning `Ok(None)` means "nothing to send"; the post-hook still runs.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, ctx: CommandContext) -> anyhow::Result<Option<Payload>>;
}

#[async_trait]
impl<F, Fut> Generate for F
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Payload>>> + Send + 'static,
{
    async fn generate(&self, ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
        self(ctx).await
    }
}

/// Runs after the response was (or was not) sent. `sent` is the handle of
/// the posted response, if any.
#[async_trait]
pub trait PostHook: Send + Sync {
    async fn run(&self, ctx: CommandContext, sent: Option<MessageHandle>) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> PostHook for F
where
    F: Fn(CommandContext, Option<MessageHandle>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, ctx: CommandContext, sent: Option<MessageHandle>) -> anyhow::Result<()> {
        self(ctx, sent).await
    }
}

/// How a command obtains its response.
#[derive(Clone)]
pub enum Generator {
    /// The same payload every time.
    Static(Payload),
    /// Computed per invocation.
    Deferred(Arc<dyn Generate>),
}

impl Generator {
    pub fn fixed(payload: impl Into<Payload>) -> Self {
        Self::Static(payload.into())
    }

    /// Wrap an async closure.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Payload>>> + Send + 'static,
    {
        Self::Deferred(Arc::new(f))
    }

    pub fn from_impl(generate: impl Generate + 'static) -> Self {
        Self::Deferred(Arc::new(generate))
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(payload) => f.debug_tuple("Static").field(payload).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Where a command may be invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextRestriction {
    #[default]
    Any,
    GuildOnly,
    DirectOnly,
}

impl ContextRestriction {
    pub fn permits(self, kind: ConversationKind) -> bool {
        match self {
            Self::Any => true,
            Self::GuildOnly => kind == ConversationKind::Guild,
            Self::DirectOnly => kind == ConversationKind::Direct,
        }
    }
}

pub const DEFAULT_INVALID_USAGE_MESSAGE: &str = "Invalid usage.";
pub const DEFAULT_ERROR_MESSAGE: &str = "IveBot has experienced an internal error.";
pub const TRIGGER_DELETE_REASON: &str = "Automatically deleted by IveBot.";

/// Immutable description of one command.
///
/// Build with [`CommandDef::new`] and the chained setters, then hand it to
/// [`crate::CommandRegistry::register`].
#[derive(Clone)]
pub struct CommandDef {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub full_description: String,
    pub usage: String,
    pub example: String,
    pub hidden: bool,
    /// When set, an invocation with no arguments gets
    /// `invalid_usage_message` instead of running.
    pub requires_arguments: bool,
    pub restriction: ContextRestriction,
    pub requirement: Option<Requirement>,
    pub generator: Generator,
    pub post_hook: Option<Arc<dyn PostHook>>,
    /// Delete the triggering message once the command completes.
    pub delete_trigger: bool,
    pub invalid_usage_message: String,
    pub error_message: String,
}

impl fmt::Debug for CommandDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDef")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("hidden", &self.hidden)
            .field("requires_arguments", &self.requires_arguments)
            .field("restriction", &self.restriction)
            .field("requirement", &self.requirement)
            .field("generator", &self.generator)
            .field("post_hook", &self.post_hook.is_some())
            .field("delete_trigger", &self.delete_trigger)
            .finish_non_exhaustive()
    }
}

impl CommandDef {
    pub fn new(name: impl Into<String>, generator: Generator) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            full_description: String::new(),
            usage: String::new(),
            example: String::new(),
            hidden: false,
            requires_arguments: true,
            restriction: ContextRestriction::Any,
            requirement: None,
            generator,
            post_hook: None,
            delete_trigger: false,
            invalid_usage_message: DEFAULT_INVALID_USAGE_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn full_description(mut self, full_description: impl Into<String>) -> Self {
        self.full_description = full_description.into();
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    #[must_use]
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn no_arguments(mut self) -> Self {
        self.requires_arguments = false;
        self
    }

    #[must_use]
    pub fn guild_only(mut self) -> Self {
        self.restriction = ContextRestriction::GuildOnly;
        self
    }

    #[must_use]
    pub fn direct_only(mut self) -> Self {
        self.restriction = ContextRestriction::DirectOnly;
        self
    }

    #[must_use]
    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    #[must_use]
    pub fn post_hook<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CommandContext, Option<MessageHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.post_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn post_hook_impl(mut self, hook: impl PostHook + 'static) -> Self {
        self.post_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn delete_trigger(mut self) -> Self {
        self.delete_trigger = true;
        self
    }

    #[must_use]
    pub fn invalid_usage_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_usage_message = message.into();
        self
    }

    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Name followed by aliases.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}
