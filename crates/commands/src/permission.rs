//! Per-command access requirements and their evaluation.

use std::{fmt, sync::Arc};

use ivebot_channels::{CapabilitySet, ConversationKind, InboundMessage, gating::is_listed};

/// Arbitrary predicate over the triggering message.
pub type CustomCheck = Arc<dyn Fn(&InboundMessage) -> bool + Send + Sync>;

/// One way of satisfying a [`Requirement`].
#[derive(Clone)]
pub enum Check {
    /// The author's id is on this list.
    Actors(Vec<String>),
    /// The predicate returns true for the message.
    Custom(CustomCheck),
    /// The author holds every listed capability in the current guild channel.
    /// Never satisfied outside a guild.
    Capabilities(CapabilitySet),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actors(ids) => f.debug_tuple("Actors").field(ids).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Capabilities(caps) => f.debug_tuple("Capabilities").field(caps).finish(),
        }
    }
}

impl Check {
    pub fn passes(&self, message: &InboundMessage) -> bool {
        match self {
            Self::Actors(ids) => is_listed(&message.author.id, ids),
            Self::Custom(predicate) => predicate(message),
            Self::Capabilities(required) => match (&message.kind, &message.member_capabilities) {
                (ConversationKind::Guild, Some(granted)) => granted.covers(required),
                _ => false,
            },
        }
    }
}

/// Logical OR of the checks a command declares.
///
/// A check that is not declared contributes nothing, so an empty
/// requirement denies everyone. Commands open to all carry no requirement
/// at all (`None`).
#[derive(Debug, Clone, Default)]
pub struct Requirement {
    checks: Vec<Check>,
}

impl Requirement {
    pub fn any_of(checks: impl IntoIterator<Item = Check>) -> Self {
        Self {
            checks: checks.into_iter().collect(),
        }
    }

    pub fn actors<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().or_actors(ids)
    }

    pub fn capabilities<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().or_capabilities(names)
    }

    pub fn custom(predicate: impl Fn(&InboundMessage) -> bool + Send + Sync + 'static) -> Self {
        Self::default().or(Check::Custom(Arc::new(predicate)))
    }

    #[must_use]
    pub fn or(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    #[must_use]
    pub fn or_actors<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.or(Check::Actors(ids.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn or_capabilities<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.or(Check::Capabilities(CapabilitySet::granted(names)))
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn is_satisfied_by(&self, message: &InboundMessage) -> bool {
        self.checks.iter().any(|check| check.passes(message))
    }
}

/// Result of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// Decide whether the author of `message` may run a command with `requirement`.
pub fn evaluate(requirement: Option<&Requirement>, message: &InboundMessage) -> Verdict {
    match requirement {
        None => Verdict::Allow,
        Some(req) if req.is_satisfied_by(message) => Verdict::Allow,
        Some(_) => Verdict::Deny,
    }
}
