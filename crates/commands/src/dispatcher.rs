//! The per-message command pipeline.
//!
//! ```text
//! RECEIVED -> ignored (automated author)
//!          -> fallback (not an invocation / unknown command)
//!          -> ARG_CHECK -> invalid usage
//!          -> CONTEXT_CHECK -> silently dropped
//!          -> PERMISSION_CHECK -> denial
//!          -> EXECUTING -> RESPONSE_READY -> SEND (if allowed)
//!          -> POSTHOOK -> TRIGGER_DELETE -> completed
//! ```
//!
//! Any failure after resolution lands in the dispatcher's failure boundary,
//! which logs it and posts the command's error message exactly once.

use std::{future::Future, sync::Arc};

use {
    ivebot_channels::{
        ConversationClient, FallbackHandler, IgnoreFallback, InboundMessage, MessageHandle,
        Payload,
    },
    ivebot_storage::DocumentStore,
    tracing::{debug, error, info, warn},
};

use crate::{
    command::{CommandDef, Generator, TRIGGER_DELETE_REASON},
    context::CommandContext,
    error::{Error, Result},
    extract::{ArgumentExtractor, Invocation},
    insult::denial_message,
    permission::{Verdict, evaluate},
    registry::CommandRegistry,
    state::EphemeralState,
};

/// Terminal state of one message's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Authored by a bot; nothing happened.
    IgnoredAutomated,
    /// Handed to the fallback handler.
    Forwarded,
    /// Arguments were required but absent.
    InvalidUsage,
    /// The command does not run in this kind of conversation.
    WrongContext,
    /// The permission check failed.
    Denied,
    Completed {
        sent: Option<MessageHandle>,
        trigger_deleted: bool,
    },
    /// A generator, post-hook or required outbound call failed.
    Failed,
}

pub struct Dispatcher {
    extractor: ArgumentExtractor,
    registry: Arc<CommandRegistry>,
    client: Arc<dyn ConversationClient>,
    fallback: Arc<dyn FallbackHandler>,
    state: Arc<EphemeralState>,
    store: Arc<dyn DocumentStore>,
}

impl Dispatcher {
    /// Dispatcher with the `/` prefix and a fallback that ignores everything.
    pub fn new(
        registry: Arc<CommandRegistry>,
        client: Arc<dyn ConversationClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            extractor: ArgumentExtractor::new('/', registry.case_insensitive()),
            registry,
            client,
            fallback: Arc::new(IgnoreFallback),
            state: Arc::new(EphemeralState::new()),
            store,
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: char) -> Self {
        self.extractor = ArgumentExtractor::new(prefix, self.registry.case_insensitive());
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackHandler>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: Arc<EphemeralState>) -> Self {
        self.state = state;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<EphemeralState> {
        &self.state
    }

    /// Run one inbound message through the pipeline.
    ///
    /// Never returns an error: failures end in [`Outcome::Failed`] after
    /// being logged and reported to the conversation.
    pub async fn on_message(&self, message: InboundMessage) -> Outcome {
        if message.author.bot {
            return Outcome::IgnoredAutomated;
        }

        let resolved = self.extractor.extract(&message.content).and_then(|invocation| {
            self.registry
                .resolve(&invocation.command_token)
                .map(|command| (command, invocation))
        });
        let Some((command, invocation)) = resolved else {
            self.fallback.handle(&message).await;
            return Outcome::Forwarded;
        };

        let message = Arc::new(message);
        debug!(
            command = %command.name,
            author_id = %message.author.id,
            conversation_id = %message.conversation_id,
            "command invoked"
        );

        match self
            .execute(&command, Arc::clone(&message), invocation)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    command = %command.name,
                    conversation_id = %message.conversation_id,
                    error = %e,
                    "command failed"
                );
                let report = Payload::text(&command.error_message);
                if let Err(send_err) = self
                    .client
                    .send_message(&message.conversation_id, &report)
                    .await
                {
                    warn!(
                        command = %command.name,
                        error = %send_err,
                        "failed to report command error"
                    );
                }
                Outcome::Failed
            },
        }
    }

    async fn execute(
        &self,
        command: &Arc<CommandDef>,
        message: Arc<InboundMessage>,
        invocation: Invocation,
    ) -> Result<Outcome> {
        let conversation_id = message.conversation_id.clone();

        if command.requires_arguments && invocation.args.is_empty() {
            self.notify(command, &conversation_id, Payload::text(&command.invalid_usage_message))
                .await;
            return Ok(Outcome::InvalidUsage);
        }

        if !command.restriction.permits(message.kind) {
            debug!(command = %command.name, kind = ?message.kind, "command not available here");
            return Ok(Outcome::WrongContext);
        }

        if evaluate(command.requirement.as_ref(), &message) == Verdict::Deny {
            info!(
                command = %command.name,
                author_id = %message.author.id,
                "permission denied"
            );
            self.notify(command, &conversation_id, Payload::text(denial_message()))
                .await;
            return Ok(Outcome::Denied);
        }

        let ctx = CommandContext {
            message: Arc::clone(&message),
            invocation: Arc::new(invocation),
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
        };

        let response = match &command.generator {
            Generator::Static(payload) => Some(payload.clone()),
            Generator::Deferred(generate) => {
                let generate = Arc::clone(generate);
                let ctx = ctx.clone();
                isolate(&command.name, async move { generate.generate(ctx).await }).await?
            },
        };

        let sent = match response {
            Some(payload) if !payload.is_empty() => {
                if self.client.can_send(&conversation_id).await {
                    Some(self.client.send_message(&conversation_id, &payload).await?)
                } else {
                    debug!(command = %command.name, "cannot post here, response dropped");
                    None
                }
            },
            _ => None,
        };

        if let Some(hook) = &command.post_hook {
            let hook = Arc::clone(hook);
            let sent = sent.clone();
            isolate(&command.name, async move { hook.run(ctx, sent).await }).await?;
        }

        let trigger_deleted = command.delete_trigger && self.delete_trigger(&message).await;
        info!(
            command = %command.name,
            conversation_id = %conversation_id,
            responded = sent.is_some(),
            trigger_deleted,
            "command completed"
        );

        Ok(Outcome::Completed {
            sent,
            trigger_deleted,
        })
    }

    /// Post a usage or denial notice. These outcomes are already final, so a
    /// failed send is only logged.
    async fn notify(&self, command: &CommandDef, conversation_id: &str, notice: Payload) {
        if let Err(e) = self.client.send_message(conversation_id, &notice).await {
            warn!(command = %command.name, %conversation_id, error = %e, "failed to send notice");
        }
    }

    /// Best-effort: lacking the right to delete is not a command failure.
    async fn delete_trigger(&self, message: &InboundMessage) -> bool {
        match self
            .client
            .delete_message(&message.handle(), Some(TRIGGER_DELETE_REASON))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!(message_id = %message.id, error = %e, "could not delete trigger message");
                false
            },
        }
    }
}

/// Run command code on its own task so an error or a panic surfaces as a
/// [`Error::HandlerFault`] instead of unwinding through the dispatcher.
async fn isolate<T, F>(command: &str, fut: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::handler_fault(command, e)),
        Err(join) => Err(Error::handler_fault(command, join)),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use {
        super::*,
        crate::{
            permission::Requirement,
            testing::{
                CountingFallback, Recorded, RecordingClient, direct_message, guild_message,
            },
        },
        ivebot_channels::{Author, CapabilitySet},
        ivebot_storage::MemoryStore,
        rstest::rstest,
    };

    struct Harness {
        dispatcher: Dispatcher,
        client: Arc<RecordingClient>,
        fallback: Arc<CountingFallback>,
    }

    fn harness(defs: Vec<CommandDef>) -> Harness {
        let mut registry = CommandRegistry::default();
        for def in defs {
            registry.register(def).unwrap();
        }
        let client = RecordingClient::new();
        let fallback = CountingFallback::new();
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::clone(&client) as Arc<dyn ConversationClient>,
            Arc::new(MemoryStore::new()),
        )
        .with_fallback(Arc::clone(&fallback) as Arc<dyn FallbackHandler>);
        Harness {
            dispatcher,
            client,
            fallback,
        }
    }

    fn echo() -> CommandDef {
        CommandDef::new(
            "say",
            Generator::deferred(|ctx: CommandContext| async move {
                Ok(Some(Payload::text(ctx.rest())))
            }),
        )
        .delete_trigger()
    }

    fn moderation() -> CommandDef {
        CommandDef::new("purge", Generator::fixed("purged"))
            .no_arguments()
            .requirement(Requirement::capabilities(["manageMessages"]))
    }

    #[tokio::test]
    async fn echo_replies_and_deletes_trigger() {
        let h = harness(vec![echo()]);
        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/say hello", CapabilitySet::new()))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Completed {
                sent: Some(_),
                trigger_deleted: true
            }
        ));
        let calls = h.client.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], Recorded::Sent { payload, .. } if payload.as_text() == Some("hello")));
        assert!(matches!(
            &calls[1],
            Recorded::Deleted { handle, reason: Some(r) }
                if handle.message_id == "msg-1" && r == TRIGGER_DELETE_REASON
        ));
    }

    #[tokio::test]
    async fn missing_arguments_yield_invalid_usage_only() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let def = CommandDef::new(
            "say",
            Generator::deferred(move |_ctx: CommandContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            }),
        )
        .delete_trigger()
        .invalid_usage_message("Correct usage: /say <text>");
        let h = harness(vec![def]);

        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/say", CapabilitySet::new()))
            .await;

        assert_eq!(outcome, Outcome::InvalidUsage);
        assert_eq!(h.client.sent_texts(), vec!["Correct usage: /say <text>"]);
        assert!(h.client.deleted().is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_without_capability() {
        let h = harness(vec![moderation()]);
        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/purge", CapabilitySet::granted(["sendMessages"])))
            .await;

        assert_eq!(outcome, Outcome::Denied);
        let sent = h.client.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("**Thankfully, you don't have enough permissions for that"));
    }

    #[tokio::test]
    async fn capability_requirement_never_passes_in_direct_messages() {
        let h = harness(vec![moderation()]);
        let outcome = h.dispatcher.on_message(direct_message("u1", "/purge")).await;
        assert_eq!(outcome, Outcome::Denied);
    }

    #[tokio::test]
    async fn allowed_with_capability() {
        let h = harness(vec![moderation()]);
        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/purge", CapabilitySet::granted(["manageMessages"])))
            .await;
        assert!(matches!(outcome, Outcome::Completed { sent: Some(_), .. }));
        assert_eq!(h.client.sent_texts(), vec!["purged"]);
    }

    #[tokio::test]
    async fn failing_generator_reports_error_message_once() {
        let post_runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&post_runs);
        let def = CommandDef::new(
            "boom",
            Generator::deferred(|_ctx: CommandContext| async {
                Err::<Option<Payload>, _>(anyhow::anyhow!("upstream down"))
            }),
        )
        .no_arguments()
        .delete_trigger()
        .post_hook(move |_ctx: CommandContext, _sent: Option<MessageHandle>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .error_message("Something broke.");
        let h = harness(vec![def, echo()]);

        let outcome = h.dispatcher.on_message(direct_message("u1", "/boom")).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.client.sent_texts(), vec!["Something broke."]);
        assert!(h.client.deleted().is_empty());
        assert_eq!(post_runs.load(Ordering::SeqCst), 0);

        // The loop keeps working.
        let outcome = h.dispatcher.on_message(direct_message("u1", "/say still alive")).await;
        assert!(matches!(outcome, Outcome::Completed { .. }));
    }

    #[tokio::test]
    async fn panicking_generator_is_contained() {
        let def = CommandDef::new(
            "panic",
            Generator::deferred(|_ctx: CommandContext| async {
                if true {
                    panic!("generator exploded");
                }
                Ok(None)
            }),
        )
        .no_arguments();
        let h = harness(vec![def]);

        let outcome = h.dispatcher.on_message(direct_message("u1", "/panic")).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.client.sent_texts(), vec![
            "IveBot has experienced an internal error."
        ]);
    }

    #[tokio::test]
    async fn failing_post_hook_reports_error() {
        let def = CommandDef::new("hook", Generator::fixed("first"))
            .no_arguments()
            .post_hook(|_ctx: CommandContext, _sent: Option<MessageHandle>| async {
                Err(anyhow::anyhow!("edit failed"))
            });
        let h = harness(vec![def]);

        let outcome = h.dispatcher.on_message(direct_message("u1", "/hook")).await;
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(h.client.sent_texts(), vec![
            "first",
            "IveBot has experienced an internal error."
        ]);
    }

    #[tokio::test]
    async fn post_hook_receives_sent_handle() {
        let def = CommandDef::new("edit", Generator::fixed("draft"))
            .no_arguments()
            .post_hook(|ctx: CommandContext, sent: Option<MessageHandle>| async move {
                let handle = sent.ok_or_else(|| anyhow::anyhow!("nothing sent"))?;
                ctx.client
                    .edit_message(&handle, &Payload::text("final"))
                    .await?;
                Ok(())
            });
        let h = harness(vec![def]);

        h.dispatcher.on_message(direct_message("u1", "/edit")).await;
        let calls = h.client.calls();
        assert!(matches!(
            &calls[1],
            Recorded::Edited { handle, payload } if handle.message_id == "sent-0" && payload.as_text() == Some("final")
        ));
    }

    #[tokio::test]
    async fn empty_response_is_not_sent_but_post_hook_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let def = CommandDef::new(
            "quiet",
            Generator::deferred(|_ctx: CommandContext| async { Ok(Some(Payload::text("  "))) }),
        )
        .no_arguments()
        .post_hook(move |_ctx: CommandContext, sent: Option<MessageHandle>| {
            assert!(sent.is_none());
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });
        let h = harness(vec![def]);

        let outcome = h.dispatcher.on_message(direct_message("u1", "/quiet")).await;
        assert_eq!(outcome, Outcome::Completed {
            sent: None,
            trigger_deleted: false
        });
        assert!(h.client.sent_texts().is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn muted_conversation_skips_send() {
        let h = harness(vec![echo()]);
        h.client.mute("chan-1");
        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/say hi", CapabilitySet::new()))
            .await;
        assert!(matches!(outcome, Outcome::Completed { sent: None, .. }));
        assert!(h.client.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn failed_trigger_delete_is_not_a_failure() {
        let h = harness(vec![echo()]);
        h.client.fail_deletes();
        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/say hi", CapabilitySet::new()))
            .await;
        assert!(matches!(outcome, Outcome::Completed {
            sent: Some(_),
            trigger_deleted: false
        }));
        assert_eq!(h.client.sent_texts(), vec!["hi"]);
    }

    #[tokio::test]
    async fn send_failure_enters_failure_boundary() {
        let h = harness(vec![echo()]);
        h.client.fail_sends();
        let outcome = h.dispatcher.on_message(direct_message("u1", "/say hi")).await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn undeliverable_notices_keep_their_outcome() {
        let say = echo().invalid_usage_message("Correct usage: /say <text>");
        let h = harness(vec![say, moderation()]);
        h.client.fail_sends();

        let outcome = h.dispatcher.on_message(direct_message("u1", "/say")).await;
        assert_eq!(outcome, Outcome::InvalidUsage);

        let outcome = h
            .dispatcher
            .on_message(guild_message("u1", "/purge", CapabilitySet::new()))
            .await;
        assert_eq!(outcome, Outcome::Denied);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn wrong_context_is_silent() {
        let def = CommandDef::new("guildy", Generator::fixed("x"))
            .no_arguments()
            .guild_only();
        let h = harness(vec![def]);
        let outcome = h.dispatcher.on_message(direct_message("u1", "/guildy")).await;
        assert_eq!(outcome, Outcome::WrongContext);
        assert!(h.client.calls().is_empty());
    }

    #[rstest]
    #[case("hello there")]
    #[case("/unknown command")]
    #[case("/")]
    #[tokio::test]
    async fn non_commands_go_to_fallback(#[case] body: &str) {
        let h = harness(vec![echo()]);
        let outcome = h.dispatcher.on_message(direct_message("u1", body)).await;
        assert_eq!(outcome, Outcome::Forwarded);
        assert_eq!(h.fallback.count(), 1);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn bot_authors_are_ignored() {
        let h = harness(vec![echo()]);
        let mut msg = direct_message("bot", "/say hi");
        msg.author = Author {
            bot: true,
            ..msg.author
        };
        assert_eq!(h.dispatcher.on_message(msg).await, Outcome::IgnoredAutomated);
        assert_eq!(h.fallback.count(), 0);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn alias_and_case_resolve_same_command() {
        let def = CommandDef::new("reverse", Generator::fixed("done")).alias("rev");
        let h = harness(vec![def]);
        for body in ["/reverse a", "/REV a", "/Reverse a"] {
            let outcome = h.dispatcher.on_message(direct_message("u1", body)).await;
            assert!(matches!(outcome, Outcome::Completed { .. }), "{body}");
        }
        assert_eq!(h.client.sent_texts().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_invocations_do_not_interfere() {
        let def = CommandDef::new(
            "slow",
            Generator::deferred(|ctx: CommandContext| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Some(Payload::text(ctx.rest())))
            }),
        );
        let h = Arc::new(harness(vec![def]));
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let h = Arc::clone(&h);
                tokio::spawn(async move {
                    h.dispatcher
                        .on_message(direct_message("u1", &format!("/slow {i}")))
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(matches!(task.await.unwrap(), Outcome::Completed { .. }));
        }
        let mut texts = h.client.sent_texts();
        texts.sort();
        assert_eq!(texts, (0..8).map(|i| i.to_string()).collect::<Vec<_>>());
    }
}
