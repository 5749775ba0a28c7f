//! General-purpose commands: help, say/type, reminders, leave, edits.

use std::{sync::Arc, time::Duration};

use {
    ivebot_channels::{ConversationClient, MessageHandle, Payload, RichPayload},
    ivebot_commands::{
        BeginOutcome, CommandContext, CommandDef, ConfirmationKey, Generator, Requirement,
    },
    tracing::{debug, warn},
};

use crate::{
    BuiltinSettings,
    args::{parse_duration, split_channel_target},
};

const NOTHING_TO_EDIT: &str = "Nothing to edit.";
const LEAVE_PROMPT: &str = "Are you sure you want to leave the server? You will require an invite link \
                            to join back. Type /leave to confirm.";
const LEAVE_TIMED_OUT: &str = "Your leave request has timed out.";
const REMINDME_USAGE: &str = "Correct usage: /remindme <time in 1d|1h|1m|1s> <description>";
const MAX_TYPING_DELAY: Duration = Duration::from_secs(8);

pub fn definitions(settings: &Arc<BuiltinSettings>) -> Vec<CommandDef> {
    let request_settings = Arc::clone(settings);
    let leave_ttl = settings.leave_confirmation;

    vec![
        CommandDef::new("help", Generator::deferred(help))
            .alias("h")
            .no_arguments()
            .description("List commands or show help for one.")
            .full_description("Lists every command, or shows detailed help for the given command.")
            .usage("/help (command)")
            .example("/help remindme"),
        CommandDef::new(
            "request",
            Generator::deferred(move |ctx| request(ctx, Arc::clone(&request_settings))),
        )
        .alias("req")
        .requirement(Requirement::actors(settings.trusted()))
        .description("Request a specific feature.")
        .full_description("Request a feature. Only available to test pilots.")
        .usage("/request <suggestion>")
        .example("/request a /userinfo command."),
        CommandDef::new("say", Generator::deferred(say))
            .requirement(settings.trusted_or_moderator())
            .post_hook(record_last_say)
            .delete_trigger()
            .description("Say something, even in another channel.")
            .full_description("Say something. Test pilots and admins/mods only.")
            .usage("/say (channel) <text>")
            .example("/say #general heyo"),
        CommandDef::new("type", Generator::deferred(type_message))
            .requirement(settings.trusted_or_moderator())
            .post_hook(record_last_say)
            .delete_trigger()
            .description("Type something, even in another channel.")
            .full_description("Type something. Test pilots and admins/mods only.")
            .usage("/type (channel) <text>")
            .example("/type #general heyo"),
        CommandDef::new("remindme", Generator::deferred(remindme))
            .alias("rm")
            .description("Reminders.")
            .full_description("Remind you of something.")
            .usage("/remindme <time in 1d|1h|1m|1s> <description>")
            .example("/remindme 1h do your homework"),
        CommandDef::new("avatar", Generator::deferred(avatar))
            .alias("av")
            .no_arguments()
            .description("Avatar of a user.")
            .full_description("Get a large-sized link to the avatar of a user.")
            .usage("/avatar <user>")
            .example("/avatar @voldemort#6931"),
        CommandDef::new("leave", Generator::deferred(move |ctx| leave(ctx, leave_ttl)))
            .guild_only()
            .no_arguments()
            .error_message("There was an error processing your request.")
            .description("Makes you leave the server.")
            .full_description("This kicks you from the server, essentially making you leave.")
            .usage("/leave")
            .example("/leave"),
        CommandDef::new("edit", Generator::deferred(edit))
            .requirement(Requirement::actors([settings.host.clone()]))
            .delete_trigger()
            .description("Edits a single message.")
            .full_description("Edits a single message. Owner only command.")
            .usage("/edit (channel) <message ID> <new text>")
            .example("/edit #general 123456789012345678 hi"),
        CommandDef::new("editLastSay", Generator::deferred(edit_last_say))
            .alias("els")
            .requirement(settings.trusted_or_moderator())
            .delete_trigger()
            .description("Edits the last say in a channel.")
            .full_description("Edits the last say in a channel. Test pilots and admins/mods only.")
            .usage("/editLastSay (channel) <new text>")
            .example("/editLastSay #general hey"),
    ]
}

async fn help(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let Some(query) = ctx.args().first() else {
        let names: Vec<String> = ctx
            .registry
            .iter()
            .filter(|def| !def.hidden)
            .map(|def| format!("`{}`", def.name))
            .collect();
        return Ok(Some(Payload::text(format!(
            "**Commands:** {}\nUse /help <command> for more information on a command.",
            names.join(", ")
        ))));
    };

    let Some(def) = ctx.registry.resolve(query.trim_start_matches('/')) else {
        return Ok(Some(Payload::text("There is no such command.")));
    };
    let description = if def.full_description.is_empty() {
        &def.description
    } else {
        &def.full_description
    };
    let mut rich = RichPayload::titled(format!("/{}", def.name))
        .description(description.as_str())
        .color(0x00AE86);
    if !def.usage.is_empty() {
        rich = rich.field("Usage", &def.usage, false);
    }
    if !def.example.is_empty() {
        rich = rich.field("Example", &def.example, false);
    }
    if !def.aliases.is_empty() {
        rich = rich.field("Aliases", def.aliases.join(", "), true);
    }
    Ok(Some(rich.into()))
}

async fn request(
    ctx: CommandContext,
    settings: Arc<BuiltinSettings>,
) -> anyhow::Result<Option<Payload>> {
    let author = ctx.author();
    let host_dm = ctx.client.direct_channel(&settings.host).await?;
    ctx.client
        .send_message(
            &host_dm,
            &Payload::text(format!(
                "{} with ID {}: {}",
                author.tag(),
                author.id,
                ctx.args().join(" ")
            )),
        )
        .await?;

    Ok(Some(Payload::text(format!(
        "{}, what a pathetic idea. It has been DMed to the main developer and will be read \
         shortly.\nYou may receive a response soon, and you can keep track here:\n\
         <https://github.com/retrixe/IveBot/projects/1>",
        author.mention()
    ))))
}

fn say_text(words: &[String]) -> String {
    let text = words.join(" ");
    if text == "pls adim me" {
        "no".to_string()
    } else {
        text
    }
}

fn typing_delay(text: &str) -> Duration {
    let millis = u64::try_from(text.chars().count())
        .unwrap_or(u64::MAX)
        .saturating_mul(120);
    Duration::from_millis(millis).min(MAX_TYPING_DELAY)
}

async fn say(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    relay(ctx, false).await
}

async fn type_message(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    relay(ctx, true).await
}

/// Shared body of `say` and `type`. A message sent to another channel is
/// recorded here; one sent as the response is recorded by the post-hook.
async fn relay(ctx: CommandContext, typing: bool) -> anyhow::Result<Option<Payload>> {
    let (target, words) = split_channel_target(&ctx.message, ctx.args());
    let text = say_text(words);
    if text.is_empty() {
        return Ok(Some(Payload::text("Correct usage: /say (channel) <text>")));
    }

    if typing {
        let channel = target.as_deref().unwrap_or(ctx.conversation_id());
        if let Err(e) = ctx.client.send_typing(channel).await {
            debug!(error = %e, "typing indicator failed");
        }
        tokio::time::sleep(typing_delay(&text)).await;
    }

    match target {
        Some(channel) => {
            let handle = ctx.client.send_message(&channel, &Payload::text(text)).await?;
            ctx.state.record_say(handle);
            Ok(None)
        },
        None => Ok(Some(Payload::text(text))),
    }
}

async fn record_last_say(ctx: CommandContext, sent: Option<MessageHandle>) -> anyhow::Result<()> {
    if let Some(handle) = sent {
        ctx.state.record_say(handle);
    }
    Ok(())
}

async fn remindme(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let args = ctx.args();
    let parsed = match args {
        [when, words @ ..] if !words.is_empty() => {
            parse_duration(when).map(|delay| (when.clone(), delay, words.join(" ")))
        },
        _ => None,
    };
    let Some((when, delay, text)) = parsed else {
        return Ok(Some(Payload::text(REMINDME_USAGE)));
    };

    let client = Arc::clone(&ctx.client);
    let author_id = ctx.author().id.clone();
    let reply = format!("You will be reminded in {when} through a DM.");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let body = format!("⏰ {text}\nReminder set {when} ago.");
        if let Err(e) = deliver_dm(client.as_ref(), &author_id, &body).await {
            warn!(%author_id, error = %e, "failed to deliver reminder");
        }
    });
    Ok(Some(Payload::text(reply)))
}

pub(crate) async fn deliver_dm(
    client: &dyn ConversationClient,
    actor_id: &str,
    body: &str,
) -> ivebot_channels::Result<MessageHandle> {
    let dm = client.direct_channel(actor_id).await?;
    client.send_message(&dm, &Payload::text(body)).await
}

/// Drop any size query and ask for the 2048px rendition.
fn sized_avatar(url: &str) -> String {
    let base = url.split_once('?').map_or(url, |(base, _)| base);
    format!("{base}?size=2048")
}

async fn avatar(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let user = ctx.message.mentions.first().unwrap_or(&ctx.message.author);
    let text = match &user.avatar_url {
        Some(url) => format!("Link: {}", sized_avatar(url)),
        None => format!("**{}** has no avatar.", user.tag()),
    };
    Ok(Some(Payload::text(text)))
}

async fn leave(ctx: CommandContext, ttl: Duration) -> anyhow::Result<Option<Payload>> {
    let author = ctx.author();
    let key = ConfirmationKey::new(&author.id, ctx.conversation_id());

    if ctx.state.confirmations.confirm(&key) {
        let guild_id = ctx
            .message
            .guild_id()
            .ok_or_else(|| anyhow::anyhow!("leave confirmed outside a guild"))?;
        return Ok(Some(Payload::text(
            match ctx.client.kick_member(guild_id, &author.id, "Used /leave.").await {
                Ok(()) => format!("{} has left the server.", author.tag()),
                Err(e) => {
                    warn!(author_id = %author.id, error = %e, "leave kick failed");
                    "You will have to manually leave the server or transfer ownership before \
                     leaving."
                        .to_string()
                },
            },
        )));
    }

    let client = Arc::clone(&ctx.client);
    let conversation_id = ctx.conversation_id().to_string();
    let outcome = ctx.state.confirmations.begin(key, ttl, move || async move {
        if let Err(e) = client
            .send_message(&conversation_id, &Payload::text(LEAVE_TIMED_OUT))
            .await
        {
            warn!(%conversation_id, error = %e, "failed to announce leave timeout");
        }
    });
    if outcome == BeginOutcome::AlreadyPending {
        debug!(author_id = %author.id, "leave confirmation already pending");
    }
    Ok(Some(Payload::text(LEAVE_PROMPT)))
}

async fn edit(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let (target, words) = split_channel_target(&ctx.message, ctx.args());
    let channel = target.unwrap_or_else(|| ctx.conversation_id().to_string());
    let Some((message_id, text)) = words.split_first() else {
        return Ok(Some(Payload::text(NOTHING_TO_EDIT)));
    };
    if text.is_empty() {
        return Ok(Some(Payload::text(NOTHING_TO_EDIT)));
    }
    apply_edit(&ctx, MessageHandle::new(channel, message_id), text.join(" ")).await
}

async fn edit_last_say(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let (target, words) = split_channel_target(&ctx.message, ctx.args());
    let channel = target.unwrap_or_else(|| ctx.conversation_id().to_string());
    let Some(handle) = ctx.state.last_say(&channel) else {
        return Ok(Some(Payload::text(NOTHING_TO_EDIT)));
    };
    if words.is_empty() {
        return Ok(Some(Payload::text(NOTHING_TO_EDIT)));
    }
    apply_edit(&ctx, handle, words.join(" ")).await
}

async fn apply_edit(
    ctx: &CommandContext,
    handle: MessageHandle,
    text: String,
) -> anyhow::Result<Option<Payload>> {
    match ctx.client.edit_message(&handle, &Payload::text(text)).await {
        Ok(()) => Ok(None),
        Err(e) => {
            debug!(message_id = %handle.message_id, error = %e, "edit rejected");
            Ok(Some(Payload::text(NOTHING_TO_EDIT)))
        },
    }
}
