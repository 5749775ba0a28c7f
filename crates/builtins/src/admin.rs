//! Moderation commands backed by the `warnings` collection.

use std::sync::Arc;

use {
    chrono::{DateTime, Utc},
    ivebot_channels::{Author, Payload, RichPayload},
    ivebot_commands::{CommandContext, CommandDef, Generator, Requirement, insult::insult},
    ivebot_storage::Filter,
    serde::{Deserialize, Serialize},
    tracing::{info, warn},
};

use crate::{BuiltinSettings, args::user_mention_id, utility::deliver_dm};

pub const WARNINGS: &str = "warnings";
const NOTICE_COLOR: u32 = 0x00AE86;
/// Discord rejects embeds with more than 25 fields.
const MAX_FIELDS: usize = 25;
const MAX_FIELD_VALUE: usize = 1024;

/// One stored warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub warned_id: String,
    pub warner_id: String,
    pub reason: String,
    pub server_id: String,
    /// RFC 3339.
    pub date: String,
}

pub fn definitions(settings: &Arc<BuiltinSettings>) -> Vec<CommandDef> {
    let warn_settings = Arc::clone(settings);
    let moderators = || Requirement::capabilities(["manageMessages"]);

    vec![
        CommandDef::new(
            "warn",
            Generator::deferred(move |ctx| warn_member(ctx, Arc::clone(&warn_settings))),
        )
        .guild_only()
        .requirement(moderators())
        .description("Warn someone.")
        .full_description("Warn someone.")
        .usage("/warn <user by ID/username/mention> <reason>"),
        CommandDef::new("warnings", Generator::deferred(list_warnings))
            .alias("warns")
            .guild_only()
            .requirement(moderators())
            .description("List warnings of a user.")
            .full_description("List all warnings a user has received in this server.")
            .usage("/warnings <user by ID/username/mention>"),
        CommandDef::new("clearwarns", Generator::deferred(clear_warnings))
            .alias("cw")
            .guild_only()
            .requirement(moderators())
            .description("Clear warnings of a user.")
            .full_description("Remove every warning a user has received in this server.")
            .usage("/clearwarns <user by ID/username/mention>"),
    ]
}

/// Resolve a user argument: mention, then the message's mentions by id or
/// name, then the gateway's member lookup.
async fn find_user(ctx: &CommandContext, query: &str) -> anyhow::Result<Option<Author>> {
    let id = user_mention_id(query).unwrap_or(query);
    if let Some(user) = ctx
        .message
        .mentions
        .iter()
        .find(|m| m.id == id || m.username.eq_ignore_ascii_case(query) || m.tag() == query)
    {
        return Ok(Some(user.clone()));
    }
    let Some(guild_id) = ctx.message.guild_id() else {
        return Ok(None);
    };
    Ok(ctx.client.find_member(guild_id, id).await?)
}

fn guild_filter(guild_id: &str, user_id: &str) -> Filter {
    Filter::new()
        .eq("warnedId", user_id)
        .eq("serverId", guild_id)
}

fn not_a_member() -> Option<Payload> {
    Some(Payload::text(format!(
        "Specify a valid member of this guild, {}.",
        insult()
    )))
}

async fn warn_member(
    ctx: CommandContext,
    settings: Arc<BuiltinSettings>,
) -> anyhow::Result<Option<Payload>> {
    let Some((query, reason)) = ctx.args().split_first().filter(|(_, r)| !r.is_empty()) else {
        return Ok(Some(Payload::text("Correct usage: /warn <user> <reason>")));
    };
    let reason = reason.join(" ");
    let Some(user) = find_user(&ctx, query).await? else {
        return Ok(not_a_member());
    };
    let guild = ctx
        .message
        .guild
        .clone()
        .ok_or_else(|| anyhow::anyhow!("warn invoked outside a guild"))?;
    let moderator = ctx.author();
    if !outranks(&ctx, &guild.id, moderator, &user).await? {
        return Ok(Some(Payload::text(format!(
            "You cannot warn this person, you {}.",
            insult()
        ))));
    }
    let now = Utc::now();

    let warning = Warning {
        warned_id: user.id.clone(),
        warner_id: moderator.id.clone(),
        reason: reason.clone(),
        server_id: guild.id.clone(),
        date: now.to_rfc3339(),
    };
    ctx.store
        .insert(WARNINGS, serde_json::to_value(&warning)?)
        .await?;
    info!(
        guild_id = %guild.id,
        warned_id = %user.id,
        warner_id = %moderator.id,
        "member warned"
    );

    let dm_body = format!("You have been warned in {} for: {reason}.", guild.name);
    if let Err(e) = deliver_dm(ctx.client.as_ref(), &user.id, &dm_body).await {
        warn!(warned_id = %user.id, error = %e, "could not DM warned member");
    }

    if let Some(log_channel) = settings.warn_log_channels.get(&guild.id) {
        let notice = warn_notice(&user, moderator, &reason, now);
        if let Err(e) = ctx.client.send_message(log_channel, &notice).await {
            warn!(%log_channel, error = %e, "could not post warn notice");
        }
    }

    Ok(Some(Payload::text(format!(
        "**{}** has been warned. **lol.**",
        user.tag()
    ))))
}

/// Whether `moderator` sits strictly above `target` in the guild's role
/// order. Nobody outranks themselves; unknown positions do not block.
async fn outranks(
    ctx: &CommandContext,
    guild_id: &str,
    moderator: &Author,
    target: &Author,
) -> anyhow::Result<bool> {
    if moderator.id == target.id {
        return Ok(false);
    }
    let target_position = ctx.client.role_position(guild_id, &target.id).await?;
    let moderator_position = ctx.client.role_position(guild_id, &moderator.id).await?;
    Ok(match (target_position, moderator_position) {
        (Some(target), Some(moderator)) => moderator > target,
        _ => true,
    })
}

fn warn_notice(user: &Author, moderator: &Author, reason: &str, at: DateTime<Utc>) -> Payload {
    RichPayload::titled("Information")
        .content(format!("**{}** has been warned:", user.tag()))
        .color(NOTICE_COLOR)
        .description(format!(
            "**| Moderator:** {} **| Reason:** {reason}\n**| Date:** {}",
            moderator.tag(),
            at.format("%A, %B %-d %Y, %-I:%M:%S %p")
        ))
        .into()
}

async fn list_warnings(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let Some(query) = ctx.args().first() else {
        return Ok(None);
    };
    let Some(user) = find_user(&ctx, query).await? else {
        return Ok(not_a_member());
    };
    let guild_id = ctx.message.guild_id().unwrap_or_default();

    let docs = ctx
        .store
        .find(WARNINGS, &guild_filter(guild_id, &user.id))
        .await?;
    if docs.is_empty() {
        return Ok(Some(Payload::text(format!(
            "**{}** has no warnings.",
            user.tag()
        ))));
    }

    let mut rich = RichPayload::titled(format!("Warnings for {}", user.tag())).color(NOTICE_COLOR);
    for (idx, doc) in docs.iter().enumerate() {
        if idx == MAX_FIELDS - 1 {
            rich = rich.field(
                "..too many warnings",
                "More warnings will not be displayed.",
                false,
            );
            break;
        }
        let warning: Warning = doc.parse()?;
        let value = format!(
            "**Reason:** {}\n**Moderator:** <@{}>\n**Date:** {}",
            warning.reason, warning.warner_id, warning.date
        );
        rich = rich.field(format!("Warning {}", idx + 1), clip(&value), false);
    }
    Ok(Some(rich.into()))
}

fn clip(value: &str) -> String {
    match value.char_indices().nth(MAX_FIELD_VALUE) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

async fn clear_warnings(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let Some(query) = ctx.args().first() else {
        return Ok(None);
    };
    let Some(user) = find_user(&ctx, query).await? else {
        return Ok(not_a_member());
    };
    let guild_id = ctx.message.guild_id().unwrap_or_default();

    let removed = ctx
        .store
        .delete(WARNINGS, &guild_filter(guild_id, &user.id))
        .await?;
    let text = if removed == 0 {
        format!("**{}** has no warnings to clear.", user.tag())
    } else {
        info!(guild_id, cleared_id = %user.id, removed, "warnings cleared");
        format!("Warnings of **{}** have been cleared.", user.tag())
    };
    Ok(Some(Payload::text(text)))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{Bot, bot, bot_with, settings},
        ivebot_channels::CapabilitySet,
        ivebot_commands::{
            Outcome,
            testing::{direct_message, guild_message},
        },
        ivebot_storage::DocumentStore,
    };

    fn moderator_says(body: &str, mentions: Vec<Author>) -> ivebot_channels::InboundMessage {
        guild_message("mod", body, CapabilitySet::granted(["manageMessages"])).with_mentions(mentions)
    }

    fn troublemaker() -> Author {
        Author::new("42", "troll")
    }

    async fn stored(bot: &Bot) -> Vec<Warning> {
        bot.store
            .find(WARNINGS, &Filter::new())
            .await
            .unwrap()
            .iter()
            .map(|d| d.parse().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn warn_stores_dms_and_confirms() {
        let bot = bot();
        let outcome = bot
            .send(moderator_says("/warn <@42> spamming links", vec![troublemaker()]))
            .await;
        assert!(matches!(outcome, Outcome::Completed { .. }));

        let warnings = stored(&bot).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warned_id, "42");
        assert_eq!(warnings[0].warner_id, "mod");
        assert_eq!(warnings[0].reason, "spamming links");
        assert_eq!(warnings[0].server_id, "guild-1");
        assert!(DateTime::parse_from_rfc3339(&warnings[0].date).is_ok());

        let sent = bot.client.sent_payloads();
        assert_eq!(sent[0].0, "dm-42");
        assert_eq!(
            sent[0].1.as_text(),
            Some("You have been warned in Test Guild for: spamming links.")
        );
        assert_eq!(sent[1].1.as_text(), Some("**troll** has been warned. **lol.**"));
    }

    #[tokio::test]
    async fn warn_posts_notice_to_configured_channel() {
        let mut custom = settings();
        custom
            .warn_log_channels
            .insert("guild-1".into(), "modlog".into());
        let bot = bot_with(&custom);
        bot.send(moderator_says("/warn troll rude", vec![troublemaker()])).await;

        let notice = bot
            .client
            .sent_payloads()
            .into_iter()
            .find(|(channel, _)| channel == "modlog")
            .map(|(_, payload)| payload)
            .unwrap();
        let Payload::Rich(rich) = notice else {
            panic!("expected rich notice");
        };
        assert_eq!(rich.content.as_deref(), Some("**troll** has been warned:"));
        assert!(rich.description.unwrap().contains("**| Reason:** rude"));
    }

    #[tokio::test]
    async fn warn_resolves_members_through_gateway() {
        let bot = bot();
        bot.client.add_member(troublemaker());
        bot.send(moderator_says("/warn 42 rude", vec![])).await;
        assert_eq!(stored(&bot).await.len(), 1);
    }

    #[tokio::test]
    async fn warn_rejects_unknown_member() {
        let bot = bot();
        bot.send(moderator_says("/warn nobody rude", vec![])).await;
        assert!(bot.client.sent_texts()[0].starts_with("Specify a valid member of this guild, "));
        assert!(stored(&bot).await.is_empty());
    }

    #[tokio::test]
    async fn warn_requires_reason() {
        let bot = bot();
        bot.send(moderator_says("/warn <@42>", vec![troublemaker()])).await;
        assert_eq!(bot.client.sent_texts(), vec!["Correct usage: /warn <user> <reason>"]);
    }

    #[tokio::test]
    async fn warn_requires_moderator_in_guild() {
        let bot = bot();
        assert_eq!(
            bot.send(direct_message("mod", "/warn <@42> rude")).await,
            Outcome::WrongContext
        );
        assert_eq!(
            bot.send(guild_message("rando", "/warn <@42> rude", CapabilitySet::new()))
                .await,
            Outcome::Denied
        );
    }

    #[tokio::test]
    async fn warn_refuses_self_and_higher_ranks() {
        let bot = bot();
        bot.client.add_member(Author::new("mod", "tester"));
        let outcome = bot.send(moderator_says("/warn mod because", vec![])).await;
        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert!(bot.client.sent_texts()[0].starts_with("You cannot warn this person, you "));

        bot.client.set_role_position("mod", 3);
        bot.client.set_role_position("42", 3);
        bot.send(moderator_says("/warn <@42> peer", vec![troublemaker()])).await;
        assert!(stored(&bot).await.is_empty());

        bot.client.set_role_position("mod", 4);
        bot.send(moderator_says("/warn <@42> junior", vec![troublemaker()])).await;
        assert_eq!(stored(&bot).await.len(), 1);
    }

    #[tokio::test]
    async fn long_warning_lists_stay_within_embed_limits() {
        let bot = bot();
        let long_reason = "x".repeat(1100);
        bot.send(moderator_says(&format!("/warn <@42> {long_reason}"), vec![troublemaker()]))
            .await;
        for n in 1..30 {
            bot.send(moderator_says(&format!("/warn <@42> r{n}"), vec![troublemaker()]))
                .await;
        }

        bot.send(moderator_says("/warns <@42>", vec![troublemaker()])).await;
        let (_, listing) = bot.client.sent_payloads().pop().unwrap();
        let Payload::Rich(rich) = listing else {
            panic!("expected rich listing");
        };
        assert_eq!(rich.fields.len(), MAX_FIELDS);
        assert_eq!(rich.fields[0].value.chars().count(), MAX_FIELD_VALUE);
        assert_eq!(rich.fields[23].name, "Warning 24");
        assert_eq!(rich.fields[24].name, "..too many warnings");
    }

    #[tokio::test]
    async fn list_then_clear_warnings() {
        let bot = bot();
        bot.send(moderator_says("/warn <@42> one", vec![troublemaker()])).await;
        bot.send(moderator_says("/warn <@42> two", vec![troublemaker()])).await;

        bot.send(moderator_says("/warns <@42>", vec![troublemaker()])).await;
        let (_, listing) = bot.client.sent_payloads().pop().unwrap();
        let Payload::Rich(rich) = listing else {
            panic!("expected rich listing");
        };
        assert_eq!(rich.title.as_deref(), Some("Warnings for troll"));
        assert_eq!(rich.fields.len(), 2);
        assert!(rich.fields[0].value.starts_with("**Reason:** one"));

        bot.send(moderator_says("/cw <@42>", vec![troublemaker()])).await;
        assert_eq!(
            bot.client.sent_texts().last().unwrap(),
            "Warnings of **troll** have been cleared."
        );
        assert!(stored(&bot).await.is_empty());

        bot.send(moderator_says("/warnings <@42>", vec![troublemaker()])).await;
        assert_eq!(bot.client.sent_texts().last().unwrap(), "**troll** has no warnings.");
    }
}
