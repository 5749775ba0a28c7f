//! serenity model -> gateway-neutral types.

use std::num::NonZeroU64;

use {
    ivebot_channels::{Author, CapabilitySet, Error, GuildInfo, InboundMessage, Result},
    serenity::all::{Cache, Message, Permissions, User},
};

/// Discord permission bits and the camelCase names commands refer to.
pub const PERMISSION_NAMES: &[(Permissions, &str)] = &[
    (Permissions::CREATE_INSTANT_INVITE, "createInstantInvite"),
    (Permissions::KICK_MEMBERS, "kickMembers"),
    (Permissions::BAN_MEMBERS, "banMembers"),
    (Permissions::ADMINISTRATOR, "administrator"),
    (Permissions::MANAGE_CHANNELS, "manageChannels"),
    (Permissions::MANAGE_GUILD, "manageGuild"),
    (Permissions::ADD_REACTIONS, "addReactions"),
    (Permissions::VIEW_AUDIT_LOG, "viewAuditLogs"),
    (Permissions::VIEW_CHANNEL, "readMessages"),
    (Permissions::SEND_MESSAGES, "sendMessages"),
    (Permissions::SEND_TTS_MESSAGES, "sendTTSMessages"),
    (Permissions::MANAGE_MESSAGES, "manageMessages"),
    (Permissions::EMBED_LINKS, "embedLinks"),
    (Permissions::ATTACH_FILES, "attachFiles"),
    (Permissions::READ_MESSAGE_HISTORY, "readMessageHistory"),
    (Permissions::MENTION_EVERYONE, "mentionEveryone"),
    (Permissions::USE_EXTERNAL_EMOJIS, "externalEmojis"),
    (Permissions::CONNECT, "voiceConnect"),
    (Permissions::SPEAK, "voiceSpeak"),
    (Permissions::MUTE_MEMBERS, "voiceMuteMembers"),
    (Permissions::DEAFEN_MEMBERS, "voiceDeafenMembers"),
    (Permissions::MOVE_MEMBERS, "voiceMoveMembers"),
    (Permissions::CHANGE_NICKNAME, "changeNickname"),
    (Permissions::MANAGE_NICKNAMES, "manageNicknames"),
    (Permissions::MANAGE_ROLES, "manageRoles"),
    (Permissions::MANAGE_WEBHOOKS, "manageWebhooks"),
];

/// Every named permission, granted or explicitly not.
pub fn capabilities(permissions: Permissions) -> CapabilitySet {
    PERMISSION_NAMES
        .iter()
        .fold(CapabilitySet::new(), |set, (flag, name)| {
            set.with(*name, permissions.contains(*flag))
        })
}

pub fn author(user: &User) -> Author {
    Author {
        id: user.id.to_string(),
        username: user.name.clone(),
        discriminator: user.discriminator.map(|d| format!("{:04}", d.get())),
        bot: user.bot,
        avatar_url: user.avatar_url(),
    }
}

/// Ids of `<#id>` channel mentions, in order of appearance.
pub fn channel_mentions(content: &str) -> Vec<String> {
    let Ok(re) = regex::Regex::new(r"<#(\d+)>") else {
        return Vec::new();
    };
    re.captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Parse a snowflake. Discord ids are never zero.
pub fn snowflake(id: &str) -> Result<u64> {
    let id: NonZeroU64 = id
        .parse()
        .map_err(|_| Error::invalid_input(format!("not a discord id: {id:?}")))?;
    Ok(id.get())
}

/// Translate a gateway message, resolving guild name and the author's
/// channel permissions from the cache.
pub fn inbound_message(cache: &Cache, msg: &Message) -> InboundMessage {
    let inbound = InboundMessage::new(
        msg.id.to_string(),
        msg.channel_id.to_string(),
        author(&msg.author),
        msg.content.clone(),
    )
    .with_mentions(msg.mentions.iter().map(author).collect())
    .with_channel_mentions(channel_mentions(&msg.content));

    let Some(guild_id) = msg.guild_id else {
        return inbound;
    };

    let (name, permissions) = match cache.guild(guild_id) {
        Some(guild) => {
            let permissions = guild.channels.get(&msg.channel_id).map(|channel| {
                match (guild.members.get(&msg.author.id), msg.member.as_deref()) {
                    (Some(member), _) => guild.user_permissions_in(channel, member),
                    (None, Some(partial)) => {
                        guild.partial_member_permissions_in(channel, msg.author.id, partial)
                    },
                    (None, None) => Permissions::empty(),
                }
            });
            (guild.name.clone(), permissions.unwrap_or_else(Permissions::empty))
        },
        None => (String::new(), Permissions::empty()),
    };

    inbound.in_guild(
        GuildInfo {
            id: guild_id.to_string(),
            name,
        },
        capabilities(permissions),
    )
}
