//! Argument helpers shared by the built-in commands.

use std::time::Duration;

use {ivebot_channels::InboundMessage, regex::Regex};

/// Id inside a `<@id>` / `<@!id>` user mention.
pub fn user_mention_id(arg: &str) -> Option<&str> {
    let inner = arg.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.strip_prefix('!').unwrap_or(inner);
    is_snowflake(id).then_some(id)
}

/// Id inside a `<#id>` channel mention.
pub fn channel_mention_id(arg: &str) -> Option<&str> {
    let id = arg.strip_prefix("<#")?.strip_suffix('>')?;
    is_snowflake(id).then_some(id)
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Split a leading channel mention off `args`.
///
/// Only counts when the platform also reported it as the message's first
/// channel mention, so text that merely looks like one is left alone.
pub fn split_channel_target<'a>(
    message: &InboundMessage,
    args: &'a [String],
) -> (Option<String>, &'a [String]) {
    let Some((first, rest)) = args.split_first() else {
        return (None, args);
    };
    match (channel_mention_id(first), message.channel_mentions.first()) {
        (Some(id), Some(reported)) if id == reported => (Some(id.to_string()), rest),
        _ => (None, args),
    }
}

/// Parse `1d`, `2h`, `30m`, `45s` or a combination such as `1h30m`.
/// Zero-length durations are rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let re = Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").ok()?;
    let caps = re.captures(input)?;

    let mut total: u64 = 0;
    for (idx, unit) in [(1, 86_400), (2, 3_600), (3, 60), (4, 1)] {
        if let Some(amount) = caps.get(idx) {
            let amount: u64 = amount.as_str().parse().ok()?;
            total = total.checked_add(amount.checked_mul(unit)?)?;
        }
    }
    (total > 0).then(|| Duration::from_secs(total))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        ivebot_channels::Author,
        rstest::rstest,
    };

    #[rstest]
    #[case("<@123>", Some("123"))]
    #[case("<@!123>", Some("123"))]
    #[case("<@abc>", None)]
    #[case("123", None)]
    #[case("<#123>", None)]
    fn user_mentions(#[case] arg: &str, #[case] expected: Option<&str>) {
        assert_eq!(user_mention_id(arg), expected);
    }

    #[rstest]
    #[case("<#42>", Some("42"))]
    #[case("<#>", None)]
    #[case("#general", None)]
    fn channel_mentions(#[case] arg: &str, #[case] expected: Option<&str>) {
        assert_eq!(channel_mention_id(arg), expected);
    }

    #[rstest]
    #[case("1s", Some(1))]
    #[case("5m", Some(300))]
    #[case("2h", Some(7_200))]
    #[case("1d", Some(86_400))]
    #[case("1h30m", Some(5_400))]
    #[case("0s", None)]
    #[case("", None)]
    #[case("soon", None)]
    #[case("30m1h", None)]
    fn durations(#[case] input: &str, #[case] secs: Option<u64>) {
        assert_eq!(parse_duration(input), secs.map(Duration::from_secs));
    }

    #[test]
    fn channel_target_must_match_reported_mention() {
        let args: Vec<String> = ["<#42>", "hello"].map(String::from).to_vec();
        let plain = InboundMessage::new("m", "c", Author::new("u", "u"), "/say <#42> hello");
        let (target, rest) = split_channel_target(&plain, &args);
        assert!(target.is_none());
        assert_eq!(rest.len(), 2);

        let mentioned = plain.with_channel_mentions(vec!["42".into()]);
        let (target, rest) = split_channel_target(&mentioned, &args);
        assert_eq!(target.as_deref(), Some("42"));
        assert_eq!(rest, ["hello".to_string()]);
    }
}
