//! String toys. None of these touch the gateway beyond their response.

use {
    ivebot_channels::Payload,
    ivebot_commands::{CommandContext, CommandDef, Generator},
    rand::{Rng, seq::IndexedRandom},
};

const EIGHT_BALL: &[&str] = &[
    "It is certain.",
    "It is decidedly so.",
    "Better not tell you now.",
    "My sources say no.",
    "Without a doubt.",
    "Concentrate and ask again.",
    "My reply is no.",
    "No.",
    "Yes, definitely.",
    "Ask again later.",
    "Reply hazy, try again later.",
];

/// Combining marks stacked above, through and below the text.
const ZALGO_MARKS: &[char] = &[
    // above
    '\u{030d}', '\u{030e}', '\u{0304}', '\u{0305}', '\u{033f}', '\u{0311}', '\u{0306}', '\u{0310}',
    '\u{0352}', '\u{0357}', '\u{0351}', '\u{0307}', '\u{0308}', '\u{030a}', '\u{0342}', '\u{0343}',
    '\u{0344}', '\u{034a}', '\u{034b}', '\u{034c}', '\u{0303}', '\u{0302}', '\u{030c}', '\u{0350}',
    '\u{0300}', '\u{0301}', '\u{030b}', '\u{030f}', '\u{0312}', '\u{0313}', '\u{0314}', '\u{033d}',
    '\u{0309}', '\u{0363}', '\u{0364}', '\u{0365}', '\u{0366}', '\u{0367}', '\u{0368}', '\u{0369}',
    '\u{036a}', '\u{036b}', '\u{036c}', '\u{036d}', '\u{036e}', '\u{036f}', '\u{033e}', '\u{035b}',
    '\u{0346}', '\u{031a}',
    // through
    '\u{0315}', '\u{031b}', '\u{0340}', '\u{0341}', '\u{0358}', '\u{0321}', '\u{0322}', '\u{0327}',
    '\u{0328}', '\u{0334}', '\u{0335}', '\u{0336}', '\u{034f}', '\u{035c}', '\u{035d}', '\u{035e}',
    '\u{035f}', '\u{0360}', '\u{0362}', '\u{0338}', '\u{0337}', '\u{0361}', '\u{0489}',
    // below
    '\u{0316}', '\u{0317}', '\u{0318}', '\u{0319}', '\u{031c}', '\u{031d}', '\u{031e}', '\u{031f}',
    '\u{0320}', '\u{0324}', '\u{0325}', '\u{0326}', '\u{0329}', '\u{032a}', '\u{032b}', '\u{032c}',
    '\u{032d}', '\u{032e}', '\u{032f}', '\u{0330}', '\u{0331}', '\u{0332}', '\u{0333}', '\u{0339}',
    '\u{033a}', '\u{033b}', '\u{033c}', '\u{0345}', '\u{0347}', '\u{0348}', '\u{0349}', '\u{034d}',
    '\u{034e}', '\u{0353}', '\u{0354}', '\u{0355}', '\u{0356}', '\u{0359}', '\u{035a}', '\u{0323}',
];

const REPEAT_LIMIT: usize = 2000;
const REPEAT_USAGE: &str = "Correct usage: /repeat <number of times> <string to repeat>";
const RANDOM_USAGE: &str = "Correct usage: /random (optional start number) (optional end number)";

pub fn definitions() -> Vec<CommandDef> {
    vec![
        CommandDef::new("choose", Generator::deferred(choose))
            .alias("cho")
            .description("Choose between multiple options.")
            .full_description("Choose between multiple options.")
            .usage("/choose <option 1>|(option 2)|(option 3)..."),
        CommandDef::new("reverse", Generator::deferred(reverse))
            .alias("rev")
            .description("Reverse a sentence.")
            .full_description("Reverse a sentence.")
            .usage("/reverse <text>"),
        CommandDef::new("8ball", Generator::deferred(eight_ball))
            .invalid_usage_message("Please ask the 8ball a question.")
            .description("Random answers to random questions.")
            .full_description("Random answers to random questions.")
            .usage("/8ball <question>"),
        CommandDef::new("zalgo", Generator::deferred(zalgo))
            .alias("zgo")
            .description("The zalgo demon's writing.")
            .full_description("The zalgo demon's writing.")
            .usage("/zalgo <text>"),
        CommandDef::new("dezalgo", Generator::deferred(dezalgo))
            .alias("dzgo")
            .description("The zalgo demon's writing.")
            .full_description("Read the zalgo demon's writing.")
            .usage("/dezalgo <text>"),
        CommandDef::new("repeat", Generator::deferred(repeat))
            .alias("rep")
            .description("Repeat a string.")
            .full_description("Repeat a string.")
            .usage("/repeat <number of times> <string to repeat>"),
        CommandDef::new("random", Generator::deferred(random))
            .alias("rand")
            .no_arguments()
            .description("Return a random number.")
            .full_description("Returns a random number, by default between 0 and 10.")
            .usage("/random (starting number) (ending number)"),
    ]
}

fn text(body: impl Into<String>) -> anyhow::Result<Option<Payload>> {
    Ok(Some(Payload::text(body)))
}

async fn choose(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let rest = ctx.rest();
    if !rest.contains('|') {
        return text("Correct usage: /choose item1|item2|...");
    }
    let options: Vec<&str> = rest.split('|').collect();
    let pick = options.choose(&mut rand::rng()).copied().unwrap_or_default();
    text(format!("I choose: {pick}"))
}

async fn reverse(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    text(ctx.rest().chars().rev().collect::<String>())
}

async fn eight_ball(_ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let answer = EIGHT_BALL.choose(&mut rand::rng()).copied().unwrap_or("No.");
    text(format!("The 🎱 has spoken.\n8ball: {answer}"))
}

pub fn zalgoify(input: &str) -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(input.len() * 8);
    for ch in input.chars() {
        out.push(ch);
        for _ in 0..rng.random_range(1..=5) {
            if let Some(mark) = ZALGO_MARKS.choose(&mut rng) {
                out.push(*mark);
            }
        }
    }
    out
}

pub fn dezalgoify(input: &str) -> String {
    input.chars().filter(|c| !ZALGO_MARKS.contains(c)).collect()
}

async fn zalgo(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    text(zalgoify(ctx.rest()))
}

async fn dezalgo(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    text(dezalgoify(ctx.rest()))
}

fn repeat_reply(times: &str, body: &str) -> String {
    let Ok(times) = times.parse::<usize>() else {
        return REPEAT_USAGE.to_string();
    };
    if body.is_empty() {
        return REPEAT_USAGE.to_string();
    }
    if times.saturating_mul(body.chars().count()) > REPEAT_LIMIT {
        return "To prevent spam, your excessive message has not been repeated.".to_string();
    }
    if matches!(body, "_" | "*" | "~") {
        return "This is known to lag users and is disabled.".to_string();
    }
    body.repeat(times)
}

async fn repeat(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    let (times, body) = ctx
        .rest()
        .split_once(char::is_whitespace)
        .map_or((ctx.rest(), ""), |(times, body)| (times, body.trim_start()));
    text(repeat_reply(times, body))
}

fn random_reply(args: &[String]) -> String {
    let mut rng = rand::rng();
    let numbers: Option<Vec<i64>> = args.iter().map(|a| a.parse().ok()).collect();
    let value = match numbers.as_deref() {
        Some([]) => rng.random_range(0..10),
        Some([start]) => start.saturating_add(rng.random_range(0..10)),
        Some([a, b]) => {
            let (low, high) = if a <= b { (*a, *b) } else { (*b, *a) };
            if low == high {
                low
            } else {
                rng.random_range(low..high)
            }
        },
        _ => return RANDOM_USAGE.to_string(),
    };
    format!("The number.. is.. {value}")
}

async fn random(ctx: CommandContext) -> anyhow::Result<Option<Payload>> {
    text(random_reply(ctx.args()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::bot,
        ivebot_commands::testing::direct_message,
        rstest::rstest,
    };

    async fn reply(body: &str) -> String {
        let bot = bot();
        bot.send(direct_message("u", body)).await;
        bot.client.sent_texts().remove(0)
    }

    #[tokio::test]
    async fn choose_picks_one_option() {
        let answer = reply("/choose tea|coffee|water").await;
        assert!(["I choose: tea", "I choose: coffee", "I choose: water"].contains(&answer.as_str()));
        assert_eq!(reply("/cho tea").await, "Correct usage: /choose item1|item2|...");
    }

    #[tokio::test]
    async fn reverse_reverses_text() {
        assert_eq!(reply("/rev hello world").await, "dlrow olleh");
    }

    #[tokio::test]
    async fn eight_ball_needs_a_question() {
        assert_eq!(reply("/8ball").await, "Please ask the 8ball a question.");
        assert!(reply("/8ball will it rain?").await.starts_with("The 🎱 has spoken.\n8ball: "));
    }

    #[test]
    fn zalgo_round_trips_through_dezalgo() {
        let input = "hello, zalgo";
        let cursed = zalgoify(input);
        assert!(cursed.chars().count() > input.chars().count());
        assert_eq!(dezalgoify(&cursed), input);
    }

    #[rstest]
    #[case("3", "ab", "ababab")]
    #[case("x", "ab", REPEAT_USAGE)]
    #[case("2", "", REPEAT_USAGE)]
    #[case("1000", "abc", "To prevent spam, your excessive message has not been repeated.")]
    #[case("5", "~", "This is known to lag users and is disabled.")]
    fn repeat_rules(#[case] times: &str, #[case] body: &str, #[case] expected: &str) {
        assert_eq!(repeat_reply(times, body), expected);
    }

    #[tokio::test]
    async fn repeat_keeps_inner_spacing() {
        assert_eq!(reply("/rep 2 a  b ").await, "a  b a  b ");
    }

    #[test]
    fn random_ranges() {
        for _ in 0..50 {
            let n: i64 = random_reply(&[])
                .trim_start_matches("The number.. is.. ")
                .parse()
                .unwrap();
            assert!((0..10).contains(&n));

            let n: i64 = random_reply(&["100".into()])
                .trim_start_matches("The number.. is.. ")
                .parse()
                .unwrap();
            assert!((100..110).contains(&n));

            let n: i64 = random_reply(&["20".into(), "5".into()])
                .trim_start_matches("The number.. is.. ")
                .parse()
                .unwrap();
            assert!((5..20).contains(&n));
        }
        assert_eq!(random_reply(&["7".into(), "7".into()]), "The number.. is.. 7");
        assert_eq!(random_reply(&["a".into()]), RANDOM_USAGE);
        assert_eq!(random_reply(&["1".into(), "2".into(), "3".into()]), RANDOM_USAGE);
    }
}
