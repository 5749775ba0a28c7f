//! Randomised name-calling used in refusals.

use rand::seq::IndexedRandom;

const INSULTS: &[&str] = &[
    "idiot",
    "moron",
    "buffoon",
    "nincompoop",
    "dunce",
    "numbskull",
    "knucklehead",
    "ungrateful bastard",
    "dimwit",
    "clown",
];

pub fn insult() -> &'static str {
    INSULTS.choose(&mut rand::rng()).copied().unwrap_or("idiot")
}

/// The message sent when a permission check fails.
pub fn denial_message() -> String {
    format!(
        "**Thankfully, you don't have enough permissions for that, you {}.**",
        insult()
    )
}
