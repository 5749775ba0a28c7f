//! Splitting a raw message body into a command token and its arguments.

/// A message body recognised as a command call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub raw_body: String,
    /// First word without the prefix; lower-cased when commands are
    /// case-insensitive. May be empty (a bare prefix).
    pub command_token: String,
    /// Remaining whitespace-delimited words, in order.
    pub args: Vec<String>,
    /// Everything after the first word, with inner spacing preserved.
    pub rest: String,
}

/// Recognises `<prefix><name> arg arg ...` bodies.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentExtractor {
    prefix: char,
    case_insensitive: bool,
}

impl Default for ArgumentExtractor {
    fn default() -> Self {
        Self::new('/', true)
    }
}

impl ArgumentExtractor {
    pub fn new(prefix: char, case_insensitive: bool) -> Self {
        Self {
            prefix,
            case_insensitive,
        }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Returns `None` when the body does not start with the prefix: such a
    /// message is not an invocation at all.
    pub fn extract(&self, body: &str) -> Option<Invocation> {
        let after_prefix = body.strip_prefix(self.prefix)?;

        let (head, rest) = match after_prefix.find(char::is_whitespace) {
            Some(idx) => after_prefix.split_at(idx),
            None => (after_prefix, ""),
        };
        let command_token = if self.case_insensitive {
            head.to_lowercase()
        } else {
            head.to_string()
        };

        Some(Invocation {
            raw_body: body.to_string(),
            command_token,
            args: rest.split_whitespace().map(str::to_string).collect(),
            rest: rest.trim_start().to_string(),
        })
    }
}
