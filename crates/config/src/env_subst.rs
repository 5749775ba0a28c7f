/// Replace `${VAR}` and `${VAR:-fallback}` placeholders in raw config text.
///
/// A variable that is unset (or set but empty, when a fallback is given)
/// takes the fallback. Without a fallback an unresolved placeholder is left
/// untouched.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// [`substitute_env`] with an injectable lookup, for tests.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // '{'

        let mut body = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            body.push(c);
        }

        if !closed || body.is_empty() {
            result.push_str("${");
            result.push_str(&body);
            continue;
        }

        match body.split_once(":-") {
            Some((name, fallback)) => match lookup(name).filter(|v| !v.is_empty()) {
                Some(value) => result.push_str(&value),
                None => result.push_str(fallback),
            },
            None => match lookup(&body) {
                Some(value) => result.push_str(&value),
                None => {
                    result.push_str("${");
                    result.push_str(&body);
                    result.push('}');
                },
            },
        }
    }

    result
}
