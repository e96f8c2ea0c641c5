/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable or malformed placeholders are left untouched, so a config
/// file never silently loses content.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        match after_open.find('}') {
            Some(end) if end > 0 => {
                let name = &after_open[..end];
                match lookup(name) {
                    Some(value) => result.push_str(&value),
                    None => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    },
                }
                rest = &after_open[end + 1..];
            },
            _ => {
                // Unclosed or empty placeholder; emit literally and move on.
                result.push_str("${");
                rest = after_open;
            },
        }
    }

    result.push_str(rest);
    result
}
