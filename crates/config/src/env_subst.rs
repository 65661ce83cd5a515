//! `${VAR}` expansion applied to raw config text before parsing.

/// Replace `${ENV_VAR}` placeholders with values from the process environment.
///
/// Unset variables and unterminated placeholders are left untouched.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "ALERTCAST_TEST_TOKEN" => Some("123:abc".to_string()),
            "ALERTCAST_TEST_DIR" => Some("/var/lib/alertcast".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token = \"${ALERTCAST_TEST_TOKEN}\"", lookup),
            "token = \"123:abc\""
        );
    }

    #[test]
    fn substitutes_several_vars_on_one_line() {
        assert_eq!(
            substitute_env_with("${ALERTCAST_TEST_DIR}/${ALERTCAST_TEST_TOKEN}", lookup),
            "/var/lib/alertcast/123:abc"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${ALERTCAST_NONEXISTENT_XYZ}", lookup),
            "${ALERTCAST_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
        assert_eq!(substitute_env_with("cost: $5", lookup), "cost: $5");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
