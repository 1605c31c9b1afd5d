use std::env;

/// Replace `${VAR}` references with environment values.
///
/// Unset variables expand to the empty string. An unclosed `${` or an empty
/// name is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| env::var(name).ok())
}

fn expand_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::expand_with;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "GROQ_API_KEY" => Some("gsk_123".to_string()),
            "HOME_DIR" => Some("/home/me".to_string()),
            _ => None,
        }
    }

    #[test]
    fn no_vars_is_identity() {
        assert_eq!(expand_with("plain value", lookup), "plain value");
    }

    #[test]
    fn single_var() {
        assert_eq!(expand_with("${GROQ_API_KEY}", lookup), "gsk_123");
    }

    #[test]
    fn missing_var_becomes_empty() {
        assert_eq!(expand_with("a${NOPE}b", lookup), "ab");
    }

    #[test]
    fn adjacent_vars() {
        assert_eq!(
            expand_with("${HOME_DIR}${GROQ_API_KEY}", lookup),
            "/home/megsk_123"
        );
    }

    #[test]
    fn unclosed_brace_preserved() {
        assert_eq!(expand_with("x${GROQ_API_KEY", lookup), "x${GROQ_API_KEY");
    }

    #[test]
    fn empty_name_preserved() {
        assert_eq!(expand_with("${}", lookup), "${}");
    }

    #[test]
    fn unicode_content_survives() {
        assert_eq!(
            expand_with("café ${HOME_DIR}/ñ", lookup),
            "café /home/me/ñ"
        );
    }
}
