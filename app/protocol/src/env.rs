//! Environment expansion for TOML configuration files.

use std::borrow::Cow;

/// Expand `${VAR}` and `${VAR:-fallback}` references.
///
/// Unset variables expand to their fallback, or to nothing. An unterminated
/// `${` is kept as written.
pub fn expand_env_vars(input: &str) -> Cow<'_, str> {
    if !input.contains("${") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            out.push_str(&rest[start..]);
            return Cow::Owned(out);
        };

        let reference = &tail[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(fallback.unwrap_or_default()),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::expand_env_vars;

    #[test]
    fn expands_known_and_drops_unknown() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("HILLVIEW_ENV_TEST_HOST", "10.0.0.1") };
        let out = expand_env_vars(
            "url = \"ws://${HILLVIEW_ENV_TEST_HOST}:${HILLVIEW_ENV_TEST_MISSING}8080\"",
        );
        assert_eq!(out, "url = \"ws://10.0.0.1:8080\"");
    }

    #[test]
    fn fallback_applies_to_unset_variables() {
        let out = expand_env_vars("port = ${HILLVIEW_ENV_TEST_UNSET_PORT:-9090}");
        assert_eq!(out, "port = 9090");
    }

    #[test]
    fn plain_and_unterminated_input_is_untouched() {
        assert_eq!(expand_env_vars("port = 8080"), "port = 8080");
        assert_eq!(expand_env_vars("x = \"${OPEN\""), "x = \"${OPEN\"");
    }
}
