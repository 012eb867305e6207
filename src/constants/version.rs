use semver::Version;

const REPOSITORY_URL: &str = "https://github.com/remindbot/remindbot";

/// the crate version, with a link to the commit it was built from when known.
pub fn get_version() -> String {
    let sha = env!("VERGEN_GIT_SHA");

    match env!("CARGO_PKG_VERSION").parse::<Version>() {
        // vergen reports this placeholder when the build has no git metadata
        Ok(semver) if sha == "VERGEN_IDEMPOTENT_OUTPUT" => semver.to_string(),
        Ok(semver) => format!(
            "{} [[`{}`]({}/commit/{})]",
            semver,
            short_sha(sha),
            REPOSITORY_URL,
            sha
        ),
        Err(e) => {
            tracing::warn!(err = ?e, "couldn't parse a semver out of Cargo.toml? defaulting to 0.0.0-unknown.");
            String::from("0.0.0-unknown")
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn test_get_version_starts_with_crate_version() {
        assert!(get_version().starts_with(env!("CARGO_PKG_VERSION")));
    }
}
