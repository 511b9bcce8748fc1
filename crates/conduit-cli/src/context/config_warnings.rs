use conduit_config::ConduitConfig;

/// Emit warnings for likely mistyped env var keys that silently fell back to defaults.
pub fn warn_unconfigured(config: &ConduitConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &ConduitConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    let mut warnings = Vec::new();

    if !config.source.is_configured() && has_single_underscore_key(&env_keys, "CONDUIT_SOURCE") {
        warnings.push(
            "Source config appears default while CONDUIT_SOURCE_* env vars exist. Use double underscores (example: CONDUIT_SOURCE__BASE_URL)."
                .to_string(),
        );
    }

    for section in ["STORE", "IMPORT", "SEARCH"] {
        let prefix = format!("CONDUIT_{section}");
        if has_single_underscore_key(&env_keys, &prefix) {
            warnings.push(format!(
                "{prefix}_* env vars are ignored. Use double underscores (example: {prefix}__{}).",
                example_key(section)
            ));
        }
    }

    warnings
}

/// `CONDUIT_SOURCE_BASE_URL` style keys: the section prefix followed by a
/// single underscore, which figment does not split into a nested key.
fn has_single_underscore_key(keys: &[String], prefix: &str) -> bool {
    keys.iter().any(|key| {
        key.strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('_') && !rest.starts_with("__"))
    })
}

fn example_key(section: &str) -> &'static str {
    match section {
        "STORE" => "PATH",
        "IMPORT" => "BATCH_SIZE",
        _ => "SAMPLE_SIZE",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn env(keys: &[&str]) -> Vec<(String, String)> {
        keys.iter().map(|k| ((*k).to_string(), "x".to_string())).collect()
    }

    #[test]
    fn single_underscore_source_key_warns() {
        let warnings =
            collect_unconfigured_warnings(&ConduitConfig::default(), env(&["CONDUIT_SOURCE_BASE_URL"]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("CONDUIT_SOURCE__BASE_URL"));
    }

    #[test]
    fn double_underscore_keys_are_fine() {
        let warnings = collect_unconfigured_warnings(
            &ConduitConfig::default(),
            env(&["CONDUIT_SOURCE__BASE_URL", "CONDUIT_STORE__PATH", "CONDUIT_LOG"]),
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn other_sections_warn_too() {
        let warnings = collect_unconfigured_warnings(
            &ConduitConfig::default(),
            env(&["CONDUIT_IMPORT_BATCH_SIZE", "CONDUIT_SEARCH_SAMPLE_SIZE"]),
        );
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("CONDUIT_IMPORT__BATCH_SIZE"));
        assert!(warnings[1].contains("CONDUIT_SEARCH__SAMPLE_SIZE"));
    }
}
