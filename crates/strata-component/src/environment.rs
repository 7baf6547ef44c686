//! Environment snapshots attached to identities.

use std::collections::BTreeMap;

/// Captures the host parameters an identity is conceived in.
///
/// Keys: `os`, `arch`, `family`, `process_id`.
///
/// ```
/// let env = strata_component::environment::host_snapshot();
/// assert_eq!(env["os"], std::env::consts::OS);
/// assert!(env.contains_key("process_id"));
/// ```
#[must_use]
pub fn host_snapshot() -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("os".to_string(), std::env::consts::OS.to_string());
    env.insert("arch".to_string(), std::env::consts::ARCH.to_string());
    env.insert("family".to_string(), std::env::consts::FAMILY.to_string());
    env.insert("process_id".to_string(), std::process::id().to_string());
    env
}

/// Returns `base` with every entry of `overrides` applied on top.
#[must_use]
pub fn overlay(
    mut base: BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    for (k, v) in overrides {
        base.insert(k.clone(), v.clone());
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_has_all_keys() {
        let env = host_snapshot();
        for key in ["os", "arch", "family", "process_id"] {
            assert!(env.contains_key(key), "missing {key}");
        }
        assert_eq!(env["process_id"], std::process::id().to_string());
    }

    #[test]
    fn overlay_replaces_and_adds() {
        let mut overrides = BTreeMap::new();
        overrides.insert("os".to_string(), "plan9".to_string());
        overrides.insert("zone".to_string(), "eu-1".to_string());

        let env = overlay(host_snapshot(), &overrides);
        assert_eq!(env["os"], "plan9");
        assert_eq!(env["zone"], "eu-1");
        assert!(env.contains_key("arch"));
    }
}
