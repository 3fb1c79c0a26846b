pub mod clean;
pub mod direct;
pub mod endpoint;
pub mod error;

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use clean::*;
pub use endpoint::HubEndpoint;
pub use error::{Error, Result};

pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

pub fn kube_dir() -> Result<PathBuf> {
    let home = env::var_os("HOME").ok_or(Error::NoHome)?;
    Ok(Path::new(&home).join(".kube"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(kube_dir()?.join("config"))
}

/// Load the kubeconfig the way kubectl finds it.
///
/// An explicit path must exist and is used alone. Otherwise every existing file listed in
/// `KUBECONFIG` is merged in order, falling back to `~/.kube/config`. No file at all yields an
/// empty config.
pub fn load(explicit: Option<&Path>) -> Result<KubeConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let listed = env::var_os(KUBECONFIG_ENV)
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();
    load_from_paths(&listed)
}

pub fn load_from_paths(paths: &[PathBuf]) -> Result<KubeConfig> {
    let mut existing = paths
        .iter()
        .filter(|p| !p.as_os_str().is_empty() && p.exists())
        .peekable();

    if existing.peek().is_none() {
        let default = default_config_path()?;
        if default.exists() {
            return read_config(&default);
        }
        debug!("no kubeconfig found, using an empty one");
        return Ok(KubeConfig::default());
    }

    let mut merged = KubeConfig::default();
    for path in existing {
        merged.merge(read_config(path)?);
    }
    Ok(merged)
}

pub fn read_config(path: &Path) -> Result<KubeConfig> {
    debug!(path = %path.display(), "reading kubeconfig");
    direct::KubeConfig::read_from(path).map(KubeConfig::from)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("missing"))).unwrap_err();

        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn listed_paths_merge_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(
            dir.path(),
            "first",
            "current-context: a\ncontexts:\n- name: a\n  context:\n    cluster: k\n    user: u\n",
        );
        let second = write(
            dir.path(),
            "second",
            "current-context: b\nclusters:\n- name: k\n  cluster:\n    server: https://api.hub.io\nusers:\n- name: u\n  user:\n    token: t\n",
        );
        let missing = dir.path().join("missing");

        let kc = load_from_paths(&[first, missing, second]).unwrap();
        let resolved = kc.resolve(&Overrides::default()).unwrap();

        assert_eq!(kc.current_context, "a");
        assert_eq!(resolved.server, "https://api.hub.io");
        assert_eq!(resolved.token.as_deref(), Some("t"));
    }

    // One test owns HOME and KUBECONFIG so nothing else races on them.
    #[test]
    fn environment_picks_the_files() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir(home.path().join(".kube")).unwrap();
        write(&home.path().join(".kube"), "config", "current-context: default\n");
        let first = write(home.path(), "first", "current-context: first\n");
        let second = write(
            home.path(),
            "second",
            "current-context: second\nclusters:\n- name: k\n  cluster:\n    server: https://api.hub.io\n",
        );

        env::set_var("HOME", home.path());
        env::remove_var(KUBECONFIG_ENV);
        assert_eq!(load(None).unwrap().current_context, "default");

        env::set_var(KUBECONFIG_ENV, env::join_paths([&first, &second]).unwrap());
        let kc = load(None).unwrap();
        assert_eq!(kc.current_context, "first");
        assert!(kc.clusters.contains_key("k"));

        env::set_var(KUBECONFIG_ENV, home.path().join("missing"));
        assert_eq!(load(None).unwrap().current_context, "default");

        let empty = tempfile::tempdir().unwrap();
        env::set_var("HOME", empty.path());
        let kc = load(None).unwrap();
        assert_eq!(kc.current_context, "");
        assert!(kc.clusters.is_empty());

        env::remove_var(KUBECONFIG_ENV);
    }
}
