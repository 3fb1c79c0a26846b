use std::collections::BTreeMap;
use std::fs;

use crate::direct;
use crate::error::{Error, Result};
pub use crate::direct::{ClusterSpec, ContextSpec, UserSpec};

#[derive(Debug, Clone, Default)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub users: BTreeMap<String, UserSpec>,
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        // first entry wins when a file repeats a name, same as across files
        let mut clean = Self {
            current_context: kc.current_context,
            ..Self::default()
        };
        for ctx in kc.contexts {
            clean.contexts.entry(ctx.name).or_insert(ctx.context);
        }
        for cls in kc.clusters {
            clean.clusters.entry(cls.name).or_insert(cls.cluster);
        }
        for usr in kc.users {
            clean.users.entry(usr.name).or_insert(usr.user);
        }
        clean
    }
}

/// Values given on the command line that take precedence over the kubeconfig.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub context: Option<String>,
    pub cluster: Option<String>,
    pub user: Option<String>,
    pub server: Option<String>,
    pub token: Option<String>,
}

/// What the selected context boils down to.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub cluster_name: String,
    pub user_name: String,
    pub server: String,
    pub token: Option<String>,
    pub namespace: Option<String>,
}

impl KubeConfig {
    /// Fold another file into this one. Entries already present are kept.
    pub fn merge(&mut self, other: KubeConfig) {
        if self.current_context.is_empty() {
            self.current_context = other.current_context;
        }
        for (name, ctx) in other.contexts {
            self.contexts.entry(name).or_insert(ctx);
        }
        for (name, cluster) in other.clusters {
            self.clusters.entry(name).or_insert(cluster);
        }
        for (name, user) in other.users {
            self.users.entry(name).or_insert(user);
        }
    }

    pub fn resolve(&self, overrides: &Overrides) -> Result<ClientConfig> {
        let context_name = overrides
            .context
            .as_deref()
            .unwrap_or(&self.current_context);
        let context = self
            .contexts
            .get(context_name)
            .ok_or_else(|| Error::ContextNotFound(context_name.to_string()))?;

        let cluster_name = overrides.cluster.as_deref().unwrap_or(&context.cluster);
        let cluster = self
            .clusters
            .get(cluster_name)
            .ok_or_else(|| Error::ClusterNotFound(cluster_name.to_string()))?;

        let server = overrides
            .server
            .clone()
            .unwrap_or_else(|| cluster.server.clone());

        let user_name = overrides.user.as_deref().unwrap_or(&context.user);
        let token = match &overrides.token {
            Some(token) => Some(token.clone()),
            None => {
                let user = self
                    .users
                    .get(user_name)
                    .ok_or_else(|| Error::UserNotFound(user_name.to_string()))?;
                user_token(user)?
            }
        };

        Ok(ClientConfig {
            cluster_name: cluster_name.to_string(),
            user_name: user_name.to_string(),
            server,
            token,
            namespace: context.namespace.clone(),
        })
    }
}

fn user_token(user: &UserSpec) -> Result<Option<String>> {
    if let Some(token) = user.token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(Some(token.clone()));
    }

    match &user.token_file {
        Some(path) => {
            let token = fs::read_to_string(path).map_err(|source| Error::TokenFile {
                path: path.clone(),
                source,
            })?;
            let token = token.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        None => Ok(None),
    }
}
