use tracing::debug;
use url::Url;

use crate::clean::ClientConfig;
use crate::error::{Error, Result};

const API_PREFIX: &str = "api.";
const NONK8S_API_ROOT: &str = "multicloud/hub-of-hubs-nonk8s-api";

/// Host of the hub-of-hubs API: `https://api.hub.example.com:6443` gives `hub.example.com`.
pub fn nonk8s_api_host(server: &str) -> Result<String> {
    let server_url = Url::parse(server).map_err(|source| Error::InvalidServerUrl {
        url: server.to_string(),
        source,
    })?;

    // `host_str` never carries the port
    let host = server_url.host_str().unwrap_or_default();
    let api_host = host.strip_prefix(API_PREFIX).unwrap_or(host);
    if api_host.is_empty() {
        return Err(Error::UnknownUrlFormat(host.to_string()));
    }

    Ok(api_host.to_string())
}

/// The bearer token of the resolved user, which the hub-of-hubs API requires.
pub fn bearer_token(config: &ClientConfig) -> Result<&str> {
    config
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::NoToken(config.user_name.clone()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct HubEndpoint {
    pub base_url: String,
    pub token: String,
}

impl HubEndpoint {
    pub fn from_client_config(config: &ClientConfig) -> Result<Self> {
        if config.server.is_empty() {
            return Err(Error::ServerNotFound(config.cluster_name.clone()));
        }
        let host = nonk8s_api_host(&config.server)?;
        let token = bearer_token(config)?.to_string();
        debug!(cluster = %config.cluster_name, %host, "derived hub-of-hubs endpoint");

        Ok(Self {
            base_url: format!("https://{host}"),
            token,
        })
    }

    pub fn resource_url(&self, resource_path: &str) -> String {
        format!(
            "{}/{NONK8S_API_ROOT}/{}",
            self.base_url,
            resource_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_config(server: &str, token: Option<&str>) -> ClientConfig {
        ClientConfig {
            cluster_name: "hub-cluster".into(),
            user_name: "admin".into(),
            server: server.into(),
            token: token.map(String::from),
            namespace: None,
        }
    }

    #[test]
    fn strips_api_prefix_and_port() {
        assert_eq!(
            nonk8s_api_host("https://api.hub.example.com:6443").unwrap(),
            "hub.example.com"
        );
    }

    #[test]
    fn keeps_hosts_without_api_prefix() {
        assert_eq!(nonk8s_api_host("https://10.0.0.5:6443").unwrap(), "10.0.0.5");
        assert_eq!(nonk8s_api_host("https://apis.example.com").unwrap(), "apis.example.com");
    }

    #[test]
    fn only_the_first_prefix_goes() {
        assert_eq!(nonk8s_api_host("https://api.api.example.com").unwrap(), "api.example.com");
    }

    #[test]
    fn bare_api_host_is_rejected() {
        let err = nonk8s_api_host("https://api./").unwrap_err();
        assert!(matches!(err, Error::UnknownUrlFormat(_)));
    }

    #[test]
    fn unparseable_server_is_rejected() {
        let err = nonk8s_api_host("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidServerUrl { .. }));
    }

    #[test]
    fn endpoint_needs_a_token() {
        let err = HubEndpoint::from_client_config(&client_config("https://api.hub.io:6443", None))
            .unwrap_err();
        assert_eq!(err.to_string(), "No Token found: for admin");

        let err = HubEndpoint::from_client_config(&client_config("https://api.hub.io", Some("")))
            .unwrap_err();
        assert!(matches!(err, Error::NoToken(_)));
    }

    #[test]
    fn endpoint_needs_a_server() {
        let err = HubEndpoint::from_client_config(&client_config("", Some("t"))).unwrap_err();
        assert!(matches!(err, Error::ServerNotFound(_)));
    }

    #[test]
    fn resource_url_joins_the_api_root() {
        let endpoint =
            HubEndpoint::from_client_config(&client_config("https://api.hub.io:6443", Some("t")))
                .unwrap();

        assert_eq!(
            endpoint.resource_url("managedclusters"),
            "https://hub.io/multicloud/hub-of-hubs-nonk8s-api/managedclusters"
        );
        assert_eq!(endpoint.token, "t");
    }
}
