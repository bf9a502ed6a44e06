/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use log::warn;

pub const HOST_NAME_UNKNOWN: &str = "HostName-Unknown";

/// Process environment lookups used when building the publishing pipeline.
pub trait PublishEnv: Send + Sync {
    fn env_var(&self, name: &str) -> Option<String>;

    fn local_host_name(&self) -> Option<String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl PublishEnv for SystemEnv {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    #[cfg(unix)]
    fn local_host_name(&self) -> Option<String> {
        let uname = rustix::system::uname();
        let name = uname.nodename().to_str().ok()?;
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    #[cfg(not(unix))]
    fn local_host_name(&self) -> Option<String> {
        std::env::var("COMPUTERNAME").ok().filter(|s| !s.is_empty())
    }
}

/// Resolve `${NAME}` to the value of the environment variable `NAME`.
/// Any other address is returned as is.
pub(crate) fn resolve_address(env: &dyn PublishEnv, address: &str) -> anyhow::Result<String> {
    match address
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
    {
        Some(name) => env
            .env_var(name)
            .ok_or_else(|| anyhow!("environment variable {name} is not set")),
        None => Ok(address.to_string()),
    }
}

pub(crate) fn local_host_name(env: &dyn PublishEnv) -> String {
    match env.local_host_name() {
        Some(name) => name,
        None => {
            warn!("failed to get local host name, will use {HOST_NAME_UNKNOWN}");
            HOST_NAME_UNKNOWN.to_string()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub(crate) struct FixedEnv {
        pub(crate) vars: HashMap<String, String>,
        pub(crate) host: Option<String>,
    }

    impl PublishEnv for FixedEnv {
        fn env_var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }

        fn local_host_name(&self) -> Option<String> {
            self.host.clone()
        }
    }

    #[test]
    fn resolve() {
        let mut env = FixedEnv::default();
        env.vars
            .insert("GRAPHITE_HOST".to_string(), "10.0.0.5".to_string());

        assert_eq!(resolve_address(&env, "${GRAPHITE_HOST}").unwrap(), "10.0.0.5");
        assert_eq!(
            resolve_address(&env, "graphite.example.net").unwrap(),
            "graphite.example.net"
        );
        assert_eq!(resolve_address(&env, "$GRAPHITE_HOST").unwrap(), "$GRAPHITE_HOST");
        assert!(resolve_address(&env, "${NOT_SET}").is_err());
    }

    #[test]
    fn host_name() {
        let mut env = FixedEnv::default();
        assert_eq!(local_host_name(&env), HOST_NAME_UNKNOWN);
        env.host = Some("web01".to_string());
        assert_eq!(local_host_name(&env), "web01");
    }
}
