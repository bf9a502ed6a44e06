/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::{Yaml, yaml};

use super::GraphiteConfig;

impl GraphiteConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Hash(map) => {
                let mut config = GraphiteConfig::new(String::new());
                foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
                config.check()?;
                Ok(config)
            }
            Yaml::String(s) => {
                let mut config = GraphiteConfig::new(s.as_str());
                config.check()?;
                Ok(config)
            }
            _ => Err(anyhow!(
                "yaml value type for 'graphite config' should be 'map' or 'string'"
            )),
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "address" | "addr" | "host" => {
                self.address = as_string(v).context(format!("invalid string value for key {k}"))?;
            }
            "port" => {
                self.port = as_u16(v).context(format!("invalid u16 value for key {k}"))?;
            }
            "poll_interval" | "pollintervalseconds" => {
                self.poll_interval =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "queue_size" | "queuesize" => {
                self.queue_size = as_usize(v).context(format!("invalid usize value for key {k}"))?;
            }
            "send_as_rate" | "sendasrate" => {
                self.send_as_rate = as_bool(v).context(format!("invalid bool value for key {k}"))?;
            }
            "prefix" => {
                let prefix = as_string(v).context(format!("invalid string value for key {k}"))?;
                self.prefix = Some(prefix);
            }
            "connect_timeout" => {
                self.connect_timeout =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "write_timeout" => {
                self.write_timeout =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

fn as_u16(v: &Yaml) -> anyhow::Result<u16> {
    match v {
        Yaml::String(s) => Ok(u16::from_str(s)?),
        Yaml::Integer(i) => Ok(u16::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'u16' should be 'string' or 'integer'"
        )),
    }
}

fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(s) => Ok(usize::from_str(s)?),
        Yaml::Integer(i) => Ok(usize::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'usize' should be 'string' or 'integer'"
        )),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Boolean(value) => Ok(*value),
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                let u = u64::from_str(value).map_err(|_| anyhow!("invalid duration string"))?;
                Ok(Duration::from_secs(u))
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            let u = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(Duration::from_secs(u))
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer'"
        )),
    }
}
