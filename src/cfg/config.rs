// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::cfg::enums::AddressFamily;

/// Well-known LDP port (RFC 5036 §3): both the UDP discovery socket and the
/// TCP session listener bind to this port.
pub const LDP_PORT: u16 = 646;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Discovery-side (UDP) settings: which interfaces/address-families are
    /// enabled for Hello reception.
    pub discovery: DiscoveryConfig,
    /// Session-side (TCP) settings: listener address and timers.
    pub session: SessionConfig,
    /// Implementation/runtime parameters that live outside the LDP protocol.
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DiscoveryConfig {
    #[serde(rename = "HelloPort", default = "default_ldp_port")]
    pub hello_port: u16,
    #[serde(rename = "Interfaces")]
    pub interfaces: Vec<InterfaceConfig>,
}

/// One LDP-enabled interface, keyed by the kernel ifindex reported in the
/// packet-info ancillary data.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InterfaceConfig {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IfIndex")]
    pub ifindex: u32,
    #[serde(rename = "AddressFamilies")]
    pub address_families: Vec<AddressFamily>,
}

impl InterfaceConfig {
    pub fn enabled_for(&self, af: AddressFamily) -> bool {
        self.address_families.contains(&af)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionConfig {
    #[serde(rename = "ListenPort", default = "default_ldp_port")]
    pub listen_port: u16,
    #[serde(rename = "PendingConnTimeout", with = "serde_secs")]
    pub pending_conn_timeout: Duration,
    #[serde(rename = "InitialMaxPduLen", default = "default_max_pdu_len")]
    pub initial_max_pdu_len: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "IbufReadSize", default = "default_ibuf_read_size")]
    pub ibuf_read_size: usize,
    #[serde(rename = "MaxAcceptedPending")]
    pub max_accepted_pending: u32,
    #[serde(flatten)]
    pub custom: HashMap<String, String>,
}

fn default_ldp_port() -> u16 {
    LDP_PORT
}

fn default_max_pdu_len() -> u16 {
    crate::wire::header::MAX_PDU_LEN
}

fn default_ibuf_read_size() -> usize {
    16384
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.session.initial_max_pdu_len as usize
                >= crate::wire::header::HDR_SIZE as usize
                    + crate::wire::header::MSG_HDR_SIZE as usize,
            "InitialMaxPduLen is too small to hold even one empty message"
        );
        ensure!(
            self.session.pending_conn_timeout > Duration::ZERO,
            "PendingConnTimeout must be > 0"
        );
        ensure!(
            self.runtime.ibuf_read_size
                >= self.session.initial_max_pdu_len as usize,
            "IbufReadSize must be able to hold at least one max-size PDU"
        );
        for iface in &self.discovery.interfaces {
            ensure!(
                !iface.address_families.is_empty(),
                "interface {} has no enabled address families",
                iface.name
            );
        }
        Ok(())
    }

    pub fn interface_by_ifindex(&self, ifindex: u32) -> Option<&InterfaceConfig> {
        self.discovery.interfaces.iter().find(|i| i.ifindex == ifindex)
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            discovery: DiscoveryConfig {
                hello_port: LDP_PORT,
                interfaces: vec![InterfaceConfig {
                    name: "eth0".into(),
                    ifindex: 2,
                    address_families: vec![AddressFamily::Ipv4, AddressFamily::Ipv6],
                }],
            },
            session: SessionConfig {
                listen_port: LDP_PORT,
                pending_conn_timeout: Duration::from_secs(5),
                initial_max_pdu_len: 4096,
            },
            runtime: RuntimeConfig {
                ibuf_read_size: 16384,
                max_accepted_pending: 1024,
                custom: HashMap::new(),
            },
        }
    }

    #[test]
    fn validates_sample_config() {
        let mut cfg = sample();
        cfg.validate_and_normalize().expect("sample config must be valid");
    }

    #[test]
    fn rejects_zero_pending_timeout() {
        let mut cfg = sample();
        cfg.session.pending_conn_timeout = Duration::ZERO;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn rejects_interface_without_address_family() {
        let mut cfg = sample();
        cfg.discovery.interfaces[0].address_families.clear();
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn round_trips_through_yaml() {
        let cfg = sample();
        let yaml = serde_yaml::to_string(&cfg).expect("serialize");
        let back: Config = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back.discovery.interfaces[0].ifindex, 2);
    }
}
