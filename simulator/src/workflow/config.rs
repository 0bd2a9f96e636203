use alertcore::config::DEFAULT_MAX_SEEN;
use alertcore::math::Position;
use alertcore::prelude::ConfigError;
use alertcore::{ReceiverConfig, RelayConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, ToSocketAddrs, UdpSocket};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Relay,
    Receiver,
}

/// One node of a live deployment, as read from YAML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub role: Role,
    pub local_port: u16,
    #[serde(default)]
    pub multicast_group: Option<Ipv4Addr>,
    /// Address of the local interface used for the multicast join. Must
    /// belong to this host.
    #[serde(default)]
    pub multicast_interface: Option<Ipv4Addr>,
    /// IP type-of-service byte applied to outgoing datagrams.
    #[serde(default)]
    pub tos: Option<u32>,
    #[serde(default)]
    pub relay: Option<RelaySection>,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub vehicle: VehicleSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelaySection {
    #[serde(default = "default_max_seen")]
    pub max_seen: usize,
    #[serde(default = "default_loop_prevention")]
    pub enable_loop_prevention: bool,
    /// `host:port`, resolved once at start-up.
    pub destination: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSection {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    /// Stationary nodes (road-side units) expose no mobility.
    pub mobile: bool,
}

impl Default for VehicleSection {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading_deg: 0.0,
            mobile: true,
        }
    }
}

impl VehicleSection {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

fn default_name() -> String {
    "node".to_string()
}

fn default_max_seen() -> usize {
    DEFAULT_MAX_SEEN
}

fn default_loop_prevention() -> bool {
    true
}

impl NodeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading node config {}", path_ref.display()))?;
        let config: NodeConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing node config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings and the named local interface. Runs before any
    /// socket is bound for traffic.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.role {
            Role::Relay => {
                let section = self
                    .relay
                    .as_ref()
                    .ok_or(ConfigError::MissingSection("relay"))?;
                if section.max_seen == 0 {
                    return Err(ConfigError::NonPositiveMaxSeen(section.max_seen).into());
                }
            }
            Role::Receiver => self.receiver.validate()?,
        }
        if let Some(tos) = self.tos {
            if tos > u32::from(u8::MAX) {
                return Err(ConfigError::InvalidTos(tos).into());
            }
        }
        if let Some(interface) = self.multicast_interface {
            check_local_interface(interface)?;
        }
        Ok(())
    }

    /// Resolves the relay destination and builds the core relay settings.
    pub fn relay_config(&self) -> anyhow::Result<RelayConfig> {
        let section = self
            .relay
            .as_ref()
            .ok_or(ConfigError::MissingSection("relay"))?;
        let destination = section
            .destination
            .as_str()
            .to_socket_addrs()
            .map_err(|_| ConfigError::InvalidDestination(section.destination.clone()))?
            .next()
            .ok_or_else(|| ConfigError::InvalidDestination(section.destination.clone()))?;

        let config = RelayConfig {
            max_seen: section.max_seen,
            enable_loop_prevention: section.enable_loop_prevention,
            destination,
        };
        config.validate()?;
        Ok(config)
    }
}

/// An address belongs to this host exactly when a socket can bind to it.
fn check_local_interface(interface: Ipv4Addr) -> Result<(), ConfigError> {
    if interface.is_multicast() || interface.is_broadcast() {
        return Err(ConfigError::MissingInterface(interface.to_string()));
    }
    UdpSocket::bind((interface, 0))
        .map(|_| ())
        .map_err(|_| ConfigError::MissingInterface(interface.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(contents: &str) -> tempfile::TempPath {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        temp.into_temp_path()
    }

    #[test]
    fn relay_config_load_reads_yaml() {
        let path = write_yaml(
            "name: rsu-1\nrole: relay\nlocal_port: 4000\nrelay:\n  max_seen: 64\n  destination: \"127.0.0.1:3000\"\n",
        );
        let cfg = NodeConfig::load(&path).unwrap();
        assert_eq!(cfg.role, Role::Relay);
        let relay = cfg.relay_config().unwrap();
        assert_eq!(relay.max_seen, 64);
        assert!(relay.enable_loop_prevention);
        assert_eq!(relay.destination, "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn receiver_config_defaults_thresholds() {
        let path = write_yaml(
            "role: receiver\nlocal_port: 3000\nmulticast_group: 224.0.0.10\nvehicle:\n  heading_deg: 90\n",
        );
        let cfg = NodeConfig::load(&path).unwrap();
        assert_eq!(cfg.name, "node");
        assert_eq!(cfg.multicast_group, Some(Ipv4Addr::new(224, 0, 0, 10)));
        assert_eq!(cfg.receiver.stop_distance, 60.0);
        assert!(cfg.vehicle.mobile);
        assert_eq!(cfg.vehicle.heading_deg, 90.0);
    }

    #[test]
    fn relay_without_section_is_fatal() {
        let path = write_yaml("role: relay\nlocal_port: 4000\n");
        let err = NodeConfig::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingSection("relay"))
        );
    }

    #[test]
    fn local_multicast_interface_and_tos_are_accepted() {
        let path = write_yaml(
            "role: receiver\nlocal_port: 3000\nmulticast_group: 224.0.0.10\nmulticast_interface: 127.0.0.1\ntos: 184\n",
        );
        let cfg = NodeConfig::load(&path).unwrap();
        assert_eq!(cfg.multicast_interface, Some(Ipv4Addr::LOCALHOST));
        assert_eq!(cfg.tos, Some(184));
    }

    #[test]
    fn interface_settings_default_to_unset() {
        let path = write_yaml("role: receiver\nlocal_port: 3000\n");
        let cfg = NodeConfig::load(&path).unwrap();
        assert_eq!(cfg.multicast_interface, None);
        assert_eq!(cfg.tos, None);
    }

    #[test]
    fn foreign_multicast_interface_is_fatal() {
        // TEST-NET-1 is never assigned to a real host.
        let path = write_yaml(
            "role: receiver\nlocal_port: 3000\nmulticast_group: 224.0.0.10\nmulticast_interface: 192.0.2.77\n",
        );
        let err = NodeConfig::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingInterface("192.0.2.77".into()))
        );
    }

    #[test]
    fn multicast_address_is_not_an_interface() {
        let path = write_yaml(
            "role: receiver\nlocal_port: 3000\nmulticast_interface: 224.0.0.10\n",
        );
        let err = NodeConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("missing interface"));
    }

    #[test]
    fn oversized_tos_is_fatal() {
        let path = write_yaml("role: receiver\nlocal_port: 3000\ntos: 256\n");
        let err = NodeConfig::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidTos(256))
        );
    }

    #[test]
    fn zero_max_seen_is_fatal() {
        let path = write_yaml(
            "role: relay\nlocal_port: 4000\nrelay:\n  max_seen: 0\n  destination: \"127.0.0.1:3000\"\n",
        );
        let err = NodeConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("max_seen"));
    }

    #[test]
    fn unresolvable_destination_is_fatal() {
        let path = write_yaml(
            "role: relay\nlocal_port: 4000\nrelay:\n  destination: \"not an address\"\n",
        );
        let cfg = NodeConfig::load(&path).unwrap();
        assert!(cfg.relay_config().is_err());
    }
}
