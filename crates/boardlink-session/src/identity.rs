use boardlink_osc::OscArg;
use serde::Serialize;

/// Address pattern of the zero-argument discovery probe.
pub const SYSTEM_INFO_PROBE: &str = "/system/info";
/// First reserved system-info response: name, serial, ip, version, memory.
pub const SYSTEM_INFO_A: &str = "/system/info-internal-a";
/// Second reserved system-info response: network configuration.
pub const SYSTEM_INFO_B: &str = "/system/info-internal-b";

/// Network configuration reported by a board.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub dhcp: Option<bool>,
    pub webserver_enabled: Option<bool>,
    pub gateway: Option<String>,
    pub netmask: Option<String>,
    pub listen_port: Option<i32>,
    pub send_port: Option<i32>,
}

/// Last-known identity of one board, filled in field by field as
/// system-info messages arrive.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BoardIdentity {
    pub name: Option<String>,
    pub serial_number: Option<i32>,
    pub ip_address: Option<String>,
    pub firmware_version: Option<String>,
    pub free_memory: Option<i32>,
    pub network: NetworkConfig,
}

impl BoardIdentity {
    /// Apply a `/system/info-internal-a` argument list.
    ///
    /// The board sends the fields in a fixed positional order; a short or
    /// mistyped list simply updates fewer fields. Returns whether any
    /// field actually changed value.
    pub fn apply_info_a(&mut self, args: &[OscArg]) -> bool {
        let mut changed = false;
        for (position, arg) in args.iter().enumerate() {
            match (position, arg) {
                (0, OscArg::Str(v)) => changed |= set(&mut self.name, v.clone()),
                (1, OscArg::Int(v)) => changed |= set(&mut self.serial_number, *v),
                (2, OscArg::Str(v)) => changed |= set(&mut self.ip_address, v.clone()),
                (3, OscArg::Str(v)) => changed |= set(&mut self.firmware_version, v.clone()),
                (4, OscArg::Int(v)) => changed |= set(&mut self.free_memory, *v),
                _ => {}
            }
        }
        changed
    }

    /// Apply a `/system/info-internal-b` argument list; same rules.
    pub fn apply_info_b(&mut self, args: &[OscArg]) -> bool {
        let network = &mut self.network;
        let mut changed = false;
        for (position, arg) in args.iter().enumerate() {
            match (position, arg) {
                (0, OscArg::Int(v)) => changed |= set(&mut network.dhcp, *v != 0),
                (1, OscArg::Int(v)) => changed |= set(&mut network.webserver_enabled, *v != 0),
                (2, OscArg::Str(v)) => changed |= set(&mut network.gateway, v.clone()),
                (3, OscArg::Str(v)) => changed |= set(&mut network.netmask, v.clone()),
                (4, OscArg::Int(v)) => changed |= set(&mut network.listen_port, *v),
                (5, OscArg::Int(v)) => changed |= set(&mut network.send_port, *v),
                _ => {}
            }
        }
        changed
    }
}

fn set<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_a_fills_all_fields_in_order() {
        let mut identity = BoardIdentity::default();
        let changed = identity.apply_info_a(&[
            OscArg::Str("Board1".to_string()),
            OscArg::Int(42),
            OscArg::Str("10.0.0.5".to_string()),
            OscArg::Str("1.2.3".to_string()),
            OscArg::Int(1024),
        ]);

        assert!(changed);
        assert_eq!(identity.name.as_deref(), Some("Board1"));
        assert_eq!(identity.serial_number, Some(42));
        assert_eq!(identity.ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(identity.firmware_version.as_deref(), Some("1.2.3"));
        assert_eq!(identity.free_memory, Some(1024));
    }

    #[test]
    fn reapplying_identical_info_reports_no_change() {
        let args = [
            OscArg::Str("Board1".to_string()),
            OscArg::Int(42),
            OscArg::Str("10.0.0.5".to_string()),
        ];
        let mut identity = BoardIdentity::default();
        assert!(identity.apply_info_a(&args));
        assert!(!identity.apply_info_a(&args));
    }

    #[test]
    fn short_info_updates_fewer_fields() {
        let mut identity = BoardIdentity::default();
        let changed = identity.apply_info_a(&[OscArg::Str("Tiny".to_string())]);

        assert!(changed);
        assert_eq!(identity.name.as_deref(), Some("Tiny"));
        assert_eq!(identity.serial_number, None);
        assert_eq!(identity.free_memory, None);
    }

    #[test]
    fn mistyped_position_is_skipped() {
        let mut identity = BoardIdentity::default();
        let changed = identity.apply_info_a(&[
            OscArg::Int(7), // name position expects a string
            OscArg::Int(42),
        ]);

        assert!(changed);
        assert_eq!(identity.name, None);
        assert_eq!(identity.serial_number, Some(42));
    }

    #[test]
    fn info_b_fills_network_config() {
        let mut identity = BoardIdentity::default();
        let changed = identity.apply_info_b(&[
            OscArg::Int(1),
            OscArg::Int(0),
            OscArg::Str("10.0.0.1".to_string()),
            OscArg::Str("255.255.255.0".to_string()),
            OscArg::Int(10000),
            OscArg::Int(10000),
        ]);

        assert!(changed);
        assert_eq!(identity.network.dhcp, Some(true));
        assert_eq!(identity.network.webserver_enabled, Some(false));
        assert_eq!(identity.network.gateway.as_deref(), Some("10.0.0.1"));
        assert_eq!(identity.network.netmask.as_deref(), Some("255.255.255.0"));
        assert_eq!(identity.network.listen_port, Some(10000));
        assert_eq!(identity.network.send_port, Some(10000));
    }
}
