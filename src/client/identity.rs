//! Machine identity used as the request `UUID`

use uuid::Uuid;

const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Stable identifier for this machine
///
/// Derived from the OS machine id when one is available, so every client on
/// the same host reports the same UUID. Falls back to a random UUID.
pub fn machine_uuid() -> String {
    MACHINE_ID_PATHS
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .and_then(|raw| uuid_from_machine_id(&raw))
        .unwrap_or_else(Uuid::new_v4)
        .to_string()
}

fn uuid_from_machine_id(raw: &str) -> Option<Uuid> {
    let id = raw.trim();
    if id.is_empty() {
        return None;
    }
    Some(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_id_is_stable() {
        let a = uuid_from_machine_id("4c4c4544004d3510\n").unwrap();
        let b = uuid_from_machine_id("4c4c4544004d3510").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_blank_machine_id() {
        assert!(uuid_from_machine_id("  \n").is_none());
    }

    #[test]
    fn test_machine_uuid_parses() {
        assert!(Uuid::parse_str(&machine_uuid()).is_ok());
    }
}
