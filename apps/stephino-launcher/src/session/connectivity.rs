/// Answers "does this host think it is online".
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Online when at least one non-loopback interface is up.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceConnectivity;

impl Connectivity for InterfaceConnectivity {
    fn is_online(&self) -> bool {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces.iter().any(|iface| !iface.is_loopback()),
            Err(err) => {
                tracing::warn!(
                    target: "stephino::session",
                    error = %err,
                    "unable to enumerate network interfaces; assuming online"
                );
                true
            }
        }
    }
}

/// Fixed answer, for tests and `--skip-online-check`.
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> bool {
        self.0
    }
}
