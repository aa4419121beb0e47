//! Owning and talking to a well-known D-Bus name.

use interfaces::{Error, Interface, Plug, Result, Slot, apparmor, dbus, ensure_plug, ensure_slot};

const BUS: &str = "bus";
const NAME: &str = "name";

/// Longest name the bus daemon accepts.
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bus {
    Session,
    System,
}

impl Bus {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "session" => Some(Bus::Session),
            "system" => Some(Bus::System),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Bus::Session => "session",
            Bus::System => "system",
        }
    }
}

/// Check a well-known bus name: at least two dot-separated elements of
/// `[A-Za-z0-9_-]`, none starting with a digit.
fn valid_bus_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.starts_with('.') {
        return false;
    }
    let elements: Vec<&str> = name.split('.').collect();
    elements.len() >= 2
        && elements.iter().all(|element| {
            !element.is_empty()
                && !element.starts_with(|c: char| c.is_ascii_digit())
                && element
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Providing (slot) or using (plug) a well-known D-Bus name.
#[derive(Debug, Default)]
pub struct DBusName;

impl DBusName {
    /// Read and validate the `bus` and `name` attributes.
    fn endpoint<'a>(&self, attrs: &'a interfaces::Attributes) -> Result<(Bus, &'a str)> {
        let bus = attrs
            .get(BUS)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::sanitize(self.name(), "bus attribute must be set"))?;
        let bus = Bus::parse(bus).ok_or_else(|| {
            Error::sanitize(
                self.name(),
                format!("bus {bus:?} must be one of \"session\", \"system\""),
            )
        })?;
        let name = attrs
            .get(NAME)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::sanitize(self.name(), "name attribute must be set"))?;
        if !valid_bus_name(name) {
            return Err(Error::sanitize(self.name(), format!("invalid bus name {name:?}")));
        }
        Ok((bus, name))
    }

    /// Endpoint shared by both sides of a connection.
    fn shared_endpoint<'a>(&self, plug: &'a Plug, slot: &'a Slot) -> Result<(Bus, &'a str)> {
        let wanted = self.endpoint(&plug.attrs)?;
        let offered = self.endpoint(&slot.attrs)?;
        if wanted != offered {
            return Err(Error::sanitize(
                self.name(),
                format!(
                    "plug {plug} wants {} bus name {:?}, slot {slot} offers {} bus name {:?}",
                    wanted.0.as_str(),
                    wanted.1,
                    offered.0.as_str(),
                    offered.1
                ),
            ));
        }
        Ok(offered)
    }
}

impl Interface for DBusName {
    fn name(&self) -> &'static str {
        "dbus"
    }

    fn sanitize_plug(&self, plug: &mut Plug) -> Result<()> {
        ensure_plug(self.name(), plug)?;
        self.endpoint(&plug.attrs).map(|_| ())
    }

    fn sanitize_slot(&self, slot: &mut Slot) -> Result<()> {
        ensure_slot(self.name(), slot)?;
        self.endpoint(&slot.attrs).map(|_| ())
    }

    fn auto_connect(&self, _plug: &Plug, _slot: &Slot) -> bool {
        false
    }

    fn apparmor_permanent_slot(&self, spec: &mut apparmor::Scope<'_>, slot: &Slot) -> Result<()> {
        let (bus, name) = self.endpoint(&slot.attrs)?;
        spec.add_snippet(format!(
            "# Description: allow owning a name on DBus {bus} bus\n\
             dbus (bind) bus={bus} name={name},\n\
             dbus (receive, send) bus={bus} path=/org/freedesktop/DBus \
             interface=org.freedesktop.DBus peer=(name=org.freedesktop.DBus, label=unconfined),",
            bus = bus.as_str(),
        ));
        Ok(())
    }

    fn dbus_permanent_slot(&self, spec: &mut dbus::Scope<'_>, slot: &Slot) -> Result<()> {
        let (bus, name) = self.endpoint(&slot.attrs)?;
        if bus != Bus::System {
            return Ok(());
        }
        spec.add_snippet(format!(
            "<policy user=\"root\">\n  <allow own=\"{name}\"/>\n  \
             <allow send_destination=\"{name}\"/>\n</policy>"
        ));
        Ok(())
    }

    fn apparmor_connected_plug(
        &self,
        spec: &mut apparmor::Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        let (bus, name) = self.shared_endpoint(plug, slot)?;
        spec.add_snippet(format!(
            "# Description: allow talking to {name} on DBus {bus} bus\n\
             dbus (receive, send) bus={bus} peer=(name={name}, label=snap.{provider}.*),",
            bus = bus.as_str(),
            provider = slot.snap.name,
        ));
        Ok(())
    }

    fn apparmor_connected_slot(
        &self,
        spec: &mut apparmor::Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        let (bus, _) = self.shared_endpoint(plug, slot)?;
        spec.add_snippet(format!(
            "# Description: allow clients on DBus {bus} bus\n\
             dbus (receive, send) bus={bus} peer=(label=snap.{consumer}.*),",
            bus = bus.as_str(),
            consumer = plug.snap.name,
        ));
        Ok(())
    }

    fn dbus_connected_plug(
        &self,
        spec: &mut dbus::Scope<'_>,
        plug: &Plug,
        slot: &Slot,
    ) -> Result<()> {
        let (bus, name) = self.shared_endpoint(plug, slot)?;
        if bus != Bus::System {
            return Ok(());
        }
        spec.add_snippet(format!(
            "<policy context=\"default\">\n  <allow send_destination=\"{name}\"/>\n</policy>"
        ));
        Ok(())
    }
}
