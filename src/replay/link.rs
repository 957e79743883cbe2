use crate::error::{Error, Result};

use pnet::datalink::{self, Channel, DataLinkSender, NetworkInterface};
use std::io;

/// Anything frames can be sent to
pub trait FrameSender {
    /// Send one complete link-layer frame. Blocks until the frame is handed to the system.
    fn send(&mut self, frame: &[u8]) -> Result<()>;
}

pub fn find_interface_by_name(name: &str) -> Option<NetworkInterface> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
}

/// Raw Ethernet channel bound to one interface. Opening it usually requires privileges.
pub struct InterfaceSender {
    name: String,
    tx: Box<dyn DataLinkSender>,
}

impl InterfaceSender {
    pub fn bind(name: &str) -> Result<Self> {
        let iface = find_interface_by_name(name)
            .ok_or_else(|| Error::Interface(format!("no interface named \"{name}\"")))?;
        log::debug!("Binding to {} ({:?})", iface.name, iface.mac);
        match datalink::channel(&iface, Default::default()) {
            Ok(Channel::Ethernet(tx, _)) => Ok(InterfaceSender {
                name: iface.name,
                tx,
            }),
            Ok(_) => Err(Error::Interface(format!("{name}: not an Ethernet channel"))),
            Err(e) => Err(Error::Interface(format!("{name}: {e}"))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FrameSender for InterfaceSender {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        match self.tx.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(Error::Transport(e)),
            None => Err(Error::Transport(io::Error::new(
                io::ErrorKind::Other,
                "the frame could not be sent",
            ))),
        }
    }
}
