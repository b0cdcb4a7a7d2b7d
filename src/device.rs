use crate::error::{Error, Result};
use crate::sender::Transmit;

use pcap::{Active, Capture, Device};
use pnet::datalink;
use pnet::util::MacAddr;

const SEND_SNAPLEN: i32 = 1600;
const CAPTURE_SNAPLEN: i32 = 65536;
/// Read timeout of capture handles, so the capture loop can check the stop signal.
pub const CAPTURE_TIMEOUT_MS: i32 = 100;

/// Open an interface for raw frame injection.
pub fn open_injection(interface: &str) -> Result<Capture<Active>> {
    let capture = Capture::from_device(interface)?
        .snaplen(SEND_SNAPLEN)
        .promisc(true)
        .open()?;
    log::debug!("{interface} opened for injection");
    Ok(capture)
}

/// Open an interface for capture, only keeping the UDP traffic of `port`.
pub fn open_capture(interface: &str, port: u16, promisc: bool) -> Result<Capture<Active>> {
    let mut capture = Capture::from_device(interface)?
        .snaplen(CAPTURE_SNAPLEN)
        .promisc(promisc)
        .timeout(CAPTURE_TIMEOUT_MS)
        .open()?;
    let filter = format!("udp and port {port}");
    capture.filter(&filter, true)?;
    log::debug!("{interface} opened for capture with filter \"{filter}\"");
    Ok(capture)
}

/// The link-layer address of a named interface.
pub fn interface_mac(interface: &str) -> Result<MacAddr> {
    let iface = datalink::interfaces()
        .into_iter()
        .find(|i| i.name == interface)
        .ok_or_else(|| Error::UnknownInterface(interface.to_string()))?;
    iface
        .mac
        .ok_or_else(|| Error::NoLinkAddress(interface.to_string()))
}

/// Print the capture devices with their addresses.
pub fn list_devices() -> Result<()> {
    let devices = Device::list()?;
    if devices.is_empty() {
        log::warn!("No devices found");
    }
    for device in devices {
        println!("Name: {}", device.name);
        println!(
            "Description: {}",
            device.desc.as_deref().unwrap_or("(none)")
        );
        println!("Addresses:");
        for address in device.addresses {
            match address.netmask {
                Some(netmask) => println!("  IP: {}, Netmask: {netmask}", address.addr),
                None => println!("  IP: {}", address.addr),
            }
        }
        println!("-----------------------------------");
    }
    Ok(())
}

impl Transmit for Capture<Active> {
    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        self.sendpacket(frame).map_err(Error::Transmit)
    }
}
