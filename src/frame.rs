use crate::error::{Error, Result};

use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::udp::{self, MutableUdpPacket};
use rand_core::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use std::net::Ipv4Addr;

const ETH_HEADER_SIZE: usize = 14;
const IPV4_HEADER_SIZE: usize = 20;
const UDP_HEADER_SIZE: usize = 8;

/// Size of the Ethernet + IPv4 + UDP headers prepended to every payload.
pub const HEADER_SIZE: usize = ETH_HEADER_SIZE + IPV4_HEADER_SIZE + UDP_HEADER_SIZE;
/// Largest payload that fits in a single IPv4 datagram.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - IPV4_HEADER_SIZE - UDP_HEADER_SIZE;

const TTL: u8 = 64;

/// The addresses and payload every generated frame is made of.
#[derive(Debug, Clone)]
pub struct FrameTemplate {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: Vec<u8>,
}

/// Fill a payload of `size` bytes with pseudo-random filler.
pub fn random_payload(size: usize, seed: Option<u64>) -> Vec<u8> {
    let mut rng = match seed {
        Some(s) => Pcg32::seed_from_u64(s),
        None => Pcg32::from_entropy(),
    };
    let mut payload = vec![0u8; size];
    rng.fill_bytes(&mut payload);
    payload
}

impl FrameTemplate {
    /// Total size on the wire of a frame built from this template.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Serializes wire-ready frames from a template.
///
/// Every call recomputes the lengths and checksums, so two calls on the same template
/// always produce byte-identical frames.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    template: FrameTemplate,
}

impl FrameBuilder {
    pub fn new(template: FrameTemplate) -> Self {
        FrameBuilder { template }
    }

    pub fn template(&self) -> &FrameTemplate {
        &self.template
    }

    /// Build a new frame.
    pub fn build(&self) -> Result<Vec<u8>> {
        let t = &self.template;
        if t.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: t.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let mut frame = vec![0u8; t.frame_len()];
        let ip_start = ETH_HEADER_SIZE;
        let udp_start = ip_start + IPV4_HEADER_SIZE;

        self.setup_ethernet_frame(&mut frame[..])
            .ok_or(Error::Serialize("Ethernet buffer too small"))?;
        self.setup_ip_packet(&mut frame[ip_start..])
            .ok_or(Error::Serialize("IPv4 buffer too small"))?;
        self.setup_udp_packet(&mut frame[udp_start..])
            .ok_or(Error::Serialize("UDP buffer too small"))?;
        Ok(frame)
    }

    fn setup_ethernet_frame(&self, packet: &mut [u8]) -> Option<()> {
        let mut eth_packet = MutableEthernetPacket::new(packet)?;
        eth_packet.set_ethertype(EtherTypes::Ipv4);
        eth_packet.set_source(self.template.src_mac);
        eth_packet.set_destination(self.template.dst_mac);
        Some(())
    }

    fn setup_ip_packet(&self, packet: &mut [u8]) -> Option<()> {
        let len = packet.len();
        let mut ipv4_packet = MutableIpv4Packet::new(packet)?;
        ipv4_packet.set_version(4);
        ipv4_packet.set_header_length(5);
        ipv4_packet.set_total_length(len as u16);
        ipv4_packet.set_ttl(TTL);
        ipv4_packet.set_next_level_protocol(IpNextHeaderProtocols::Udp);
        ipv4_packet.set_source(self.template.src_ip);
        ipv4_packet.set_destination(self.template.dst_ip);
        ipv4_packet.set_checksum(ipv4::checksum(&ipv4_packet.to_immutable()));
        Some(())
    }

    fn setup_udp_packet(&self, packet: &mut [u8]) -> Option<()> {
        let t = &self.template;
        let len = packet.len();
        let mut udp_packet = MutableUdpPacket::new(packet)?;
        udp_packet.set_source(t.src_port);
        udp_packet.set_destination(t.dst_port);
        udp_packet.set_length(len as u16);
        udp_packet.set_payload(&t.payload);
        udp_packet.set_checksum(udp::ipv4_checksum(
            &udp_packet.to_immutable(),
            &t.src_ip,
            &t.dst_ip,
        ));
        Some(())
    }
}
