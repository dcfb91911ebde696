use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::outputsink::OutputSink;
use crate::schedule::MAX_VALUE;

const UNIVERSE_SIZE: usize = 512;

/// Sends channel values to an OLA daemon as one DMX universe over OSC.
///
/// Channel `n` maps to DMX slot `n`. Values are duty percentages scaled to `0..=255`.
pub struct OlaOutput {
    sock: UdpSocket,
    target_addr: SocketAddr,
    osc_addr: String,
    buffer: Vec<u8>,
}

impl OlaOutput {
    pub fn new(target_addr: SocketAddr, universe: u16) -> io::Result<Self> {
        let our_addr = if target_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let sock = UdpSocket::bind(our_addr)?;

        Ok(OlaOutput {
            sock,
            target_addr,
            osc_addr: format!("/dmx/universe/{universe}"),
            buffer: vec![0; UNIVERSE_SIZE],
        })
    }

    fn flush(&self) {
        let msg_buf = match encoder::encode(&OscPacket::Message(OscMessage {
            addr: self.osc_addr.clone(),
            args: vec![OscType::Blob(self.buffer.clone())],
        })) {
            Ok(msg_buf) => msg_buf,
            Err(err) => {
                log::warn!("Cannot encode DMX frame: {err}");
                return;
            }
        };

        if let Err(err) = self.sock.send_to(&msg_buf, self.target_addr) {
            log::warn!("Cannot send DMX frame to {}: {err}", self.target_addr);
        }
    }
}

fn percent_to_dmx(value: u8) -> u8 {
    let value = u32::from(value.min(MAX_VALUE));
    ((value * 255 + u32::from(MAX_VALUE) / 2) / u32::from(MAX_VALUE)) as u8
}

impl OutputSink for OlaOutput {
    fn set(&mut self, channel: u8, value: u8) {
        self.buffer[usize::from(channel)] = percent_to_dmx(value);
        self.flush();
    }
}
