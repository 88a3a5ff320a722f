//! NTPv4 client-mode packet header
//!
//! The fixed 48-byte header exchanged with an NTP server. Only the fields a
//! client-mode exchange needs are interpreted; everything is carried so a
//! parsed response can be re-serialized bit-exactly.

use crate::ntp::NtpTimestamp;

/// Size of the fixed NTP header on the wire.
pub const PACKET_LEN: usize = 48;

/// Leap-indicator "unknown", version 4, mode 3 (client).
const LI_VN_MODE_CLIENT: u8 = 0x23;

/// A fixed-size NTPv4 packet header, all multi-byte fields big-endian on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NtpPacketHeader {
    /// Leap indicator, version number, and association mode, packed 2:3:3.
    pub li_vn_mode: u8,
    /// Server stratum; zero is unsynchronized and must be rejected.
    pub stratum: u8,
    /// Log2 of the poll interval in seconds.
    pub poll: i8,
    /// Log2 of the clock resolution in seconds; negative for sub-second.
    pub precision: i8,
    /// Total round-trip delay to the reference clock (16.16 fixed point).
    pub root_delay: u32,
    /// Dispersion relative to the reference clock (16.16 fixed point).
    pub root_dispersion: u32,
    /// Reference clock identifier.
    pub reference_id: u32,
    /// Time the server clock was last set or corrected.
    pub reference: NtpTimestamp,
    /// Time the request left the client, echoed by the server.
    pub originate: NtpTimestamp,
    /// Time the request arrived at the server.
    pub receive: NtpTimestamp,
    /// Time the response left the server (or the request left the client).
    pub transmit: NtpTimestamp,
}

impl NtpPacketHeader {
    /// A fresh client request with all timestamp fields zeroed.
    ///
    /// The caller stamps [`NtpPacketHeader::transmit`] immediately before
    /// sending; `precision` describes the local tick resolution.
    pub const fn client_request(precision: i8) -> Self {
        NtpPacketHeader {
            li_vn_mode: LI_VN_MODE_CLIENT,
            stratum: 0,
            poll: 0,
            precision,
            root_delay: 0,
            root_dispersion: 0,
            reference_id: 0,
            reference: NtpTimestamp::ZERO,
            originate: NtpTimestamp::ZERO,
            receive: NtpTimestamp::ZERO,
            transmit: NtpTimestamp::ZERO,
        }
    }

    /// Decode a header from its wire representation.
    pub fn from_bytes(b: &[u8; PACKET_LEN]) -> Self {
        NtpPacketHeader {
            li_vn_mode: b[0],
            stratum: b[1],
            poll: b[2] as i8,
            precision: b[3] as i8,
            root_delay: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            root_dispersion: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
            reference_id: u32::from_be_bytes([b[12], b[13], b[14], b[15]]),
            reference: NtpTimestamp::from_bytes([
                b[16], b[17], b[18], b[19], b[20], b[21], b[22], b[23],
            ]),
            originate: NtpTimestamp::from_bytes([
                b[24], b[25], b[26], b[27], b[28], b[29], b[30], b[31],
            ]),
            receive: NtpTimestamp::from_bytes([
                b[32], b[33], b[34], b[35], b[36], b[37], b[38], b[39],
            ]),
            transmit: NtpTimestamp::from_bytes([
                b[40], b[41], b[42], b[43], b[44], b[45], b[46], b[47],
            ]),
        }
    }

    /// Encode the header into its wire representation.
    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut b = [0u8; PACKET_LEN];
        b[0] = self.li_vn_mode;
        b[1] = self.stratum;
        b[2] = self.poll as u8;
        b[3] = self.precision as u8;
        b[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        b[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        b[12..16].copy_from_slice(&self.reference_id.to_be_bytes());
        b[16..24].copy_from_slice(&self.reference.to_bytes());
        b[24..32].copy_from_slice(&self.originate.to_bytes());
        b[32..40].copy_from_slice(&self.receive.to_bytes());
        b[40..48].copy_from_slice(&self.transmit.to_bytes());
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured server response used throughout the time tests.
    const RESPONSE: [u8; PACKET_LEN] = [
        0x24, 0x03, 0x03, 0xea, 0x00, 0x00, 0x11, 0x1d, 0x00, 0x00, 0x11, 0xcb, 0x32, 0x74, 0x26,
        0x9d, 0xd6, 0xd1, 0xc5, 0x6c, 0x55, 0x49, 0x1f, 0x0a, 0xd6, 0x6d, 0xd9, 0x01, 0xbf, 0xf4,
        0x00, 0x00, 0xd6, 0xd1, 0xc8, 0xda, 0xfc, 0x61, 0x70, 0x5f, 0xd6, 0xd1, 0xc8, 0xda, 0xfc,
        0x65, 0x26, 0x4f,
    ];

    #[test]
    fn decodes_server_response() {
        let pkt = NtpPacketHeader::from_bytes(&RESPONSE);
        assert_eq!(pkt.li_vn_mode, 0x24); // version 4, mode 4 (server)
        assert_eq!(pkt.stratum, 3);
        assert_eq!(pkt.poll, 3);
        assert_eq!(pkt.precision, -22);
        assert_eq!(pkt.root_delay, 0x0000_111d);
        assert_eq!(pkt.root_dispersion, 0x0000_11cb);
        assert_eq!(pkt.reference_id, 0x3274_269d);
        assert_eq!(
            pkt.originate,
            NtpTimestamp::from_fixed(15_451_244_498_116_673_536)
        );
        assert_eq!(
            pkt.receive,
            NtpTimestamp::from_fixed(15_479_374_237_111_775_327)
        );
        assert_eq!(
            pkt.transmit,
            NtpTimestamp::from_fixed(15_479_374_237_112_018_511)
        );
    }

    #[test]
    fn encode_decode_is_identity() {
        let pkt = NtpPacketHeader::from_bytes(&RESPONSE);
        assert_eq!(pkt.to_bytes(), RESPONSE);
    }

    #[test]
    fn client_request_shape() {
        let pkt = NtpPacketHeader::client_request(-15);
        assert_eq!(pkt.li_vn_mode, 0x23); // version 4, mode 3 (client)
        assert_eq!(pkt.stratum, 0);
        assert_eq!(pkt.precision, -15);
        assert_eq!(pkt.transmit, NtpTimestamp::ZERO);
        let bytes = pkt.to_bytes();
        assert_eq!(bytes[0], 0x23);
        assert_eq!(bytes[3], (-15i8) as u8);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }
}
