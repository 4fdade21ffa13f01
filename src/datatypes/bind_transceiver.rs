use crate::codec::{
    decode_cstring, decode_u8, encode_cstring, encode_u8, CodecError, Decodable, Encodable,
    PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber,
};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

// SMPP v3.4 field sizes including the NULL terminator
const SYSTEM_ID_SIZE: usize = 16;
const PASSWORD_SIZE: usize = 9;
const SYSTEM_TYPE_SIZE: usize = 13;
const ADDRESS_RANGE_SIZE: usize = 41;

/// BindTransceiver is used to bind a transceiver ESME to the SMSC.
/// A transceiver ESME can both send and receive messages through a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id: identification of the ESME requesting to bind,
    ///       up to 15 characters.
    pub system_id: String,

    /// 5.2.2 password: used by the SMSC to authenticate the ESME, up to 8
    ///       characters. Empty when the SMSC needs no password.
    pub password: String,

    /// 5.2.3 system_type: categorises the type of ESME that is binding
    ///       (e.g. "VMS", "OTA"), up to 12 characters.
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served via this session.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es).
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: range of SME addresses serviced by the ESME.
    pub address_range: String,
}

impl BindTransceiver {
    pub fn new(
        sequence_number: u32,
        system_id: impl Into<String>,
        password: impl Into<String>,
        system_type: impl Into<String>,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            password: password.into(),
            system_type: system_type.into(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// SMSC identifier. Empty when the SMSC rejected the bind with a
    /// header-only response.
    pub system_id: String,
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0, // fixed up by to_bytes
            command_id: CommandId::BindTransceiver,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.system_id, SYSTEM_ID_SIZE);
        encode_cstring(buf, &self.password, PASSWORD_SIZE);
        encode_cstring(buf, &self.system_type, SYSTEM_TYPE_SIZE);
        encode_u8(buf, self.interface_version.into());
        encode_u8(buf, self.addr_ton.into());
        encode_u8(buf, self.addr_npi.into());
        encode_cstring(buf, &self.address_range, ADDRESS_RANGE_SIZE);

        Ok(())
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(buf, SYSTEM_ID_SIZE, "system_id")?;
        let password = decode_cstring(buf, PASSWORD_SIZE, "password")?;
        let system_type = decode_cstring(buf, SYSTEM_TYPE_SIZE, "system_type")?;
        let interface_version = InterfaceVersion::try_from(decode_u8(buf, "interface_version")?)
            .unwrap_or_default();
        let addr_ton = TypeOfNumber::try_from(decode_u8(buf, "addr_ton")?).unwrap_or_default();
        let addr_npi =
            NumericPlanIndicator::try_from(decode_u8(buf, "addr_npi")?).unwrap_or_default();
        let address_range = decode_cstring(buf, ADDRESS_RANGE_SIZE, "address_range")?;

        Ok(BindTransceiver {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::BindTransceiverResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;
        encode_cstring(buf, &self.system_id, SYSTEM_ID_SIZE);
        Ok(())
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = if buf.has_remaining() {
            decode_cstring(buf, SYSTEM_ID_SIZE, "system_id")?
        } else {
            String::new()
        };

        // sc_interface_version TLV is not used
        buf.advance(buf.remaining());

        Ok(BindTransceiverResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    #[test]
    fn bind_transceiver_wire_layout() {
        let bind = BindTransceiver::new(1, "smpp", "secret", "");
        let bytes = bind.to_bytes().unwrap();

        // 16 header + "smpp\0" + "secret\0" + "\0" + 3 octets + "\0"
        assert_eq!(bytes.len(), 16 + 5 + 7 + 1 + 3 + 1);
        assert_eq!(&bytes[0..4], &(bytes.len() as u32).to_be_bytes());
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x09]);
        assert_eq!(&bytes[16..21], b"smpp\0");
        assert_eq!(&bytes[21..28], b"secret\0");
        assert_eq!(bytes[29], 0x34);

        match Frame::parse(&bytes).unwrap() {
            Frame::BindTransceiver(decoded) => assert_eq!(decoded, bind),
            other => panic!("Expected BindTransceiver, got {other:?}"),
        }
    }

    #[test]
    fn long_credentials_are_truncated() {
        let bind = BindTransceiver::new(1, "a-very-long-system-id", "password123", "");
        let bytes = bind.to_bytes().unwrap();

        match Frame::parse(&bytes).unwrap() {
            Frame::BindTransceiver(decoded) => {
                assert_eq!(decoded.system_id, "a-very-long-sys");
                assert_eq!(decoded.password, "password");
            }
            other => panic!("Expected BindTransceiver, got {other:?}"),
        }
    }

    #[test]
    fn rejected_bind_response_without_body() {
        let data = [
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x09, // bind_transceiver_resp
            0x00, 0x00, 0x00, 0x0E, // invalid password
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];

        match Frame::parse(&data).unwrap() {
            Frame::BindTransceiverResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::InvalidPassword);
                assert!(resp.system_id.is_empty());
            }
            other => panic!("Expected BindTransceiverResp, got {other:?}"),
        }
    }

    #[test]
    fn bind_response_skips_tlvs() {
        let mut data = vec![0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x09];
        data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
        data.extend_from_slice(b"SMSC\0");
        data.extend_from_slice(&[0x02, 0x10, 0x00, 0x01, 0x34]); // sc_interface_version
        let length = data.len() as u32;
        data[0..4].copy_from_slice(&length.to_be_bytes());

        match Frame::parse(&data).unwrap() {
            Frame::BindTransceiverResp(resp) => assert_eq!(resp.system_id, "SMSC"),
            other => panic!("Expected BindTransceiverResp, got {other:?}"),
        }
    }
}
