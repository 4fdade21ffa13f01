use crate::codec::{
    decode_cstring, decode_octets, decode_u8, encode_cstring, encode_u8, CodecError, Decodable,
    Encodable, PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, TypeOfNumber,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

// SMPP v3.4 field sizes including the NULL terminator
const SERVICE_TYPE_SIZE: usize = 6;
const ADDRESS_SIZE: usize = 21;
const TIME_SIZE: usize = 17;
const MESSAGE_ID_SIZE: usize = 65;

/// Largest short_message the sm_length octet can describe
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// This operation is used by an ESME to submit a short message to the SMSC for onward transmission
/// to a specified short message entity (SME).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 4.1.1 service_type: SMS application service associated with the message.
    ///       Empty for the SMSC default.
    pub service_type: String,

    /// 4.1.2 source_addr_ton: Type of Number for source address.
    pub source_addr_ton: TypeOfNumber,

    /// 4.1.3 source_addr_npi: Numbering Plan Indicator for source address.
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.1.4 source_addr: Address of SME which originated this message.
    ///       Max length: 20 octets (21 with null terminator).
    pub source_addr: String,

    /// 4.1.5 dest_addr_ton: Type of Number for destination address.
    pub dest_addr_ton: TypeOfNumber,

    /// 4.1.6 dest_addr_npi: Numbering Plan Indicator for destination address.
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.1.7 destination_addr: Destination address of this short message.
    ///       Max length: 20 octets (21 with null terminator).
    pub destination_addr: String,

    /// 4.1.8 esm_class: Message Mode and Message Type. UDHI is set when the
    ///       short_message starts with a concatenation header.
    pub esm_class: EsmClass,

    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,

    /// 4.1.13 registered_delivery: bit 0 requests an SMSC delivery receipt.
    pub registered_delivery: u8,

    pub replace_if_present_flag: u8,

    /// 4.1.15 data_coding: encoding scheme of the short message user data.
    pub data_coding: DataCoding,

    pub sm_default_msg_id: u8,

    /// 4.1.18 short_message: Up to 254 octets of user data, including any UDH.
    ///        sm_length is derived from it on the wire.
    pub short_message: Bytes,
}

impl SubmitSm {
    /// Creates a submit_sm with every optional field at its SMSC default
    pub fn new(
        sequence_number: u32,
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
        short_message: Bytes,
    ) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.into(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: destination_addr.into(),
            esm_class: EsmClass::default(),
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: DataCoding::default(),
            sm_default_msg_id: 0,
            short_message,
        }
    }

    /// Validates field lengths that would otherwise be silently truncated
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!(
                    "{} octets exceeds maximum of {MAX_SHORT_MESSAGE_LENGTH}",
                    self.short_message.len()
                ),
            });
        }
        if self.source_addr.len() >= ADDRESS_SIZE {
            return Err(CodecError::FieldValidation {
                field: "source_addr",
                reason: format!("exceeds maximum length of {}", ADDRESS_SIZE - 1),
            });
        }
        if self.destination_addr.len() >= ADDRESS_SIZE {
            return Err(CodecError::FieldValidation {
                field: "destination_addr",
                reason: format!("exceeds maximum length of {}", ADDRESS_SIZE - 1),
            });
        }
        Ok(())
    }
}

impl Encodable for SubmitSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;

        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::SubmitSm,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;

        encode_cstring(buf, &self.service_type, SERVICE_TYPE_SIZE);
        encode_u8(buf, self.source_addr_ton.into());
        encode_u8(buf, self.source_addr_npi.into());
        encode_cstring(buf, &self.source_addr, ADDRESS_SIZE);
        encode_u8(buf, self.dest_addr_ton.into());
        encode_u8(buf, self.dest_addr_npi.into());
        encode_cstring(buf, &self.destination_addr, ADDRESS_SIZE);
        encode_u8(buf, self.esm_class.to_byte());
        encode_u8(buf, self.protocol_id);
        encode_u8(buf, self.priority_flag);
        encode_cstring(buf, &self.schedule_delivery_time, TIME_SIZE);
        encode_cstring(buf, &self.validity_period, TIME_SIZE);
        encode_u8(buf, self.registered_delivery);
        encode_u8(buf, self.replace_if_present_flag);
        encode_u8(buf, self.data_coding.to_byte());
        encode_u8(buf, self.sm_default_msg_id);
        encode_u8(buf, self.short_message.len() as u8);
        buf.put_slice(&self.short_message);

        Ok(())
    }
}

impl Decodable for SubmitSm {
    fn command_id() -> CommandId {
        CommandId::SubmitSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let service_type = decode_cstring(buf, SERVICE_TYPE_SIZE, "service_type")?;
        let source_addr_ton =
            TypeOfNumber::try_from(decode_u8(buf, "source_addr_ton")?).unwrap_or_default();
        let source_addr_npi =
            NumericPlanIndicator::try_from(decode_u8(buf, "source_addr_npi")?).unwrap_or_default();
        let source_addr = decode_cstring(buf, ADDRESS_SIZE, "source_addr")?;
        let dest_addr_ton =
            TypeOfNumber::try_from(decode_u8(buf, "dest_addr_ton")?).unwrap_or_default();
        let dest_addr_npi =
            NumericPlanIndicator::try_from(decode_u8(buf, "dest_addr_npi")?).unwrap_or_default();
        let destination_addr = decode_cstring(buf, ADDRESS_SIZE, "destination_addr")?;
        let esm_class = EsmClass::from_byte(decode_u8(buf, "esm_class")?);
        let protocol_id = decode_u8(buf, "protocol_id")?;
        let priority_flag = decode_u8(buf, "priority_flag")?;
        let schedule_delivery_time = decode_cstring(buf, TIME_SIZE, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, TIME_SIZE, "validity_period")?;
        let registered_delivery = decode_u8(buf, "registered_delivery")?;
        let replace_if_present_flag = decode_u8(buf, "replace_if_present_flag")?;
        let data_coding = DataCoding::from_byte(decode_u8(buf, "data_coding")?);
        let sm_default_msg_id = decode_u8(buf, "sm_default_msg_id")?;
        let sm_length = decode_u8(buf, "sm_length")?;
        let short_message = decode_octets(buf, sm_length as usize, "short_message")?;

        // Optional TLVs are not interpreted
        buf.advance(buf.remaining());

        Ok(SubmitSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
        })
    }
}

/// submit_sm_resp: carries the SMSC assigned message id. Rejected
/// submissions may come back with no body at all.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::SubmitSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;
        encode_cstring(buf, &self.message_id, MESSAGE_ID_SIZE);
        Ok(())
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = if buf.has_remaining() {
            decode_cstring(buf, MESSAGE_ID_SIZE, "message_id")?
        } else {
            String::new()
        };
        buf.advance(buf.remaining());

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    fn concatenated_part() -> SubmitSm {
        let mut payload = vec![0x05, 0x00, 0x03, 0x2A, 0x02, 0x01];
        payload.extend_from_slice(b"first part");

        let mut pdu = SubmitSm::new(77, "Shop", "447700900123", Bytes::from(payload));
        pdu.source_addr_ton = TypeOfNumber::Alphanumeric;
        pdu.source_addr_npi = NumericPlanIndicator::Isdn;
        pdu.dest_addr_ton = TypeOfNumber::International;
        pdu.dest_addr_npi = NumericPlanIndicator::Isdn;
        pdu.esm_class = EsmClass::default().with_udhi();
        pdu
    }

    #[test]
    fn submit_sm_wire_layout() {
        let pdu = concatenated_part();
        let bytes = pdu.to_bytes().unwrap();

        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x04]);
        assert_eq!(&bytes[12..16], &77u32.to_be_bytes());

        // service_type NULL, then source TON/NPI
        assert_eq!(bytes[16], 0x00);
        assert_eq!(bytes[17], 0x05);
        assert_eq!(bytes[18], 0x01);
        assert_eq!(&bytes[19..24], b"Shop\0");

        // sm_length followed by the payload closes the PDU
        let sm_length = bytes[bytes.len() - pdu.short_message.len() - 1];
        assert_eq!(sm_length as usize, pdu.short_message.len());
        assert!(bytes.ends_with(b"first part"));

        match Frame::parse(&bytes).unwrap() {
            Frame::SubmitSm(decoded) => assert_eq!(*decoded, pdu),
            other => panic!("Expected SubmitSm, got {other:?}"),
        }
    }

    #[test]
    fn oversized_short_message_is_rejected() {
        let pdu = SubmitSm::new(1, "src", "dst", Bytes::from(vec![b'x'; 255]));
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldValidation { field: "short_message", .. })
        ));
    }

    #[test]
    fn long_destination_is_rejected() {
        let pdu = SubmitSm::new(1, "src", "123456789012345678901", Bytes::from_static(b"hi"));
        assert!(matches!(
            pdu.validate(),
            Err(CodecError::FieldValidation { field: "destination_addr", .. })
        ));
    }

    #[test]
    fn submit_sm_resp_with_message_id() {
        let resp = SubmitSmResponse::new(12, "0A1B2C");
        let bytes = resp.to_bytes().unwrap();
        assert_eq!(bytes.len(), 16 + 7);

        match Frame::parse(&bytes).unwrap() {
            Frame::SubmitSmResp(decoded) => {
                assert_eq!(decoded.message_id, "0A1B2C");
                assert_eq!(decoded.sequence_number, 12);
            }
            other => panic!("Expected SubmitSmResp, got {other:?}"),
        }
    }

    #[test]
    fn throttled_response_without_body() {
        let data = [
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x04, // submit_sm_resp
            0x00, 0x00, 0x00, 0x58, // throttling error
            0x00, 0x00, 0x00, 0x05, // sequence_number
        ];

        match Frame::parse(&data).unwrap() {
            Frame::SubmitSmResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::ThrottlingError);
                assert!(resp.message_id.is_empty());
            }
            other => panic!("Expected SubmitSmResp, got {other:?}"),
        }
    }
}
