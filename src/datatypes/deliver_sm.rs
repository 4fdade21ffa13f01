use crate::codec::{
    decode_cstring, decode_octets, decode_u8, encode_cstring, encode_u8, CodecError, Decodable,
    Encodable, PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, DataCoding, EsmClass, NumericPlanIndicator, TypeOfNumber,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

const SERVICE_TYPE_SIZE: usize = 6;
const ADDRESS_SIZE: usize = 21;
const TIME_SIZE: usize = 17;

/// message_payload TLV tag, used by some SMSCs instead of short_message
const MESSAGE_PAYLOAD_TAG: u16 = 0x0424;

/// This operation is used by the SMSC to deliver a short message to an ESME.
/// The deliver_sm PDU is used to deliver both mobile originated messages and
/// delivery receipts from the SMSC to the ESME.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,

    /// 4.3.4 source_addr: Address of SME which originated this message.
    pub source_addr: String,

    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,

    /// 4.3.7 destination_addr: Destination address of this short message.
    pub destination_addr: String,

    /// 4.3.8 esm_class: Message Type bits mark delivery receipts.
    pub esm_class: EsmClass,

    pub protocol_id: u8,
    pub priority_flag: u8,
    pub registered_delivery: u8,
    pub data_coding: DataCoding,

    /// 4.3.18 short_message: message user data. For delivery receipts this
    ///        holds the receipt text (`id:... stat:...`). Filled from the
    ///        message_payload TLV when sm_length is zero.
    pub short_message: Bytes,
}

impl DeliverSm {
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
            registered_delivery: 0,
            data_coding: DataCoding::default(),
            short_message,
        }
    }

    /// Builds an SMSC delivery receipt carrying `text`
    pub fn receipt(sequence_number: u32, text: &str) -> Self {
        let mut pdu = Self::new(sequence_number, "", "", Bytes::copy_from_slice(text.as_bytes()));
        pdu.esm_class = EsmClass::from_byte(0x04);
        pdu
    }

    /// Message body decoded as text; invalid UTF-8 is replaced rather than rejected
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.short_message).into_owned()
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class.is_delivery_receipt()
    }
}

impl Encodable for DeliverSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.short_message.len() > u8::MAX as usize {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!("{} octets does not fit sm_length", self.short_message.len()),
            });
        }

        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::DeliverSm,
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
        // schedule_delivery_time and validity_period are unused in deliver_sm
        encode_cstring(buf, "", TIME_SIZE);
        encode_cstring(buf, "", TIME_SIZE);
        encode_u8(buf, self.registered_delivery);
        encode_u8(buf, 0); // replace_if_present_flag
        encode_u8(buf, self.data_coding.to_byte());
        encode_u8(buf, 0); // sm_default_msg_id
        encode_u8(buf, self.short_message.len() as u8);
        buf.put_slice(&self.short_message);

        Ok(())
    }
}

impl Decodable for DeliverSm {
    fn command_id() -> CommandId {
        CommandId::DeliverSm
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
        decode_cstring(buf, TIME_SIZE, "schedule_delivery_time")?;
        decode_cstring(buf, TIME_SIZE, "validity_period")?;
        let registered_delivery = decode_u8(buf, "registered_delivery")?;
        decode_u8(buf, "replace_if_present_flag")?;
        let data_coding = DataCoding::from_byte(decode_u8(buf, "data_coding")?);
        decode_u8(buf, "sm_default_msg_id")?;
        let sm_length = decode_u8(buf, "sm_length")?;
        let mut short_message = decode_octets(buf, sm_length as usize, "short_message")?;

        if let Some(payload) = find_message_payload(buf)? {
            if short_message.is_empty() {
                short_message = payload;
            }
        }

        Ok(DeliverSm {
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
            registered_delivery,
            data_coding,
            short_message,
        })
    }
}

/// Walks the optional TLVs and returns the message_payload value, if any.
fn find_message_payload(buf: &mut Cursor<&[u8]>) -> Result<Option<Bytes>, CodecError> {
    let mut payload = None;

    while buf.remaining() >= 4 {
        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        let value = decode_octets(buf, length, "tlv_value")?;
        if tag == MESSAGE_PAYLOAD_TAG {
            payload = Some(value);
        }
    }

    // Trailing garbage shorter than a TLV header
    buf.advance(buf.remaining());
    Ok(payload)
}

/// deliver_sm_resp: message_id is unused and always empty
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32, command_status: CommandStatus) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::DeliverSmResp,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf)?;
        encode_u8(buf, 0); // empty message_id
        Ok(())
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        buf.advance(buf.remaining());

        Ok(DeliverSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}
