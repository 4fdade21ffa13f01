// ABOUTME: Chooses GSM default or UCS-2 encoding for a text and splits it into submit_sm parts
// ABOUTME: Multi-part messages get a 6-octet concatenation UDH; only the last part is correlated

use crate::client::error::{SmppError, SmppResult};
use crate::client::types::SubmitParams;
use crate::datatypes::{DataCoding, EsmClass};
use bytes::{BufMut, Bytes, BytesMut};

/// Concatenated SM information element: IEI 0x00, 8-bit reference
const UDH_CONCAT_8BIT: [u8; 3] = [0x05, 0x00, 0x03];
const UDH_LENGTH: usize = 6;
const MAX_PARTS: usize = 255;

/// registered_delivery value requesting an SMSC delivery receipt
const RECEIPT_REQUESTED: u8 = 0x01;

/// Character encoding selected for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Plain ASCII sent as the SMSC default alphabet, one octet per character
    Gsm7,
    /// UTF-16BE, two octets per BMP character
    Ucs2,
}

impl Encoding {
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() {
            Encoding::Gsm7
        } else {
            Encoding::Ucs2
        }
    }

    /// Largest payload that fits a single, unsegmented submit_sm
    pub fn max_single_length(self) -> usize {
        match self {
            Encoding::Gsm7 => 160,
            Encoding::Ucs2 => 140,
        }
    }

    /// Payload budget of each part once a UDH is present
    pub fn part_length(self) -> usize {
        match self {
            Encoding::Gsm7 => 153,
            Encoding::Ucs2 => 134,
        }
    }

    pub fn data_coding(self) -> DataCoding {
        match self {
            Encoding::Gsm7 => DataCoding::SmscDefault,
            Encoding::Ucs2 => DataCoding::Ucs2,
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Gsm7 => text.as_bytes().to_vec(),
            Encoding::Ucs2 => encode_ucs2(text),
        }
    }
}

/// Big-endian UTF-16. Characters outside the BMP become surrogate pairs.
pub fn encode_ucs2(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// One submit_sm worth of user data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// UDH (when concatenated) followed by this part's slice of the text
    pub payload: Bytes,
    /// Sequence number the part must be sent with; 0 for uncorrelated parts
    pub sequence_number: u32,
    pub requests_receipt: bool,
    /// The payload starts with a UDH and esm_class must carry UDHI
    pub concatenated: bool,
}

/// How one message goes out on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPlan {
    pub encoding: Encoding,
    pub part_length: usize,
    pub max_single_length: usize,
    pub segments: Vec<Segment>,
}

impl SegmentPlan {
    /// submit_sm fields for one of this plan's segments
    pub fn submit_params(&self, segment: &Segment) -> SubmitParams {
        let mut esm_class = EsmClass::default();
        if segment.concatenated {
            esm_class = esm_class.with_udhi();
        }

        SubmitParams {
            esm_class,
            registered_delivery: if segment.requests_receipt {
                RECEIPT_REQUESTED
            } else {
                0
            },
            data_coding: self.encoding.data_coding(),
            ..SubmitParams::default()
        }
    }

    pub fn is_concatenated(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Plans `text` for `domain_id` with a random concatenation reference
pub fn plan(domain_id: u32, text: &str) -> SmppResult<SegmentPlan> {
    plan_with_reference(domain_id, text, rand::random())
}

/// Plans `text` for `domain_id`, using `reference` as the UDH reference id
/// shared by all parts.
///
/// A message that fits in one submit_sm goes out unsegmented, correlated by
/// `domain_id` and requesting a receipt. Otherwise every part carries a UDH
/// and only the final part is correlated and requests a receipt.
pub fn plan_with_reference(domain_id: u32, text: &str, reference: u8) -> SmppResult<SegmentPlan> {
    let encoding = Encoding::for_text(text);
    let encoded = encoding.encode(text);
    let part_length = encoding.part_length();
    let max_single_length = encoding.max_single_length();

    if encoded.len() <= max_single_length {
        return Ok(SegmentPlan {
            encoding,
            part_length,
            max_single_length,
            segments: vec![Segment {
                payload: Bytes::from(encoded),
                sequence_number: domain_id,
                requests_receipt: true,
                concatenated: false,
            }],
        });
    }

    let count = encoded.len().div_ceil(part_length);
    if count > MAX_PARTS {
        return Err(SmppError::InvalidData(format!(
            "message needs {count} parts, at most {MAX_PARTS} are possible"
        )));
    }

    let segments = encoded
        .chunks(part_length)
        .enumerate()
        .map(|(index, chunk)| {
            let number = index + 1;
            let last = number == count;

            let mut payload = BytesMut::with_capacity(UDH_LENGTH + chunk.len());
            payload.put_slice(&UDH_CONCAT_8BIT);
            payload.put_u8(reference);
            payload.put_u8(count as u8);
            payload.put_u8(number as u8);
            payload.put_slice(chunk);

            Segment {
                payload: payload.freeze(),
                sequence_number: if last { domain_id } else { 0 },
                requests_receipt: last,
                concatenated: true,
            }
        })
        .collect();

    Ok(SegmentPlan {
        encoding,
        part_length,
        max_single_length,
        segments,
    })
}
