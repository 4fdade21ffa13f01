// ABOUTME: SMPP esm_class bitfield with the flags the gateway reads and writes
// ABOUTME: Covers the UDHI feature bit on submissions and the delivery receipt type on deliveries

/// Bit 6: UDHI (User Data Header Indicator)
const UDHI_FLAG: u8 = 0b0100_0000;
/// Bits 5-2 value 0001 marks an SMSC delivery receipt in deliver_sm
const DELIVERY_RECEIPT_TYPE: u8 = 0b0000_0100;
const MESSAGE_TYPE_MASK: u8 = 0b0011_1100;

/// ESM (External Short Message) Class bitfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct EsmClass(u8);

impl EsmClass {
    pub fn from_byte(value: u8) -> Self {
        EsmClass(value)
    }

    pub fn to_byte(&self) -> u8 {
        self.0
    }

    /// Adds UDHI (User Data Header Indicator) feature
    pub fn with_udhi(self) -> Self {
        EsmClass(self.0 | UDHI_FLAG)
    }

    /// The short_message starts with a user data header
    pub fn has_udhi(&self) -> bool {
        self.0 & UDHI_FLAG != 0
    }

    /// deliver_sm carries an SMSC delivery receipt rather than an MO message
    pub fn is_delivery_receipt(&self) -> bool {
        self.0 & MESSAGE_TYPE_MASK == DELIVERY_RECEIPT_TYPE
    }
}
