// ABOUTME: SMPP data coding scheme covering the alphabets the gateway selects between
// ABOUTME: Maps the wire data_coding octet to a typed value and back

/// Data coding scheme of a short message's user data.
///
/// The gateway itself only ever emits `SmscDefault` (plain ASCII text sent as
/// the SMSC default alphabet) and `Ucs2`, but inbound PDUs may carry any
/// value, so the rest decode into their own variants or `Custom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet (typically GSM 7-bit)
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII encoding
    Ascii,
    /// 8-bit binary data (no encoding)
    Binary,
    /// Latin-1 (ISO-8859-1) character set
    Latin1,
    /// UCS-2 (ISO/IEC-10646) Unicode encoding
    Ucs2,
    /// Custom/reserved data coding value
    Custom(u8),
}

impl DataCoding {
    /// Creates a DataCoding from a raw u8 value
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 | 0x04 => DataCoding::Binary,
            0x03 => DataCoding::Latin1,
            0x08 => DataCoding::Ucs2,
            _ => DataCoding::Custom(value),
        }
    }

    /// Returns the raw u8 value for wire protocol
    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::Latin1 => 0x03,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Custom(value) => *value,
        }
    }

    /// Returns true if the user data is UCS-2 (two octets per character)
    pub fn is_ucs2(&self) -> bool {
        matches!(self, DataCoding::Ucs2)
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        DataCoding::from_byte(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_round_trip() {
        for value in [0x00, 0x01, 0x02, 0x03, 0x08] {
            assert_eq!(DataCoding::from_byte(value).to_byte(), value);
        }
    }

    #[test]
    fn unknown_values_are_custom() {
        assert_eq!(DataCoding::from_byte(0xF5), DataCoding::Custom(0xF5));
        assert_eq!(DataCoding::from_byte(0xF5).to_byte(), 0xF5);
    }

    #[test]
    fn ucs2_detection() {
        assert!(DataCoding::Ucs2.is_ucs2());
        assert!(!DataCoding::default().is_ucs2());
    }
}
