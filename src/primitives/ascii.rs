//! Symbolic names for ASCII control codes
//!
//! Used to describe keys in user-facing messages, e.g. `ETB - End of
//! transmission block (23)`.

/// Human readable name of an ASCII control code, if it has one.
pub fn control_name(code: u32) -> Option<&'static str> {
    let name = match code {
        0x00 => "NUL - Null",
        0x01 => "SOH - Start of heading, console interrupt",
        0x02 => "STX - Start of text",
        0x03 => "ETX - End of text",
        0x04 => "EOT - End of transmission",
        0x05 => "ENQ - Enquiry, goes with ACK flow control",
        0x06 => "ACK - Acknowledgement",
        0x07 => "BEL - Bell",
        0x08 => "BS - Backspace",
        0x09 => "HT - Horizontal tab",
        0x0a => "NL - New line",
        0x0b => "VT - Vertical tab",
        0x0c => "FF - Form feed",
        0x0d => "CR - Carriage return",
        0x0e => "SO - Shift-out, begin alternate character set",
        0x0f => "SI - Shift-in, resume default character set",
        0x10 => "DLE - Data-link escape",
        0x11 => "DC1 - XON, for flow control",
        0x12 => "DC2 - Device control 2, block-mode flow control",
        0x13 => "DC3 - XOFF, for flow control",
        0x14 => "DC4 - Device control 4",
        0x15 => "NAK - Negative acknowledgement",
        0x16 => "SYN - Synchronous idle",
        0x17 => "ETB - End of transmission block",
        0x18 => "CAN - Cancel",
        0x19 => "EM - End of medium",
        0x1a => "SUB - Substitute",
        0x1b => "ESC - Escape",
        0x1c => "FS - File separator",
        0x1d => "GS - Group separator",
        0x1e => "RS - Record separator, block-mode terminator",
        0x1f => "US - Unit separator",
        0x20 => "SP - Space",
        0x7f => "DEL - Delete",
        _ => return None,
    };
    Some(name)
}

pub const BEL: char = '\x07';
pub const ETX: char = '\x03';
pub const EOT: char = '\x04';
pub const HT: char = '\t';
pub const NL: char = '\n';
pub const CR: char = '\r';
pub const DC2: char = '\x12';
pub const ESC: char = '\x1b';
pub const DEL: char = '\x7f';
