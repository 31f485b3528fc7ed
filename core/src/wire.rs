//! STK500v1 wire constants shared by the frame parser and the dispatcher.

/// End-of-packet sentinel terminating every host→device frame.
pub const EOP: u8 = 0x20;

/// Success envelope opens with this byte.
pub const INSYNC: u8 = 0x14;
/// Success envelope closes with this byte.
pub const OK: u8 = 0x10;
/// Failure envelope: `INSYNC` followed by this byte.
pub const FAILED: u8 = 0x11;
/// Emitted alone (no `INSYNC`) on a framing error.
pub const NOSYNC: u8 = 0x15;

pub mod cmd {
    pub const GET_SYNC: u8 = 0x30;
    pub const GET_SIGN_ON: u8 = 0x31;
    pub const SET_PARAMETER: u8 = 0x40;
    pub const GET_PARAMETER: u8 = 0x41;
    pub const SET_DEVICE: u8 = 0x42;
    pub const SET_DEVICE_EXT: u8 = 0x45;
    pub const ENTER_PROGMODE: u8 = 0x50;
    pub const LEAVE_PROGMODE: u8 = 0x51;
    pub const CHIP_ERASE: u8 = 0x52;
    pub const CHECK_AUTOINC: u8 = 0x53;
    pub const LOAD_ADDRESS: u8 = 0x55;
    pub const UNIVERSAL: u8 = 0x56;
    pub const PROG_PAGE: u8 = 0x64;
    pub const READ_PAGE: u8 = 0x74;
    pub const READ_SIGN: u8 = 0x75;
}

/// Fixed total frame length (cmd byte through trailing EOP, inclusive) for
/// every command except PROG_PAGE, whose length depends on its
/// length-prefixed body.
pub fn fixed_frame_len(command: u8) -> Option<usize> {
    use cmd::*;
    Some(match command {
        GET_SYNC => 2,
        GET_SIGN_ON => 2,
        SET_PARAMETER => 4,
        GET_PARAMETER => 3,
        SET_DEVICE => 22,
        SET_DEVICE_EXT => 7,
        ENTER_PROGMODE => 2,
        LEAVE_PROGMODE => 2,
        CHIP_ERASE => 2,
        CHECK_AUTOINC => 2,
        LOAD_ADDRESS => 4,
        UNIVERSAL => 6,
        READ_PAGE => 5,
        READ_SIGN => 2,
        _ => return None,
    })
}
