pub const REMINDER_COLOUR: u32 = 0xFAA0A0;
pub const EIGHT_BALL_COLOUR: u32 = 0x3498DB;
pub const ERROR_COLOUR: u32 = 0xFF0000;
