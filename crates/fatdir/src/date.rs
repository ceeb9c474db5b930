/// Pack a calendar date as `(year - 1980) << 9 | month << 5 | day`.
///
/// Years before 1980 clamp to 1980.
pub const fn dos_date(year: u16, month: u8, day: u8) -> u16 {
    let year = if year < 1980 { 0 } else { year - 1980 };
    ((year & 0x7f) << 9) | (((month & 0x0f) as u16) << 5) | (day & 0x1f) as u16
}

/// Pack a wall-clock time with two-second resolution.
pub const fn dos_time(hour: u8, minute: u8, second: u8) -> u16 {
    (((hour & 0x1f) as u16) << 11) | (((minute & 0x3f) as u16) << 5) | ((second / 2) & 0x1f) as u16
}

pub const fn decode_dos_date(value: u16) -> (u16, u8, u8) {
    (1980 + (value >> 9), ((value >> 5) & 0x0f) as u8, (value & 0x1f) as u8)
}

pub const fn decode_dos_time(value: u16) -> (u8, u8, u8) {
    ((value >> 11) as u8, ((value >> 5) & 0x3f) as u8, ((value & 0x1f) * 2) as u8)
}
