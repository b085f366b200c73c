//! X keysym to evdev keycode translation, US layout.

// keysym ranges
const XK_SPACE: u32 = 0x0020;
const XK_APOSTROPHE: u32 = 0x0027;
const XK_COMMA: u32 = 0x002c;
const XK_MINUS: u32 = 0x002d;
const XK_PERIOD: u32 = 0x002e;
const XK_SLASH: u32 = 0x002f;
const XK_0: u32 = 0x0030;
const XK_9: u32 = 0x0039;
const XK_SEMICOLON: u32 = 0x003b;
const XK_EQUAL: u32 = 0x003d;
const XK_A: u32 = 0x0041;
const XK_Z: u32 = 0x005a;
const XK_BRACKETLEFT: u32 = 0x005b;
const XK_BACKSLASH: u32 = 0x005c;
const XK_BRACKETRIGHT: u32 = 0x005d;
const XK_GRAVE: u32 = 0x0060;
const XK_A_LOWER: u32 = 0x0061;
const XK_Z_LOWER: u32 = 0x007a;
const XK_BACKSPACE: u32 = 0xff08;
const XK_TAB: u32 = 0xff09;
const XK_LINEFEED: u32 = 0xff0a;
const XK_RETURN: u32 = 0xff0d;
const XK_ESCAPE: u32 = 0xff1b;
const XK_HOME: u32 = 0xff50;
const XK_LEFT: u32 = 0xff51;
const XK_UP: u32 = 0xff52;
const XK_RIGHT: u32 = 0xff53;
const XK_DOWN: u32 = 0xff54;
const XK_PAGE_UP: u32 = 0xff55;
const XK_PAGE_DOWN: u32 = 0xff56;
const XK_END: u32 = 0xff57;
const XK_INSERT: u32 = 0xff63;
const XK_F1: u32 = 0xffbe;
const XK_F10: u32 = 0xffc7;
const XK_F11: u32 = 0xffc8;
const XK_F12: u32 = 0xffc9;
const XK_SHIFT_L: u32 = 0xffe1;
const XK_SHIFT_R: u32 = 0xffe2;
const XK_CONTROL_L: u32 = 0xffe3;
const XK_CONTROL_R: u32 = 0xffe4;
const XK_CAPS_LOCK: u32 = 0xffe5;
const XK_META_L: u32 = 0xffe7;
const XK_META_R: u32 = 0xffe8;
const XK_ALT_L: u32 = 0xffe9;
const XK_ALT_R: u32 = 0xffea;
const XK_SUPER_L: u32 = 0xffeb;
const XK_SUPER_R: u32 = 0xffec;
const XK_ISO_LEVEL3_SHIFT: u32 = 0xfe03;
const XK_DELETE: u32 = 0xffff;

// evdev keycodes
const KEY_ESC: u32 = 1;
const KEY_1: u32 = 2;
const KEY_0: u32 = 11;
const KEY_MINUS: u32 = 12;
const KEY_EQUAL: u32 = 13;
const KEY_BACKSPACE: u32 = 14;
const KEY_TAB: u32 = 15;
const KEY_LEFTBRACE: u32 = 26;
const KEY_RIGHTBRACE: u32 = 27;
const KEY_ENTER: u32 = 28;
const KEY_LEFTCTRL: u32 = 29;
const KEY_SEMICOLON: u32 = 39;
const KEY_APOSTROPHE: u32 = 40;
const KEY_GRAVE: u32 = 41;
const KEY_LEFTSHIFT: u32 = 42;
const KEY_BACKSLASH: u32 = 43;
const KEY_COMMA: u32 = 51;
const KEY_DOT: u32 = 52;
const KEY_SLASH: u32 = 53;
const KEY_RIGHTSHIFT: u32 = 54;
const KEY_LEFTALT: u32 = 56;
const KEY_SPACE: u32 = 57;
const KEY_CAPSLOCK: u32 = 58;
const KEY_F1: u32 = 59;
const KEY_F11: u32 = 87;
const KEY_F12: u32 = 88;
const KEY_RIGHTCTRL: u32 = 97;
const KEY_RIGHTALT: u32 = 100;
const KEY_LINEFEED: u32 = 101;
const KEY_HOME: u32 = 102;
const KEY_UP: u32 = 103;
const KEY_PAGEUP: u32 = 104;
const KEY_LEFT: u32 = 105;
const KEY_RIGHT: u32 = 106;
const KEY_END: u32 = 107;
const KEY_DOWN: u32 = 108;
const KEY_PAGEDOWN: u32 = 109;
const KEY_INSERT: u32 = 110;
const KEY_DELETE: u32 = 111;
const KEY_LEFTMETA: u32 = 125;
const KEY_RIGHTMETA: u32 = 126;

// A..Z in keysym order; evdev scatters letters across keyboard rows
const LETTER_KEYCODES: [u32; 26] = [
    30, 48, 46, 32, 18, 33, 34, 35, 23, 36, 37, 38, 50, 49, 24, 25, 16, 19, 31, 20, 22, 47, 17,
    45, 21, 44,
];

// 1..9 then 0 on the top row
const DIGIT_KEYCODES: [u32; 10] = [KEY_0, KEY_1, 3, 4, 5, 6, 7, 8, 9, 10];

/// Translates an X keysym to an evdev keycode. Returns `None` for symbols
/// with no key on a US layout; callers drop those.
pub fn keycode_for_sym(sym: u32) -> Option<u32> {
    let code = match sym {
        XK_A..=XK_Z => LETTER_KEYCODES[(sym - XK_A) as usize],
        XK_A_LOWER..=XK_Z_LOWER => LETTER_KEYCODES[(sym - XK_A_LOWER) as usize],
        XK_0..=XK_9 => DIGIT_KEYCODES[(sym - XK_0) as usize],
        XK_SPACE => KEY_SPACE,
        XK_APOSTROPHE => KEY_APOSTROPHE,
        XK_COMMA => KEY_COMMA,
        XK_MINUS => KEY_MINUS,
        XK_PERIOD => KEY_DOT,
        XK_SLASH => KEY_SLASH,
        XK_SEMICOLON => KEY_SEMICOLON,
        XK_EQUAL => KEY_EQUAL,
        XK_BRACKETLEFT => KEY_LEFTBRACE,
        XK_BACKSLASH => KEY_BACKSLASH,
        XK_BRACKETRIGHT => KEY_RIGHTBRACE,
        XK_GRAVE => KEY_GRAVE,
        XK_BACKSPACE => KEY_BACKSPACE,
        XK_TAB => KEY_TAB,
        XK_LINEFEED => KEY_LINEFEED,
        XK_RETURN => KEY_ENTER,
        XK_ESCAPE => KEY_ESC,
        XK_HOME => KEY_HOME,
        XK_LEFT => KEY_LEFT,
        XK_UP => KEY_UP,
        XK_RIGHT => KEY_RIGHT,
        XK_DOWN => KEY_DOWN,
        XK_PAGE_UP => KEY_PAGEUP,
        XK_PAGE_DOWN => KEY_PAGEDOWN,
        XK_END => KEY_END,
        XK_INSERT => KEY_INSERT,
        XK_DELETE => KEY_DELETE,
        XK_F1..=XK_F10 => KEY_F1 + (sym - XK_F1),
        XK_F11 => KEY_F11,
        XK_F12 => KEY_F12,
        XK_SHIFT_L => KEY_LEFTSHIFT,
        XK_SHIFT_R => KEY_RIGHTSHIFT,
        XK_CONTROL_L => KEY_LEFTCTRL,
        XK_CONTROL_R => KEY_RIGHTCTRL,
        XK_CAPS_LOCK => KEY_CAPSLOCK,
        XK_META_L | XK_SUPER_L => KEY_LEFTMETA,
        XK_META_R | XK_SUPER_R => KEY_RIGHTMETA,
        XK_ALT_L => KEY_LEFTALT,
        XK_ALT_R | XK_ISO_LEVEL3_SHIFT => KEY_RIGHTALT,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_qwerty_rows() {
        assert_eq!(keycode_for_sym(u32::from(b'a')), Some(30));
        assert_eq!(keycode_for_sym(u32::from(b'A')), Some(30));
        assert_eq!(keycode_for_sym(u32::from(b'q')), Some(16));
        assert_eq!(keycode_for_sym(u32::from(b'z')), Some(44));
        assert_eq!(keycode_for_sym(u32::from(b'm')), Some(50));
    }

    #[test]
    fn digits_and_controls() {
        assert_eq!(keycode_for_sym(u32::from(b'1')), Some(KEY_1));
        assert_eq!(keycode_for_sym(u32::from(b'0')), Some(KEY_0));
        assert_eq!(keycode_for_sym(XK_RETURN), Some(KEY_ENTER));
        assert_eq!(keycode_for_sym(XK_ESCAPE), Some(KEY_ESC));
        assert_eq!(keycode_for_sym(XK_SHIFT_R), Some(KEY_RIGHTSHIFT));
    }

    #[test]
    fn function_key_range() {
        assert_eq!(keycode_for_sym(XK_F1), Some(KEY_F1));
        assert_eq!(keycode_for_sym(XK_F10), Some(KEY_F1 + 9));
        assert_eq!(keycode_for_sym(XK_F12), Some(KEY_F12));
    }

    #[test]
    fn unmapped_symbols_are_none() {
        assert_eq!(keycode_for_sym(0x00a9), None); // copyright sign
        assert_eq!(keycode_for_sym(0xfe20), None);
    }
}
