// ── Remote button table ──
//
// The full code space a controller may send. Codes outside this table
// are legal on the wire and surface as "unknown command".

use serde::Serialize;
use strum::Display;

/// Section of the remote a button belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum ButtonGroup {
    Streaming,
    Basic,
    Navigation,
    #[strum(serialize = "D-Pad")]
    #[serde(rename = "D-Pad")]
    DPad,
    Playback,
    Digits,
    Colors,
    Advanced,
    Smart,
    System,
    Gaming,
    Picture,
    Audio,
    Connectivity,
}

macro_rules! buttons {
    ($( $group:ident { $( $variant:ident = $code:literal => $name:literal ),+ $(,)? } )+) => {
        /// A named remote button.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Button {
            $( $( $variant, )+ )+
        }

        impl Button {
            /// Every button, in code order.
            pub const ALL: &'static [Button] = &[ $( $( Button::$variant, )+ )+ ];

            /// Wire code of this button.
            pub const fn code(self) -> u8 {
                match self {
                    $( $( Button::$variant => $code, )+ )+
                }
            }

            /// Display name shown to observers.
            pub const fn name(self) -> &'static str {
                match self {
                    $( $( Button::$variant => $name, )+ )+
                }
            }

            pub const fn group(self) -> ButtonGroup {
                match self {
                    $( $( Button::$variant => ButtonGroup::$group, )+ )+
                }
            }

            /// Look up a wire code. Anything above 0xFF is unknown.
            pub const fn from_code(code: u32) -> Option<Self> {
                match code {
                    $( $( $code => Some(Button::$variant), )+ )+
                    _ => None,
                }
            }
        }
    };
}

buttons! {
    Streaming {
        YouTube = 0x01 => "YouTube",
        Netflix = 0x02 => "Netflix",
        AmazonPrime = 0x03 => "Amazon Prime",
        HboMax = 0x04 => "HBO Max",
    }
    Basic {
        Power = 0x10 => "Power",
        VolumeUp = 0x11 => "Volume Up",
        VolumeDown = 0x12 => "Volume Down",
        Mute = 0x13 => "Mute",
        ChannelUp = 0x14 => "Channel Up",
        ChannelDown = 0x15 => "Channel Down",
    }
    Navigation {
        Home = 0x20 => "Home",
        Menu = 0x21 => "Menu",
        Back = 0x22 => "Back",
        Exit = 0x23 => "Exit",
        Options = 0x24 => "Options",
        Input = 0x25 => "Input",
        Source = 0x26 => "Source",
    }
    DPad {
        Up = 0x30 => "Up",
        Down = 0x31 => "Down",
        Left = 0x32 => "Left",
        Right = 0x33 => "Right",
        Ok = 0x34 => "OK",
        Enter = 0x35 => "Enter",
    }
    Playback {
        Play = 0x40 => "Play",
        Pause = 0x41 => "Pause",
        Stop = 0x42 => "Stop",
        FastForward = 0x43 => "Fast Forward",
        Rewind = 0x44 => "Rewind",
        Record = 0x45 => "Record",
    }
    Digits {
        Digit0 = 0x50 => "0",
        Digit1 = 0x51 => "1",
        Digit2 = 0x52 => "2",
        Digit3 = 0x53 => "3",
        Digit4 = 0x54 => "4",
        Digit5 = 0x55 => "5",
        Digit6 = 0x56 => "6",
        Digit7 = 0x57 => "7",
        Digit8 = 0x58 => "8",
        Digit9 = 0x59 => "9",
        Dash = 0x5A => "Dash",
    }
    Colors {
        Red = 0x60 => "Red",
        Green = 0x61 => "Green",
        Yellow = 0x62 => "Yellow",
        Blue = 0x63 => "Blue",
    }
    Advanced {
        Info = 0x70 => "Info",
        Guide = 0x71 => "Guide",
        Settings = 0x72 => "Settings",
        ClosedCaptions = 0x73 => "CC",
        Subtitles = 0x74 => "Subtitles",
        Sap = 0x75 => "SAP",
        AudioTrack = 0x76 => "Audio",
        Sleep = 0x77 => "Sleep",
        PictureMode = 0x78 => "Picture Mode",
        Aspect = 0x79 => "Aspect",
        Zoom = 0x7A => "Zoom",
        PictureSize = 0x7B => "P.Size",
    }
    Smart {
        Voice = 0x80 => "Voice",
        Mic = 0x81 => "Mic",
        LiveTv = 0x82 => "Live TV",
        Stream = 0x83 => "Stream",
    }
    System {
        Display = 0x90 => "Display",
        Status = 0x91 => "Status",
        Help = 0x92 => "Help",
        EManual = 0x93 => "E-Manual",
    }
    Gaming {
        GameMode = 0xA0 => "Game Mode",
    }
    Picture {
        Motion = 0xB0 => "Motion",
        Backlight = 0xB1 => "Backlight",
        Brightness = 0xB2 => "Brightness",
    }
    Audio {
        SoundMode = 0xC0 => "Sound Mode",
        Sync = 0xC1 => "Sync",
        SoundOutput = 0xC2 => "Sound Output",
    }
    Connectivity {
        MultiView = 0xD0 => "Multi View",
        Pip = 0xD1 => "PIP",
        ScreenMirror = 0xD2 => "Screen Mirror",
    }
}

const DIGIT_BASE: u8 = 0x50;

/// Short forms accepted on the command line, already normalized.
const ALIASES: &[(&str, Button)] = &[
    ("volup", Button::VolumeUp),
    ("voldown", Button::VolumeDown),
    ("chup", Button::ChannelUp),
    ("chdown", Button::ChannelDown),
    ("prime", Button::AmazonPrime),
    ("amazon", Button::AmazonPrime),
    ("hbo", Button::HboMax),
    ("game", Button::GameMode),
    ("ff", Button::FastForward),
    ("rec", Button::Record),
    ("psize", Button::PictureSize),
    ("manual", Button::EManual),
];

impl Button {
    /// Digit value for the 0-9 keys.
    pub fn digit(self) -> Option<u8> {
        let code = self.code();
        (DIGIT_BASE..DIGIT_BASE + 10)
            .contains(&code)
            .then(|| code - DIGIT_BASE)
    }

    /// Resolve a user-typed button name.
    ///
    /// Case, spaces, dashes, underscores and dots are ignored, so
    /// `volume-up`, `Volume Up` and `VOLUME_UP` all match.
    pub fn from_name(input: &str) -> Option<Self> {
        let wanted = normalize(input);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|b| normalize(b.name()) == wanted)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == wanted)
                    .map(|(_, b)| *b)
            })
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse a button argument into a wire code.
///
/// Accepts hex (`0x10`), a button name or alias (`power`, `vol_up`,
/// `5`), or a decimal code (`16`). Single digits resolve to the digit
/// keys, not to codes 0-9. Unknown codes are allowed through; only
/// unparseable input is rejected.
pub fn parse_code(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(button) = Button::from_name(trimmed) {
        return Some(u32::from(button.code()));
    }
    trimmed.parse::<u32>().ok()
}
