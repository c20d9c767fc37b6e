use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewError;

/// Default block size of the random-access reader: 1 MiB.
pub const DEFAULT_UNIT_SIZE: usize = 1024 * 1024;
/// Deepest folder nesting the walker accepts before rejecting the archive.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 256;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Size of one cached block; reads are split on multiples of this value.
    pub unit_size: usize,
    /// Code page used for ANSI (non-Unicode) strings. `None` lets the archive
    /// backend pick its default.
    pub ansi_encoding: Option<AnsiEncoding>,
    pub max_folder_depth: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            unit_size: DEFAULT_UNIT_SIZE,
            ansi_encoding: None,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

impl OpenOptions {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.unit_size == 0 {
            return Err(ViewError::InvalidConfig("unit_size must be non-zero".into()));
        }
        if self.max_folder_depth == 0 {
            return Err(ViewError::InvalidConfig(
                "max_folder_depth must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

macro_rules! ansi_encodings {
    ($($variant:ident => $name:literal,)*) => {
        /// Named code pages accepted for ANSI string decoding.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum AnsiEncoding {
            $($variant,)*
        }

        impl AnsiEncoding {
            pub const ALL: &'static [AnsiEncoding] = &[$(AnsiEncoding::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(AnsiEncoding::$variant => $name,)*
                }
            }
        }
    };
}

ansi_encodings! {
    Utf8 => "utf8",
    Ascii => "ascii",
    Latin1 => "latin1",
    Armscii8 => "armscii8",
    Big5Hkscs => "big5hkscs",
    Cp437 => "cp437",
    Cp737 => "cp737",
    Cp775 => "cp775",
    Cp850 => "cp850",
    Cp852 => "cp852",
    Cp855 => "cp855",
    Cp856 => "cp856",
    Cp858 => "cp858",
    Cp860 => "cp860",
    Cp861 => "cp861",
    Cp862 => "cp862",
    Cp863 => "cp863",
    Cp864 => "cp864",
    Cp865 => "cp865",
    Cp866 => "cp866",
    Cp869 => "cp869",
    Cp922 => "cp922",
    Cp932 => "cp932",
    Cp936 => "cp936",
    Cp949 => "cp949",
    Cp950 => "cp950",
    Cp1046 => "cp1046",
    Cp1124 => "cp1124",
    Cp1125 => "cp1125",
    Cp1129 => "cp1129",
    Cp1133 => "cp1133",
    Cp1161 => "cp1161",
    Cp1162 => "cp1162",
    Cp1163 => "cp1163",
    EucJp => "eucjp",
    Gb18030 => "gb18030",
    Gbk => "gbk",
    GeorgianAcademy => "georgianacademy",
    GeorgianPs => "georgianps",
    HpRoman8 => "hproman8",
    Iso646Cn => "iso646cn",
    Iso646Jp => "iso646jp",
    Iso88591 => "iso88591",
    Iso88592 => "iso88592",
    Iso88593 => "iso88593",
    Iso88594 => "iso88594",
    Iso88595 => "iso88595",
    Iso88596 => "iso88596",
    Iso88597 => "iso88597",
    Iso88598 => "iso88598",
    Iso88599 => "iso88599",
    Iso885910 => "iso885910",
    Iso885911 => "iso885911",
    Iso885913 => "iso885913",
    Iso885914 => "iso885914",
    Iso885915 => "iso885915",
    Iso885916 => "iso885916",
    Koi8R => "koi8r",
    Koi8Ru => "koi8ru",
    Koi8T => "koi8t",
    Koi8U => "koi8u",
    MacCroatian => "maccroatian",
    MacCyrillic => "maccyrillic",
    MacGreek => "macgreek",
    MacIceland => "maciceland",
    Macintosh => "macintosh",
    MacRoman => "macroman",
    MacRomania => "macromania",
    MacThai => "macthai",
    MacTurkish => "macturkish",
    MacUkraine => "macukraine",
    Pt154 => "pt154",
    Rk1048 => "rk1048",
    ShiftJis => "shiftjis",
    Tcvn => "tcvn",
    Tis620 => "tis620",
    Viscii => "viscii",
    Windows874 => "windows874",
    Windows1250 => "windows1250",
    Windows1251 => "windows1251",
    Windows1252 => "windows1252",
    Windows1253 => "windows1253",
    Windows1254 => "windows1254",
    Windows1255 => "windows1255",
    Windows1256 => "windows1256",
    Windows1257 => "windows1257",
    Windows1258 => "windows1258",
}

impl fmt::Display for AnsiEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnsiEncoding {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AnsiEncoding::ALL
            .iter()
            .copied()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| ViewError::InvalidConfig(format!("unknown ANSI encoding: {s}")))
    }
}

impl TryFrom<String> for AnsiEncoding {
    type Error = ViewError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnsiEncoding> for String {
    fn from(value: AnsiEncoding) -> Self {
        value.name().to_owned()
    }
}

/// Parse a user-entered encoding name; an empty string means "unset".
pub fn parse_ansi_encoding(s: &str) -> crate::error::Result<Option<AnsiEncoding>> {
    if s.trim().is_empty() {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}
