use super::{SettingDescriptor, SettingError, SettingType, SettingValue, SettingsRegistry};
use crate::block::Decoding;

/// Line terminator detected from the first line of a loaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    LF,
    CRLF,
}

impl LineEnding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::LF => "lf",
            LineEnding::CRLF => "crlf",
        }
    }
}

/// Buffer-local options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferOptions {
    /// Display width of a tab stop
    pub tab_width: usize,
    /// Line ending used when saving
    pub line_ending: LineEnding,
    /// How bytes are grouped into characters
    pub decoding: Decoding,
    /// Refuse every mutation
    pub read_only: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        BufferOptions {
            tab_width: 8,
            line_ending: LineEnding::LF,
            decoding: Decoding::Utf8,
            read_only: false,
        }
    }
}

fn set_tab_width(options: &mut BufferOptions, value: SettingValue) -> Result<(), SettingError> {
    match value {
        SettingValue::Integer(n) => {
            options.tab_width = n;
            Ok(())
        }
        _ => Err(SettingError::ValidationError(
            "Expected integer".to_string(),
        )),
    }
}

fn set_line_ending(options: &mut BufferOptions, value: SettingValue) -> Result<(), SettingError> {
    match value {
        SettingValue::Enum(s) => match s {
            "lf" | "unix" => {
                options.line_ending = LineEnding::LF;
                Ok(())
            }
            "crlf" | "dos" => {
                options.line_ending = LineEnding::CRLF;
                Ok(())
            }
            _ => Err(SettingError::ValidationError(format!(
                "Invalid line ending: {s}. Expected 'lf' or 'crlf'"
            ))),
        },
        _ => Err(SettingError::ValidationError(
            "Expected enum value for line ending".to_string(),
        )),
    }
}

fn set_decoding(options: &mut BufferOptions, value: SettingValue) -> Result<(), SettingError> {
    match value {
        SettingValue::Enum("utf-8") => {
            options.decoding = Decoding::Utf8;
            Ok(())
        }
        SettingValue::Enum("bytes") => {
            options.decoding = Decoding::Bytes;
            Ok(())
        }
        other => Err(SettingError::ValidationError(format!(
            "Invalid encoding: {other:?}"
        ))),
    }
}

fn set_read_only(options: &mut BufferOptions, value: SettingValue) -> Result<(), SettingError> {
    match value {
        SettingValue::Bool(b) => {
            options.read_only = b;
            Ok(())
        }
        _ => Err(SettingError::ValidationError(
            "Expected boolean".to_string(),
        )),
    }
}

/// Buffer-local settings
const BUFFER_SETTINGS: &[SettingDescriptor<BufferOptions>] = &[
    SettingDescriptor {
        name: "tab-width",
        aliases: &["ts", "tabstop"],
        ty: SettingType::Integer {
            min: Some(1),
            max: Some(8),
        },
        set: set_tab_width,
    },
    SettingDescriptor {
        name: "newline",
        aliases: &["ff", "fileformat"],
        ty: SettingType::Enum {
            variants: &["lf", "crlf", "unix", "dos"],
        },
        set: set_line_ending,
    },
    SettingDescriptor {
        name: "encoding",
        aliases: &["enc"],
        ty: SettingType::Enum {
            variants: &["utf-8", "bytes"],
        },
        set: set_decoding,
    },
    SettingDescriptor {
        name: "read-only",
        aliases: &["ro"],
        ty: SettingType::Boolean,
        set: set_read_only,
    },
];

#[must_use]
pub fn create_buffer_settings_registry() -> SettingsRegistry<BufferOptions> {
    SettingsRegistry::new(BUFFER_SETTINGS)
}
