use std::fmt;

/// Error while parsing a brush preset.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetError {
    /// A known key carried a value that could not be parsed.
    InvalidValue { line: usize, key: String, value: String },
    /// A non-comment line without `=`.
    MalformedLine { line: usize, text: String },
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::InvalidValue { line, key, value } => {
                write!(f, "line {}: invalid value {:?} for '{}'", line, value, key)
            }
            PresetError::MalformedLine { line, text } => {
                write!(f, "line {}: expected key=value, got {:?}", line, text)
            }
        }
    }
}

impl std::error::Error for PresetError {}

/// Error while reading or writing a stroke recording.
#[derive(Debug)]
pub enum RecordingError {
    Io(std::io::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::Io(e) => write!(f, "I/O error: {}", e),
            RecordingError::Serialize(e) => write!(f, "Serialization error: {}", e),
            RecordingError::InvalidFormat(e) => write!(f, "Invalid format: {}", e),
        }
    }
}

impl std::error::Error for RecordingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RecordingError {
    fn from(e: std::io::Error) -> Self {
        RecordingError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for RecordingError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        RecordingError::Serialize(e.to_string())
    }
}

/// Error surfaced by the headless CLI.
#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Image(image::ImageError),
    Preset(PresetError),
    Recording(RecordingError),
    /// A `--stroke` / `--trace` argument that is not a list of `x,y` pairs.
    BadPoints(String),
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Image(e) => write!(f, "image error: {}", e),
            CliError::Preset(e) => write!(f, "preset error: {}", e),
            CliError::Recording(e) => write!(f, "recording error: {}", e),
            CliError::BadPoints(s) => write!(f, "cannot parse point list {:?} (expected \"x,y x,y ...\")", s),
            CliError::Usage(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<image::ImageError> for CliError {
    fn from(e: image::ImageError) -> Self {
        CliError::Image(e)
    }
}

impl From<PresetError> for CliError {
    fn from(e: PresetError) -> Self {
        CliError::Preset(e)
    }
}

impl From<RecordingError> for CliError {
    fn from(e: RecordingError) -> Self {
        CliError::Recording(e)
    }
}
