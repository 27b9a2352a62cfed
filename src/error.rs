use std::io;

#[derive(Debug)]
pub enum GpxError {
    XmlParse(quick_xml::Error),
    Io(io::Error),
    /// The input contained no root element at all.
    EmptyDocument,
}

impl std::fmt::Display for GpxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XmlParse(e) => write!(f, "XML parse error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::EmptyDocument => write!(f, "document has no root element"),
        }
    }
}

impl std::error::Error for GpxError {}

impl From<quick_xml::Error> for GpxError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParse(e)
    }
}

impl From<io::Error> for GpxError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
