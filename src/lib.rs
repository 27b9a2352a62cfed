//! Editing support for GPX waypoint comments: an XML document tree that
//! round-trips with its formatting intact, the OZI Explorer comment
//! sanitizer, and the table/edit-session view-model the terminal UI renders.

pub mod document;
pub mod error;
pub mod gpx;
pub mod sanitize;
pub mod session;

pub use error::GpxError;
pub use gpx::{CommitOutcome, GpxFile, WptRow, XML_DECLARATION};
pub use sanitize::{MAX_COMMENT_CHARS, ozi_str};
pub use session::EditSession;
