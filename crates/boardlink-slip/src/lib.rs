//! SLIP framing for board byte links.
//!
//! Turns an unreliable serial/USB byte stream into discrete frames using
//! `END`/`ESC` byte stuffing. The incremental [`SlipDecoder`] survives
//! arbitrary read boundaries; [`SlipReader`] and [`SlipWriter`] adapt any
//! blocking `Read`/`Write` stream.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{encode_frame, Frame, SlipDecoder, END, ESC, ESC_END, ESC_ESC};
pub use error::{FrameError, Result};
pub use reader::{SlipReader, DEFAULT_MAX_FRAME};
pub use writer::SlipWriter;
