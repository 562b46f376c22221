//! CSV boundary: reads submissions in, writes payment records out.

pub mod record_writer;
pub mod request_reader;
