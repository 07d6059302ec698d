//! Discovery of notebook-export notifications and their download links.

mod links;
mod scanner;

pub use links::{DownloadLinks, LinkExtractor};
pub use scanner::{filename_from_subject, Candidate, CandidateFailure, InboxScanner};
