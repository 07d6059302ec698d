use serde::Serialize;

/// What happened to one inbox candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Success {
        message_id: String,
        filename: String,
        pdf_file_id: String,
        txt_file_id: Option<String>,
    },
    /// Another candidate in the same batch already carried this name.
    Skipped {
        message_id: String,
        filename: String,
        reason: String,
    },
    Error {
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        error: String,
    },
}

impl CandidateOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            CandidateOutcome::Success { message_id, .. }
            | CandidateOutcome::Skipped { message_id, .. }
            | CandidateOutcome::Error { message_id, .. } => message_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CandidateOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CandidateOutcome::Skipped { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CandidateOutcome::Error { .. })
    }
}

/// What happened to one text artifact in a distill batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DistillOutcome {
    Success {
        original_txt: String,
        md_file_id: String,
        archived_as: String,
    },
    Error {
        original_txt: String,
        error: String,
    },
}

impl DistillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DistillOutcome::Success { .. })
    }
}
