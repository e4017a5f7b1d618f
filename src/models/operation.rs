use serde::{Deserialize, Serialize};

/// Kind of AI operation requested by the resume builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Extract structured resume data from raw text.
    Parse,
    /// Rewrite a resume section for impact.
    Enhance,
    /// Produce a professional summary.
    Summarize,
    /// Bucket free-form skills into categories.
    Categorize,
    /// Score a resume against a job description.
    Match,
    /// Generate a cover letter.
    Generate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 6] = [
        Self::Parse,
        Self::Enhance,
        Self::Summarize,
        Self::Categorize,
        Self::Match,
        Self::Generate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Enhance => "enhance",
            Self::Summarize => "summarize",
            Self::Categorize => "categorize",
            Self::Match => "match",
            Self::Generate => "generate",
        }
    }

    /// Whether hybrid tiers may split this operation between the cost and
    /// quality providers. Everything else goes to the quality provider.
    pub fn is_hybrid_eligible(&self) -> bool {
        matches!(self, Self::Parse | Self::Categorize | Self::Summarize)
    }

    /// Pinned operations always run on the quality provider, overriding
    /// the tier policy. Cover-letter generation is user-facing prose where
    /// output quality dominates cost.
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Generate)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token counts reported by a provider for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl TokenUsage {
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// Request payload handed to a provider adapter.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub kind: OperationKind,
    /// User-supplied input (resume text, section content, job description).
    pub input: String,
}

impl CompletionRequest {
    pub fn new(kind: OperationKind, input: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
        }
    }
}

/// Result of a provider call, before usage accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    /// Model that actually served the request, as reported by the provider.
    pub model: String,
}
