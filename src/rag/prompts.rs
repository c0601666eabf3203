//! Prompt templates for grounded queries.
//!
//! A template may contain the literal token `{selected_file}`, which is
//! replaced with the names of the files the query is scoped to. No other
//! placeholder syntax is recognised, so templates can contain JSON braces.

use std::{fmt, str::FromStr};

/// Token replaced with the comma-separated selected file names.
pub const SELECTED_FILE_TOKEN: &str = "{selected_file}";

/// Answer strictly from the indexed documents.
pub const RAG_BASE_PROMPT: &str = "You are an intelligent assistant that answers questions based \
strictly on the provided documents. Do not use external or prior knowledge. If the answer cannot \
be found in the documents, say so clearly.";

/// Extract bibliographic metadata from one document as a JSON object.
pub const DOCUMENT_METADATA_PROMPT: &str = r#"You already possess the document {selected_file} that contains all the information needed to answer the following questions.
Extract the following fields ONLY from that document; do not invent facts.

Return ONE JSON object with exactly these keys and types:
- "title": string (not the file name; the title as it appears on the first page of the document)
- "organization": array of strings (the organizations that wrote the document)
- "summary": string (4-6 sentences capturing the essentials, suitable for one spreadsheet cell)
- "main themes": array of up to 10 short theme phrases (ranked by prominence; do not pad with guesses)

Rules:
- Base your answer ONLY on the provided content; do not rely on outside knowledge.
- If a field is not present, set it to null (or [] for arrays).
- Preserve the document's original title (do not translate it); the "summary" must be in English.
- Output VALID JSON and NOTHING ELSE (no markdown fences, no prose, no citations like [doc1])."#;

/// Check one document against four policy challenges, one short summary or
/// null per challenge.
pub const POLICY_CHALLENGES_PROMPT: &str = r#"You already possess the document {selected_file} that contains all the information needed to answer the following questions.

Below are concise definitions of four challenges that motivate a new Biotechnology Act:

- VC (Access to Capital): Biotech requires large upfront funding for long R&D, trials, regulation, and scale-up; early bootstrapping helps, but VC/PE/strategic capital typically catalyze growth and Europe faces persistent risk-capital gaps and foreign exits.
- Clusters (Biotech clusters & technology centers): Co-located hubs concentrate talent, infrastructure, and investment, enabling public-private partnerships, sector specialization, shared services (regulatory/funding/market access), and internationalization.
- Skills (Reskilling & upskilling): Biomanufacturing needs deep process expertise (e.g., fermentation, molecular methods) plus cross-cutting data/AI, sustainability, systems thinking, and entrepreneurship; agile VET/HE and lifelong learning are critical.
- AI/data (Use of data & AI): AI (incl. GenAI) turns large scientific/process datasets into gains across discovery, engineering, and operations (e.g., target ID, CRISPR guide design, digital twins), with outcomes dependent on data quality, validation, and governance.

TASK: For each challenge, check whether the document makes a substantive reference to it. If yes, return a MAXIMUM TWO-SENTENCE English summary of how the document addresses that challenge (what it says, proposes, or evidences). If not present, set the value to null.

Return ONE JSON object with EXACTLY these keys (values are either a string of at most 2 sentences or null):
{
  "VC": <string or null>,
  "clusters": <string or null>,
  "skills": <string or null>,
  "AI/data": <string or null>
}

Rules:
- Base your answer ONLY on the provided content; do not rely on outside knowledge.
- Do not invent facts; if uncertain, use null.
- Output VALID JSON and NOTHING ELSE (no markdown fences, no prose, no citations)."#;

/// Built-in prompt templates, selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptKind {
    #[default]
    Base,
    DocumentMetadata,
    PolicyChallenges,
}

impl PromptKind {
    pub fn template(&self) -> &'static str {
        match self {
            Self::Base => RAG_BASE_PROMPT,
            Self::DocumentMetadata => DOCUMENT_METADATA_PROMPT,
            Self::PolicyChallenges => POLICY_CHALLENGES_PROMPT,
        }
    }

    /// Whether the template asks for a JSON object.
    pub fn expects_json(&self) -> bool {
        !matches!(self, Self::Base)
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::DocumentMetadata => write!(f, "document-metadata"),
            Self::PolicyChallenges => write!(f, "policy-challenges"),
        }
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "document-metadata" | "metadata" => Ok(Self::DocumentMetadata),
            "policy-challenges" | "challenges" => Ok(Self::PolicyChallenges),
            other => Err(format!(
                "unknown prompt '{}', expected 'base', 'document-metadata' or \
                 'policy-challenges'",
                other
            )),
        }
    }
}

/// Fill `{selected_file}` with the selected names joined by `", "`.
///
/// Templates without the token are returned unchanged.
pub fn render_prompt<S: AsRef<str>>(template: &str, selected_files: &[S]) -> String {
    if !template.contains(SELECTED_FILE_TOKEN) {
        return template.to_string();
    }
    let joined = selected_files
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    template.replace(SELECTED_FILE_TOKEN, &joined)
}
