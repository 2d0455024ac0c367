use serde::Deserialize;

/// Built-in banned terms, Spanish first, then English. Order decides which
/// term is reported when several match.
const BANNED_TERMS: &[&str] = &[
    "violencia",
    "odio",
    "desnudo",
    "sangre",
    "drogas",
    "cocaína",
    "pornografía",
    "asesinato",
    "terrorismo",
    "violence",
    "hatred",
    "nudity",
    "naked",
    "blood",
    "drugs",
    "cocaine",
    "heroin",
    "porn",
    "murder",
    "terrorism",
];

/// What to do with empty or whitespace-only input.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyInputPolicy {
    /// Nothing to check, so nothing to block.
    #[default]
    Allow,
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub blocked: bool,
    /// Human-readable explanation, shown to the caller verbatim.
    pub reason: String,
    /// The banned term that matched, if any.
    pub term: Option<String>,
}

impl ModerationVerdict {
    fn allowed() -> Self {
        Self {
            blocked: false,
            reason: String::new(),
            term: None,
        }
    }

    fn matched(term: &str) -> Self {
        Self {
            blocked: true,
            reason: format!("Content blocked by ethics policy: contains banned term '{term}'"),
            term: Some(term.to_string()),
        }
    }

    fn empty() -> Self {
        Self {
            blocked: true,
            reason: "Content blocked by ethics policy: input is empty".into(),
            term: None,
        }
    }
}

/// Keyword pre-check run before any provider call.
///
/// Immutable after construction and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    terms: Vec<String>,
    empty_input: EmptyInputPolicy,
}

impl Default for ModerationFilter {
    fn default() -> Self {
        Self::new(EmptyInputPolicy::default(), std::iter::empty::<&str>())
    }
}

impl ModerationFilter {
    pub fn new<I, S>(empty_input: EmptyInputPolicy, extra_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = BANNED_TERMS.iter().map(|t| t.to_string()).collect();
        for term in extra_terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        Self { terms, empty_input }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Case-insensitive substring scan. The first term in list order wins.
    pub fn check(&self, text: &str) -> ModerationVerdict {
        if text.trim().is_empty() {
            return match self.empty_input {
                EmptyInputPolicy::Allow => ModerationVerdict::allowed(),
                EmptyInputPolicy::Block => ModerationVerdict::empty(),
            };
        }

        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| haystack.contains(term.as_str()))
            .map(|term| ModerationVerdict::matched(term))
            .unwrap_or_else(ModerationVerdict::allowed)
    }

    /// Check several fields; the first blocked verdict wins.
    pub fn check_all<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> ModerationVerdict {
        fields
            .into_iter()
            .map(|field| self.check(field))
            .find(|verdict| verdict.blocked)
            .unwrap_or_else(ModerationVerdict::allowed)
    }
}
