//! Script and notebook extraction
//!
//! Patterns are matched against a whitespace-free copy of the source, so a
//! pattern author does not have to anticipate formatting. Notebooks store
//! cell source as JSON strings; one layer of `\"` escaping is undone before
//! matching so quotes look the way they do in a plain script.

use dpflow_core::CompiledPatterns;
use std::sync::Arc;

use crate::extractor::Extraction;

/// Extractor for `.py` scripts and `.ipynb` notebooks
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    patterns: Arc<CompiledPatterns>,
    notebook: bool,
}

impl ScriptExtractor {
    /// Extractor for plain scripts
    pub fn script(patterns: Arc<CompiledPatterns>) -> Self {
        Self {
            patterns,
            notebook: false,
        }
    }

    /// Extractor for notebooks
    pub fn notebook(patterns: Arc<CompiledPatterns>) -> Self {
        Self {
            patterns,
            notebook: true,
        }
    }

    /// Text the patterns are matched against
    pub fn preprocess(&self, text: &str) -> String {
        let collapsed: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        if self.notebook {
            collapsed.replace("\\\"", "\"")
        } else {
            collapsed
        }
    }

    /// Extract artifact references. Duplicates are kept.
    pub fn extract_text(&self, text: &str) -> Extraction {
        let code = self.preprocess(text);

        Extraction {
            inputs: self.patterns.find_inputs(&code),
            outputs: self.patterns.find_outputs(&code),
        }
    }
}
