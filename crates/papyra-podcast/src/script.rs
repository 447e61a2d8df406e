//! Episode script generation.

use std::sync::Arc;

use tracing::{instrument, warn};

use papyra_kb::PaperRecord;
use papyra_llm::{LlmBackend, LlmRequest};

const SCRIPT_MAX_TOKENS: u32 = 2_000;

/// Rewrites a paper summary into a spoken-style narration. On generation
/// failure the stored summary is used verbatim, so an episode is always
/// produced.
pub struct ScriptWriter {
    backend: Arc<dyn LlmBackend>,
}

impl ScriptWriter {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, paper), fields(arxiv_id = %paper.arxiv_id))]
    pub async fn episode_script(&self, paper: &PaperRecord) -> String {
        let prompt = format!(
            "Rewrite this research paper summary as a script for a short \
             podcast episode.\n\n\
             Paper: \"{}\"\n\
             Authors: {}\n\n\
             Summary:\n{}\n\n\
             Guidelines:\n\
             - Open by stating the paper title and authors\n\
             - Speak directly to the listener in plain language\n\
             - Explain why the problem matters before describing the method\n\
             - No headings, bullet points, or citations; flowing spoken prose only\n\
             - Close with the single most important takeaway",
            paper.title, paper.authors, paper.summary,
        );

        match self
            .backend
            .complete(LlmRequest::prompt(prompt, SCRIPT_MAX_TOKENS))
            .await
        {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(error = %e, "script generation failed, narrating the summary as-is");
                format!(
                    "{}, by {}. {}",
                    paper.title, paper.authors, paper.summary
                )
            }
        }
    }
}
