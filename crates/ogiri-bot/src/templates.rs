//! Prompt template store.
//!
//! Templates are plain-text files in one directory. The file named
//! `answer.txt` is the dedicated answer template; every other `.txt` file is
//! a topic template. Topic templates carry an `{instruction}` placeholder,
//! the answer template a `{topic}` placeholder.
//!
//! Files are re-read on every call — like the ledger, the store holds no
//! long-lived resources between cycles.

use rand::seq::SliceRandom;
use std::path::PathBuf;
use tracing::debug;

/// File name of the distinguished answer template.
pub const ANSWER_TEMPLATE: &str = "answer.txt";

/// A loaded template: the file name it came from (recorded as the topic's
/// `prompt_source`) and its raw body.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub body: String,
}

impl Template {
    /// Substitute every occurrence of `{placeholder}` with `value`.
    ///
    /// Substitution is a plain string replace; a template without the
    /// placeholder passes through unchanged.
    pub fn fill(&self, placeholder: &str, value: &str) -> String {
        self.body.replace(&format!("{{{placeholder}}}"), value)
    }
}

/// Directory-backed store of prompt templates.
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick one topic template uniformly at random. Errors if the directory
    /// is unreadable or holds no topic templates.
    pub fn pick_topic_template(&self) -> Result<Template, String> {
        let names = self.topic_template_names()?;
        let name = names
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| format!("no topic templates in {}", self.dir.display()))?;
        debug!("Selected topic template {name}");
        self.load(name)
    }

    /// Load the dedicated answer template.
    pub fn answer_template(&self) -> Result<Template, String> {
        self.load(ANSWER_TEMPLATE)
    }

    /// All `.txt` files except `answer.txt`, sorted for determinism.
    fn topic_template_names(&self) -> Result<Vec<String>, String> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| format!("failed to read template dir {}: {e}", self.dir.display()))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".txt") && name != ANSWER_TEMPLATE)
            .collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, file_name: &str) -> Result<Template, String> {
        let path = self.dir.join(file_name);
        let body = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read template {}: {e}", path.display()))?;
        Ok(Template {
            name: file_name.to_string(),
            body,
        })
    }
}
