use anyhow::Context;
use std::path::PathBuf;
use syllabus_core::config::PipelineConfig;
use syllabus_core::knowledge::KnowledgeBase;

/// Where the configuration and knowledge base come from. Either falls back
/// to the built-in defaults when no file is given.
pub struct Sources {
    pub config: Option<PathBuf>,
    pub knowledge: Option<PathBuf>,
}

impl Sources {
    pub fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => Ok(PipelineConfig::default()),
        }
    }

    pub fn load_knowledge(&self) -> anyhow::Result<KnowledgeBase> {
        match &self.knowledge {
            Some(path) => KnowledgeBase::load(path)
                .with_context(|| format!("failed to load knowledge base from {}", path.display())),
            None => Ok(KnowledgeBase::builtin()),
        }
    }
}
