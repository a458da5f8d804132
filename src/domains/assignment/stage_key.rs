use std::collections::BTreeSet;

pub const DEFAULT_KIND_QUALIFIED_STAGES: [&str; 3] = ["vistoria_inicial", "vistoria_final", "lavagem"];

/// Decides which stages are split per service kind in `stageProgress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageKeyPolicy {
    kind_qualified: BTreeSet<String>,
}

impl StageKeyPolicy {
    pub fn new<I, S>(kind_qualified: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind_qualified: kind_qualified.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_kind_qualified(&self, stage: &str) -> bool {
        self.kind_qualified.contains(stage)
    }

    pub fn key_for(&self, stage: &str, service_kind: Option<&str>) -> String {
        match service_kind {
            Some(kind) if !kind.is_empty() && self.is_kind_qualified(stage) => {
                format!("{}_{}", stage, kind)
            }
            _ => stage.to_string(),
        }
    }
}

impl Default for StageKeyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_KIND_QUALIFIED_STAGES)
    }
}
