use crate::error::SkillError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Success,
    Failure(String),
}

impl BatchOutcome {
    pub fn from_result<T>(result: &Result<T, SkillError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) => Self::Failure(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Per-name outcomes in completion order. Correlate by name, not position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub items: Vec<(String, BatchOutcome)>,
}

impl BatchResult {
    pub fn push(&mut self, name: impl Into<String>, outcome: BatchOutcome) {
        self.items.push((name.into(), outcome));
    }

    pub fn outcome(&self, name: &str) -> Option<&BatchOutcome> {
        self.items
            .iter()
            .find(|(item, _)| item == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(name, _)| name.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().filter_map(|(name, outcome)| match outcome {
            BatchOutcome::Failure(reason) => Some((name.as_str(), reason.as_str())),
            BatchOutcome::Success => None,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
