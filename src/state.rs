/// Lifecycle of a screen.
///
/// `Idle -> LoadingParent -> (Failed | ParentLoaded) -> LoadingContent -> (Failed | ContentLoaded)`.
/// Navigation goes straight back to `LoadingContent`. `Unresolved` means the parent list
/// loaded but does not contain the requested child, so no content fetch was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingParent,
    ParentLoaded,
    Unresolved { requested: String },
    LoadingContent,
    ContentLoaded,
    Failed(String),
}

impl Phase {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::LoadingParent | Self::LoadingContent)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Token stamped on each content request; only the newest one may update state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: u64,
}

impl GenerationCounter {
    pub fn advance(&mut self) -> Generation {
        self.latest += 1;
        Generation(self.latest)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_generation_is_current() {
        let mut counter = GenerationCounter::default();
        let first = counter.advance();
        assert!(counter.is_current(first));
        let second = counter.advance();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }
}
