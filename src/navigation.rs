/// Prev/next targets for a position in an ordered child list.
///
/// A `None` side is hidden in the view and a no-op when triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

impl Bounds {
    pub fn at(index: usize, len: usize) -> Self {
        if index >= len {
            return Self::default();
        }
        Self {
            prev: index.checked_sub(1),
            next: Some(index + 1).filter(|&n| n < len),
        }
    }

    pub fn of(index: Option<usize>, len: usize) -> Self {
        index.map(|i| Self::at(i, len)).unwrap_or_default()
    }

    pub fn target(&self, step: Step) -> Option<usize> {
        match step {
            Step::Prev => self.prev,
            Step::Next => self.next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prev,
    Next,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_hide_controls() {
        assert_eq!(Bounds::at(0, 3), Bounds { prev: None, next: Some(1) });
        assert_eq!(Bounds::at(1, 3), Bounds { prev: Some(0), next: Some(2) });
        assert_eq!(Bounds::at(2, 3), Bounds { prev: Some(1), next: None });
        assert_eq!(Bounds::at(0, 1), Bounds::default());
    }

    #[test]
    fn out_of_range_has_no_targets() {
        assert_eq!(Bounds::at(3, 3), Bounds::default());
        assert_eq!(Bounds::of(None, 5), Bounds::default());
        assert_eq!(Bounds::at(0, 0).target(Step::Next), None);
    }
}
