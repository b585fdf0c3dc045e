//! Linking interaction state for one layout

use crate::widget::WidgetId;

/// Where the layout is in the click-to-connect flow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkingState {
    #[default]
    Idle,
    /// `initiator` is choosing a source
    Linking { initiator: WidgetId },
}

/// A clickable overlay offered over `target` while `initiator` is linking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub layout: String,
    pub target: WidgetId,
    pub initiator: WidgetId,
}

#[derive(Debug, Default)]
pub struct LinkSession {
    state: LinkingState,
    affordances: Vec<Affordance>,
}

impl LinkSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LinkingState {
        &self.state
    }

    pub fn initiator(&self) -> Option<&WidgetId> {
        match &self.state {
            LinkingState::Idle => None,
            LinkingState::Linking { initiator } => Some(initiator),
        }
    }

    pub fn is_linking(&self) -> bool {
        matches!(self.state, LinkingState::Linking { .. })
    }

    /// Enter `Linking`, dropping any affordances from a previous session
    pub fn begin(&mut self, initiator: &WidgetId) {
        self.affordances.clear();
        self.state = LinkingState::Linking {
            initiator: initiator.clone(),
        };
    }

    pub fn offer(&mut self, affordance: Affordance) {
        self.affordances.push(affordance);
    }

    pub fn affordances(&self) -> &[Affordance] {
        &self.affordances
    }

    /// Back to `Idle`; returns true if anything was cleared
    pub fn clear(&mut self) -> bool {
        let was_active = self.is_linking() || !self.affordances.is_empty();
        self.affordances.clear();
        self.state = LinkingState::Idle;
        was_active
    }

    /// True if an overlay over `target` was offered to `initiator` in this session
    pub fn is_offered(&self, target: &WidgetId, initiator: &WidgetId) -> bool {
        self.initiator() == Some(initiator)
            && self
                .affordances
                .iter()
                .any(|a| &a.target == target && &a.initiator == initiator)
    }

    /// True if `id` is the initiator or an offered target
    pub fn involves(&self, id: &WidgetId) -> bool {
        self.initiator() == Some(id) || self.affordances.iter().any(|a| &a.target == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affordance(target: &str, initiator: &str) -> Affordance {
        Affordance {
            layout: "main".to_string(),
            target: WidgetId::new(target),
            initiator: WidgetId::new(initiator),
        }
    }

    #[test]
    fn test_begin_replaces_previous_session() {
        let mut session = LinkSession::new();
        session.begin(&WidgetId::new("b"));
        session.offer(affordance("a", "b"));

        session.begin(&WidgetId::new("c"));
        assert_eq!(session.initiator(), Some(&WidgetId::new("c")));
        assert!(session.affordances().is_empty());
    }

    #[test]
    fn test_is_offered_checks_current_initiator() {
        let mut session = LinkSession::new();
        session.begin(&WidgetId::new("b"));
        session.offer(affordance("a", "b"));

        assert!(session.is_offered(&WidgetId::new("a"), &WidgetId::new("b")));
        assert!(!session.is_offered(&WidgetId::new("a"), &WidgetId::new("c")));
        assert!(!session.is_offered(&WidgetId::new("x"), &WidgetId::new("b")));
    }

    #[test]
    fn test_involves_initiator_and_targets() {
        let mut session = LinkSession::new();
        assert!(!session.involves(&WidgetId::new("b")));
        session.begin(&WidgetId::new("b"));
        session.offer(affordance("a", "b"));

        assert!(session.involves(&WidgetId::new("b")));
        assert!(session.involves(&WidgetId::new("a")));
        assert!(!session.involves(&WidgetId::new("c")));
    }

    #[test]
    fn test_clear_reports_activity() {
        let mut session = LinkSession::new();
        assert!(!session.clear());
        session.begin(&WidgetId::new("b"));
        assert!(session.clear());
        assert_eq!(session.state(), &LinkingState::Idle);
    }
}
