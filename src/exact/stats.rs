use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters collected during one branch-and-bound run.
///
/// Every edge considered while expanding a node creates exactly one state,
/// and every created state ends up in exactly one of four places: it
/// improved the incumbent, it was pruned, it was pushed, or it was a dead end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// States evaluated, the root included.
    pub states_created: u64,
    /// States placed on the frontier, the root included.
    pub states_pushed: u64,
    /// States discarded because their bound (or completed cost) could not
    /// beat the incumbent.
    pub states_pruned: u64,
    /// States revisiting a city or completing through a missing closing edge.
    pub dead_ends: u64,
    /// Completed tours that replaced the incumbent (the seed excluded).
    pub solutions_found: u64,
    /// Nodes popped and expanded.
    pub states_expanded: u64,
    /// Nodes popped whose bound no longer beat the incumbent.
    pub stale_discarded: u64,
    pub max_frontier_size: usize,
    /// Nodes left on the frontier when the search stopped.
    pub frontier_remaining: usize,
    pub root_lower_bound: f64,
    #[serde(with = "duration_secs")]
    pub time_total: Duration,
}

impl Default for SearchStats {
    fn default() -> Self {
        SearchStats {
            states_created: 0,
            states_pushed: 0,
            states_pruned: 0,
            dead_ends: 0,
            solutions_found: 0,
            states_expanded: 0,
            stale_discarded: 0,
            max_frontier_size: 0,
            frontier_remaining: 0,
            root_lower_bound: 0.0,
            time_total: Duration::ZERO,
        }
    }
}

impl SearchStats {
    #[inline]
    pub fn on_state_created(&mut self) {
        self.states_created = self.states_created.saturating_add(1);
    }

    #[inline]
    pub fn on_state_pushed(&mut self, frontier_size: usize) {
        self.states_pushed = self.states_pushed.saturating_add(1);
        self.max_frontier_size = self.max_frontier_size.max(frontier_size);
    }

    #[inline]
    pub fn on_state_pruned(&mut self) {
        self.states_pruned = self.states_pruned.saturating_add(1);
    }

    #[inline]
    pub fn on_dead_end(&mut self) {
        self.dead_ends = self.dead_ends.saturating_add(1);
    }

    #[inline]
    pub fn on_solution_found(&mut self) {
        self.solutions_found = self.solutions_found.saturating_add(1);
    }

    #[inline]
    pub fn on_state_expanded(&mut self) {
        self.states_expanded = self.states_expanded.saturating_add(1);
    }

    #[inline]
    pub fn on_stale_discarded(&mut self) {
        self.stale_discarded = self.stale_discarded.saturating_add(1);
    }

    #[inline]
    pub fn set_root_lower_bound(&mut self, bound: f64) {
        self.root_lower_bound = bound;
    }

    #[inline]
    pub fn set_total_time(&mut self, duration: Duration) {
        self.time_total = duration;
    }

    #[inline]
    pub fn set_frontier_remaining(&mut self, remaining: usize) {
        self.frontier_remaining = remaining;
    }

    /// Whether the search ran until the frontier was empty. The incumbent is
    /// then a proven optimum.
    #[inline]
    pub fn exhausted(&self) -> bool {
        self.frontier_remaining == 0
    }

    /// `created == solutions + pruned + pushed + dead ends`
    pub fn is_consistent(&self) -> bool {
        self.states_created
            == self.solutions_found + self.states_pruned + self.states_pushed + self.dead_ends
    }
}

impl std::fmt::Display for SearchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Branch-and-Bound Statistics:")?;
        writeln!(f, "  States created:       {}", self.states_created)?;
        writeln!(f, "  States pushed:        {}", self.states_pushed)?;
        writeln!(f, "  States pruned:        {}", self.states_pruned)?;
        writeln!(f, "  Dead ends:            {}", self.dead_ends)?;
        writeln!(f, "  States expanded:      {}", self.states_expanded)?;
        writeln!(f, "  Stale discarded:      {}", self.stale_discarded)?;
        writeln!(f, "  Solutions found:      {}", self.solutions_found)?;
        writeln!(f, "  Max frontier size:    {}", self.max_frontier_size)?;
        writeln!(f, "  Frontier remaining:   {}", self.frontier_remaining)?;
        writeln!(f, "  Root lower bound:     {:.2}", self.root_lower_bound)?;
        writeln!(f, "  Total time:           {:.2?}", self.time_total)?;
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_consistency() {
        let mut stats = SearchStats::default();
        assert!(stats.is_consistent());

        for _ in 0..5 {
            stats.on_state_created();
        }
        stats.on_state_pushed(1);
        stats.on_state_pushed(3);
        stats.on_state_pruned();
        stats.on_dead_end();
        assert!(!stats.is_consistent());
        stats.on_solution_found();

        assert!(stats.is_consistent());
        assert_eq!(stats.max_frontier_size, 3);
    }

    #[test]
    fn test_exhausted() {
        let mut stats = SearchStats::default();
        assert!(stats.exhausted());
        stats.set_frontier_remaining(4);
        assert!(!stats.exhausted());
    }

    #[test]
    fn test_display() {
        let mut stats = SearchStats::default();
        stats.on_state_created();
        stats.set_root_lower_bound(35.0);
        stats.set_total_time(Duration::from_millis(1500));

        let rendered = format!("{}", stats);
        assert!(rendered.contains("Branch-and-Bound Statistics:"));
        assert!(rendered.contains("States created:       1"));
        assert!(rendered.contains("Root lower bound:     35.00"));
    }

    #[test]
    fn test_serializes_time_as_seconds() {
        let stats = SearchStats {
            time_total: Duration::from_millis(250),
            ..SearchStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["time_total"], 0.25);

        let back: SearchStats = serde_json::from_value(json).unwrap();
        assert_eq!(back.time_total, Duration::from_millis(250));
    }
}
