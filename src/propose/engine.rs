//! Signal to proposal synthesis.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Proposal, ProposalHook, ProposalSet};
use crate::detect::Signal;
use crate::workflow::ResolvedWorkflow;

/// Combine agreeing confidences with a probabilistic sum.
///
/// `1 - (1 - c1)(1 - c2)...`: never lower than the strongest input, grows
/// with every additional agreeing signal and never exceeds 1.0.
pub fn combine_confidences(confidences: impl IntoIterator<Item = f64>) -> f64 {
    confidences
        .into_iter()
        .map(|c| c.clamp(0.0, 1.0))
        .fold(0.0, |acc, c| acc + c - acc * c)
        .clamp(0.0, 1.0)
}

/// Normalise a candidate value for grouping: trim, collapse inner
/// whitespace and compare case-insensitively.
pub fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Builds proposals from signals. Stateless and pure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProposalEngine;

impl ProposalEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Proposals for every question step with a hook.
    pub fn propose(&self, workflow: &ResolvedWorkflow, signals: &[Signal]) -> ProposalSet {
        let mut set = ProposalSet::new();
        for step in workflow.questions() {
            let Some(hook) = &step.proposal else {
                continue;
            };
            let proposals = self.propose_step(&step.id, hook, signals);
            tracing::debug!(step = step.id.as_str(), count = proposals.len(), "Synthesized proposals");
            set.insert(step.id.clone(), proposals);
        }
        set
    }

    /// Ranked proposals for one step.
    pub fn propose_step(&self, step_id: &str, hook: &ProposalHook, signals: &[Signal]) -> Vec<Proposal> {
        let mut relevant: Vec<&Signal> = signals.iter().filter(|s| hook.accepts(s)).collect();
        relevant.sort_by(|a, b| a.canonical_cmp(b));

        // normalised value -> contributing signals, in canonical order
        let mut groups: BTreeMap<String, Vec<&Signal>> = BTreeMap::new();
        for signal in relevant {
            let Some(value) = signal.get(&hook.value_key) else {
                continue;
            };
            let key = normalize_value(value);
            if key.is_empty() {
                continue;
            }
            groups.entry(key).or_default().push(signal);
        }

        let mut proposals: Vec<(String, Proposal)> = groups
            .into_iter()
            .map(|(key, contributors)| {
                let shown = contributors[0].get(&hook.value_key).unwrap_or_default();
                let proposal = Proposal {
                    step_id: step_id.to_string(),
                    value: shown.split_whitespace().collect::<Vec<_>>().join(" "),
                    confidence: combine_confidences(contributors.iter().map(|s| s.confidence)),
                    rationale: contributors.into_iter().cloned().collect(),
                };
                (key, proposal)
            })
            .collect();

        proposals.sort_by(|(key_a, a), (key_b, b)| rank(key_a, a, key_b, b));
        proposals.into_iter().map(|(_, p)| p).collect()
    }
}

/// Confidence descending, then candidate value, then first detector name.
fn rank(key_a: &str, a: &Proposal, key_b: &str, b: &Proposal) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| key_a.cmp(key_b))
        .then_with(|| first_detector(a).cmp(first_detector(b)))
}

fn first_detector(proposal: &Proposal) -> &str {
    proposal.rationale.first().map_or("", |s| s.detector.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::kinds;

    fn hook() -> ProposalHook {
        ProposalHook::new(["npm", "cargo", "go", "python"], kinds::TECH_STACK)
    }

    #[test]
    fn test_combine_confidences() {
        assert!((combine_confidences([0.9]) - 0.9).abs() < f64::EPSILON);
        assert!((combine_confidences([0.5, 0.5]) - 0.75).abs() < 1e-12);
        assert!((combine_confidences([1.4, 0.2]) - 1.0).abs() < f64::EPSILON);
        assert!(combine_confidences(std::iter::empty()).abs() < f64::EPSILON);

        let one = combine_confidences([0.6]);
        let two = combine_confidences([0.6, 0.3]);
        let three = combine_confidences([0.6, 0.3, 0.3]);
        assert!(one < two && two < three && three <= 1.0);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("  Node/Express "), "node/express");
        assert_eq!(normalize_value("Go\t /  Gin"), "go / gin");
    }

    #[test]
    fn test_express_proposal() {
        let signals = vec![
            Signal::new("npm", kinds::TECH_STACK, "Node/Express", 0.9).with("path", "package.json"),
            Signal::new("npm", kinds::TESTING, "Jest", 0.8),
        ];
        let proposals = ProposalEngine::new().propose_step("tech-stack", &hook(), &signals);

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].step_id, "tech-stack");
        assert_eq!(proposals[0].value, "Node/Express");
        assert!((proposals[0].confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(proposals[0].rationale.len(), 1);
    }

    #[test]
    fn test_agreeing_signals_merge() {
        let signals = vec![
            Signal::new("python", kinds::TECH_STACK, "python", 0.6),
            Signal::new("cargo", kinds::TECH_STACK, "Python", 0.5),
        ];
        let proposals = ProposalEngine::new().propose_step("tech-stack", &hook(), &signals);

        assert_eq!(proposals.len(), 1);
        // first contributor in canonical order supplies the displayed value
        assert_eq!(proposals[0].value, "Python");
        assert!((proposals[0].confidence - 0.8).abs() < 1e-12);
        assert_eq!(proposals[0].detectors(), vec!["cargo", "python"]);
    }

    #[test]
    fn test_conflicts_are_ranked_with_stable_ties() {
        let signals = vec![
            Signal::new("npm", kinds::TECH_STACK, "Node/React", 0.6),
            Signal::new("go", kinds::TECH_STACK, "Go", 0.6),
            Signal::new("npm", kinds::TECH_STACK, "Node/Express", 0.9),
            Signal::new("docker", kinds::TECH_STACK, "Docker", 1.0),
        ];
        let proposals = ProposalEngine::new().propose_step("tech-stack", &hook(), &signals);

        let values: Vec<_> = proposals.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["Node/Express", "Go", "Node/React"]);
    }

    #[test]
    fn test_no_signals_no_proposals() {
        let proposals = ProposalEngine::new().propose_step("tech-stack", &hook(), &[]);
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_custom_value_key() {
        let mut hook = ProposalHook::new(["features"], kinds::FEATURE);
        hook.value_key = "slug".to_string();
        let signals = vec![Signal::new("features", kinds::FEATURE, "Order Intake", 0.7)
            .with("slug", "order-intake")];

        let proposals = ProposalEngine::new().propose_step("feature", &hook, &signals);
        assert_eq!(proposals[0].value, "order-intake");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let a = Signal::new("npm", kinds::TECH_STACK, "Node.js", 0.6);
        let b = Signal::new("go", kinds::TECH_STACK, "Go", 0.6);
        let engine = ProposalEngine::new();

        let forward = engine.propose_step("tech-stack", &hook(), &[a.clone(), b.clone()]);
        let backward = engine.propose_step("tech-stack", &hook(), &[b, a]);
        assert_eq!(forward, backward);
    }
}
