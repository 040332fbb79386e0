//! Merges a base definition with its extensions into one step sequence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Position, Step, StepChange, StepKind, WorkflowDefinition, WorkflowError};

/// A fully merged workflow, ready to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWorkflow {
    /// Name of the outermost definition
    pub name: String,

    /// Definitions applied, root first
    pub chain: Vec<String>,

    /// Threshold set by the outermost definition that sets one
    pub threshold: Option<f64>,

    /// Steps in execution order; a step's index is its position here
    pub steps: Vec<Step>,
}

impl ResolvedWorkflow {
    /// Question steps, in order.
    pub fn questions(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.kind == StepKind::Question)
    }

    /// Generation steps, in order.
    pub fn generations(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.kind == StepKind::Generation)
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Index of a step in the total order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// Active threshold in percent, falling back to `default`.
    pub fn threshold_or(&self, default: f64) -> f64 {
        self.threshold.unwrap_or(default)
    }

    /// Check whether any definition in the chain extends the root.
    pub fn is_extended(&self) -> bool {
        self.chain.len() > 1
    }
}

/// Resolve `base` followed by `extensions`, outermost last.
///
/// Each extension's parent must appear earlier in the list. Changes are
/// applied in listed order, then the extension's actions are appended.
pub fn resolve(
    base: &WorkflowDefinition,
    extensions: &[WorkflowDefinition],
) -> Result<ResolvedWorkflow, WorkflowError> {
    check_chain(base, extensions)?;

    let mut steps = base.steps.clone();
    for action in &base.actions {
        push_unique(&mut steps, action.clone(), &base.name)?;
    }

    let mut threshold = base.threshold;
    for extension in extensions {
        apply(&mut steps, extension)?;
        if extension.threshold.is_some() {
            threshold = extension.threshold;
        }
    }

    let mut chain = vec![base.name.clone()];
    chain.extend(extensions.iter().map(|e| e.name.clone()));
    let name = chain.last().cloned().unwrap_or_default();

    tracing::debug!(workflow = name.as_str(), steps = steps.len(), "Resolved workflow");
    Ok(ResolvedWorkflow { name, chain, threshold, steps })
}

/// Validate the ordering of the chain before anything is merged.
fn check_chain(
    base: &WorkflowDefinition,
    extensions: &[WorkflowDefinition],
) -> Result<(), WorkflowError> {
    if let Some(parent) = &base.parent {
        return Err(WorkflowError::resolution(
            &base.name,
            parent,
            "the base definition must not have a parent",
        ));
    }

    let mut seen: Vec<&str> = vec![base.name.as_str()];
    for extension in extensions {
        if seen.contains(&extension.name.as_str()) {
            let mut chain: Vec<String> = seen.iter().map(|s| (*s).to_string()).collect();
            chain.push(extension.name.clone());
            return Err(WorkflowError::Cycle { chain });
        }
        match extension.parent.as_deref() {
            Some(parent) if seen.contains(&parent) => {}
            Some(parent) => {
                return Err(WorkflowError::resolution(
                    &extension.name,
                    parent,
                    "parent is not applied before this extension",
                ));
            }
            None => {
                return Err(WorkflowError::resolution(
                    &extension.name,
                    "",
                    "extension has no parent",
                ));
            }
        }
        seen.push(&extension.name);
    }
    Ok(())
}

fn apply(steps: &mut Vec<Step>, extension: &WorkflowDefinition) -> Result<(), WorkflowError> {
    let name = extension.name.as_str();

    for change in &extension.changes {
        let target = change.target();
        let Some(index) = steps.iter().position(|s| s.id == target) else {
            return Err(WorkflowError::resolution(name, target, "referenced step does not exist"));
        };

        match change {
            StepChange::Insert { position, step, .. } => {
                if steps.iter().any(|s| s.id == step.id) {
                    return Err(WorkflowError::resolution(name, &step.id, "step id already exists"));
                }
                let at = match position {
                    Position::Before => index,
                    Position::After => index + 1,
                };
                steps.insert(at, step.clone());
            }
            StepChange::Override { proposal, .. } => {
                let step = question_mut(steps, index, name)?;
                step.proposal = Some(proposal.clone());
            }
            StepChange::Append { text, .. } => {
                let step = question_mut(steps, index, name)?;
                if !step.prompt.is_empty() && !step.prompt.ends_with('\n') {
                    step.prompt.push('\n');
                }
                step.prompt.push_str(text.trim_end());
            }
        }
    }

    for action in &extension.actions {
        push_unique(steps, action.clone(), name)?;
    }
    Ok(())
}

fn question_mut<'a>(
    steps: &'a mut [Step],
    index: usize,
    definition: &str,
) -> Result<&'a mut Step, WorkflowError> {
    let step = &mut steps[index];
    if step.kind != StepKind::Question {
        return Err(WorkflowError::resolution(
            definition,
            &step.id,
            "only question steps can be overridden or appended to",
        ));
    }
    Ok(step)
}

fn push_unique(steps: &mut Vec<Step>, step: Step, definition: &str) -> Result<(), WorkflowError> {
    let ids: BTreeSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    if ids.contains(step.id.as_str()) {
        return Err(WorkflowError::resolution(definition, &step.id, "step id already exists"));
    }
    steps.push(step);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propose::ProposalHook;
    use crate::workflow::ArtifactSpec;

    fn base() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "base".to_string(),
            description: None,
            parent: None,
            threshold: Some(90.0),
            steps: vec![
                Step::question("vision", "What is the vision?"),
                Step::question("tech-stack", "Which stack?"),
                Step::question("testing", "How is it tested?"),
            ],
            changes: Vec::new(),
            actions: vec![Step::generation(
                "design",
                ArtifactSpec {
                    output: "DESIGN.md".to_string(),
                    template: "{{ tech-stack }}".to_string(),
                    per_feature: false,
                    required_sections: Vec::new(),
                },
            )],
        }
    }

    fn extension(name: &str, parent: &str, changes: Vec<StepChange>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: name.to_string(),
            description: None,
            parent: Some(parent.to_string()),
            threshold: None,
            steps: Vec::new(),
            changes,
            actions: Vec::new(),
        }
    }

    fn ids(resolved: &ResolvedWorkflow) -> Vec<&str> {
        resolved.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_base_only() {
        let resolved = resolve(&base(), &[]).unwrap();
        assert_eq!(ids(&resolved), vec!["vision", "tech-stack", "testing", "design"]);
        assert_eq!(resolved.chain, vec!["base"]);
        assert_eq!(resolved.threshold, Some(90.0));
        assert!(!resolved.is_extended());
        assert_eq!(resolved.index_of("design"), Some(3));
    }

    #[test]
    fn test_insert_override_append() {
        let ext = extension(
            "reverse",
            "base",
            vec![
                StepChange::Insert {
                    position: Position::Before,
                    anchor: "testing".to_string(),
                    step: Step::question("linting", "Which linters?"),
                },
                StepChange::Override {
                    step: "tech-stack".to_string(),
                    proposal: ProposalHook::new(["npm"], "tech-stack"),
                },
                StepChange::Append {
                    step: "vision".to_string(),
                    text: "Describe the existing system.\n".to_string(),
                },
            ],
        );

        let resolved = resolve(&base(), &[ext]).unwrap();
        assert_eq!(ids(&resolved), vec!["vision", "tech-stack", "linting", "testing", "design"]);
        assert!(resolved.step("tech-stack").unwrap().proposal.is_some());
        assert_eq!(
            resolved.step("vision").unwrap().prompt,
            "What is the vision?\nDescribe the existing system."
        );
        assert_eq!(resolved.name, "reverse");
        assert_eq!(resolved.threshold, Some(90.0));
    }

    #[test]
    fn test_outermost_threshold_wins() {
        let mut first = extension("first", "base", Vec::new());
        first.threshold = Some(70.0);
        let second = extension("second", "first", Vec::new());

        let resolved = resolve(&base(), &[first.clone(), second]).unwrap();
        assert_eq!(resolved.threshold, Some(70.0));

        let mut third = extension("third", "first", Vec::new());
        third.threshold = Some(80.0);
        let resolved = resolve(&base(), &[first, third]).unwrap();
        assert_eq!(resolved.threshold_or(90.0), 80.0);
    }

    #[test]
    fn test_unknown_override_target() {
        let ext = extension(
            "reverse",
            "base",
            vec![StepChange::Override {
                step: "tech-stak".to_string(),
                proposal: ProposalHook::new(["npm"], "tech-stack"),
            }],
        );
        let err = resolve(&base(), &[ext]).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Resolution { ref definition, ref step, .. }
                if definition == "reverse" && step == "tech-stak"
        ));
    }

    #[test]
    fn test_unknown_insert_anchor() {
        let ext = extension(
            "reverse",
            "base",
            vec![StepChange::Insert {
                position: Position::After,
                anchor: "missing".to_string(),
                step: Step::question("x", "?"),
            }],
        );
        assert!(matches!(resolve(&base(), &[ext]), Err(WorkflowError::Resolution { .. })));
    }

    #[test]
    fn test_duplicate_insert_id() {
        let ext = extension(
            "reverse",
            "base",
            vec![StepChange::Insert {
                position: Position::After,
                anchor: "vision".to_string(),
                step: Step::question("testing", "again?"),
            }],
        );
        assert!(matches!(resolve(&base(), &[ext]), Err(WorkflowError::Resolution { .. })));
    }

    #[test]
    fn test_override_generation_step_fails() {
        let ext = extension(
            "reverse",
            "base",
            vec![StepChange::Append { step: "design".to_string(), text: "more".to_string() }],
        );
        let err = resolve(&base(), &[ext]).unwrap_err();
        assert!(err.to_string().contains("only question steps"));
    }

    #[test]
    fn test_repeated_name_is_cycle() {
        let a = extension("a", "base", Vec::new());
        let err = resolve(&base(), &[a.clone(), a]).unwrap_err();
        assert!(matches!(err, WorkflowError::Cycle { ref chain } if chain == &["base", "a", "a"]));
    }

    #[test]
    fn test_parent_out_of_order() {
        let a = extension("a", "b", Vec::new());
        let b = extension("b", "base", Vec::new());
        assert!(matches!(resolve(&base(), &[a, b]), Err(WorkflowError::Resolution { .. })));
    }

    #[test]
    fn test_actions_are_appended() {
        let mut ext = extension("reverse", "base", Vec::new());
        ext.actions.push(Step::generation(
            "features",
            ArtifactSpec {
                output: "features/{slug}.md".to_string(),
                template: "# {{ feature.name }}".to_string(),
                per_feature: true,
                required_sections: Vec::new(),
            },
        ));
        let resolved = resolve(&base(), &[ext]).unwrap();
        let generations: Vec<_> = resolved.generations().map(|s| s.id.as_str()).collect();
        assert_eq!(generations, vec!["design", "features"]);
        assert_eq!(resolved.questions().count(), 3);
    }
}
