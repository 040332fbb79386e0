//! Built-in workflow definitions.

/// Base feature-driven design questionnaire.
pub const FDD_BASE: &str = r##"
name: fdd-base
description: Capture business context and overall design for a project.
steps:
  - id: project-name
    prompt: "What is the project called?"

  - id: vision
    prompt: "Describe the business problem the project solves, in one or two sentences."

  - id: actors
    prompt: "Who uses the system? List the main actors."

  - id: tech-stack
    prompt: "Which language and framework does the project use?"

  - id: testing
    prompt: "How is the project tested?"

  - id: deployment
    prompt: "How is the project packaged and deployed?"

actions:
  - id: business-context
    artifact:
      output: BUSINESS.md
      required_sections: [A, B]
      template: |
        # {{ project-name }}: Business Context

        ## A. Vision

        {{ vision }}

        ## B. Actors

        {{ actors }}

  - id: overall-design
    artifact:
      output: DESIGN.md
      required_sections: [A, B, C]
      template: |
        # {{ project-name }}: Overall Design

        ## A. Architecture Overview

        {{ vision }}

        ## B. Technology

        - **Stack**: {{ tech-stack }}
        - **Testing**: {{ testing }}

        ## C. Delivery

        - **Deployment**: {{ deployment }}
"##;

/// Reverse-engineering extension: answers are proposed from the codebase.
pub const FDD_REVERSE_ENGINEERING: &str = r##"
name: fdd-reverse-engineering
description: Propose design answers from an existing codebase and document each feature.
parent: fdd-base
threshold: 70
changes:
  - op: override
    step: project-name
    proposal:
      detectors: [npm, cargo, go, python]
      kind: project-name

  - op: override
    step: tech-stack
    proposal:
      detectors: [npm, cargo, go, python]
      kind: tech-stack

  - op: override
    step: testing
    proposal:
      detectors: [npm, cargo, go, python, test-config]
      kind: testing

  - op: override
    step: deployment
    proposal:
      detectors: [docker]
      kind: deployment

  - op: insert
    position: after
    anchor: testing
    step:
      id: linting
      prompt: "Which linters and formatters are enforced?"
      proposal:
        detectors: [npm, python, lint-config]
        kind: linting

  - op: insert
    position: after
    anchor: deployment
    step:
      id: features
      prompt: "Which feature units does the codebase contain?"
      proposal:
        detectors: [features]
        kind: feature-list

  - op: append
    step: vision
    text: "Describe what the existing code already does rather than planned work."

actions:
  - id: feature-designs
    artifact:
      output: "features/{slug}/DESIGN.md"
      per_feature: true
      required_sections: [A, B]
      template: |
        # {{ feature.name }}

        **Status**: reverse-engineered

        ## A. Location

        - **Path**: `{{ feature.path }}`
        - **ID**: `fdd-{{ project-name }}-feature-{{ feature.slug }}`

        ## B. Context

        - **Project**: {{ project-name }}
        - **Stack**: {{ tech-stack }}
        - **Linting**: {{ linting }}
"##;

/// Every built-in definition source.
pub const ALL: &[&str] = &[FDD_BASE, FDD_REVERSE_ENGINEERING];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{parse_workflow_str, resolve};

    #[test]
    fn test_builtins_parse() {
        for source in ALL {
            parse_workflow_str(source).unwrap();
        }
    }

    #[test]
    fn test_reverse_engineering_resolves() {
        let base = parse_workflow_str(FDD_BASE).unwrap();
        let reverse = parse_workflow_str(FDD_REVERSE_ENGINEERING).unwrap();

        let resolved = resolve(&base, &[reverse]).unwrap();
        let questions: Vec<_> = resolved.questions().map(|s| s.id.as_str()).collect();
        assert_eq!(
            questions,
            vec!["project-name", "vision", "actors", "tech-stack", "testing", "linting", "deployment", "features"]
        );
        assert_eq!(resolved.threshold, Some(70.0));
        assert_eq!(resolved.generations().count(), 3);
    }
}
