//! Prompt templates.
//!
//! Templates live in `<paths.commands>/<name>.md` and use `$KEY`
//! placeholders. When a project ships no template, a built-in default is
//! used for the three prompts the pipeline renders.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::PhaseError;

pub const PLAN_TEMPLATE: &str = "plan";
pub const BUILD_TEMPLATE: &str = "build";
pub const TEST_TEMPLATE: &str = "test";

const DEFAULT_PLAN: &str = "\
You are planning the implementation of GitHub issue #$ISSUE_NUMBER.

Title: $ISSUE_TITLE

$ISSUE_BODY

Write a specification in Markdown with these sections: Summary, Requirements,
Acceptance Criteria, Implementation Notes, Test Plan. Output only the
specification document.
";

const DEFAULT_BUILD: &str = "\
Implement GitHub issue #$ISSUE_NUMBER according to the specification at
$SPEC_PATH. Edit the files in this repository directly.

$SPEC_CONTENT

Keep the project type-checking cleanly. Do not commit.
";

const DEFAULT_TEST: &str = "\
The test suite for GitHub issue #$ISSUE_NUMBER is failing (attempt $ATTEMPT).
The specification is at $SPEC_PATH:

$SPEC_CONTENT

Test output:

$TEST_OUTPUT

Fix the implementation or the tests so the suite passes and still meets the
specification. Edit the files directly. Do not commit.
";

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        PLAN_TEMPLATE => Some(DEFAULT_PLAN),
        BUILD_TEMPLATE => Some(DEFAULT_BUILD),
        TEST_TEMPLATE => Some(DEFAULT_TEST),
        _ => None,
    }
}

/// Substitute `$KEY` placeholders in one left-to-right pass.
///
/// At each `$` the longest matching key wins, so `$SPEC_PATH` is never read
/// as `$SPEC`. Inserted values are not rescanned. A `$` that starts no known
/// key is kept as is.
pub fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    let mut ordered: Vec<&(&str, String)> = vars.iter().collect();
    ordered.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        rendered.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match ordered.iter().find(|entry| after.starts_with(entry.0)) {
            Some(entry) => {
                rendered.push_str(&entry.1);
                rest = &after[entry.0.len()..];
            }
            None => {
                rendered.push('$');
                rest = after;
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Loads and renders prompt templates from a commands directory.
#[derive(Debug, Clone)]
pub struct PromptRenderer {
    commands_dir: PathBuf,
}

impl PromptRenderer {
    pub fn new(commands_dir: &Path) -> Self {
        Self {
            commands_dir: commands_dir.to_path_buf(),
        }
    }

    fn load(&self, name: &str) -> Result<String, PhaseError> {
        let path = self.commands_dir.join(format!("{}.md", name));
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                info!(template = name, path = %path.display(), "Loaded prompt template");
                Ok(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => builtin(name)
                .map(|t| {
                    debug!(template = name, "Using built-in prompt template");
                    t.to_string()
                })
                .ok_or_else(|| {
                    PhaseError::Prompt(format!("Prompt template not found: {}", path.display()))
                }),
            Err(e) => Err(PhaseError::Prompt(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn render(&self, name: &str, vars: &[(&str, String)]) -> Result<String, PhaseError> {
        let template = self.load(name)?;
        Ok(substitute(&template, vars))
    }
}
