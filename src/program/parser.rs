//! Line-oriented program text parser
//!
//! Recognized markers (case-insensitive, leading indentation ignored):
//!
//! ```text
//! PROGRAM: <name>
//! GOAL: <goal text>
//! STATE:
//!   <ignored>
//! STEPS:
//!   STEP <label>:
//!     ACTION: <free text>
//!     CONDITION: <free text>
//! ```
//!
//! Everything between `STATE:` and `STEPS:` is skipped, including lines
//! that look like markers. Step markers only open a step inside the
//! `STEPS:` section. Action and condition lines attach to the most
//! recently opened step. Every other line is ignored, so parsing never
//! fails.

use regex::Regex;
use std::sync::LazyLock;

use super::model::{Program, Step};

static PROGRAM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PROGRAM\s*:\s*(.*)$").unwrap());
static GOAL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^GOAL\s*:\s*(.*)$").unwrap());
static STATE_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^STATE\s*:\s*$").unwrap());
static STEPS_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^STEPS\s*:\s*$").unwrap());
static STEP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^STEP\s+([^:]+?)\s*:").unwrap());
static ACTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ACTION\s*:\s*(.*)$").unwrap());
static CONDITION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^CONDITION\s*:\s*(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    State,
    Steps,
}

/// Parser for step-program text
pub struct ProgramParser;

impl ProgramParser {
    /// Parse program text. Unrecognized lines are skipped; text without
    /// step markers yields a program with no steps.
    pub fn parse(text: &str) -> Program {
        let mut program = Program::default();
        let mut section = Section::Header;
        let mut current: Option<usize> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if section == Section::State {
                // state content is opaque; only the steps marker ends it
                if STEPS_SECTION.is_match(line) {
                    section = Section::Steps;
                }
                continue;
            }

            if let Some(cap) = PROGRAM_LINE.captures(line) {
                program.name = cap[1].trim().to_string();
            } else if let Some(cap) = GOAL_LINE.captures(line) {
                program.goal = cap[1].trim().to_string();
            } else if STATE_SECTION.is_match(line) {
                section = Section::State;
                current = None;
            } else if STEPS_SECTION.is_match(line) {
                section = Section::Steps;
                current = None;
            } else if let Some(cap) = STEP_LINE.captures(line) {
                if section == Section::Steps {
                    program.steps.push(Step::new(cap[1].trim()));
                    current = Some(program.steps.len() - 1);
                }
            } else if let Some(cap) = ACTION_LINE.captures(line) {
                if let Some(idx) = current {
                    program.steps[idx].actions.push(cap[1].trim().to_string());
                }
            } else if let Some(cap) = CONDITION_LINE.captures(line) {
                if let Some(idx) = current {
                    program.steps[idx].conditions.push(cap[1].trim().to_string());
                }
            }
        }

        program
    }
}

impl std::str::FromStr for Program {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ProgramParser::parse(s))
    }
}
