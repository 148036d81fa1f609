use std::fmt;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::score::{Criterion, SPEAKING_CRITERIA, WRITING_CRITERIA};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Writing,
    Speaking,
}

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Writing => "writing",
            Skill::Speaking => "speaking",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "writing" => Some(Skill::Writing),
            "speaking" => Some(Skill::Speaking),
            _ => None,
        }
    }

    /// The four band criteria for this skill, in reporting order.
    pub fn criteria(&self) -> &'static [Criterion; 4] {
        match self {
            Skill::Writing => &WRITING_CRITERIA,
            Skill::Speaking => &SPEAKING_CRITERIA,
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingModule {
    Academic,
    General,
}

impl WritingModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingModule::Academic => "academic",
            WritingModule::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "academic" => Some(WritingModule::Academic),
            "general" => Some(WritingModule::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingTask {
    Task1,
    Task2,
}

impl WritingTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingTask::Task1 => "task1",
            WritingTask::Task2 => "task2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task1" => Some(WritingTask::Task1),
            "task2" => Some(WritingTask::Task2),
            _ => None,
        }
    }

    /// Official minimum length used when no stored question supplies one.
    pub fn default_min_words(&self) -> u32 {
        match self {
            WritingTask::Task1 => 150,
            WritingTask::Task2 => 250,
        }
    }
}

/// Speaking test part, serialized as the bare number 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SpeakingPart {
    Part1,
    Part2,
    Part3,
}

impl SpeakingPart {
    pub fn number(&self) -> u8 {
        match self {
            SpeakingPart::Part1 => 1,
            SpeakingPart::Part2 => 2,
            SpeakingPart::Part3 => 3,
        }
    }
}

impl TryFrom<u8> for SpeakingPart {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SpeakingPart::Part1),
            2 => Ok(SpeakingPart::Part2),
            3 => Ok(SpeakingPart::Part3),
            other => Err(format!("speaking part must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<SpeakingPart> for u8 {
    fn from(part: SpeakingPart) -> Self {
        part.number()
    }
}

/// Classification tags of an attempt or question.
///
/// Serializes flat, e.g. `{"skill":"writing","module":"academic","task":"task2"}`
/// or `{"skill":"speaking","part":2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "skill", rename_all = "snake_case")]
pub enum Category {
    Writing {
        module: WritingModule,
        task: WritingTask,
    },
    Speaking {
        part: SpeakingPart,
    },
}

impl Category {
    pub fn skill(&self) -> Skill {
        match self {
            Category::Writing { .. } => Skill::Writing,
            Category::Speaking { .. } => Skill::Speaking,
        }
    }

    /// Every category of a skill, in the fixed order used by breakdowns.
    pub fn all(skill: Skill) -> Vec<Category> {
        match skill {
            Skill::Writing => {
                let mut out = Vec::with_capacity(4);
                for module in [WritingModule::Academic, WritingModule::General] {
                    for task in [WritingTask::Task1, WritingTask::Task2] {
                        out.push(Category::Writing { module, task });
                    }
                }
                out
            }
            Skill::Speaking => [SpeakingPart::Part1, SpeakingPart::Part2, SpeakingPart::Part3]
                .into_iter()
                .map(|part| Category::Speaking { part })
                .collect(),
        }
    }

    /// Short label such as `academic_task2` or `part3`.
    pub fn label(&self) -> String {
        match self {
            Category::Writing { module, task } => format!("{}_{}", module.as_str(), task.as_str()),
            Category::Speaking { part } => format!("part{}", part.number()),
        }
    }

    /// Harder categories count more towards the weighted band.
    pub fn weight(&self) -> f64 {
        let bonus = match self {
            Category::Writing { module, task } => {
                let task_bonus = if *task == WritingTask::Task2 { 0.3 } else { 0.0 };
                let module_bonus = if *module == WritingModule::Academic {
                    0.2
                } else {
                    0.0
                };
                task_bonus + module_bonus
            }
            Category::Speaking { part } => match part {
                SpeakingPart::Part1 => 0.0,
                SpeakingPart::Part2 => 0.2,
                SpeakingPart::Part3 => 0.3,
            },
        };
        1.0 + bonus
    }

    /// Splits the category into its nullable table columns `(module, task, part)`.
    pub fn columns(&self) -> (Option<&'static str>, Option<&'static str>, Option<i16>) {
        match self {
            Category::Writing { module, task } => {
                (Some(module.as_str()), Some(task.as_str()), None)
            }
            Category::Speaking { part } => (None, None, Some(part.number() as i16)),
        }
    }

    /// Rebuilds a category from its table columns.
    pub fn from_columns(
        skill: Skill,
        module: Option<&str>,
        task: Option<&str>,
        part: Option<i16>,
    ) -> Result<Self> {
        match skill {
            Skill::Writing => {
                let module = module
                    .and_then(WritingModule::parse)
                    .ok_or_else(|| anyhow!("writing row has invalid module {module:?}"))?;
                let task = task
                    .and_then(WritingTask::parse)
                    .ok_or_else(|| anyhow!("writing row has invalid task {task:?}"))?;
                Ok(Category::Writing { module, task })
            }
            Skill::Speaking => {
                let Some(raw) = part else {
                    bail!("speaking row has no part");
                };
                let part = u8::try_from(raw)
                    .map_err(|_| anyhow!("speaking row has invalid part {raw}"))
                    .and_then(|n| SpeakingPart::try_from(n).map_err(|e| anyhow!(e)))?;
                Ok(Category::Speaking { part })
            }
        }
    }
}
