//! Task declarations: named build actions with predecessor edges.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use strata_util::errors::StrataError;

use crate::effective::EffectiveConfig;
use crate::layout::OutputLayout;
use crate::value::ConfigValue;

/// Option path holding explicit task declarations.
pub const TASKS_OPTION: &str = "tasks";

/// What a task does when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskAction {
    /// Remove a directory tree.
    Clean { path: PathBuf },
    /// Run an external program and wait for it.
    Exec {
        program: String,
        args: Vec<String>,
        cwd: PathBuf,
    },
    /// Placeholder for work owned by an external toolchain.
    Noop,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Clean { path } => write!(f, "clean {}", path.display()),
            TaskAction::Exec { program, args, .. } => {
                write!(f, "exec {program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            TaskAction::Noop => f.write_str("noop"),
        }
    }
}

/// A node of the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    pub name: String,
    /// Tasks that must complete before this one, in declaration order.
    pub after: Vec<String>,
    pub action: TaskAction,
}

impl TaskNode {
    pub fn new(name: impl Into<String>, after: &[&str], action: TaskAction) -> Self {
        Self {
            name: name.into(),
            after: after.iter().map(|s| s.to_string()).collect(),
            action,
        }
    }

    /// Parse one element of the `tasks` sequence.
    ///
    /// ```toml
    /// [[defaults.tasks]]
    /// name = "assemble"
    /// after = ["package"]
    /// action = "exec"
    /// program = "flutter"
    /// args = ["build", "apk"]
    /// ```
    pub fn from_value(value: &ConfigValue, layout: &OutputLayout) -> Result<Self, StrataError> {
        let table = value.as_mapping().ok_or_else(|| StrataError::Task {
            message: format!("task declaration must be a table, found {value}"),
        })?;
        let name = required_str(table, "name", value)?.to_string();
        let after = string_list(table, "after", &name)?;
        let action = match optional_str(table, "action", &name)?.unwrap_or("noop") {
            "noop" => TaskAction::Noop,
            "clean" => TaskAction::Clean {
                path: match optional_str(table, "path", &name)? {
                    Some(p) => layout.resolve(p),
                    None => layout.build_dir().to_path_buf(),
                },
            },
            "exec" => TaskAction::Exec {
                program: required_str(table, "program", value)?.to_string(),
                args: string_list(table, "args", &name)?,
                cwd: match optional_str(table, "cwd", &name)? {
                    Some(dir) => layout.resolve(dir),
                    None => layout.project_dir().to_path_buf(),
                },
            },
            other => {
                return Err(StrataError::Task {
                    message: format!("task `{name}` has unknown action `{other}`"),
                })
            }
        };
        Ok(Self { name, after, action })
    }
}

fn required_str<'a>(
    table: &'a BTreeMap<String, ConfigValue>,
    key: &str,
    whole: &ConfigValue,
) -> Result<&'a str, StrataError> {
    table
        .get(key)
        .and_then(ConfigValue::as_str)
        .ok_or_else(|| StrataError::Task {
            message: format!("task declaration {whole} is missing string field `{key}`"),
        })
}

/// A string field that may be absent but must not have another type.
fn optional_str<'a>(
    table: &'a BTreeMap<String, ConfigValue>,
    key: &str,
    task: &str,
) -> Result<Option<&'a str>, StrataError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or_else(|| StrataError::Task {
            message: format!("task `{task}`: `{key}` must be a string, found {value}"),
        }),
    }
}

fn string_list(
    table: &BTreeMap<String, ConfigValue>,
    key: &str,
    task: &str,
) -> Result<Vec<String>, StrataError> {
    let Some(value) = table.get(key) else {
        return Ok(Vec::new());
    };
    let items = value.as_sequence().ok_or_else(|| StrataError::Task {
        message: format!("task `{task}`: `{key}` must be a list of strings"),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| StrataError::Task {
                message: format!("task `{task}`: `{key}` must be a list of strings"),
            })
        })
        .collect()
}

/// Extract explicit task declarations from an effective configuration, in
/// declaration (merged sequence) order.
pub fn tasks_from(config: &EffectiveConfig, layout: &OutputLayout) -> Result<Vec<TaskNode>, StrataError> {
    let Some(items) = config.get_sequence(TASKS_OPTION)? else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| TaskNode::from_value(item, layout))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn layout() -> OutputLayout {
        OutputLayout::new(Path::new("/work/android"), "../build")
    }

    fn table(pairs: &[(&str, ConfigValue)]) -> ConfigValue {
        ConfigValue::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn clean_defaults_to_build_dir() {
        let task = TaskNode::from_value(
            &table(&[("name", "clean".into()), ("action", "clean".into())]),
            &layout(),
        )
        .unwrap();
        assert_eq!(
            task.action,
            TaskAction::Clean {
                path: PathBuf::from("/work/build")
            }
        );
        assert!(task.after.is_empty());
    }

    #[test]
    fn exec_with_predecessors() {
        let task = TaskNode::from_value(
            &table(&[
                ("name", "assemble".into()),
                ("after", vec!["package"].into()),
                ("action", "exec".into()),
                ("program", "flutter".into()),
                ("args", vec!["build", "apk"].into()),
            ]),
            &layout(),
        )
        .unwrap();
        assert_eq!(task.after, vec!["package"]);
        assert_eq!(task.action.to_string(), "exec flutter build apk");
    }

    #[test]
    fn missing_name_or_program_rejected() {
        assert!(TaskNode::from_value(&table(&[("action", "noop".into())]), &layout()).is_err());
        assert!(TaskNode::from_value(
            &table(&[("name", "x".into()), ("action", "exec".into())]),
            &layout()
        )
        .is_err());
        assert!(TaskNode::from_value(
            &table(&[("name", "x".into()), ("action", "deploy".into())]),
            &layout()
        )
        .is_err());
    }

    #[test]
    fn mistyped_optional_fields_rejected() {
        let clean = table(&[
            ("name", "cleanGenerated".into()),
            ("action", "clean".into()),
            ("path", vec!["gen"].into()),
        ]);
        assert!(matches!(
            TaskNode::from_value(&clean, &layout()),
            Err(StrataError::Task { .. })
        ));

        let exec = table(&[
            ("name", "assemble".into()),
            ("action", "exec".into()),
            ("program", "flutter".into()),
            ("cwd", ConfigValue::Integer(1)),
        ]);
        assert!(TaskNode::from_value(&exec, &layout()).is_err());

        let typo = table(&[("name", "x".into()), ("action", ConfigValue::Integer(5))]);
        assert!(TaskNode::from_value(&typo, &layout()).is_err());
    }

    #[test]
    fn clean_resolves_declared_path() {
        let task = TaskNode::from_value(
            &table(&[
                ("name", "cleanGenerated".into()),
                ("action", "clean".into()),
                ("path", "gen".into()),
            ]),
            &layout(),
        )
        .unwrap();
        assert_eq!(
            task.action,
            TaskAction::Clean {
                path: PathBuf::from("/work/android/gen")
            }
        );
    }
}
