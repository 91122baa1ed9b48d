//! Tasks implied by applied plugins.
//!
//! Applying a plugin in the `plugins` option makes its tasks available
//! without declaring them. Their real work belongs to the external
//! toolchain, so implicit tasks carry a no-op action; an explicit declaration
//! of the same name takes over.

use strata_core::effective::EffectiveConfig;
use strata_core::layout::OutputLayout;
use strata_core::task::{tasks_from, TaskAction, TaskNode};
use strata_util::errors::StrataError;

/// Option listing applied plugin ids.
pub const PLUGINS_OPTION: &str = "plugins";

/// Name of the task that removes the build directory.
pub const CLEAN_TASK: &str = "clean";

/// A task contributed by a plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginTask {
    pub name: &'static str,
    pub after: &'static [&'static str],
    /// Tasks this one must run before, when they exist.
    pub before: &'static [&'static str],
}

const fn task(
    name: &'static str,
    after: &'static [&'static str],
    before: &'static [&'static str],
) -> PluginTask {
    PluginTask { name, after, before }
}

/// Known plugin ids and the tasks they contribute.
pub const PLUGINS: &[(&str, &[PluginTask])] = &[
    (
        "com.android.application",
        &[task("compile", &[], &[]), task("package", &["compile"], &[])],
    ),
    ("com.android.library", &[task("compile", &[], &[])]),
    ("kotlin-android", &[task("compileKotlin", &[], &["compile"])]),
    ("org.jetbrains.kotlin.android", &[task("compileKotlin", &[], &["compile"])]),
    (
        "com.google.gms.google-services",
        &[task("processGoogleServices", &[], &["compile"])],
    ),
    (
        "dev.flutter.flutter-gradle-plugin",
        &[task("compileFlutterBuild", &[], &["compile"])],
    ),
];

/// Tasks contributed by one plugin id, if it is known.
pub fn plugin_tasks(id: &str) -> Option<&'static [PluginTask]> {
    PLUGINS
        .iter()
        .find(|(plugin, _)| *plugin == id)
        .map(|(_, tasks)| *tasks)
}

/// Every task of a target, in declaration order: the implicit `clean`, the
/// plugin tasks in plugin order, then explicit declarations. A name declared
/// twice keeps its first position and its last definition.
pub fn collect_tasks(
    config: &EffectiveConfig,
    layout: &OutputLayout,
) -> Result<Vec<TaskNode>, StrataError> {
    let plugins: Vec<String> = match config.get_sequence(PLUGINS_OPTION)? {
        Some(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| StrataError::InvalidOption {
                    option: PLUGINS_OPTION.to_string(),
                    message: format!("plugin ids must be strings, found {item}"),
                })
            })
            .collect::<Result<_, _>>()?,
        None => Vec::new(),
    };

    let mut implied: Vec<PluginTask> = Vec::new();
    for id in &plugins {
        match plugin_tasks(id) {
            Some(tasks) => {
                for t in tasks {
                    if !implied.iter().any(|existing| existing.name == t.name) {
                        implied.push(*t);
                    }
                }
            }
            None => tracing::debug!("plugin `{id}` contributes no tasks"),
        }
    }

    let mut tasks = vec![TaskNode::new(
        CLEAN_TASK,
        &[],
        TaskAction::Clean {
            path: layout.build_dir().to_path_buf(),
        },
    )];
    tasks.extend(implied.iter().map(|t| TaskNode::new(t.name, t.after, TaskAction::Noop)));

    let explicit = tasks_from(config, layout)?;
    let explicit_names: Vec<String> = explicit.iter().map(|t| t.name.clone()).collect();
    for task in explicit {
        match tasks.iter_mut().find(|t| t.name == task.name) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
    }

    // Implicit predecessors only apply when the other end exists.
    let declared: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
    for task in tasks.iter_mut() {
        if !explicit_names.contains(&task.name) {
            task.after.retain(|pred| declared.contains(pred));
        }
    }
    for t in &implied {
        if !declared.iter().any(|d| d == t.name) {
            continue;
        }
        for successor in t.before {
            if explicit_names.iter().any(|name| name == successor) {
                continue;
            }
            if let Some(next) = tasks.iter_mut().find(|n| n.name == *successor) {
                if !next.after.iter().any(|a| a == t.name) {
                    next.after.push(t.name.to_string());
                }
            }
        }
    }

    tracing::debug!(
        "{}: {} task(s) from {} plugin(s)",
        config.target(),
        tasks.len(),
        plugins.len()
    );
    Ok(tasks)
}
