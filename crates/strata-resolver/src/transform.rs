//! Passes applied to a merged configuration before it is handed out.
//!
//! Each pass takes the configuration and everything it needs as arguments;
//! none of them read shared state.

use std::path::Path;

use strata_core::effective::{EffectiveConfig, ResolvedOption};
use strata_core::fragment::ConfigFragment;
use strata_core::layout::OutputLayout;
use strata_core::schema;
use strata_core::value::ConfigValue;
use strata_util::errors::StrataError;

use crate::merge::overlay;

/// Option holding a module's output directory.
pub const BUILD_DIR_OPTION: &str = "buildDir";

/// Scope recorded for values set by the layout pass.
pub const LAYOUT_SOURCE: &str = "<layout>";

/// Force the `[finalize]` values onto a merged target.
pub fn apply_finalize(config: &mut EffectiveConfig, finalize: &ConfigFragment) {
    tracing::debug!(
        "{}: applying `{}` ({} option(s))",
        config.target(),
        finalize.scope,
        finalize.options.len()
    );
    overlay(config, finalize);
}

/// Give the module its output directory under the project build directory,
/// unless a fragment already chose one.
pub fn apply_layout(config: &mut EffectiveConfig, layout: &OutputLayout, module: &str) {
    if config.contains(BUILD_DIR_OPTION) {
        return;
    }
    let dir = layout.module_dir(module);
    config.set(
        BUILD_DIR_OPTION,
        ResolvedOption::from_scope(ConfigValue::from(path_string(&dir)), LAYOUT_SOURCE),
    );
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Run every pass in order: finalize, layout, then schema defaults and rules.
pub fn finish(
    config: &mut EffectiveConfig,
    finalize: Option<&ConfigFragment>,
    layout: &OutputLayout,
    module: &str,
) -> Result<(), StrataError> {
    if let Some(finalize) = finalize {
        apply_finalize(config, finalize);
    }
    apply_layout(config, layout, module);
    schema::apply(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn leaf(value: impl Into<ConfigValue>, scope: &str) -> ResolvedOption {
        ResolvedOption::from_scope(value.into(), scope)
    }

    #[test]
    fn finalize_overrides_merged_value() {
        let mut config = EffectiveConfig::new("app");
        config.set("sourceCompatibility", leaf("17", "app"));
        let finalize = ConfigFragment::root(
            "finalize",
            BTreeMap::from([("sourceCompatibility".to_string(), ConfigValue::from("11"))]),
        );
        apply_finalize(&mut config, &finalize);
        let option = config.option("sourceCompatibility").unwrap();
        assert_eq!(option.value, ConfigValue::from("11"));
        assert_eq!(option.sources, vec!["finalize"]);
    }

    #[test]
    fn layout_sets_module_dir_once() {
        let layout = OutputLayout::new(Path::new("/work/android"), "../build");
        let mut config = EffectiveConfig::new("app/debug");
        apply_layout(&mut config, &layout, "app");
        assert_eq!(config.get_str(BUILD_DIR_OPTION).unwrap(), Some("/work/build/app"));

        let mut custom = EffectiveConfig::new("lib");
        custom.set(BUILD_DIR_OPTION, leaf("/elsewhere", "lib"));
        apply_layout(&mut custom, &layout, "lib");
        assert_eq!(custom.get_str(BUILD_DIR_OPTION).unwrap(), Some("/elsewhere"));
    }

    #[test]
    fn finish_reports_missing_required_option() {
        let layout = OutputLayout::new(Path::new("/work"), "build");
        let mut config = EffectiveConfig::new("app/release");
        config.set("compileSdkVersion", leaf(34, "root"));
        config.set("minSdkVersion", leaf(21, "root"));
        let err = finish(&mut config, None, &layout, "app").unwrap_err();
        assert!(matches!(
            err,
            StrataError::MissingRequiredOption { ref option, ref target }
                if option == "applicationId" && target == "app/release"
        ));
    }
}
