//! Built-in rule tables.

use crate::{ReincError, ReplacerConfig, Result, RuleConfig, RuleMode};

/// Names accepted by [`preset`].
pub const PRESET_NAMES: &[&str] = &["sh", "c"];

/// Names of the built-in presets, in documentation order.
pub fn preset_names() -> &'static [&'static str] {
    PRESET_NAMES
}

/// Look up a built-in rule table by name.
///
/// - `sh`: `. "path"`, `source 'path'` and bare-word forms, resolved against
///   the working directory.
/// - `c`: `#include "path"`, resolved against the including file.
///
/// Every preset rule echoes directives it cannot resolve.
pub fn preset(name: &str) -> Result<ReplacerConfig> {
    match name {
        "sh" => Ok(shell()),
        "c" => Ok(c()),
        other => Err(ReincError::PresetNotFound(other.to_string())),
    }
}

fn shell() -> ReplacerConfig {
    let rule = |pattern: &str| {
        RuleConfig::new(pattern, "$1")
            .with_ignore_error(true)
            .with_mode(RuleMode::WorkDir)
    };

    ReplacerConfig::new(vec![
        rule(r#"(?m)^\s*(?:\.|source)\s+"([^"]+)"\s*$"#),
        rule(r#"(?m)^\s*(?:\.|source)\s+'([^']+)'\s*$"#),
        rule(r#"(?m)^\s*(?:\.|source)\s+(\S+)\s*$"#),
    ])
}

fn c() -> ReplacerConfig {
    ReplacerConfig::new(vec![RuleConfig::new(r#"(?m)^#\s*(?:include)\s+"([^"]+)"\s*$"#, "$1")
        .with_ignore_error(true)
        .with_mode(RuleMode::FileDir)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rule, RuleSet};

    #[test]
    fn test_presets_compile() {
        for name in preset_names() {
            let config = preset(name).unwrap();
            assert!(RuleSet::from_config(&config).is_ok(), "preset {}", name);
        }
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(preset_names(), ["sh", "c"]);
        assert!(preset_names().iter().all(|name| preset(name).is_ok()));
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            preset("fortran"),
            Err(ReincError::PresetNotFound(ref n)) if n == "fortran"
        ));
    }

    #[test]
    fn test_shell_forms() {
        let rules = RuleSet::from_config(&preset("sh").unwrap()).unwrap();

        for (line, expected) in [
            (". \"lib/a.sh\"", "lib/a.sh"),
            ("  source 'b c.sh'", "b c.sh"),
            ("source plain.sh", "plain.sh"),
        ] {
            let found = rules.find_earliest(line.as_bytes()).unwrap();
            let matched = &line.as_bytes()[found.range.clone()];
            assert_eq!(
                found.rule.target_path(matched),
                std::path::PathBuf::from(expected),
                "line {:?}",
                line
            );
        }

        assert!(rules.find_earliest(b"echo source.sh").is_none());
    }

    #[test]
    fn test_c_include() {
        let config = preset("c").unwrap();
        let rule = Rule::new(&config.rules[0]).unwrap();
        assert_eq!(rule.mode(), RuleMode::FileDir);

        let src = b"int x;\n#include \"util.h\"\n#include <stdio.h>\n";
        let range = rule.find(src).unwrap();
        assert_eq!(&src[range.clone()], b"#include \"util.h\"");
        assert_eq!(rule.target_path(&src[range]), std::path::PathBuf::from("util.h"));
    }
}
