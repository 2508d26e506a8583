//! End-to-end tests for the `twolight` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use camino::Utf8PathBuf;
use plist::Value;
use twolight::{Theme, parse_theme};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_twolight"))
        .args(args)
        .output()
        .expect("failed to spawn twolight")
}

fn convert(out: &Path, extra: &[&str]) -> Output {
    let input = fixture("TwoDark.tmTheme");
    let vim = fixture("one.vim");
    let mut args = vec![
        "--in",
        input.to_str().unwrap(),
        "--vim",
        vim.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    run(&args)
}

fn load(path: &Path) -> Theme {
    parse_theme(&Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()).unwrap()
}

fn attr<'a>(theme: &'a Theme, scope: Option<&str>, key: &str) -> Option<&'a str> {
    theme
        .rules
        .iter()
        .find(|rule| rule.scope.as_deref() == scope)
        .and_then(|rule| rule.settings.get(key))
        .and_then(Value::as_string)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_converts_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let output = convert(&out, &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let theme = load(&out);
    assert_eq!(theme.header("name"), Some("TwoLight"));
    assert_eq!(theme.header("semanticClass"), Some("theme.light.two_light"));
    assert_ne!(
        theme.header("uuid"),
        Some("0AE2D35E-5F4D-4A4F-9C61-2B0B2E6D2B6C")
    );

    // Global settings.
    assert_eq!(attr(&theme, None, "background"), Some("#fafafa"));
    assert_eq!(attr(&theme, None, "foreground"), Some("#494b53"));
    assert_eq!(attr(&theme, None, "caret"), Some("#526fff"));
    assert_eq!(attr(&theme, None, "guide"), Some("#494b5320"));

    // The comment rule from the sample scenario.
    let comment = Some("comment, punctuation.definition.comment");
    assert_eq!(attr(&theme, comment, "foreground"), Some("#a0a1a7"));
    assert_eq!(attr(&theme, comment, "fontStyle"), Some("italic"));

    // Nearest match: #9BC37D is close to hue_4.
    assert_eq!(
        attr(&theme, Some("markup.inserted"), "foreground"),
        Some("#50a14f")
    );

    // Unmapped colours pass through untouched, one warning each.
    assert_eq!(
        attr(&theme, Some("invalid.illegal"), "background"),
        Some("#FF00FF")
    );
    assert_eq!(
        attr(&theme, Some("invalid.illegal"), "foreground"),
        Some("#FFFFFF")
    );
    let err = stderr(&output);
    assert!(err.contains("2 colour(s) have no palette equivalent"), "{err}");
    assert_eq!(err.matches("#ff00ff has no palette equivalent").count(), 1, "{err}");
}

#[test]
fn test_gutter_settings_are_remapped() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    assert!(convert(&out, &[]).status.success());

    let theme = load(&out);
    let gutter: Vec<_> = theme
        .color_attributes()
        .into_iter()
        .filter(|a| a.path == "gutterSettings")
        .map(|a| (a.key, a.value))
        .collect();
    assert_eq!(
        gutter,
        vec![("background", "#fafafa"), ("foreground", "#a0a1a7")]
    );
}

#[test]
fn test_scope_patches() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    assert!(convert(&out, &[]).status.success());

    let theme = load(&out);
    let scopes: Vec<_> = theme
        .rules
        .iter()
        .filter_map(|rule| rule.scope.as_deref())
        .collect();
    assert!(scopes.contains(&"support.class, entity.name.class, entity.name.type.class, entity.name"));
    assert!(scopes.contains(&"source.json meta.mapping.key.json string.quoted.double.json"));

    let unpatched = dir.path().join("Unpatched.tmTheme");
    assert!(convert(&unpatched, &["--no-patch"]).status.success());
    let theme = load(&unpatched);
    assert!(
        theme
            .rules
            .iter()
            .any(|rule| rule.scope.as_deref()
                == Some("source.json meta.structure.dictionary.json string.quoted.double.json"))
    );
}

#[test]
fn test_round_trip_keeps_rules_and_keys() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    assert!(convert(&out, &["--no-patch"]).status.success());

    let source = load(&fixture("TwoDark.tmTheme"));
    let light = load(&out);
    assert_eq!(source.rules.len(), light.rules.len());
    for (a, b) in source.rules.iter().zip(&light.rules) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.scope, b.scope);
        let keys_a: Vec<_> = a.settings.keys().collect();
        let keys_b: Vec<_> = b.settings.keys().collect();
        assert_eq!(keys_a, keys_b);
    }
}

#[test]
fn test_every_mapped_color_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    assert!(convert(&out, &["--no-patch"]).status.success());

    let source = load(&fixture("TwoDark.tmTheme"));
    let light = load(&out);
    let unmapped = ["#FF00FF", "#FFFFFF"];
    let before = source.color_attributes();
    let after = light.color_attributes();
    assert_eq!(before.len(), after.len());
    for (old, new) in before.iter().zip(&after) {
        let at = format!("{} {}", old.path, old.key);
        if unmapped.contains(&old.value) {
            assert_eq!(old.value, new.value, "{at} should pass through");
        } else {
            assert_ne!(old.value.to_lowercase(), new.value.to_lowercase(), "{at} not remapped");
        }
    }
}

#[test]
fn test_output_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.tmTheme");
    let second = dir.path().join("b.tmTheme");
    assert!(convert(&first, &[]).status.success());
    assert!(convert(&second, &[]).status.success());
    assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
}

#[test]
fn test_overwrites_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    std::fs::write(&out, "stale").unwrap();
    assert!(convert(&out, &[]).status.success());
    assert!(load(&out).rules.len() > 1);
}

#[test]
fn test_creates_missing_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("themes/light/TwoLight.tmTheme");
    assert!(convert(&out, &[]).status.success());
    assert!(out.exists());
}

#[test]
fn test_log_non_exact_lists_events() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let output = convert(&out, &["--log-non-exact"]);
    assert!(output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Non-exact remaps:"), "{err}");
    assert!(
        err.contains("nearest\tsettings[7].settings(name=Inserted scope=markup.inserted)\tforeground\t#9BC37D -> #50a14f"),
        "{err}"
    );
    assert!(err.contains("unchanged\tsettings[8].settings"), "{err}");
}

#[test]
fn test_custom_identity() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("Custom.tmTheme");
    let output = convert(
        &out,
        &["--name", "OneLight", "--semantic-class", "theme.light.one_light"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let theme = load(&out);
    assert_eq!(theme.header("name"), Some("OneLight"));
    assert_eq!(theme.header("semanticClass"), Some("theme.light.one_light"));
}

#[test]
fn test_threshold_zero_keeps_near_colors() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let output = convert(&out, &["--nearest-threshold", "0"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let theme = load(&out);
    assert_eq!(
        attr(&theme, Some("markup.inserted"), "foreground"),
        Some("#9BC37D")
    );
}

#[test]
fn test_missing_settings_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let input = fixture("NoSettings.tmTheme");
    let vim = fixture("one.vim");
    let output = run(&[
        "--in",
        input.to_str().unwrap(),
        "--vim",
        vim.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("missing required key `settings`"), "{err}");
    assert!(!out.exists());
}

#[test]
fn test_bad_palette_fails() {
    let dir = tempfile::tempdir().unwrap();
    let vim = dir.path().join("broken.vim");
    std::fs::write(
        &vim,
        "if &background ==# 'dark'\n  let s:mono_1 = ['#abb', '145']\nelse\n  let s:mono_1 = ['#494b53', '23']\nendif\n",
    )
    .unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let input = fixture("TwoDark.tmTheme");
    let output = run(&[
        "--in",
        input.to_str().unwrap(),
        "--vim",
        vim.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("line 2"), "{}", stderr(&output));
    assert!(!out.exists());
}

#[test]
fn test_missing_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("TwoLight.tmTheme");
    let vim = fixture("one.vim");
    let output = run(&[
        "--in",
        "does-not-exist.tmTheme",
        "--vim",
        vim.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does-not-exist.tmTheme"));
    assert!(!out.exists());
}

#[test]
fn test_missing_required_flag_fails() {
    let vim = fixture("one.vim");
    let output = run(&["--vim", vim.to_str().unwrap()]);
    assert!(!output.status.success());
}
