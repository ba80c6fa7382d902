//! End-to-end scenarios against a real on-disk tree, driving the full
//! `Bundler::build` pipeline through `ModuleSourceAdapter` rather than the
//! `FakeSource` fixtures the lower crates use for unit tests.

use pretty_assertions::assert_eq;
use test_tmpdir::{map, TmpDir};

use crate::{BuildOptions, Bundler, CancelToken, OutputFormat, OutputOptions};

fn options(tmp: &TmpDir, entries: &[&str]) -> BuildOptions {
    BuildOptions {
        root_dir: tmp.root().to_path_buf(),
        entries: entries.iter().map(|e| tmp.root_join(e).to_string_lossy().to_string()).collect(),
        external: Vec::new(),
        concurrency: 4,
    }
}

fn esm_output() -> OutputOptions {
    OutputOptions {
        format: OutputFormat::Esm,
        global_name: None,
        file_name_template: "[name].js".to_string(),
    }
}

async fn build(tmp: &TmpDir, entries: &[&str], output: OutputOptions) -> crate::BuildOutput {
    let bundler = Bundler::new(Vec::new());
    bundler
        .build(&options(tmp, entries), &output, &CancelToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn s1_dead_named_export_is_dropped_from_the_shared_entry_chunk() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import { x } from './a.js';\nconsole.log(x);\n",
        "a.js" => "export const x = 1;\nexport const y = 2;\n",
    });

    let out = build(&tmp, &["main.js"], esm_output()).await;

    assert_eq!(out.chunks.len(), 1);
    let code = &out.chunks[0].code;
    assert!(code.contains('1'));
    assert!(code.contains("console.log"));
    assert!(!code.contains('2'));
}

#[tokio::test]
async fn s2_two_entries_sharing_a_module_split_into_three_chunks() {
    let tmp = TmpDir::new_with_content(&map! {
        "p.js" => "import { s } from './s.js';\nconsole.log('p', s);\n",
        "q.js" => "import { s } from './s.js';\nconsole.log('q', s);\n",
        "s.js" => "export const s = 1;\n",
    });

    let out = build(&tmp, &["p.js", "q.js"], esm_output()).await;

    assert_eq!(out.chunks.len(), 3);
}

#[tokio::test]
async fn s3_side_effect_only_import_is_preserved() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import './side.js';\n",
        "side.js" => "console.log('hi');\n",
    });

    let out = build(&tmp, &["main.js"], esm_output()).await;

    assert_eq!(out.chunks.len(), 1);
    assert!(out.chunks[0].code.contains("console.log('hi')"));
}

#[tokio::test]
async fn s5_esm_cycle_is_a_warning_not_a_build_failure() {
    let tmp = TmpDir::new_with_content(&map! {
        "a.js" => "import { callB } from './b.js';\nexport function callA() { return callB(); }\n",
        "b.js" => "import { callA } from './a.js';\nexport function callB() { return 1; }\nexport function useA() { return callA(); }\n",
    });

    let out = build(&tmp, &["a.js"], esm_output()).await;

    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.code == diagnostic::DiagnosticCode::CircularDependency));
    assert!(out.diagnostics.iter().all(|d| !d.is_fatal()));
}

#[tokio::test]
async fn s6_impure_initializer_dropped_when_its_binding_is_unused() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import './lib.js';\nconsole.log('done');\n",
        "lib.js" => "// @bundler-side-effects false\nfunction f() { return Math.random(); }\nexport const k = f();\n",
    });

    let out = build(&tmp, &["main.js"], esm_output()).await;

    assert_eq!(out.chunks.len(), 1);
    assert!(!out.chunks[0].code.contains("Math.random"));
}

#[tokio::test]
async fn bare_specifier_import_is_kept_as_an_external_runtime_import() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import { pad } from 'left-pad';\nconsole.log(pad);\n",
    });

    let out = build(&tmp, &["main.js"], esm_output()).await;

    assert_eq!(out.chunks.len(), 1);
    assert!(out.chunks[0].code.contains("from 'left-pad'"));
}

#[tokio::test]
async fn external_allow_list_downgrades_a_missing_relative_import_to_a_warning() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import { pad } from './vendor/left-pad.js';\nconsole.log(pad);\n",
    });

    let mut build_options = options(&tmp, &["main.js"]);
    build_options.external = vec!["./vendor/left-pad.js".to_string()];

    let bundler = Bundler::new(Vec::new());
    let out = bundler
        .build(&build_options, &esm_output(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(out.chunks.len(), 1);
    assert!(out.chunks[0].code.contains("from './vendor/left-pad.js'"));
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.code == diagnostic::DiagnosticCode::UnresolvedImport
            && d.severity == diagnostic::Severity::Warning));
}

#[tokio::test]
async fn cancelling_before_build_starts_short_circuits_with_no_output() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "console.log('hi');\n",
    });

    let bundler = Bundler::new(Vec::new());
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = bundler.build(&options(&tmp, &["main.js"]), &esm_output(), &cancel).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn repeated_builds_of_the_same_input_are_byte_identical() {
    let tmp = TmpDir::new_with_content(&map! {
        "main.js" => "import { x } from './a.js';\nconsole.log(x);\n",
        "a.js" => "export const x = 1;\n",
    });

    let bundler = Bundler::new(Vec::new());
    let first = bundler
        .build(&options(&tmp, &["main.js"]), &esm_output(), &CancelToken::new())
        .await
        .unwrap();
    let second = bundler
        .build(&options(&tmp, &["main.js"]), &esm_output(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(
        first.chunks.iter().map(|c| (&c.file_name, &c.code)).collect::<Vec<_>>(),
        second.chunks.iter().map(|c| (&c.file_name, &c.code)).collect::<Vec<_>>(),
    );
}
