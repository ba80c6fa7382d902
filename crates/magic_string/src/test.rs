use pretty_assertions::assert_eq;

use super::*;

#[test]
fn untouched_buffer_renders_unchanged() {
    let s = MagicString::new("const a = 1;");
    assert_eq!(s.render(), "const a = 1;");
}

#[test]
fn remove_deletes_the_range() {
    let mut s = MagicString::new("const a = 1;\nconst b = 2;\n");
    s.remove(0..13).unwrap();
    assert_eq!(s.render(), "const b = 2;\n");
}

#[test]
fn overwrite_replaces_the_range() {
    let mut s = MagicString::new("const a = 1;");
    s.overwrite(6..7, "a$1").unwrap();
    assert_eq!(s.render(), "const a$1 = 1;");
}

#[test]
fn prepend_and_append_wrap_the_buffer() {
    let mut s = MagicString::new("body();");
    s.prepend("// generated\n");
    s.append("\n// end");
    assert_eq!(s.render(), "// generated\nbody();\n// end");
}

#[test]
fn later_prepend_calls_land_closer_to_the_original_content() {
    let mut s = MagicString::new("x");
    s.prepend("first\n");
    s.prepend("second\n");
    assert_eq!(s.render(), "first\nsecond\nx");
}

#[test]
fn non_overlapping_edits_compose_left_to_right() {
    let mut s = MagicString::new("import { a, b } from './lib';");
    s.remove(9..10).unwrap();
    s.overwrite(12..13, "bRenamed").unwrap();
    assert_eq!(s.render(), "import { a bRenamed } from './lib';");
}

#[test]
fn overlapping_edits_are_rejected() {
    let mut s = MagicString::new("abcdef");
    s.overwrite(0..3, "xyz").unwrap();
    let err = s.overwrite(2..4, "zzz").unwrap_err();
    assert!(err.to_string().contains("overlaps"));
}

#[test]
fn out_of_bounds_range_is_rejected() {
    let mut s = MagicString::new("abc");
    let err = s.remove(0..10).unwrap_err();
    assert!(err.to_string().contains("out of bounds"));
}

#[test]
fn range_splitting_a_multibyte_character_is_rejected() {
    let mut s = MagicString::new("caf\u{e9}");
    let bad_offset = "caf".len() + 1;
    let err = s.overwrite(0..bad_offset, "x").unwrap_err();
    assert!(err.to_string().contains("character boundary"));
}
