use crate::Loc;
use swc_common::{SourceMap, Span};

/// Renders a source excerpt with a caret under the offending column, the way
/// a bundler error frame looks: the offending line (plus one line of
/// context either side when available) followed by a `^` pointer.
pub fn render_frame(cm: &SourceMap, span: Span) -> (Loc, String) {
    let loc = cm.lookup_char_pos(span.lo);
    let file = &loc.file;

    let line_idx = loc.line.saturating_sub(1);
    let start_line = line_idx.saturating_sub(1);
    let end_line = (line_idx + 1).min(file.count_lines().saturating_sub(1));

    let mut frame = String::new();
    for idx in start_line..=end_line {
        let Some(line_text) = file.get_line(idx) else {
            continue;
        };
        frame.push_str(&format!("{:>4} | {}\n", idx + 1, line_text.trim_end()));
        if idx == line_idx {
            let caret_col = loc.col_display;
            frame.push_str("     | ");
            frame.push_str(&" ".repeat(caret_col));
            frame.push_str("^\n");
        }
    }

    (
        Loc {
            file: file.name.to_string(),
            line: loc.line,
            column: loc.col_display,
        },
        frame.trim_end().to_string(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use swc_common::Spanned;

    #[test]
    fn renders_caret_under_the_right_column() {
        let (cm, module) =
            swc_utils_parse::parse_ecma_src("main.js", "import x from './a';\nconsole.log(x);\n");
        let span = module.body[1].span();
        let (loc, frame) = render_frame(&cm, span);
        assert_eq!(loc.line, 2);
        assert!(frame.contains("console.log"));
        assert!(frame.contains('^'));
    }
}
