//! Fallible parsing, split out from `swc_utils_parse` (which unwraps — fine
//! for test fixtures, not for a loader that must turn a malformed file into
//! a `PARSE_ERROR` diagnostic instead of panicking).

use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{Capturing, Parser};

pub fn parse_module(
    file_name: &str,
    source: &str,
) -> Result<(Lrc<SourceMap>, Module), String> {
    let cm = Lrc::<SourceMap>::default();
    let fname: Lrc<FileName> = Lrc::new(FileName::Real(file_name.into()));
    let fm = cm.new_source_file(fname, source.to_string());

    let lexer = swc_utils_parse::create_lexer(&fm, None);
    let capturing = Capturing::new(lexer);
    let mut parser: Parser<Capturing<_>> = Parser::new_from(capturing);

    let module = parser
        .parse_typescript_module()
        .map_err(|err| format!("{err:?}"))?;

    let recovered = parser.take_errors();
    if let Some(first) = recovered.into_iter().next() {
        return Err(format!("{first:?}"));
    }

    Ok((cm, module))
}
