//! Output file names per chunk: an entry's own chunk is named after the
//! entry module's file stem, matching a plain bundler's default
//! `[name].js` template; every other (shared, non-entry) chunk falls back
//! to a positional `chunk-N.js` name.

use chunker::ChunkGraph;
use graph::ModuleGraph;

use crate::FileNames;

pub fn chunk_file_names(graph: &ModuleGraph, chunks: &ChunkGraph) -> FileNames {
    let mut names = FileNames::default();
    for entry in &graph.entries {
        let Some(chunk) = chunks.chunk_of(entry) else {
            continue;
        };
        names
            .entry(chunk.id)
            .or_insert_with(|| format!("{}.js", crate::file_stem(entry)));
    }
    for chunk in &chunks.chunks {
        names
            .entry(chunk.id)
            .or_insert_with(|| format!("chunk-{}.js", chunk.id));
    }
    names
}

#[cfg(test)]
mod test {
    use ahashmap::AHashSet;
    use chunker::Chunk;
    use resolver::ModuleId;

    use super::*;

    #[test]
    fn entry_chunk_is_named_after_the_entry_stem() {
        let mut graph = ModuleGraph::default();
        let entry = ModuleId::from("src/main.js");
        graph.entries.push(entry.clone());
        let chunks = ChunkGraph {
            chunks: vec![Chunk {
                id: 0,
                modules: vec![entry.clone()],
                entries: AHashSet::from_iter([entry]),
                exports: AHashSet::default(),
                imports: Vec::new(),
            }],
        };
        let names = chunk_file_names(&graph, &chunks);
        assert_eq!(names[&0], "main.js");
    }

    #[test]
    fn non_entry_chunk_gets_a_positional_name() {
        let graph = ModuleGraph::default();
        let chunks = ChunkGraph {
            chunks: vec![Chunk {
                id: 3,
                modules: vec![ModuleId::from("shared.js")],
                entries: AHashSet::default(),
                exports: AHashSet::default(),
                imports: Vec::new(),
            }],
        };
        let names = chunk_file_names(&graph, &chunks);
        assert_eq!(names[&3], "chunk-3.js");
    }
}
