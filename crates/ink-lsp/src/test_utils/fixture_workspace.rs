//! Deterministic fixture story generator for benchmarks and tests.
//!
//! Generates a synthetic ink project: a `main.ink` that includes
//! `file_N.ink` files, each holding knots with stitches, text and diverts,
//! together with the syntax tree the compiler would report for it.
//!
//! All output is deterministic, so benchmarks are reproducible.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use tempfile::TempDir;
use tower_lsp::lsp_types::Position;

use crate::syntax::{
    DebugMetadata, Divert, Flow, FlowLevel, Identifier, NodeId, NodeKind, SyntaxTree, TreeBuilder,
};

/// Configuration for generating a fixture story.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub knots_per_file: usize,
    pub stitches_per_knot: usize,
    pub lines_per_stitch: usize,
}

impl FixtureConfig {
    /// Small story: 3 files, 5 knots each, 2 stitches per knot.
    pub fn small() -> Self {
        Self {
            file_count: 3,
            knots_per_file: 5,
            stitches_per_knot: 2,
            lines_per_stitch: 3,
        }
    }

    /// Medium story: 10 files, 10 knots each, 3 stitches per knot.
    pub fn medium() -> Self {
        Self {
            file_count: 10,
            knots_per_file: 10,
            stitches_per_knot: 3,
            lines_per_stitch: 5,
        }
    }

    /// Large story: 40 files, 20 knots each, 4 stitches per knot.
    pub fn large() -> Self {
        Self {
            file_count: 40,
            knots_per_file: 20,
            stitches_per_knot: 4,
            lines_per_stitch: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    pub name: String,
    pub content: String,
}

/// A divert whose last component names `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivertSite {
    pub file: String,
    /// Position on the last path component.
    pub position: Position,
    /// `knot` or `knot.stitch`.
    pub target: String,
}

#[derive(Debug)]
pub struct FixtureStory {
    pub files: Vec<FixtureFile>,
    pub tree: SyntaxTree,
    pub diverts: Vec<DivertSite>,
    /// Start of each flow name (`knot` or `knot.stitch`), zero-based.
    pub declarations: HashMap<String, (String, Position)>,
}

impl FixtureStory {
    pub fn declaration(&self, name: &str) -> Option<&(String, Position)> {
        self.declarations.get(name)
    }
}

/// Writes one file and hands out one-based spans on it.
struct FileWriter {
    name: String,
    content: String,
    lines: u32,
}

impl FileWriter {
    fn new(name: String) -> Self {
        Self {
            name,
            content: String::new(),
            lines: 0,
        }
    }

    /// Append a line, returning its one-based number.
    fn push(&mut self, text: &str) -> u32 {
        writeln!(self.content, "{}", text).unwrap();
        self.lines += 1;
        self.lines
    }

    fn span(&self, start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Option<DebugMetadata> {
        Some(DebugMetadata::new(
            self.name.clone(),
            start_line,
            start_column,
            end_line,
            end_column,
        ))
    }

    fn finish(self) -> FixtureFile {
        FixtureFile {
            name: self.name,
            content: self.content,
        }
    }
}

fn knot_name(file: usize, knot: usize) -> String {
    format!("knot_{}_{}", file, knot)
}

fn stitch_name(stitch: usize) -> String {
    format!("stitch_{}", stitch)
}

struct Generator<'a> {
    config: &'a FixtureConfig,
    builder: TreeBuilder,
    diverts: Vec<DivertSite>,
    declarations: HashMap<String, (String, Position)>,
}

impl Generator<'_> {
    fn lines_per_knot(&self) -> u32 {
        2 + (self.config.stitches_per_knot * (self.config.lines_per_stitch + 2)) as u32
    }

    /// Path the divert at the end of `stitch` leads to.
    fn next_target(&self, file: usize, knot: usize, stitch: usize) -> Vec<String> {
        if stitch + 1 < self.config.stitches_per_knot {
            return vec![knot_name(file, knot), stitch_name(stitch + 1)];
        }
        if knot + 1 < self.config.knots_per_file {
            return vec![knot_name(file, knot + 1)];
        }
        if file + 1 < self.config.file_count {
            return vec![knot_name(file + 1, 0)];
        }
        vec!["END".to_string()]
    }

    fn divert(&mut self, writer: &mut FileWriter, parent: NodeId, target: &[String]) {
        let text = format!("-> {}", target.join("."));
        let line = writer.push(&text);
        let mut column = 4;
        let mut last_start = column;
        let mut components = Vec::new();
        for name in target {
            let end = column + name.len() as u32;
            components.push(Identifier::new(name.as_str(), writer.span(line, column, line, end)));
            last_start = column;
            column = end + 1;
        }
        self.builder.add(
            parent,
            NodeKind::Divert(Divert { target: components }),
            writer.span(line, 1, line, text.len() as u32 + 1),
        );
        if target.last().map(String::as_str) != Some("END") {
            self.diverts.push(DivertSite {
                file: writer.name.clone(),
                position: Position::new(line - 1, last_start - 1),
                target: target.join("."),
            });
        }
    }

    fn flow(
        &mut self,
        writer: &mut FileWriter,
        parent: NodeId,
        level: FlowLevel,
        header: String,
        name: &str,
        length: u32,
    ) -> (NodeId, Position) {
        let line = writer.push(&header);
        let column = header.find(name).unwrap_or(0) as u32 + 1;
        let identifier = Identifier::new(
            name,
            writer.span(line, column, line, column + name.len() as u32),
        );
        let id = self.builder.add(
            parent,
            NodeKind::Flow(Flow::new(level, Some(identifier))),
            writer.span(line, 1, line + length, 1),
        );
        (id, Position::new(line - 1, column - 1))
    }

    fn declare(&mut self, key: String, file: &str, position: Position) {
        self.declarations.insert(key, (file.to_string(), position));
    }

    fn file(&mut self, index: usize) -> FixtureFile {
        let mut writer = FileWriter::new(format!("file_{}.ink", index));
        let root = self.builder.root();

        for k in 0..self.config.knots_per_file {
            let knot = knot_name(index, k);
            let (knot_id, position) = self.flow(
                &mut writer,
                root,
                FlowLevel::Knot,
                format!("=== {} ===", knot),
                &knot,
                self.lines_per_knot(),
            );
            self.declare(knot.clone(), &writer.name, position);
            let text = format!("Arriving at {}.", knot);
            let line = writer.push(&text);
            let weave = self.builder.add(knot_id, NodeKind::Weave, writer.span(line, 1, line + 1, 1));
            self.builder.add(
                weave,
                NodeKind::Text { text },
                writer.span(line, 1, line, line_len(&writer, line)),
            );

            for s in 0..self.config.stitches_per_knot {
                let stitch = stitch_name(s);
                let (stitch_id, position) = self.flow(
                    &mut writer,
                    knot_id,
                    FlowLevel::Stitch,
                    format!("= {}", stitch),
                    &stitch,
                    self.config.lines_per_stitch as u32 + 2,
                );
                self.declare(format!("{}.{}", knot, stitch), &writer.name, position);
                let first = writer.lines + 1;
                let last = first + self.config.lines_per_stitch as u32;
                let weave = self
                    .builder
                    .add(stitch_id, NodeKind::Weave, writer.span(first, 1, last + 1, 1));
                for l in 0..self.config.lines_per_stitch {
                    let text = format!("Line {} of {} in {}.", l, stitch, knot);
                    let line = writer.push(&text);
                    self.builder.add(
                        weave,
                        NodeKind::Text { text },
                        writer.span(line, 1, line, line_len(&writer, line)),
                    );
                }
                let target = self.next_target(index, k, s);
                self.divert(&mut writer, weave, &target);
            }
        }
        writer.finish()
    }
}

fn line_len(writer: &FileWriter, line: u32) -> u32 {
    writer
        .content
        .lines()
        .nth(line as usize - 1)
        .map_or(1, |text| text.len() as u32 + 1)
}

/// Generate the story text and its syntax tree.
pub fn generate_story(config: &FixtureConfig) -> FixtureStory {
    let mut generator = Generator {
        config,
        builder: TreeBuilder::story(),
        diverts: Vec::new(),
        declarations: HashMap::new(),
    };
    let root = generator.builder.root();

    let mut main = FileWriter::new("main.ink".to_string());
    for i in 0..config.file_count {
        let line = main.push(&format!("INCLUDE file_{}.ink", i));
        generator
            .builder
            .add(root, NodeKind::Other, main.span(line, 1, line, 20));
    }
    let weave = generator.builder.add(root, NodeKind::Weave, None);
    let start = if config.file_count > 0 && config.knots_per_file > 0 {
        vec![knot_name(0, 0)]
    } else {
        vec!["END".to_string()]
    };
    generator.divert(&mut main, weave, &start);

    let mut files = vec![main.finish()];
    for i in 0..config.file_count {
        files.push(generator.file(i));
    }

    FixtureStory {
        files,
        tree: generator.builder.finish().expect("fixture tree is well formed"),
        diverts: generator.diverts,
        declarations: generator.declarations,
    }
}

/// Create a temporary fixture workspace from the given configuration.
///
/// Returns a `TempDir` whose path contains the generated `.ink` files.
/// The directory is cleaned up when the `TempDir` is dropped.
pub fn create_fixture_workspace(config: &FixtureConfig) -> (TempDir, FixtureStory) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    let story = generate_story(config);
    write_fixture_workspace(temp_dir.path(), &story);
    (temp_dir, story)
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, story: &FixtureStory) {
    for file in &story.files {
        std::fs::write(dir.join(&file.name), &file.content)
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", file.name, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_preset_values() {
        let config = FixtureConfig::small();
        assert_eq!(config.file_count, 3);
        assert_eq!(config.knots_per_file, 5);
        assert_eq!(config.stitches_per_knot, 2);
    }

    #[test]
    fn test_deterministic_output() {
        let config = FixtureConfig::small();
        let first = generate_story(&config);
        let second = generate_story(&config);
        assert_eq!(first.files, second.files);
        assert_eq!(first.diverts, second.diverts);
    }

    #[test]
    fn test_main_includes_every_file() {
        let config = FixtureConfig::small();
        let story = generate_story(&config);
        assert_eq!(story.files.len(), config.file_count + 1);
        let main = &story.files[0];
        assert_eq!(main.name, "main.ink");
        assert_eq!(
            main.content.lines().filter(|l| l.starts_with("INCLUDE ")).count(),
            config.file_count
        );
        assert!(main.content.ends_with("-> knot_0_0\n"));
    }

    #[test]
    fn test_declared_names_match_text() {
        let story = generate_story(&FixtureConfig::small());
        let (file, position) = story.declaration("knot_1_2.stitch_1").unwrap();
        let content = &story.files.iter().find(|f| &f.name == file).unwrap().content;
        let line = content.lines().nth(position.line as usize).unwrap();
        assert_eq!(&line[position.character as usize..], "stitch_1");
    }

    #[test]
    fn test_divert_positions_point_at_target_text() {
        let story = generate_story(&FixtureConfig::small());
        assert!(!story.diverts.is_empty());
        for site in &story.diverts {
            let content = &story.files.iter().find(|f| f.name == site.file).unwrap().content;
            let line = content.lines().nth(site.position.line as usize).unwrap();
            let last = site.target.rsplit('.').next().unwrap();
            assert!(line[site.position.character as usize..].starts_with(last), "{line}");
        }
    }

    #[test]
    fn test_workspace_written_to_disk() {
        let (dir, story) = create_fixture_workspace(&FixtureConfig::small());
        for file in &story.files {
            let on_disk = std::fs::read_to_string(dir.path().join(&file.name)).unwrap();
            assert_eq!(on_disk, file.content);
        }
    }
}
