//! Block state machine: tracks the open block, buffers its raw lines, and decides when it closes.
//!
//! [`transition`] is a pure function of the current state and one line. [`BlockMachine`] owns
//! the pending lines and turns transitions into [`Effect`]s for the commit pipeline.

use tracing::trace;

use super::classify::{classify_line, is_blank, is_closing_fence, leading_indent, Fence, LineClass};

/// List context carried while a list is open, and saved while a nested block interrupts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListContext {
    /// Minimum marker indent seen in this list.
    pub base_indent: usize,
    /// Indent of the most recent marker.
    pub marker_indent: usize,
}

impl ListContext {
    fn new(indent: usize) -> Self {
        Self {
            base_indent: indent,
            marker_indent: indent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Ready,
    InParagraph,
    InFencedCode {
        fence: Fence,
        resume: Option<ListContext>,
    },
    InTable {
        resume: Option<ListContext>,
    },
    InList(ListContext),
    InBlockquote {
        resume: Option<ListContext>,
    },
}

impl BlockState {
    /// The block kind a forced close of this state commits as.
    fn commit_kind(&self) -> Option<BlockKind> {
        match self {
            Self::Ready => None,
            Self::InParagraph => Some(BlockKind::Paragraph),
            Self::InFencedCode { resume: None, .. } => Some(BlockKind::FencedCode),
            Self::InTable { resume: None } => Some(BlockKind::Table),
            Self::InBlockquote { resume: None } => Some(BlockKind::Blockquote),
            Self::InFencedCode { resume: Some(_), .. }
            | Self::InTable { resume: Some(_) }
            | Self::InBlockquote { resume: Some(_) }
            | Self::InList(_) => Some(BlockKind::ListItems),
        }
    }
}

/// What a commit contained; used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    ThematicBreak,
    Paragraph,
    FencedCode,
    Table,
    ListItems,
    Blockquote,
}

/// What to do with the line just classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Append the line to the committed document without rendering.
    Passthrough,
    /// Append the line to the open block.
    Buffer,
    /// Append the line, then commit the block.
    BufferAndCommit(BlockKind),
    /// Commit the pending lines, then buffer the line as the start of the next list item.
    FlushAndBuffer(BlockKind),
    /// Commit the open block, then dispatch the same line again against the new state.
    CommitAndRedispatch(BlockKind),
    /// Dispatch the same line again against the new state without committing.
    Redispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: BlockState,
    pub action: Action,
}

impl Step {
    fn new(next: BlockState, action: Action) -> Self {
        Self { next, action }
    }
}

/// Side effect requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Raw text that joins the committed document with no render.
    Passthrough(String),
    /// A closed block (or closed list items) to commit and emit.
    Commit { kind: BlockKind, lines: Vec<String> },
}

/// The state transition for one line.
pub fn transition(state: &BlockState, line: &str) -> Step {
    match *state {
        BlockState::Ready => from_ready(line),
        BlockState::InParagraph => {
            if is_blank(line) {
                return Step::new(BlockState::Ready, Action::BufferAndCommit(BlockKind::Paragraph));
            }
            match classify_line(line, true) {
                LineClass::SetextUnderline => {
                    Step::new(BlockState::Ready, Action::BufferAndCommit(BlockKind::Heading))
                }
                LineClass::Paragraph => Step::new(BlockState::InParagraph, Action::Buffer),
                _ => Step::new(
                    BlockState::Ready,
                    Action::CommitAndRedispatch(BlockKind::Paragraph),
                ),
            }
        }
        BlockState::InFencedCode { fence, resume } => {
            if !is_closing_fence(line, &fence) {
                return Step::new(*state, Action::Buffer);
            }
            match resume {
                Some(ctx) => Step::new(BlockState::InList(ctx), Action::Buffer),
                None => Step::new(
                    BlockState::Ready,
                    Action::BufferAndCommit(BlockKind::FencedCode),
                ),
            }
        }
        BlockState::InTable { resume } => {
            if line.contains('|') {
                return Step::new(*state, Action::Buffer);
            }
            close_nested(resume, BlockKind::Table)
        }
        BlockState::InBlockquote { resume } => {
            if is_blank(line) || line.trim_start().starts_with('>') {
                return Step::new(*state, Action::Buffer);
            }
            close_nested(resume, BlockKind::Blockquote)
        }
        BlockState::InList(ctx) => in_list(ctx, line),
    }
}

fn from_ready(line: &str) -> Step {
    let (next, action) = match classify_line(line, false) {
        LineClass::Blank => (BlockState::Ready, Action::Passthrough),
        LineClass::Heading | LineClass::SetextUnderline => (
            BlockState::Ready,
            Action::BufferAndCommit(BlockKind::Heading),
        ),
        LineClass::ThematicBreak => (
            BlockState::Ready,
            Action::BufferAndCommit(BlockKind::ThematicBreak),
        ),
        LineClass::FencedCodeOpen(fence) => (
            BlockState::InFencedCode {
                fence,
                resume: None,
            },
            Action::Buffer,
        ),
        LineClass::Blockquote => (BlockState::InBlockquote { resume: None }, Action::Buffer),
        LineClass::ListMarker { indent } => {
            (BlockState::InList(ListContext::new(indent)), Action::Buffer)
        }
        LineClass::Table => (BlockState::InTable { resume: None }, Action::Buffer),
        LineClass::Paragraph => (BlockState::InParagraph, Action::Buffer),
    };
    Step::new(next, action)
}

fn close_nested(resume: Option<ListContext>, kind: BlockKind) -> Step {
    match resume {
        Some(ctx) => Step::new(BlockState::InList(ctx), Action::Redispatch),
        None => Step::new(BlockState::Ready, Action::CommitAndRedispatch(kind)),
    }
}

fn in_list(ctx: ListContext, line: &str) -> Step {
    if is_blank(line) {
        return Step::new(BlockState::InList(ctx), Action::Buffer);
    }

    let indent = leading_indent(line);
    let class = classify_line(line, false);

    if let LineClass::ListMarker { indent: marker } = class {
        let next = ListContext {
            base_indent: ctx.base_indent.min(marker),
            marker_indent: marker,
        };
        let action = if marker <= ctx.base_indent || marker < ctx.marker_indent {
            Action::FlushAndBuffer(BlockKind::ListItems)
        } else {
            Action::Buffer
        };
        return Step::new(BlockState::InList(next), action);
    }

    if indent > ctx.base_indent {
        let next = match class {
            LineClass::FencedCodeOpen(fence) => BlockState::InFencedCode {
                fence,
                resume: Some(ctx),
            },
            LineClass::Blockquote => BlockState::InBlockquote { resume: Some(ctx) },
            LineClass::Table => BlockState::InTable { resume: Some(ctx) },
            _ => BlockState::InList(ctx),
        };
        return Step::new(next, Action::Buffer);
    }

    match class {
        LineClass::Paragraph if indent > 0 => Step::new(BlockState::InList(ctx), Action::Buffer),
        _ => Step::new(
            BlockState::Ready,
            Action::CommitAndRedispatch(BlockKind::ListItems),
        ),
    }
}

/// Owns the open block's state and raw lines.
#[derive(Debug)]
pub struct BlockMachine {
    state: BlockState,
    pending: Vec<String>,
}

impl Default for BlockMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockMachine {
    pub fn new() -> Self {
        Self {
            state: BlockState::Ready,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> &BlockState {
        &self.state
    }

    /// Raw lines of the open block, in arrival order.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Feeds one complete line (including its `\n`, if any).
    pub fn push_line(&mut self, line: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        loop {
            let step = transition(&self.state, line);
            trace!(state = ?self.state, next = ?step.next, action = ?step.action, "line dispatched");
            self.state = step.next;
            match step.action {
                Action::Passthrough => effects.push(Effect::Passthrough(line.to_string())),
                Action::Buffer => self.pending.push(line.to_string()),
                Action::BufferAndCommit(kind) => {
                    self.pending.push(line.to_string());
                    effects.extend(self.take_commit(kind));
                }
                Action::FlushAndBuffer(kind) => {
                    effects.extend(self.take_commit(kind));
                    self.pending.push(line.to_string());
                }
                Action::CommitAndRedispatch(kind) => {
                    effects.extend(self.take_commit(kind));
                    continue;
                }
                Action::Redispatch => continue,
            }
            return effects;
        }
    }

    /// Force-closes the open block, committing whatever is pending.
    pub fn finish(&mut self) -> Vec<Effect> {
        let kind = self.state.commit_kind();
        self.state = BlockState::Ready;
        kind.and_then(|kind| self.take_commit(kind))
            .into_iter()
            .collect()
    }

    fn take_commit(&mut self, kind: BlockKind) -> Option<Effect> {
        if self.pending.is_empty() {
            return None;
        }
        Some(Effect::Commit {
            kind,
            lines: std::mem::take(&mut self.pending),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{transition, Action, BlockKind, BlockMachine, BlockState, Effect, ListContext};
    use crate::block::classify::Fence;

    fn commit(kind: BlockKind, lines: &[&str]) -> Effect {
        Effect::Commit {
            kind,
            lines: lines.iter().map(|line| line.to_string()).collect(),
        }
    }

    fn feed(machine: &mut BlockMachine, text: &str) -> Vec<Effect> {
        text.split_inclusive('\n')
            .flat_map(|line| machine.push_line(line))
            .collect()
    }

    #[test]
    fn ready_passes_blank_lines_through() {
        let step = transition(&BlockState::Ready, "\n");
        assert_eq!(step.next, BlockState::Ready);
        assert_eq!(step.action, Action::Passthrough);
    }

    #[test]
    fn heading_and_break_commit_immediately() {
        let mut machine = BlockMachine::new();
        assert_eq!(
            machine.push_line("# Title\n"),
            vec![commit(BlockKind::Heading, &["# Title\n"])]
        );
        assert_eq!(
            machine.push_line("***\n"),
            vec![commit(BlockKind::ThematicBreak, &["***\n"])]
        );
        assert_eq!(machine.state(), &BlockState::Ready);
    }

    #[test]
    fn paragraph_closes_on_blank_line() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "one\ntwo\n\n");
        assert_eq!(
            effects,
            vec![commit(BlockKind::Paragraph, &["one\n", "two\n", "\n"])]
        );
    }

    #[test]
    fn setext_underline_closes_paragraph_as_heading() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "Title\n---\n");
        assert_eq!(effects, vec![commit(BlockKind::Heading, &["Title\n", "---\n"])]);
        assert_eq!(machine.state(), &BlockState::Ready);
    }

    #[test]
    fn paragraph_interrupted_by_other_block_redispatches() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "text\n# Next\n");
        assert_eq!(
            effects,
            vec![
                commit(BlockKind::Paragraph, &["text\n"]),
                commit(BlockKind::Heading, &["# Next\n"]),
            ]
        );
    }

    #[test]
    fn fenced_code_buffers_verbatim_until_matching_fence() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "````\n```\n# not a heading\n\n");
        assert!(effects.is_empty());
        assert!(matches!(machine.state(), BlockState::InFencedCode { .. }));

        let effects = machine.push_line("````\n");
        assert_eq!(
            effects,
            vec![commit(
                BlockKind::FencedCode,
                &["````\n", "```\n", "# not a heading\n", "\n", "````\n"]
            )]
        );
    }

    #[test]
    fn table_closes_on_first_pipeless_line() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "| a |\n|---|\nafter\n");
        assert_eq!(
            effects,
            vec![commit(BlockKind::Table, &["| a |\n", "|---|\n"])]
        );
        assert_eq!(machine.state(), &BlockState::InParagraph);
        assert_eq!(machine.pending(), ["after\n".to_string()]);
    }

    #[test]
    fn blockquote_continues_over_blank_lines() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "> a\n\n> b\nplain\n");
        assert_eq!(
            effects,
            vec![commit(BlockKind::Blockquote, &["> a\n", "\n", "> b\n"])]
        );
    }

    #[test]
    fn list_items_flush_one_at_a_time() {
        let mut machine = BlockMachine::new();
        assert!(machine.push_line("1. First\n").is_empty());
        assert_eq!(
            machine.push_line("2. Second\n"),
            vec![commit(BlockKind::ListItems, &["1. First\n"])]
        );
        assert_eq!(
            machine.push_line("3. Third\n"),
            vec![commit(BlockKind::ListItems, &["2. Second\n"])]
        );
        assert_eq!(
            machine.finish(),
            vec![commit(BlockKind::ListItems, &["3. Third\n"])]
        );
    }

    #[test]
    fn nested_markers_extend_the_current_item() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "- a\n  - a1\n  - a2\n- b\n");
        assert_eq!(
            effects,
            vec![commit(
                BlockKind::ListItems,
                &["- a\n", "  - a1\n", "  - a2\n"]
            )]
        );
        assert_eq!(machine.pending(), ["- b\n".to_string()]);
        assert_eq!(
            machine.state(),
            &BlockState::InList(ListContext {
                base_indent: 0,
                marker_indent: 0
            })
        );
    }

    #[test]
    fn fenced_code_inside_list_resumes_list() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "- item\n  ```\n  - not a marker\n");
        assert!(effects.is_empty());
        assert_eq!(
            machine.state(),
            &BlockState::InFencedCode {
                fence: Fence {
                    ch: '`',
                    len: 3,
                    indent: 2
                },
                resume: Some(ListContext {
                    base_indent: 0,
                    marker_indent: 0
                }),
            }
        );

        assert!(machine.push_line("  ```\n").is_empty());
        assert!(matches!(machine.state(), BlockState::InList(_)));

        let effects = machine.push_line("- next\n");
        assert_eq!(
            effects,
            vec![commit(
                BlockKind::ListItems,
                &["- item\n", "  ```\n", "  - not a marker\n", "  ```\n"]
            )]
        );
    }

    #[test]
    fn blockquote_inside_list_returns_to_list() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "- item\n  > quoted\n- next\n");
        assert_eq!(
            effects,
            vec![commit(BlockKind::ListItems, &["- item\n", "  > quoted\n"])]
        );
        assert!(matches!(machine.state(), BlockState::InList(_)));
    }

    #[test]
    fn unindented_text_closes_list() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "- item\n\nAfter\n");
        assert_eq!(
            effects,
            vec![commit(BlockKind::ListItems, &["- item\n", "\n"])]
        );
        assert_eq!(machine.state(), &BlockState::InParagraph);
    }

    #[test]
    fn indented_continuation_stays_in_item() {
        let mut machine = BlockMachine::new();
        let effects = feed(&mut machine, "- item\n  more text\n");
        assert!(effects.is_empty());
        assert_eq!(machine.pending().len(), 2);
    }

    #[test]
    fn finish_commits_open_nested_block_as_list() {
        let mut machine = BlockMachine::new();
        feed(&mut machine, "- a\n  | x |\n");
        assert!(matches!(machine.state(), BlockState::InTable { resume: Some(_) }));
        assert_eq!(
            machine.finish(),
            vec![commit(BlockKind::ListItems, &["- a\n", "  | x |\n"])]
        );
        assert!(machine.finish().is_empty());
    }
}
