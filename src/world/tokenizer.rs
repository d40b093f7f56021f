use super::block::{Block, BodyState, Step};
use std::fmt;

/// The nine block kinds of the world format, keyed by their opening sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Texture,
    Shape,
    Model,
    Audio,
    Object,
    Light,
    WalkBox,
    Settings,
    Trigger,
}

impl BlockKind {
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Texture,
        BlockKind::Shape,
        BlockKind::Model,
        BlockKind::Audio,
        BlockKind::Object,
        BlockKind::Light,
        BlockKind::WalkBox,
        BlockKind::Settings,
        BlockKind::Trigger,
    ];

    pub fn from_sigil(ch: char) -> Option<Self> {
        Some(match ch {
            '%' => BlockKind::Texture,
            '*' => BlockKind::Shape,
            '+' => BlockKind::Model,
            '.' => BlockKind::Audio,
            '$' => BlockKind::Object,
            '&' => BlockKind::Light,
            '~' => BlockKind::WalkBox,
            '@' => BlockKind::Settings,
            '!' => BlockKind::Trigger,
            _ => return None,
        })
    }

    pub fn sigil(self) -> char {
        match self {
            BlockKind::Texture => '%',
            BlockKind::Shape => '*',
            BlockKind::Model => '+',
            BlockKind::Audio => '.',
            BlockKind::Object => '$',
            BlockKind::Light => '&',
            BlockKind::WalkBox => '~',
            BlockKind::Settings => '@',
            BlockKind::Trigger => '!',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Texture => "texture",
            BlockKind::Shape => "shape",
            BlockKind::Model => "model",
            BlockKind::Audio => "audio",
            BlockKind::Object => "object",
            BlockKind::Light => "light",
            BlockKind::WalkBox => "walk-box",
            BlockKind::Settings => "settings",
            BlockKind::Trigger => "trigger",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const COMMENT: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    /// Discarding through the next line break, then resuming the block (if any).
    Comment(Option<BlockKind>),
    /// Sigil seen, waiting for `[`.
    AwaitOpen(BlockKind),
    InBlock(BlockKind),
    InSubParameter(BlockKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenStats {
    pub blocks: usize,
    /// Non-whitespace characters outside any block that matched no sigil.
    pub stray: usize,
    pub abandoned: usize,
}

/// Streaming tokenizer over world text. Completed blocks are handed to a callback and
/// the block buffer is reused for the next sibling.
pub struct Tokenizer {
    state: State,
    line_start: bool,
    block: Block,
    stats: TokenStats,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self { state: State::Idle, line_start: true, block: Block::new(), stats: TokenStats::default() }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn feed(&mut self, ch: char, on_block: &mut impl FnMut(BlockKind, &Block)) {
        let at_line_start = self.line_start;
        if ch == '\n' {
            self.line_start = true;
        } else if !ch.is_whitespace() {
            self.line_start = false;
        }
        self.state = self.step(ch, at_line_start, on_block);
    }

    fn step(&mut self, ch: char, at_line_start: bool, on_block: &mut impl FnMut(BlockKind, &Block)) -> State {
        match self.state {
            State::Comment(resume) => {
                if ch != '\n' {
                    return State::Comment(resume);
                }
                match resume {
                    Some(kind) => {
                        // Keeps the line break as separator content so tokens on both sides stay apart.
                        self.block.feed(BodyState::Params, ch);
                        State::InBlock(kind)
                    }
                    None => State::Idle,
                }
            }
            State::Idle => self.idle(ch, at_line_start),
            State::AwaitOpen(kind) => {
                if ch == '[' {
                    self.block.clear();
                    State::InBlock(kind)
                } else if ch.is_whitespace() {
                    State::AwaitOpen(kind)
                } else {
                    log::warn!("[world] '{}' not followed by '[', ignoring {kind} block", kind.sigil());
                    self.stats.abandoned += 1;
                    self.idle(ch, at_line_start)
                }
            }
            State::InBlock(kind) if ch == COMMENT && at_line_start => State::Comment(Some(kind)),
            State::InBlock(kind) => self.body(kind, BodyState::Params, ch, on_block),
            State::InSubParameter(kind) => self.body(kind, BodyState::SubParameter, ch, on_block),
        }
    }

    fn idle(&mut self, ch: char, at_line_start: bool) -> State {
        if ch.is_whitespace() {
            return State::Idle;
        }
        if ch == COMMENT && at_line_start {
            return State::Comment(None);
        }
        match BlockKind::from_sigil(ch) {
            Some(kind) => State::AwaitOpen(kind),
            None => {
                log::debug!("[world] ignoring stray character {ch:?}");
                self.stats.stray += 1;
                State::Idle
            }
        }
    }

    fn body(
        &mut self,
        kind: BlockKind,
        body: BodyState,
        ch: char,
        on_block: &mut impl FnMut(BlockKind, &Block),
    ) -> State {
        match self.block.feed(body, ch) {
            Step::Continue(BodyState::Params) => State::InBlock(kind),
            Step::Continue(BodyState::SubParameter) => State::InSubParameter(kind),
            Step::Complete => {
                self.stats.blocks += 1;
                on_block(kind, &self.block);
                self.block.clear();
                State::Idle
            }
        }
    }

    /// Ends the pass. A block still open at end of input is dropped.
    pub fn finish(self) -> TokenStats {
        let mut stats = self.stats;
        match self.state {
            State::InBlock(kind) | State::InSubParameter(kind) | State::Comment(Some(kind)) => {
                log::warn!("[world] {kind} block not closed before end of input, dropping it");
                stats.abandoned += 1;
            }
            State::AwaitOpen(kind) => {
                log::warn!("[world] '{}' at end of input has no body", kind.sigil());
                stats.abandoned += 1;
            }
            State::Idle | State::Comment(None) => {}
        }
        stats
    }
}

/// Runs a whole in-memory buffer through a fresh tokenizer.
pub fn tokenize(text: &str, mut on_block: impl FnMut(BlockKind, &Block)) -> TokenStats {
    let mut tokenizer = Tokenizer::new();
    for ch in text.chars() {
        tokenizer.feed(ch, &mut on_block);
    }
    tokenizer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> (Vec<(BlockKind, Block)>, TokenStats) {
        let mut blocks = Vec::new();
        let stats = tokenize(text, |kind, block| blocks.push((kind, block.clone())));
        (blocks, stats)
    }

    #[test]
    fn every_sigil_opens_its_kind() {
        for kind in BlockKind::ALL {
            let text = format!("{}[1, name]", kind.sigil());
            let (blocks, _) = collect(&text);
            assert_eq!(blocks.len(), 1, "{kind}");
            assert_eq!(blocks[0].0, kind);
            assert_eq!(blocks[0].1.numbers, vec![1.0]);
            assert_eq!(blocks[0].1.strings, vec!["name"]);
        }
    }

    #[test]
    fn comment_lines_are_skipped_outside_and_inside_blocks() {
        let text = "# textures\n%[a.png, a]\n~[0,0,0,\n  # inline note ~[9,9]\n 4,4]\n";
        let (blocks, stats) = collect(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].1.numbers, vec![0.0, 0.0, 0.0, 4.0, 4.0]);
        assert_eq!(stats.blocks, 2);
    }

    #[test]
    fn hash_mid_line_is_not_a_comment() {
        let (blocks, _) = collect("*[cube, crate#1]");
        assert_eq!(blocks[0].1.strings, vec!["cube", "crate#1"]);
    }

    #[test]
    fn stray_characters_do_not_abort_the_pass() {
        let (blocks, stats) = collect("garbage ~[0,0,0,1,1] ?? @[2]");
        assert_eq!(blocks.len(), 2);
        assert_eq!(stats.stray, 9);
    }

    #[test]
    fn sigil_without_bracket_is_abandoned_and_reprocessed() {
        let (blocks, stats) = collect("$ ~[0,0,0,1,1]");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].0, BlockKind::WalkBox);
        assert_eq!(stats.abandoned, 1);
    }

    #[test]
    fn unterminated_block_is_dropped() {
        let (blocks, stats) = collect("~[0,0,0,1,1] ~[1,2");
        assert_eq!(blocks.len(), 1);
        assert_eq!(stats.abandoned, 1);
    }

    #[test]
    fn bracket_inside_group_does_not_close_block() {
        let mut tokenizer = Tokenizer::new();
        let mut seen = 0;
        let mut on_block = |_: BlockKind, _: &Block| seen += 1;
        for ch in "![0,0,0,0,0,0,onStart,logToConsole,(a]".chars() {
            tokenizer.feed(ch, &mut on_block);
        }
        assert_eq!(tokenizer.state(), State::InSubParameter(BlockKind::Trigger));
        tokenizer.feed(')', &mut on_block);
        tokenizer.feed(']', &mut on_block);
        assert_eq!(tokenizer.state(), State::Idle);
        assert_eq!(seen, 1);
    }
}
