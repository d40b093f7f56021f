use std::fmt;

/// Where the classifier is inside a block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    Params,
    /// Inside `( ... )`: commas and `]` are plain content until the closing parenthesis.
    SubParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue(BodyState),
    Complete,
}

/// One `sigil[...]` body split into numeric and string parameters.
///
/// A single `Block` is reused for every block of a file pass; [`Block::clear`] keeps its allocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub numbers: Vec<f32>,
    pub strings: Vec<String>,
    buffer: String,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.numbers.clear();
        self.strings.clear();
        self.buffer.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty() && self.strings.is_empty()
    }

    /// Feeds one character of the block body. `]` outside a sub-parameter completes the block.
    pub fn feed(&mut self, state: BodyState, ch: char) -> Step {
        match (state, ch) {
            (BodyState::Params, ',') => {
                self.flush();
                Step::Continue(BodyState::Params)
            }
            (BodyState::Params, ']') => {
                self.flush();
                Step::Complete
            }
            (BodyState::Params, '(') => {
                self.buffer.push(ch);
                Step::Continue(BodyState::SubParameter)
            }
            (BodyState::SubParameter, ')') => {
                self.buffer.push(ch);
                Step::Continue(BodyState::Params)
            }
            (BodyState::SubParameter, '(') => {
                log::warn!("[world] nested parenthesis groups are not supported; treating '(' as text");
                self.buffer.push(ch);
                Step::Continue(BodyState::SubParameter)
            }
            (state, ch) => {
                self.buffer.push(ch);
                Step::Continue(state)
            }
        }
    }

    /// Classifies the accumulated buffer into a number or string parameter.
    pub fn flush(&mut self) {
        let raw = self.buffer.trim();
        if raw.is_empty() {
            self.buffer.clear();
            return;
        }
        if let Some(value) = parse_number(raw) {
            self.numbers.push(value);
        } else if let Some(split) = raw.find('(') {
            let (prefix, group) = raw.split_at(split);
            let prefix = prefix.trim_end();
            if !prefix.is_empty() {
                self.strings.push(prefix.to_string());
            }
            self.strings.push(group.to_string());
        } else {
            self.strings.push(raw.to_string());
        }
        self.buffer.clear();
    }

    /// Text accumulated since the last flush.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "numbers={:?} strings={:?}", self.numbers, self.strings)
    }
}

/// A parameter is numeric only when the whole token is a finite decimal literal.
pub fn parse_number(raw: &str) -> Option<f32> {
    let first = raw.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '+' | '-' | '.')) {
        return None;
    }
    raw.parse::<f32>().ok().filter(|value| value.is_finite())
}

/// Whether a string parameter is a parenthesized sub-block such as `(hello, 2)`.
pub fn is_group(raw: &str) -> bool {
    raw.starts_with('(')
}

/// Re-parses a parenthesized sub-block with the same classifier rules as a block body.
pub fn parse_group(raw: &str) -> Block {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('(').unwrap_or(trimmed);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    let mut block = Block::new();
    let mut state = BodyState::Params;
    for ch in inner.chars() {
        match block.feed(state, ch) {
            Step::Continue(next) => state = next,
            Step::Complete => {
                log::warn!("[world] stray ']' inside parameter group {trimmed:?}");
                return block;
            }
        }
    }
    block.flush();
    block
}
