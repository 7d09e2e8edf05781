use bal_errors::{Diagnostic, DiagnosticCode};
use bal_inputs::Cancellation;
use bal_tokenizer::{LexerFlags, LexerState, Snapshot, Token, Tokenizer};
use bal_yellow::{Builder, GreenNode, NodeCache, SyntaxKind, SyntaxSet};
use drop_bomb::DropBomb;
use text_size::{TextRange, TextSize};

/// Deepest nesting of expressions, types and blocks the parser descends
/// into before giving up on the construct.
pub(crate) const MAX_DEPTH: u32 = 256;

pub(crate) struct Parser<'t> {
    text: &'t str,
    start: TextSize,
    tokenizer: Tokenizer<'t>,
    current: Token,
    /// Tokenizer position right before `current` was lexed.
    current_start: Snapshot,
    prev_end: TextSize,
    events: Vec<Event>,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
    max_depth: u32,
    cancellation: &'t dyn Cancellation,
    cancelled: bool,
}

/// Everything needed to rewind the parser to an earlier token.
pub(crate) struct Checkpoint {
    tokenizer: Snapshot,
    current: Token,
    current_start: Snapshot,
    prev_end: TextSize,
    events: usize,
    diagnostics: usize,
    lexer_diagnostics: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(text: &'t str, cancellation: &'t dyn Cancellation) -> Self {
        Self::with_state(text, TextSize::new(0), LexerState::default(), cancellation)
    }

    /// A parser that starts at `offset` with the lexer in `state`. Used to
    /// reparse a single block.
    pub(crate) fn with_state(
        text: &'t str,
        offset: TextSize,
        state: LexerState,
        cancellation: &'t dyn Cancellation,
    ) -> Self {
        let mut tokenizer = Tokenizer::with_state(text, offset, state);
        let current_start = tokenizer.snapshot();
        let current = tokenizer.next_token();
        Self {
            text,
            start: offset,
            tokenizer,
            current,
            current_start,
            prev_end: offset,
            events: Vec::new(),
            diagnostics: Vec::new(),
            depth: 0,
            max_depth: 0,
            cancellation,
            cancelled: false,
        }
    }

    pub(crate) fn peek_kind(&self) -> SyntaxKind {
        self.current.kind
    }

    pub(crate) fn current(&self) -> &Token {
        &self.current
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn at_set(&self, set: &SyntaxSet) -> bool {
        set.contains(self.peek_kind())
    }

    /// Kind of the token `n` positions ahead of the current one.
    pub(crate) fn nth(&mut self, n: usize) -> SyntaxKind {
        if n == 0 {
            return self.peek_kind();
        }
        self.nth_token(n).kind
    }

    pub(crate) fn nth_token(&mut self, n: usize) -> Token {
        let snapshot = self.tokenizer.snapshot();
        let mut token = self.current.clone();
        for _ in 0..n {
            token = self.tokenizer.next_token();
            if token.kind == SyntaxKind::EOF {
                break;
            }
        }
        self.tokenizer.restore(snapshot);
        token
    }

    /// Counts the run of adjacent `>` tokens starting at the current one,
    /// and whether an adjacent `>=` ends it. `>>` and `>>>` are built from
    /// such runs, and `>>=` is `>` followed by `>=`.
    pub(crate) fn gt_run(&mut self) -> (usize, bool) {
        if !self.at(SyntaxKind::GT) {
            return (0, false);
        }
        let mut count = 1;
        let mut end = self.current.range.end();
        loop {
            let next = self.nth_token(count);
            if next.range.start() != end {
                return (count, false);
            }
            match next.kind {
                SyntaxKind::GT if count < 3 => {
                    count += 1;
                    end = next.range.end();
                }
                SyntaxKind::GT_EQ => return (count, true),
                _ => return (count, false),
            }
        }
    }

    pub(crate) fn advance(&mut self) {
        if self.at(SyntaxKind::EOF) {
            return;
        }
        self.prev_end = self.current.range.end();
        self.current_start = self.tokenizer.snapshot();
        let next = self.tokenizer.next_token();
        let token = std::mem::replace(&mut self.current, next);
        self.events.push(Event::Token(token));
    }

    /// Consumes the `EOF` token, which carries the trivia at the end of the
    /// file.
    pub(crate) fn eof(&mut self) {
        if self.at(SyntaxKind::EOF) {
            self.prev_end = self.current.range.end();
            self.events.push(Event::Token(self.current.clone()));
        }
    }

    /// Start of the current token, used to detect lack of progress.
    pub(crate) fn position(&self) -> TextSize {
        self.current.range.start()
    }

    /// Text of the current token.
    pub(crate) fn current_text(&self) -> &'t str {
        &self.text[self.current.range]
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `kind`, or inserts it as a missing token and reports it.
    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.missing(kind);
        false
    }

    pub(crate) fn missing(&mut self, kind: SyntaxKind) {
        let message = format!("missing {}", kind.describe());
        self.report(DiagnosticCode::MissingToken, message, TextRange::empty(self.prev_end));
        self.events.push(Event::Missing(kind));
    }

    /// Inserts a missing token the tokenizer already reported.
    pub(crate) fn placeholder(&mut self, kind: SyntaxKind) {
        self.events.push(Event::Missing(kind));
    }

    /// Consumes `kind`, or inserts a placeholder without reporting.
    pub(crate) fn expect_silent(&mut self, kind: SyntaxKind) {
        if !self.eat(kind) {
            self.placeholder(kind);
        }
    }

    /// Reports at the current token.
    pub(crate) fn error(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        let range = self.current.range;
        self.report(code, message, range);
    }

    pub(crate) fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, range: TextRange) {
        if self.cancelled {
            return;
        }
        self.diagnostics.push(Diagnostic::error(code, message, range));
    }

    /// Reports an error and skips tokens up to `recovery`, wrapping them in
    /// an `ERROR` node. Stops early at the end of input.
    pub(crate) fn error_recover(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        recovery: &SyntaxSet,
    ) {
        self.error(code, message);
        if self.at_set(recovery) || self.at(SyntaxKind::EOF) {
            return;
        }
        let m = self.start();
        while !self.at_set(recovery) && !self.at(SyntaxKind::EOF) {
            self.skip_balanced();
        }
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Like [`Parser::error_recover`], but also stops right after a `;`,
    /// which ends up inside the `ERROR` node.
    pub(crate) fn error_skip(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        recovery: &SyntaxSet,
    ) {
        self.error(code, message);
        if self.at_set(recovery) || self.at(SyntaxKind::EOF) {
            return;
        }
        let m = self.start();
        while !self.at_set(recovery) && !self.at(SyntaxKind::EOF) {
            let semicolon = self.at(SyntaxKind::SEMICOLON);
            self.skip_balanced();
            if semicolon {
                break;
            }
        }
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Reports an error and wraps just the current token in an `ERROR` node.
    pub(crate) fn error_and_bump(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.error(code, message);
        if self.at(SyntaxKind::EOF) {
            return;
        }
        let m = self.start();
        self.skip_balanced();
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Skips one token, or a whole bracketed group if it opens one.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                SyntaxKind::EOF => return,
                SyntaxKind::LEFT_BRACE
                | SyntaxKind::LEFT_CLOSED_RECORD
                | SyntaxKind::LEFT_PAREN
                | SyntaxKind::LEFT_BRACKET => depth += 1,
                SyntaxKind::RIGHT_BRACE
                | SyntaxKind::RIGHT_CLOSED_RECORD
                | SyntaxKind::RIGHT_PAREN
                | SyntaxKind::RIGHT_BRACKET => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return;
            }
        }
    }

    pub(crate) fn start(&mut self) -> Marker {
        let pos = self.events.len() as u32;
        self.events.push(Event::TOMBSTONE);
        Marker::new(pos)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tokenizer: self.tokenizer.snapshot(),
            current: self.current.clone(),
            current_start: self.current_start.clone(),
            prev_end: self.prev_end,
            events: self.events.len(),
            diagnostics: self.diagnostics.len(),
            lexer_diagnostics: self.tokenizer.diagnostics().len(),
        }
    }

    /// Rewinds to `checkpoint`. Markers started after it must already be
    /// completed or abandoned.
    pub(crate) fn rewind(&mut self, checkpoint: Checkpoint) {
        self.tokenizer.restore(checkpoint.tokenizer);
        self.current = checkpoint.current;
        self.current_start = checkpoint.current_start;
        self.prev_end = checkpoint.prev_end;
        self.events.truncate(checkpoint.events);
        self.diagnostics.truncate(checkpoint.diagnostics);
    }

    /// Whether any diagnostic was reported since `checkpoint`.
    pub(crate) fn has_errors_since(&self, checkpoint: &Checkpoint) -> bool {
        self.diagnostics.len() > checkpoint.diagnostics
            || self.tokenizer.diagnostics().len() > checkpoint.lexer_diagnostics
    }

    /// Runs `f` with extra contextual keyword flags. The current token is
    /// relexed whenever the flags change.
    pub(crate) fn with_flags<T>(&mut self, flags: LexerFlags, f: impl FnOnce(&mut Self) -> T) -> T {
        let old = self.tokenizer.flags();
        self.set_flags(old | flags);
        let result = f(self);
        self.set_flags(old);
        result
    }

    fn set_flags(&mut self, flags: LexerFlags) {
        if self.tokenizer.flags() == flags {
            return;
        }
        self.tokenizer.restore(self.current_start.clone());
        self.tokenizer.set_flags(flags);
        self.current_start = self.tokenizer.snapshot();
        self.current = self.tokenizer.next_token();
    }

    /// Runs `f` one nesting level deeper. Past [`MAX_DEPTH`] the rest of
    /// the construct is swallowed into an `ERROR` node instead.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.depth >= MAX_DEPTH {
            self.too_deep();
            return None;
        }
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        let result = f(self);
        self.depth -= 1;
        Some(result)
    }

    /// Takes one nesting level for a node wrapped around an operand that is
    /// already parsed, as left-nested spines like `a + b + c` or `x[0][1]`
    /// grow. Past [`MAX_DEPTH`] the rest of the construct is swallowed and
    /// `false` is returned. Taken levels are given back with
    /// [`Parser::unwind`].
    pub(crate) fn deepen(&mut self, levels: &mut u32) -> bool {
        if self.depth >= MAX_DEPTH {
            self.too_deep();
            return false;
        }
        self.depth += 1;
        *levels += 1;
        self.max_depth = self.max_depth.max(self.depth);
        true
    }

    pub(crate) fn unwind(&mut self, levels: u32) {
        self.depth -= levels;
    }

    fn too_deep(&mut self) {
        self.error(DiagnosticCode::NestingTooDeep, "nesting too deep");
        let m = self.start();
        let mut balance = 0usize;
        loop {
            match self.peek_kind() {
                SyntaxKind::EOF => break,
                SyntaxKind::LEFT_BRACE
                | SyntaxKind::LEFT_CLOSED_RECORD
                | SyntaxKind::LEFT_PAREN
                | SyntaxKind::LEFT_BRACKET => balance += 1,
                SyntaxKind::RIGHT_BRACE
                | SyntaxKind::RIGHT_CLOSED_RECORD
                | SyntaxKind::RIGHT_PAREN
                | SyntaxKind::RIGHT_BRACKET => {
                    if balance == 0 {
                        break;
                    }
                    balance -= 1;
                }
                SyntaxKind::SEMICOLON if balance == 0 => break,
                _ => {}
            }
            self.advance();
        }
        m.complete(self, SyntaxKind::ERROR);
    }

    /// Polls cancellation; once cancelled, stays cancelled.
    pub(crate) fn is_cancelled(&mut self) -> bool {
        if !self.cancelled && self.cancellation.is_cancelled() {
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Lexer state right after the last consumed token.
    pub(crate) fn lexer_state(&self) -> &LexerState {
        self.current_start.state()
    }

    /// Forgets the current token, so a parse that stops before the end of
    /// input keeps no diagnostics from its lookahead.
    pub(crate) fn unlex_current(&mut self) {
        self.tokenizer.restore(self.current_start.clone());
    }

    pub(crate) fn finish(self) -> Output {
        self.finish_with_cache(NodeCache::default()).0
    }

    pub(crate) fn finish_with_cache(self, cache: NodeCache) -> (Output, NodeCache) {
        let Parser {
            text, start, tokenizer, mut events, mut diagnostics, cancelled, max_depth, ..
        } = self;
        let mut builder = Builder::with_cache(text, cache);
        builder.skip_to(start);
        let mut forward_parents = Vec::new();

        for i in 0..events.len() {
            match std::mem::replace(&mut events[i], Event::TOMBSTONE) {
                Event::Start { kind, forward_parent } => {
                    if kind == SyntaxKind::TOMBSTONE {
                        continue;
                    }

                    forward_parents.push(kind);
                    let mut idx = i;
                    let mut fp = forward_parent;
                    while let Some(fwd) = fp {
                        idx += fwd as usize;

                        fp = match std::mem::replace(&mut events[idx], Event::TOMBSTONE) {
                            Event::Start { kind, forward_parent } => {
                                if kind != SyntaxKind::TOMBSTONE {
                                    forward_parents.push(kind);
                                }
                                forward_parent
                            }
                            _ => unreachable!(),
                        };
                    }

                    for kind in forward_parents.drain(..).rev() {
                        builder.start_node(kind);
                    }
                }
                Event::Finish => builder.finish_node(),
                Event::Token(Token { leading, kind, range, trailing }) => {
                    builder.token(leading, kind, range.len(), trailing);
                }
                Event::Missing(kind) => builder.missing(kind),
            }
        }

        let mut lexical = tokenizer.finish();
        lexical.append(&mut diagnostics);
        lexical.sort_by_key(|diagnostic| diagnostic.range().start());

        let (green, cache) = builder.finish_with_cache();
        (Output { green, diagnostics: lexical, cancelled, max_depth }, cache)
    }
}

pub(crate) struct Output {
    pub(crate) green: GreenNode,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) cancelled: bool,
    /// Deepest nesting reached, for deciding whether a standalone reparse
    /// could have hit [`MAX_DEPTH`] in context.
    pub(crate) max_depth: u32,
}

enum Event {
    Start { kind: SyntaxKind, forward_parent: Option<u32> },
    Token(Token),
    Missing(SyntaxKind),
    Finish,
}

impl Event {
    const TOMBSTONE: Self = Self::Start { kind: SyntaxKind::TOMBSTONE, forward_parent: None };
}

pub(crate) struct Marker {
    position: u32,
    bomb: DropBomb,
}

impl Marker {
    fn new(position: u32) -> Self {
        Self { position, bomb: DropBomb::new("Marker must be either completed or abandoned") }
    }

    pub(crate) fn complete(mut self, p: &mut Parser<'_>, kind: SyntaxKind) -> CompletedMarker {
        self.bomb.defuse();

        match &mut p.events[self.position as usize] {
            Event::Start { kind: slot, .. } => {
                *slot = kind;
            }
            _ => unreachable!(),
        }

        p.events.push(Event::Finish);
        CompletedMarker::new(self.position)
    }

    /// Drops the marker without creating a node.
    pub(crate) fn abandon(mut self, p: &mut Parser<'_>) {
        self.bomb.defuse();
        if self.position as usize == p.events.len() - 1 {
            p.events.pop();
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CompletedMarker {
    pos: u32,
}

impl CompletedMarker {
    fn new(pos: u32) -> Self {
        Self { pos }
    }

    pub(crate) fn precede(self, p: &mut Parser<'_>) -> Marker {
        let new_pos = p.start();

        match &mut p.events[self.pos as usize] {
            Event::Start { forward_parent, .. } => {
                *forward_parent = Some(new_pos.position - self.pos);
            }
            _ => unreachable!(),
        }

        new_pos
    }
}
