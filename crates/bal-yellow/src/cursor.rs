use crate::{NodeOrToken, SyntaxElement, SyntaxNode, WalkEvent};

/// Preorder traversal over nodes.
pub struct Preorder {
    start: SyntaxNode,
    next: Option<WalkEvent<SyntaxNode>>,
    skip_subtree: bool,
}

impl Preorder {
    pub(crate) fn new(start: SyntaxNode) -> Self {
        let next = Some(WalkEvent::Enter(start.clone()));
        Self { start, next, skip_subtree: false }
    }

    /// Skips the subtree of the node that was just entered.
    pub fn skip_subtree(&mut self) {
        self.skip_subtree = true;
    }

    fn do_skip(&mut self) {
        self.next = self.next.take().map(|next| match next {
            WalkEvent::Enter(first_child) => match first_child.parent() {
                Some(parent) => WalkEvent::Leave(parent),
                None => WalkEvent::Leave(first_child),
            },
            WalkEvent::Leave(parent) => WalkEvent::Leave(parent),
        });
    }
}

impl Iterator for Preorder {
    type Item = WalkEvent<SyntaxNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.skip_subtree {
            self.do_skip();
            self.skip_subtree = false;
        }

        let next = self.next.take();

        self.next = next.as_ref().and_then(|event| {
            Some(match event {
                WalkEvent::Enter(node) => match node.first_child() {
                    Some(child) => WalkEvent::Enter(child),
                    None => WalkEvent::Leave(node.clone()),
                },
                WalkEvent::Leave(node) => {
                    if node == &self.start {
                        return None;
                    }

                    match node.next_sibling() {
                        Some(sibling) => WalkEvent::Enter(sibling),
                        None => WalkEvent::Leave(node.parent()?),
                    }
                }
            })
        });

        next
    }
}

/// Preorder traversal over nodes and tokens. Tokens only produce `Enter`.
pub struct PreorderWithTokens {
    start: SyntaxNode,
    next: Option<WalkEvent<SyntaxElement>>,
}

impl PreorderWithTokens {
    pub(crate) fn new(start: SyntaxNode) -> Self {
        let next = Some(WalkEvent::Enter(NodeOrToken::Node(start.clone())));
        Self { start, next }
    }

    fn after(&self, element: &SyntaxElement) -> Option<WalkEvent<SyntaxElement>> {
        if let NodeOrToken::Node(node) = element
            && node == &self.start
        {
            return None;
        }
        match element.next_sibling_or_token() {
            Some(sibling) => Some(WalkEvent::Enter(sibling)),
            None => Some(WalkEvent::Leave(NodeOrToken::Node(element.parent()?))),
        }
    }
}

impl Iterator for PreorderWithTokens {
    type Item = WalkEvent<SyntaxElement>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.next.take()?;

        self.next = match &next {
            WalkEvent::Enter(NodeOrToken::Node(node)) => match node.first_child_or_token() {
                Some(child) => Some(WalkEvent::Enter(child)),
                None => Some(WalkEvent::Leave(NodeOrToken::Node(node.clone()))),
            },
            WalkEvent::Enter(token @ NodeOrToken::Token(_)) => self.after(token),
            WalkEvent::Leave(element) => self.after(element),
        };

        Some(next)
    }
}
