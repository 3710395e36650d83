//
// syntax/path.rs
//
// Resolution of dotted content paths (`knot.stitch.label`) and list items
//

use super::tree::{FlowLevel, Identifier, NodeId, NodeKind, SyntaxTree};

impl FlowLevel {
    /// Level directly below this one.
    pub fn next(self) -> FlowLevel {
        match self {
            FlowLevel::Story => FlowLevel::Knot,
            FlowLevel::Knot => FlowLevel::Stitch,
            FlowLevel::Stitch | FlowLevel::WeavePoint => FlowLevel::WeavePoint,
        }
    }
}

impl SyntaxTree {
    /// Resolve `components` the way the compiler resolves divert targets.
    ///
    /// The first component is looked up in `context` and then in each of its
    /// ancestors; only the starting context is searched deeply (knots are
    /// always searched deeply). Remaining components must then be found at
    /// strictly finer levels below the previous hit.
    pub fn resolve_path(&self, components: &[Identifier], context: NodeId) -> Option<NodeId> {
        let (first, rest) = components.split_first()?;
        let base = self.resolve_base_target(&first.name, context)?;
        if rest.is_empty() {
            return Some(base);
        }
        self.resolve_tail_components(base, rest)
    }

    fn resolve_base_target(&self, name: &str, context: NodeId) -> Option<NodeId> {
        std::iter::once(context)
            .chain(self.ancestors(context))
            .find_map(|ancestor| self.child_from_context(ancestor, name, None, ancestor == context))
    }

    fn resolve_tail_components(&self, base: NodeId, rest: &[Identifier]) -> Option<NodeId> {
        let mut found = base;
        for component in rest {
            let minimum_level = match self.flow(found) {
                Some(flow) => flow.level.next(),
                None => FlowLevel::WeavePoint,
            };
            found = self.child_from_context(found, &component.name, Some(minimum_level), false)?;
        }
        Some(found)
    }

    fn child_from_context(
        &self,
        context: NodeId,
        name: &str,
        level: Option<FlowLevel>,
        force_deep_search: bool,
    ) -> Option<NodeId> {
        match self.kind(context) {
            NodeKind::Weave if level.is_none() || level == Some(FlowLevel::WeavePoint) => {
                self.weave_point_named(context, name)
            }
            NodeKind::Flow(flow) => {
                let deep_search = force_deep_search || flow.level == FlowLevel::Knot;
                self.content_with_name_at_level(context, name, level, deep_search)
            }
            _ => None,
        }
    }

    fn content_with_name_at_level(
        &self,
        flow_id: NodeId,
        name: &str,
        level: Option<FlowLevel>,
        deep_search: bool,
    ) -> Option<NodeId> {
        let flow = self.flow(flow_id)?;

        if (level.is_none() || level == Some(flow.level)) && flow.name() == Some(name) {
            return Some(flow_id);
        }

        if level.is_none() || level == Some(FlowLevel::WeavePoint) {
            if let Some(found) = self.weave_point_named(flow_id, name) {
                return Some(found);
            }
            if level == Some(FlowLevel::WeavePoint) {
                return deep_search
                    .then(|| self.deep_search_any_level(flow_id, name))
                    .flatten();
            }
        }

        if matches!(level, Some(level) if level < flow.level) {
            return None;
        }

        let sub_flow = self.sub_flows(flow_id).into_iter().find(|&sub| {
            self.flow(sub)
                .is_some_and(|f| f.name() == Some(name) && level.map_or(true, |l| l == f.level))
        });
        if sub_flow.is_some() {
            return sub_flow;
        }

        deep_search
            .then(|| self.deep_search_any_level(flow_id, name))
            .flatten()
    }

    fn deep_search_any_level(&self, flow_id: NodeId, name: &str) -> Option<NodeId> {
        if let Some(found) =
            self.content_with_name_at_level(flow_id, name, Some(FlowLevel::WeavePoint), false)
        {
            return Some(found);
        }
        self.sub_flows(flow_id)
            .into_iter()
            .find_map(|sub| self.content_with_name_at_level(sub, name, None, false))
    }

    /// Labelled choice or gather named `name` inside `container`, without
    /// entering nested flows.
    pub fn weave_point_named(&self, container: NodeId, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(container).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let label = match self.kind(id) {
                NodeKind::Flow(_) => continue,
                NodeKind::Choice(choice) => choice.identifier.as_ref(),
                NodeKind::Gather(gather) => gather.identifier.as_ref(),
                _ => None,
            };
            if label.is_some_and(|l| l.name == name) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev());
        }
        None
    }

    /// Flows nested directly in `flow_id` (knots of a story, stitches of a
    /// knot), in source order.
    pub fn sub_flows(&self, flow_id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(flow_id).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if matches!(self.kind(id), NodeKind::Flow(_)) {
                found.push(id);
            } else {
                stack.extend(self.children(id).iter().rev());
            }
        }
        found
    }

    /// Find a list element, either in the named list or, when `list_name`
    /// is absent, in the first list (in source order) declaring it.
    pub fn resolve_list_item(&self, list_name: Option<&str>, item_name: &str) -> Option<NodeId> {
        match list_name {
            Some(list_name) => self
                .list_definition(list_name)
                .and_then(|list| self.list_item_named(list, item_name)),
            None => self
                .list_definitions()
                .find_map(|(_, list)| self.list_item_named(list, item_name)),
        }
    }

    fn list_item_named(&self, list: NodeId, item_name: &str) -> Option<NodeId> {
        self.children(list).iter().copied().find(|&child| {
            matches!(self.kind(child),
                NodeKind::ListElementDefinition(item) if item.identifier.name == item_name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::builder::TreeBuilder;
    use crate::syntax::tree::{Choice, Divert, Flow, Gather, NamedDeclaration};

    fn ident(name: &str) -> Identifier {
        Identifier::new(name, None)
    }

    fn path(names: &[&str]) -> Vec<Identifier> {
        names.iter().map(|n| ident(n)).collect()
    }

    struct Story {
        tree: SyntaxTree,
        intro: NodeId,
        forest: NodeId,
        clearing: NodeId,
        river: NodeId,
        fork: NodeId,
        divert_in_intro: NodeId,
    }

    // === intro ===
    //   -> forest.clearing
    // === forest ===
    //   = clearing
    //     * (fork) Left
    //   = river
    fn story() -> Story {
        let mut b = TreeBuilder::story();
        let root = b.root();
        let intro = b.add(root, NodeKind::Flow(Flow::new(FlowLevel::Knot, Some(ident("intro")))), None);
        let intro_weave = b.add(intro, NodeKind::Weave, None);
        let divert_in_intro = b.add(
            intro_weave,
            NodeKind::Divert(Divert { target: path(&["forest", "clearing"]) }),
            None,
        );
        let forest = b.add(root, NodeKind::Flow(Flow::new(FlowLevel::Knot, Some(ident("forest")))), None);
        let clearing = b.add(forest, NodeKind::Flow(Flow::new(FlowLevel::Stitch, Some(ident("clearing")))), None);
        let clearing_weave = b.add(clearing, NodeKind::Weave, None);
        let fork = b.add(
            clearing_weave,
            NodeKind::Choice(Choice { identifier: Some(ident("fork")), condition: None }),
            None,
        );
        let river = b.add(forest, NodeKind::Flow(Flow::new(FlowLevel::Stitch, Some(ident("river")))), None);
        Story {
            tree: b.finish().unwrap(),
            intro,
            forest,
            clearing,
            river,
            fork,
            divert_in_intro,
        }
    }

    #[test]
    fn test_resolves_knot_from_anywhere() {
        let s = story();
        assert_eq!(s.tree.resolve_path(&path(&["forest"]), s.divert_in_intro), Some(s.forest));
    }

    #[test]
    fn test_resolves_stitch_below_knot() {
        let s = story();
        assert_eq!(
            s.tree.resolve_path(&path(&["forest", "clearing"]), s.divert_in_intro),
            Some(s.clearing)
        );
        assert_eq!(
            s.tree.resolve_path(&path(&["forest", "river"]), s.divert_in_intro),
            Some(s.river)
        );
    }

    #[test]
    fn test_resolves_label_through_full_path() {
        let s = story();
        assert_eq!(
            s.tree.resolve_path(&path(&["forest", "clearing", "fork"]), s.divert_in_intro),
            Some(s.fork)
        );
    }

    #[test]
    fn test_knot_deep_search_finds_nested_label() {
        let s = story();
        // Knots are searched deeply, so `forest.fork` reaches the label in a stitch.
        assert_eq!(
            s.tree.resolve_path(&path(&["forest", "fork"]), s.divert_in_intro),
            Some(s.fork)
        );
        assert_eq!(s.tree.resolve_path(&path(&["fork"]), s.forest), Some(s.fork));
    }

    #[test]
    fn test_stitch_not_found_at_knot_level_from_intro() {
        let s = story();
        assert_eq!(s.tree.resolve_path(&path(&["river"]), s.intro), None);
    }

    #[test]
    fn test_missing_tail_is_absent() {
        let s = story();
        assert_eq!(
            s.tree.resolve_path(&path(&["forest", "nowhere"]), s.divert_in_intro),
            None
        );
        assert_eq!(s.tree.resolve_path(&[], s.divert_in_intro), None);
    }

    #[test]
    fn test_gather_label_in_weave() {
        let mut b = TreeBuilder::story();
        let root = b.root();
        let weave = b.add(root, NodeKind::Weave, None);
        let gather = b.add(weave, NodeKind::Gather(Gather { identifier: Some(ident("loop")) }), None);
        let divert = b.add(weave, NodeKind::Divert(Divert { target: path(&["loop"]) }), None);
        let tree = b.finish().unwrap();
        assert_eq!(tree.resolve_path(&path(&["loop"]), divert), Some(gather));
    }

    #[test]
    fn test_list_items() {
        let mut b = TreeBuilder::story();
        let root = b.root();
        let colours = b.add(
            root,
            NodeKind::ListDefinition(NamedDeclaration { identifier: ident("colours") }),
            None,
        );
        let red = b.add(
            colours,
            NodeKind::ListElementDefinition(NamedDeclaration { identifier: ident("red") }),
            None,
        );
        let moods = b.add(
            root,
            NodeKind::ListDefinition(NamedDeclaration { identifier: ident("moods") }),
            None,
        );
        let moody_red = b.add(
            moods,
            NodeKind::ListElementDefinition(NamedDeclaration { identifier: ident("red") }),
            None,
        );
        let tree = b.finish().unwrap();

        assert_eq!(tree.resolve_list_item(Some("moods"), "red"), Some(moody_red));
        assert_eq!(tree.resolve_list_item(None, "red"), Some(red));
        assert_eq!(tree.resolve_list_item(Some("weather"), "red"), None);
        assert_eq!(tree.resolve_list_item(None, "blue"), None);
    }
}
