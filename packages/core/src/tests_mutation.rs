/// Tests for the container mutation API and the formatting it fills in
use crate::*;
use regex::Regex;

fn decl(prop: &str, value: &str, before: &str) -> Declaration {
    Declaration::new(prop, value).with_raws(Raws {
        before: Some(before.into()),
        between: Some(": ".into()),
        ..Raws::default()
    })
}

/// `a { a: 1; b: 2 }` built with full raws
fn sample_rule(root: &Root) -> Rule {
    let rule = Rule::new("a").with_raws(Raws {
        between: Some(" ".into()),
        after: Some(" ".into()),
        semicolon: Some(false),
        ..Raws::default()
    });
    root.push(rule.clone()).unwrap();
    rule.push(decl("a", "1", " ")).unwrap().push(decl("b", "2", " ")).unwrap();
    rule
}

fn props(container: &impl Container) -> Vec<String> {
    container
        .nodes()
        .iter()
        .map(|node| node.as_decl().expect("declaration").prop())
        .collect()
}

#[cfg(test)]
mod append_tests {
    use super::*;

    #[test]
    fn test_append_record_copies_sibling_whitespace() {
        let root = Root::new();
        let rule = sample_rule(&root);
        rule.append(NodeProps::decl("c", 3)).unwrap();

        assert_eq!(root.to_string(), "a { a: 1; b: 2; c: 3 }");
        let last = rule.last().unwrap();
        assert_eq!(last.raws().before.as_deref(), Some(" "));
        assert_eq!(last.parent().map(ContainerNode::into_node), Some(rule.clone().into_node()));
    }

    #[test]
    fn test_append_into_empty_rule_uses_single_space() {
        let rule = Rule::new("a");
        rule.append(Declaration::new("color", "red")).unwrap();
        assert_eq!(rule.first().unwrap().raws().before.as_deref(), Some(" "));
    }

    #[test]
    fn test_push_does_not_normalize() {
        let rule = Rule::new("a");
        rule.push(Declaration::new("color", "red")).unwrap();
        assert_eq!(rule.first().unwrap().raws().before, None);
    }

    #[test]
    fn test_explicit_before_is_kept() {
        let root = Root::new();
        let rule = sample_rule(&root);
        rule.append(decl("c", "3", "\n  ")).unwrap();
        assert_eq!(rule.last().unwrap().raws().before.as_deref(), Some("\n  "));
    }

    #[test]
    fn test_first_node_of_root_has_no_separator() {
        let root = Root::new();
        root.append(Rule::new("a")).unwrap();
        assert_eq!(root.first().unwrap().raws().before, None);
        assert_eq!(root.to_string(), "a {}");
    }

    #[test]
    fn test_missing_value_fails_atomically() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let record = NodeProps {
            prop: Some("color".into()),
            ..NodeProps::default()
        };

        let err = rule.append(record).unwrap_err();
        assert_eq!(err, NodeError::MissingValue);
        assert!(err.to_string().contains("Value field is missed"));
        assert_eq!(props(&rule), vec!["a", "b"]);
    }

    #[test]
    fn test_bad_record_in_batch_inserts_nothing() {
        let rule = Rule::new("a");
        let err = rule
            .append(vec![NodeProps::decl("a", 1), NodeProps::default()])
            .unwrap_err();
        assert_eq!(err, NodeError::UnknownNodeType);
        assert!(rule.is_empty());
    }

    #[test]
    fn test_record_shapes() {
        let root = Root::new();
        root.append(vec![
            NodeProps::rule("a"),
            NodeProps::at_rule("media", "print"),
            NodeProps::comment("note"),
        ])
        .unwrap();

        let kinds: Vec<NodeKind> = root.nodes().iter().map(Node::kind).collect();
        assert_eq!(kinds, vec![NodeKind::Rule, NodeKind::AtRule, NodeKind::Comment]);
    }

    #[test]
    fn test_multiple_items_keep_argument_order() {
        let rule = Rule::new("a");
        rule.append(vec![
            Child::from(Declaration::new("a", 1)),
            Child::from(NodeProps::decl("b", 2)),
            Child::from(vec![Declaration::new("c", 3).into_node()]),
        ])
        .unwrap();
        assert_eq!(props(&rule), vec!["a", "b", "c"]);

        rule.prepend(vec![NodeProps::decl("x", 0), NodeProps::decl("y", 0)])
            .unwrap();
        assert_eq!(props(&rule), vec!["x", "y", "a", "b", "c"]);
    }

    #[test]
    fn test_same_node_twice_is_inserted_once() {
        let rule = Rule::new("a");
        let node = Declaration::new("a", 1).into_node();
        rule.append(vec![node.clone(), node.clone()]).unwrap();
        assert_eq!(rule.len(), 1);
    }
}

#[cfg(test)]
mod move_tests {
    use super::*;

    #[test]
    fn test_append_moves_children_of_other_rule() {
        let root = Root::new();
        let a = Rule::new("a").with_raws(Raws {
            between: Some("".into()),
            after: Some(" ".into()),
            ..Raws::default()
        });
        let b = Rule::new("b").with_raws(Raws {
            between: Some("".into()),
            after: Some(" ".into()),
            ..Raws::default()
        });
        root.push(a.clone()).unwrap().push(b.clone()).unwrap();
        a.push(decl("z-index", "1", " ")).unwrap();
        b.push(decl("width", "1px", " ")).unwrap().push(decl("height", "2px", " ")).unwrap();

        a.append(b.nodes()).unwrap();

        assert_eq!(a.to_string(), "a{ z-index: 1; width: 1px; height: 2px }");
        assert_eq!(b.to_string(), "b{ }");
    }

    #[test]
    fn test_moved_node_has_one_owner() {
        let a = Rule::new("a");
        let b = Rule::new("b");
        let node = Declaration::new("color", "red");
        a.append(node.clone()).unwrap();
        b.append(node.clone()).unwrap();

        assert!(a.is_empty());
        assert_eq!(b.nodes(), vec![node.clone().into_node()]);
        assert_eq!(node.parent().map(ContainerNode::into_node), Some(b.clone().into_node()));
    }

    #[test]
    fn test_append_root_moves_its_children() {
        let root = Root::new();
        let other = Root::new();
        other.push(Rule::new("a")).unwrap().push(Rule::new("b")).unwrap();

        root.append(other.clone()).unwrap();
        assert!(other.is_empty());
        assert_eq!(root.len(), 2);
        assert!(root.every(|node, _| node.parent().is_some_and(|p| p.kind() == NodeKind::Root)));
    }

    #[test]
    fn test_rule_argument_is_nested() {
        let root = Root::new();
        let media = AtRule::new("media", "print");
        let rule = Rule::new("a");
        root.append(media.clone()).unwrap();
        media.append(rule.clone()).unwrap();

        assert_eq!(media.len(), 1);
        assert!(media.has_block());
        assert_eq!(rule.parent().map(ContainerNode::into_node), Some(media.clone().into_node()));
    }

    #[test]
    fn test_reappending_own_child_moves_it_to_end() {
        let rule = Rule::new("a");
        let first = Declaration::new("a", 1);
        rule.append(first.clone()).unwrap();
        rule.append(Declaration::new("b", 2)).unwrap();

        rule.append(first).unwrap();
        assert_eq!(props(&rule), vec!["b", "a"]);
    }

    #[test]
    fn test_insert_into_self_is_rejected() {
        let root = Root::new();
        let outer = Rule::new("a");
        let inner = Rule::new("b");
        root.append(outer.clone()).unwrap();
        outer.append(inner.clone()).unwrap();

        assert_eq!(outer.append(outer.clone()).unwrap_err(), NodeError::CyclicInsert);
        assert_eq!(inner.append(outer.clone()).unwrap_err(), NodeError::CyclicInsert);
        assert_eq!(outer.len(), 1);
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_push_into_descendant_is_rejected() {
        let root = Root::new();
        let rule = Rule::new("a");
        root.push(rule.clone()).unwrap();

        assert_eq!(rule.push(root.clone()).unwrap_err(), NodeError::CyclicInsert);
        assert_eq!(rule.push(rule.clone()).unwrap_err(), NodeError::CyclicInsert);
        assert!(rule.is_empty());
        assert!(root.parent().is_none());
        assert_eq!(root.nodes(), vec![rule.clone().into_node()]);
        assert_eq!(rule.parent().map(ContainerNode::into_node), Some(root.clone().into_node()));
    }

    #[test]
    fn test_set_nodes_with_repeated_node_keeps_one_copy() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let old = rule.nodes();
        let node = Declaration::new("c", 3);

        rule.set_nodes(vec![node.clone().into_node(), node.clone().into_node()])
            .unwrap();
        assert_eq!(rule.nodes(), vec![node.clone().into_node()]);
        assert_eq!(node.parent().map(ContainerNode::into_node), Some(rule.clone().into_node()));
        assert!(old.iter().all(|child| child.parent().is_none()));
    }

    #[test]
    fn test_set_nodes_keeps_listed_children() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let last = rule.last().unwrap();

        rule.set_nodes(vec![last.clone(), last.clone()]).unwrap();
        assert_eq!(props(&rule), vec!["b"]);
        assert!(last.parent().is_some());
    }

    #[test]
    fn test_set_nodes_with_ancestor_changes_nothing() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let before = rule.nodes();

        let nodes = vec![Declaration::new("c", 3).into_node(), root.clone().into_node()];
        assert_eq!(rule.set_nodes(nodes).unwrap_err(), NodeError::CyclicInsert);
        assert_eq!(rule.nodes(), before);
        assert!(before.iter().all(|child| child.parent().is_some()));
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_replace_with() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let old = rule.first().unwrap();
        old.replace_with(vec![NodeProps::decl("x", 1), NodeProps::decl("y", 2)])
            .unwrap();

        assert!(old.parent().is_none());
        assert_eq!(props(&rule), vec!["x", "y", "b"]);
    }
}

#[cfg(test)]
mod position_tests {
    use super::*;

    #[test]
    fn test_index_accepts_index_or_node() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let second = rule.last().unwrap();

        assert_eq!(rule.index(&second), Ok(1));
        assert_eq!(rule.index(7usize), Ok(7));
        assert_eq!(
            rule.index(Declaration::new("a", 1)),
            Err(NodeError::NotAChild)
        );
    }

    #[test]
    fn test_insert_before_and_after() {
        let root = Root::new();
        let rule = sample_rule(&root);
        let b = rule.last().unwrap();

        rule.insert_before(&b, NodeProps::decl("x", 0)).unwrap();
        rule.insert_after(0usize, NodeProps::decl("y", 0)).unwrap();
        rule.insert_before(rule.len(), NodeProps::decl("z", 0)).unwrap();

        assert_eq!(props(&rule), vec!["a", "y", "x", "b", "z"]);
        assert_eq!(root.to_string(), "a { a: 1; y: 0; x: 0; b: 2; z: 0 }");
    }

    #[test]
    fn test_out_of_range_positions() {
        let rule = Rule::new("a");
        rule.append(Declaration::new("a", 1)).unwrap();

        assert_eq!(
            rule.insert_after(1usize, NodeProps::decl("x", 0)).unwrap_err(),
            NodeError::IndexOutOfBounds { index: 1, len: 1 }
        );
        assert_eq!(
            rule.remove_child(3usize).unwrap_err(),
            NodeError::IndexOutOfBounds { index: 3, len: 1 }
        );
        assert_eq!(rule.len(), 1);
    }

    #[test]
    fn test_remove_child_and_remove_all_clear_parents() {
        let rule = Rule::new("a");
        let a = Declaration::new("a", 1);
        let b = Declaration::new("b", 2);
        let c = Declaration::new("c", 3);
        rule.append(vec![a.clone().into_node(), b.clone().into_node(), c.clone().into_node()])
            .unwrap();

        rule.remove_child(&b).unwrap();
        assert!(b.parent().is_none());
        assert_eq!(props(&rule), vec!["a", "c"]);

        rule.remove_all();
        assert!(rule.is_empty());
        assert!(a.parent().is_none());
        assert!(c.parent().is_none());
    }

    #[test]
    fn test_first_last_every_some() {
        let rule = Rule::new("a");
        assert!(rule.first().is_none());
        assert!(rule.last().is_none());
        assert!(rule.every(|_, _| false));
        assert!(!rule.some(|_, _| true));

        rule.append(vec![NodeProps::decl("a", 1), NodeProps::decl("b", 2)])
            .unwrap();
        assert!(rule.every(|node, _| node.kind() == NodeKind::Decl));
        assert!(rule.some(|node, _| node.as_decl().is_some_and(|d| d.prop() == "b")));
        assert!(!rule.some(|_, index| index > 1));
    }

    #[test]
    fn test_prepend_to_root_demotes_first_node() {
        let root = Root::new();
        let a = Rule::new("a");
        let b = Rule::new("b").with_raws(Raws::with_before("\n"));
        root.push(a.clone()).unwrap().push(b).unwrap();

        root.prepend(Rule::new("c")).unwrap();
        assert_eq!(root.first().unwrap().raws().before, None);
        assert_eq!(a.raws().before.as_deref(), Some("\n"));
        assert_eq!(root.to_string(), "c {}\na {}\nb {}");
    }

    #[test]
    fn test_prepend_to_single_child_root() {
        let root = Root::new();
        root.append(Rule::new("a")).unwrap();
        root.prepend(Rule::new("b")).unwrap();
        assert_eq!(root.to_string(), "b {}\na {}");
    }
}

#[cfg(test)]
mod replace_tests {
    use super::*;

    fn two_rules() -> Root {
        let root = Root::new();
        let a = Rule::new("a").with_raws(Raws {
            between: Some("".into()),
            after: Some("".into()),
            ..Raws::default()
        });
        let b = Rule::new("b").with_raws(Raws {
            before: Some("".into()),
            between: Some("".into()),
            after: Some("".into()),
            ..Raws::default()
        });
        root.push(a.clone()).unwrap().push(b.clone()).unwrap();
        a.push(Declaration::new("one", "1").with_raws(Raws {
            before: Some("".into()),
            between: Some(":".into()),
            ..Raws::default()
        })).unwrap();
        b.push(Declaration::new("two", "2").with_raws(Raws {
            before: Some("".into()),
            between: Some(":".into()),
            ..Raws::default()
        })).unwrap();
        root
    }

    #[test]
    fn test_replace_literal() {
        let root = two_rules();
        root.replace_values("1", &ReplaceOptions::default(), "A");
        assert_eq!(root.to_string(), "a{one:A}b{two:2}");
    }

    #[test]
    fn test_replace_with_callback() {
        let root = two_rules();
        root.replace_values_with(Regex::new(r"\d").unwrap(), &ReplaceOptions::default(), |m| {
            format!("{m}A")
        });
        assert_eq!(root.to_string(), "a{one:1A}b{two:2A}");
    }

    #[test]
    fn test_props_filter_leaves_others_untouched() {
        let root = two_rules();
        root.replace_values(Regex::new(r"\d").unwrap(), &ReplaceOptions::props(["one"]), "A");
        assert_eq!(root.to_string(), "a{one:A}b{two:2}");
    }

    #[test]
    fn test_fast_gate() {
        let root = two_rules();
        root.replace_values(Regex::new(r"\d").unwrap(), &ReplaceOptions::fast("2"), "A");
        assert_eq!(root.to_string(), "a{one:1}b{two:A}");
    }
}
