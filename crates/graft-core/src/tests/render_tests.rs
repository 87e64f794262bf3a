use super::*;
use crate::element_props;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Label {
    text: String,
    renders: Rc<Cell<usize>>,
}

impl Element for Label {
    element_props!(Label { text });

    fn render(&self, _ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
        self.renders.set(self.renders.get() + 1);
        Ok(RenderResult::Rendered)
    }
}

struct Banner;

impl Element for Banner {
    element_props!(Banner {});

    fn render(&self, _ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
        Ok(RenderResult::Rendered)
    }
}

struct Stateful {
    seen: Rc<RefCell<Vec<i32>>>,
    handle_out: Rc<RefCell<Option<StateHandle<i32>>>>,
}

impl Element for Stateful {
    element_props!(Stateful {});

    fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
        let state = ui.use_state(|| 0)?;
        self.seen.borrow_mut().push(state.get());
        *self.handle_out.borrow_mut() = Some(state.clone());
        Ok(RenderResult::Rendered)
    }
}

#[test]
fn prop_equal_rerender_is_skipped() {
    let renders = Rc::new(Cell::new(0));
    let mut root = RootNode::new();
    let first = root
        .render_element(Box::new(Label {
            text: "hello".into(),
            renders: Rc::clone(&renders),
        }))
        .unwrap();
    assert_eq!(first, RenderResult::Rendered);
    assert_eq!(renders.get(), 1);

    let second = root
        .render_element(Box::new(Label {
            text: "hello".into(),
            renders: Rc::clone(&renders),
        }))
        .unwrap();
    assert_eq!(second, RenderResult::Skipped);
    assert_eq!(renders.get(), 1);

    let third = root
        .render_element(Box::new(Label {
            text: "changed".into(),
            renders: Rc::clone(&renders),
        }))
        .unwrap();
    assert_eq!(third, RenderResult::Rendered);
    assert_eq!(renders.get(), 2);
}

#[test]
fn always_invalid_bypasses_prop_equality() {
    let renders = Rc::new(Cell::new(0));
    let mut root = RootNode::new();
    root.node().set_always_invalid(true);
    for _ in 0..3 {
        let result = root
            .render_element(Box::new(Label {
                text: "same".into(),
                renders: Rc::clone(&renders),
            }))
            .unwrap();
        assert_eq!(result, RenderResult::Rendered);
    }
    assert_eq!(renders.get(), 3);
}

#[test]
fn state_setter_round_trips_into_next_render() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handle_out = Rc::new(RefCell::new(None));
    let mut root = RootNode::new();
    root.render_element(Box::new(Stateful {
        seen: Rc::clone(&seen),
        handle_out: Rc::clone(&handle_out),
    }))
    .unwrap();
    assert_eq!(*seen.borrow(), vec![0]);

    let handle: StateHandle<i32> = handle_out.borrow().clone().unwrap();
    handle.set(42);
    let result = root
        .render_element(Box::new(Stateful {
            seen: Rc::clone(&seen),
            handle_out: Rc::clone(&handle_out),
        }))
        .unwrap();
    assert_eq!(result, RenderResult::Rendered);
    assert_eq!(*seen.borrow(), vec![0, 42]);
}

#[test]
fn ref_mutation_never_schedules_a_rerender() {
    struct Bump {
        total: Rc<Cell<i32>>,
    }

    impl Element for Bump {
        element_props!(Bump {});

        fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            let slot = ui.use_ref(|| 0)?;
            slot.update(|value| *value += 1);
            self.total.set(slot.get());
            Ok(RenderResult::Rendered)
        }
    }

    let total = Rc::new(Cell::new(0));
    let mut root = RootNode::new();
    root.render_element(Box::new(Bump {
        total: Rc::clone(&total),
    }))
    .unwrap();
    assert_eq!(total.get(), 1);

    // Same props, nothing invalidated: the mutation above must not force a
    // second render.
    let second = root
        .render_element(Box::new(Bump {
            total: Rc::clone(&total),
        }))
        .unwrap();
    assert_eq!(second, RenderResult::Skipped);
    assert_eq!(total.get(), 1);
}

#[test]
fn named_refs_share_slots_case_insensitively() {
    struct Named {
        bump: i32,
        out: Rc<Cell<i32>>,
    }

    impl Element for Named {
        element_props!(Named { bump });

        fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            let first = ui.use_named_ref("Total", || 0)?;
            first.update(|value| *value += 1);
            let second = ui.use_named_ref("total", || 100)?;
            self.out.set(second.get());
            Ok(RenderResult::Rendered)
        }
    }

    let out = Rc::new(Cell::new(0));
    let mut root = RootNode::new();
    root.render_element(Box::new(Named {
        bump: 0,
        out: Rc::clone(&out),
    }))
    .unwrap();
    assert_eq!(out.get(), 1);
    root.render_element(Box::new(Named {
        bump: 1,
        out: Rc::clone(&out),
    }))
    .unwrap();
    assert_eq!(out.get(), 2);
}

#[test]
fn node_level_type_change_reports_mismatch() {
    let renders = Rc::new(Cell::new(0));
    let root = RootNode::new();
    let child = root.node().create_child();
    child
        .render_element(Some(Box::new(Label {
            text: "a".into(),
            renders,
        })))
        .unwrap();
    let result = child.render_element(Some(Box::new(Banner))).unwrap();
    assert_eq!(result, RenderResult::Mismatch);
}

#[test]
fn null_element_reports_mismatch() {
    let root = RootNode::new();
    let child = root.node().create_child();
    assert_eq!(child.render_element(None).unwrap(), RenderResult::Mismatch);
}

#[test]
fn root_type_change_is_an_error() {
    let renders = Rc::new(Cell::new(0));
    let mut root = RootNode::new();
    root.render_element(Box::new(Label {
        text: "a".into(),
        renders,
    }))
    .unwrap();
    let error = root.render_element(Box::new(Banner)).unwrap_err();
    assert_eq!(error, RenderError::RootMismatch);
}

#[test]
fn disposed_node_reports_mismatch() {
    let renders = Rc::new(Cell::new(0));
    let root = RootNode::new();
    let child = root.node().create_child();
    child
        .render_element(Some(Box::new(Label {
            text: "a".into(),
            renders: Rc::clone(&renders),
        })))
        .unwrap();
    child.dispose();
    let result = child
        .render_element(Some(Box::new(Label {
            text: "a".into(),
            renders,
        })))
        .unwrap();
    assert_eq!(result, RenderResult::Mismatch);
}

#[test]
fn reentrant_render_of_a_bound_node_is_a_binding_conflict() {
    struct Reenter {
        depth: i32,
    }

    impl Element for Reenter {
        element_props!(Reenter { depth });

        fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            if self.depth == 0 {
                ui.node().render_element(Some(Box::new(Reenter { depth: 1 })))?;
            }
            Ok(RenderResult::Rendered)
        }
    }

    let mut root = RootNode::new();
    let error = root
        .render_element(Box::new(Reenter { depth: 0 }))
        .unwrap_err();
    assert!(matches!(error, RenderError::BindingConflict { .. }));
}

#[test]
fn conditional_hook_use_trips_validation() {
    struct Flaky {
        hooks: usize,
    }

    impl Element for Flaky {
        element_props!(Flaky { hooks });

        fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            for _ in 0..self.hooks {
                ui.use_ref(|| 0)?;
            }
            Ok(RenderResult::Rendered)
        }
    }

    let mut root = RootNode::new();
    root.render_element(Box::new(Flaky { hooks: 1 })).unwrap();
    let error = root.render_element(Box::new(Flaky { hooks: 2 })).unwrap_err();
    assert_eq!(
        error,
        RenderError::HookCountMismatch {
            node: root.node().id(),
            expected: 1,
            actual: 2,
        }
    );

    // The check is optional; with validation off the render goes through.
    let mut relaxed = RootNode::with_options(RootOptions {
        validate_hooks: false,
        diagnostics: None,
    });
    relaxed.render_element(Box::new(Flaky { hooks: 1 })).unwrap();
    relaxed.render_element(Box::new(Flaky { hooks: 2 })).unwrap();
}

#[test]
fn slot_read_back_as_wrong_type_fails_at_the_access_site() {
    struct TypeShift {
        second: bool,
    }

    impl Element for TypeShift {
        element_props!(TypeShift { second });

        fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            if self.second {
                ui.use_ref(String::new)?;
            } else {
                ui.use_ref(|| 0u32)?;
            }
            Ok(RenderResult::Rendered)
        }
    }

    let mut root = RootNode::new();
    root.render_element(Box::new(TypeShift { second: false }))
        .unwrap();
    let error = root
        .render_element(Box::new(TypeShift { second: true }))
        .unwrap_err();
    match error {
        RenderError::SlotTypeMismatch { slot, expected, .. } => {
            assert_eq!(slot, SlotKey::Index(0));
            assert!(expected.contains("String"));
        }
        other => panic!("expected slot type mismatch, got {other:?}"),
    }
}

#[test]
fn element_type_and_prop_names_describe_the_element() {
    let renders = Rc::new(Cell::new(0));
    let label = Label {
        text: "x".into(),
        renders,
    };
    assert!(ElementType::of::<Label>().is_type_of(&label));
    assert!(!ElementType::of::<Banner>().is_type_of(&label));
    assert!(ElementType::of::<Label>().name().contains("Label"));
    assert_eq!(label.prop_names(), &["text"]);
    assert!(matches(&label, &label));
    assert!(!matches(&label, &Banner));
}

#[test]
fn render_body_skip_is_reported_as_skipped() {
    struct Quiet;

    impl Element for Quiet {
        element_props!(Quiet {});

        fn render(&self, _ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
            Ok(RenderResult::Skipped)
        }
    }

    let mut root = RootNode::new();
    assert_eq!(
        root.render_element(Box::new(Quiet)).unwrap(),
        RenderResult::Skipped
    );
}
