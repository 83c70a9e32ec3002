use montage_document_core::{
    AddCommand, BatchCommand, BindCommand, ChangePropertyCommand, Children, ClearCommand,
    Command, CommandRecorder, DisconnectCommand, Document, DocumentConfig, DocumentError,
    DocumentRecord, Easing, KeyFrame, KeyFrameAnimation, KeyFrames, MoveCommand, NodeKind,
    ObjectId, RemoveCommand, SetAnimationCommand, Time, Value,
};
use montage_test_fixtures::{build_chain, group, leaf, standard_types, Chain, StandardTypes};

struct Bench {
    std_types: StandardTypes,
    doc: Document,
    rec: CommandRecorder,
    chain: Chain,
}

impl Bench {
    fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    fn with_config(config: DocumentConfig) -> Self {
        let std_types = standard_types().unwrap();
        let mut doc = Document::with_config(std_types.types.clone(), config.clone());
        let chain = build_chain(&mut doc, "Scene1", "Clip1").unwrap();
        Self {
            std_types,
            doc,
            rec: CommandRecorder::with_config(&config),
            chain,
        }
    }

    fn push(&mut self, cmd: impl Command + 'static) {
        self.rec.push(&mut self.doc, Box::new(cmd)).unwrap();
    }

    fn record(&self) -> DocumentRecord {
        self.doc.to_record().unwrap()
    }

    /// Add a fresh leaf of `type_name` under `parent` through the recorder.
    fn add_leaf(&mut self, parent: ObjectId, type_name: &str) -> ObjectId {
        let id = leaf(&mut self.doc, type_name).unwrap();
        self.push(AddCommand::new(Children(parent), id));
        id
    }
}

#[test]
fn undo_all_restores_exact_record() {
    let mut b = Bench::new();
    let before = b.record();

    let a = b.add_leaf(b.chain.effect, "FloatProperty");
    let grp = group(&mut b.doc).unwrap();
    b.push(AddCommand::new(Children(b.chain.effect), grp));
    let nested = b.add_leaf(grp, "FloatProperty");
    b.push(BindCommand::new(a, nested));

    let set = ChangePropertyCommand::new(&b.doc, b.chain.effect, b.std_types.opacity, 25.0).unwrap();
    b.push(set);
    let set_a = ChangePropertyCommand::new(&b.doc, a, b.std_types.float_value, 9.0).unwrap();
    b.push(set_a);

    let anim = KeyFrameAnimation::from_keyframes([
        KeyFrame::linear(Time::ZERO, Value::Float(0.0)),
        KeyFrame::new(Time::from_millis(1000), Value::Float(100.0), Easing::QuadIn),
    ]);
    let animate =
        SetAnimationCommand::new(&b.doc, b.chain.effect, b.std_types.opacity.id(), Some(anim)).unwrap();
    b.push(animate);
    b.push(AddCommand::new(
        KeyFrames::new(b.chain.effect, b.std_types.opacity.id()),
        KeyFrame::linear(Time::from_millis(500), Value::Float(10.0)),
    ));
    b.push(MoveCommand::new(Children(b.chain.effect), grp, 0));
    b.push(DisconnectCommand::new(nested));

    let after = b.record();
    assert_ne!(before, after);

    while b.rec.can_undo() {
        b.rec.undo(&mut b.doc).unwrap();
    }
    assert_eq!(b.record(), before);

    while b.rec.can_redo() {
        b.rec.redo(&mut b.doc).unwrap();
    }
    assert_eq!(b.record(), after);
}

#[test]
fn removing_subtree_severs_and_restores_crossing_bindings() {
    let mut b = Bench::new();
    let root = b.doc.root();
    let other = build_chain(&mut b.doc, "Scene2", "Clip2").unwrap();
    let a = b.add_leaf(b.chain.effect, "ColorProperty");
    let c = b.add_leaf(other.effect, "ColorProperty");
    b.push(BindCommand::new(a, c));
    let bound = b.record();

    b.push(RemoveCommand::new(Children(root), other.scene));
    assert_eq!(b.doc.object(a).unwrap().bound_to(), None);
    assert_eq!(b.doc.object(a).unwrap().bind_hint(), None);
    assert!(!b.doc.is_attached(c));

    b.rec.undo(&mut b.doc).unwrap();
    assert_eq!(b.record(), bound);
    assert_eq!(b.doc.object(c).unwrap().bound_to(), Some(a));
}

#[test]
fn exhausted_stacks_report_nothing_to_do() {
    let mut b = Bench::new();
    b.push(ChangePropertyCommand::new(&b.doc, b.chain.effect, b.std_types.opacity, 10.0).unwrap());
    b.rec.undo(&mut b.doc).unwrap();
    assert_eq!(b.rec.undo(&mut b.doc), Err(DocumentError::NothingToUndo));
    b.rec.redo(&mut b.doc).unwrap();
    assert_eq!(b.rec.redo(&mut b.doc), Err(DocumentError::NothingToRedo));
    assert_eq!(
        b.doc.get_value(b.chain.effect, b.std_types.opacity, Time::ZERO).unwrap(),
        10.0
    );
}

#[test]
fn failed_command_leaves_document_untouched() {
    let mut b = Bench::new();
    let a = b.add_leaf(b.chain.effect, "FloatProperty");
    let before = b.record();

    let loose = leaf(&mut b.doc, "FloatProperty").unwrap();
    let err = b
        .rec
        .push(&mut b.doc, Box::new(BindCommand::new(a, loose)))
        .unwrap_err();
    assert!(matches!(err, DocumentError::NotAttached { .. }));
    assert_eq!(b.record(), before);
    assert_eq!(b.rec.undo_len(), 1);

    let batch = BatchCommand::new("Half done")
        .with(Box::new(
            ChangePropertyCommand::new(&b.doc, a, b.std_types.float_value, 3.0).unwrap(),
        ))
        .with(Box::new(ClearCommand::new(KeyFrames::new(
            b.chain.effect,
            b.std_types.opacity.id(),
        ))));
    assert!(matches!(
        b.rec.push(&mut b.doc, Box::new(batch)),
        Err(DocumentError::NoAnimation { .. })
    ));
    assert_eq!(b.record(), before);
}

#[test]
fn history_limit_and_redo_discard_release_detached_objects() {
    let config = DocumentConfig {
        history_limit: Some(2),
        ..DocumentConfig::default()
    };
    let mut b = Bench::with_config(config);
    let a = b.add_leaf(b.chain.effect, "FloatProperty");
    b.rec.undo(&mut b.doc).unwrap();
    assert!(b.doc.contains(a));

    // A new push clears the redo stack; the never-attached leaf goes with it.
    b.push(ChangePropertyCommand::new(&b.doc, b.chain.effect, b.std_types.opacity, 1.0).unwrap());
    assert!(!b.doc.contains(a));

    for v in [2.0, 3.0, 4.0] {
        b.push(ChangePropertyCommand::new(&b.doc, b.chain.effect, b.std_types.opacity, v).unwrap());
    }
    assert_eq!(b.rec.undo_len(), 2);
}

#[test]
fn keyframe_remove_undo_keeps_position() {
    let mut b = Bench::new();
    let target = KeyFrames::new(b.chain.effect, b.std_types.opacity.id());
    let twin_a = KeyFrame::linear(Time::from_millis(500), Value::Float(1.0));
    let twin_b = KeyFrame::linear(Time::from_millis(500), Value::Float(2.0));
    let anim = KeyFrameAnimation::from_keyframes([twin_a.clone(), twin_b]);
    b.doc
        .set_animation(b.chain.effect, b.std_types.opacity.id(), Some(anim))
        .unwrap();
    let before = b.record();

    b.push(RemoveCommand::new(target, twin_a));
    b.rec.undo(&mut b.doc).unwrap();
    assert_eq!(b.record(), before);

    let v = b
        .doc
        .get_value(b.chain.effect, b.std_types.opacity, Time::from_millis(500))
        .unwrap();
    assert_eq!(v, 2.0);
}

#[test]
fn nodes_created_by_commands_use_fresh_ids() {
    let mut b = Bench::new();
    let first = b.add_leaf(b.chain.effect, "FloatProperty");
    b.rec.undo(&mut b.doc).unwrap();
    let second = b.doc.create("FloatProperty", NodeKind::LEAF).unwrap();
    assert!(second > first);
}
