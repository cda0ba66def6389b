/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Test storing, loading, upgrading and checking out documents

extern crate vtdb;
extern crate env_logger;

use vtdb::vt::*;
use vtdb::readwrite::HEAD_BYTES;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample() -> Vistrail {
    let meta = UserActionMeta::new("tester");
    let mut vt = Vistrail::new();
    vt.set_name(Some("sample".to_string()));

    let mut action = vt.new_action(0, &meta);
    let mid = vt.new_id("module");
    let module = DomainObject::new(ObjectKind::Module, mid)
        .with("name", "PythonSource").expect("name")
        .with("cache", 1i64).expect("cache");
    let fid = vt.new_id("function");
    let function = DomainObject::new(ObjectKind::Function, fid)
        .with("name", "source").expect("name")
        .with("pos", 0i64).expect("pos");
    let param = DomainObject::new(ObjectKind::Parameter, vt.new_id("parameter"))
        .with("type", "String").expect("type")
        .with("val", "print(1)").expect("val")
        .with("pos", 0i64).expect("pos");
    let ops = vec![
        vt.new_add(module, None),
        vt.new_add(function, Some(ParentRef { kind: ObjectKind::Module, id: mid })),
        vt.new_add(param, Some(ParentRef { kind: ObjectKind::Function, id: fid })),
    ];
    action.operations.extend(ops);
    let aid = action.id;
    vt.add_action(action).expect("add action");
    vt.set_tag(aid, "initial").expect("tag");
    vt.add_annotation("__notes__", "first draft");
    vt.add_action_annotation(aid, "__thumb__", "thumb1.png", &meta).expect("action annotation");
    vt
}

#[test]
fn stream_round_trip() {
    init();
    let vt = sample();
    let mut buf = Vec::new();
    let sum = write_vistrail(&mut buf, &vt).expect("write");
    assert_eq!(&buf[0..HEAD_BYTES], b"VISTRAIL01000002");
    assert_eq!(Sum::load(&buf[buf.len() - SUM_BYTES..]), sum);

    let back = read_vistrail(&mut &buf[..]).expect("read");
    assert_eq!(back, vt);
    assert_eq!(back.tag_by_name("initial").map(|t| t.id), Some(1));
}

#[test]
fn corruption_detected() {
    init();
    let mut buf = Vec::new();
    write_vistrail(&mut buf, &sample()).expect("write");

    // flip a byte of the final checksum
    let last = buf.len() - 1;
    buf[last] ^= 0x01;
    match read_document(&mut &buf[..]) {
        Err(Error::Read(e)) => assert_eq!(e.msg(), "checksum invalid"),
        other => panic!("unexpected: {:?}", other),
    }

    // a truncated stream is an IO error
    let mut buf = Vec::new();
    write_vistrail(&mut buf, &sample()).expect("write");
    buf.truncate(buf.len() - 10);
    match read_document(&mut &buf[..]) {
        Err(Error::Io(_)) => {},
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn old_documents_upgrade() {
    init();
    // a 1.0.1 document: parameters store their value as `value`
    let param = Node::new("parameter")
        .with("id", 0i64)
        .with("name", "size")
        .with("value", "12");
    let add = Node::new("add")
        .with("id", 0i64)
        .with("what", "parameter")
        .with("objectId", 0i64)
        .with_nodes("data", vec![param]);
    let action = Node::new("action")
        .with("id", 1i64)
        .with("prevId", 0i64)
        .with("date", "2015-03-04 10:20:30")
        .with_nodes("operations", vec![add]);
    let root = Node::new("vistrail")
        .with("version", "1.0.1")
        .with("dbVersion", 7i64)
        .with_nodes("actions", vec![action]);

    let mut buf = Vec::new();
    write_document(&mut buf, SchemaVersion::new(1, 0, 1), &root).expect("write");
    let doc = read_document(&mut &buf[..]).expect("read");
    assert_eq!(doc.version, SchemaVersion::new(1, 0, 1));
    assert_eq!(doc.root, root);

    let vt = read_vistrail(&mut &buf[..]).expect("upgrade");
    assert_eq!(vt.version(), CURRENT_VERSION);
    let p = vt.get_object(ObjectKind::Parameter, 0).expect("parameter");
    assert_eq!(p.get("val"), Some(&Value::from("12")));
    let date = vt.action(1).and_then(|a| a.date).expect("date");
    assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2015-03-04 10:20:30");
}

#[test]
fn checkout_marking() {
    init();
    let mut empty = Vistrail::new();
    empty.update_checkout_version("ui");
    assert_eq!(empty.annotation_by_key("__checkout_version_ui").map(|a| a.value.as_str()),
            Some("0"));

    let mut vt = sample();
    assert_eq!(vt.checkout_status("ui"), CheckoutStatus::NeverCheckedOut);
    vt.update_checkout_version("ui");
    let keys = CheckoutKeys::for_app("ui");
    let marked: Vec<String> = [&keys.base, &keys.annotation_hash, &keys.action_annotation_hash]
        .iter()
        .map(|k| vt.annotation_by_key(k).map(|a| a.value.clone()).expect("marker"))
        .collect();
    assert_eq!(marked[0], "1");

    vt.update_checkout_version("ui");
    let again: Vec<String> = [&keys.base, &keys.annotation_hash, &keys.action_annotation_hash]
        .iter()
        .map(|k| vt.annotation_by_key(k).map(|a| a.value.clone()).expect("marker"))
        .collect();
    assert_eq!(marked, again);

    // markers survive storage
    let mut buf = Vec::new();
    write_vistrail(&mut buf, &vt).expect("write");
    let mut back = read_vistrail(&mut &buf[..]).expect("read");
    assert_eq!(back.checkout_status("ui"), CheckoutStatus::Unchanged);
    back.add_action_annotation(1, "__notes__", "reviewed", &DefaultActionMeta).expect("aa");
    assert_eq!(back.checkout_status("ui"), CheckoutStatus::Changed);
}
