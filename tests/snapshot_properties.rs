use std::collections::BTreeMap;

use proptest::prelude::*;
use taskstate::history::{ExecutionRecord, HistoryStore};
use taskstate::implementation::ImplementationIdentity;
use taskstate::properties::{FiniteFloat, InputProperties, PropertyValue};
use taskstate::snapshot::{ContentHash, FileFingerprint, FileSetSnapshot, normalize_path};
use taskstate::types::TaskIdentity;

fn fingerprint(content: &[u8]) -> FileFingerprint {
    FileFingerprint::File {
        digest: ContentHash::of_bytes(content),
        length: content.len() as u64,
    }
}

fn path_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,6}", 1..4).prop_map(|segs| segs.join("/"))
}

fn file_map_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    proptest::collection::btree_map(path_strategy(), proptest::collection::vec(any::<u8>(), 0..32), 1..12)
}

fn scalar_strategy() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        Just(PropertyValue::Null),
        any::<bool>().prop_map(PropertyValue::Bool),
        any::<i64>().prop_map(PropertyValue::Integer),
        // Arbitrary bit patterns reach subnormals and extreme exponents.
        any::<u64>()
            .prop_filter_map("finite", |bits| FiniteFloat::new(f64::from_bits(bits)))
            .prop_map(PropertyValue::Float),
        "[ -~]{0,12}".prop_map(PropertyValue::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = PropertyValue> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(PropertyValue::List),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(PropertyValue::Map),
        ]
    })
}

fn snapshot_strategy() -> impl Strategy<Value = Option<FileSetSnapshot>> {
    let key = (any::<bool>(), path_strategy())
        .prop_map(|(absolute, p)| if absolute { format!("/{p}") } else { p });
    let entry = prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(|c| fingerprint(&c)),
        Just(FileFingerprint::Directory),
        Just(FileFingerprint::Missing),
    ];
    proptest::option::of(
        proptest::collection::btree_map(key, entry, 0..6).prop_map(|m| FileSetSnapshot::from_entries(m)),
    )
}

fn record_strategy() -> impl Strategy<Value = ExecutionRecord> {
    (
        "[a-z ]{1,16}",
        proptest::collection::btree_map("[a-z]{1,8}", value_strategy(), 0..6),
        snapshot_strategy(),
        snapshot_strategy(),
    )
        .prop_map(|(cmd, props, inputs, discovered)| {
            let builder = ExecutionRecord::builder()
                .implementation(ImplementationIdentity::for_command("Exec", &cmd, None))
                .input_properties(props.into_iter().collect())
                .no_output_files_snapshot()
                .output_files(Vec::<String>::new());
            let builder = match inputs {
                Some(s) => builder.input_files(s),
                None => builder.no_input_files(),
            };
            let builder = match discovered {
                Some(s) => builder.discovered_input_files(s),
                None => builder.no_discovered_input_files(),
            };
            builder.build().expect("complete record")
        })
}

proptest! {
    #[test]
    fn snapshot_hash_ignores_enumeration_order(files in file_map_strategy(), seed in any::<u64>()) {
        let forward: Vec<(String, FileFingerprint)> =
            files.iter().map(|(p, c)| (p.clone(), fingerprint(c))).collect();

        let mut shuffled = forward.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let a = FileSetSnapshot::from_entries(forward);
        let b = FileSetSnapshot::from_entries(shuffled);
        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.path_set_hash(), b.path_set_hash());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn changing_one_file_changes_the_hash(files in file_map_strategy(), pick in any::<prop::sample::Index>()) {
        let entries: Vec<(String, FileFingerprint)> =
            files.iter().map(|(p, c)| (p.clone(), fingerprint(c))).collect();
        let before = FileSetSnapshot::from_entries(entries.clone());

        let (target, content) = files.iter().nth(pick.index(files.len())).unwrap();
        let mut changed_content = content.clone();
        changed_content.push(0xff);

        let after = FileSetSnapshot::from_entries(entries.into_iter().map(|(p, fp)| {
            if &p == target { (p, fingerprint(&changed_content)) } else { (p, fp) }
        }));

        prop_assert_ne!(before.hash(), after.hash());
        // Same paths, so the metadata fingerprint is unchanged.
        prop_assert_eq!(before.path_set_hash(), after.path_set_hash());
        let changes = after.changes_since(&before);
        prop_assert_eq!(changes.len(), 1);
        prop_assert_eq!(&changes[0].path, target);
    }

    #[test]
    fn property_hash_ignores_insertion_order(
        props in proptest::collection::btree_map("[a-z]{1,8}", value_strategy(), 0..8)
    ) {
        let forward: InputProperties = props.clone().into_iter().collect();
        let backward: InputProperties = props.into_iter().rev().collect();
        prop_assert_eq!(forward.hash(), backward.hash());
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn stored_record_reads_back_unchanged(record in record_strategy()) {
        let store = HistoryStore::in_memory();
        let task = TaskIdentity::new(":app:compile");
        store.put(&task, &record).expect("put");
        let loaded = store.get(&task);
        prop_assert_eq!(loaded.as_ref(), Some(&record));
        prop_assert_eq!(loaded.map(|r| r.input_properties().hash()), Some(record.input_properties().hash()));
    }

    #[test]
    fn normalize_path_is_idempotent(path in "[a-z./\\\\]{0,20}") {
        let once = normalize_path(&path);
        prop_assert_eq!(normalize_path(&once), once.clone());
    }
}

#[test]
fn equivalent_path_spellings_share_an_entry() {
    let snapshot = FileSetSnapshot::from_entries([
        ("./src//main.rs", fingerprint(b"a")),
        ("src\\lib.rs", fingerprint(b"b")),
    ]);
    assert!(snapshot.contains("src/main.rs"));
    assert!(snapshot.contains("src/lib.rs"));
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn nested_values_hash_structurally() {
    let list = |items: &[i64]| PropertyValue::List(items.iter().map(|i| PropertyValue::Integer(*i)).collect());

    let a = InputProperties::new().with("flags", list(&[1, 2]));
    let b = InputProperties::new().with("flags", list(&[2, 1]));
    // Lists are ordered; maps are not.
    assert_ne!(a.hash(), b.hash());

    let map_ab: BTreeMap<String, PropertyValue> =
        [("x".to_string(), PropertyValue::Integer(1)), ("y".to_string(), PropertyValue::Integer(2))].into_iter().collect();
    let map_ba: BTreeMap<String, PropertyValue> =
        [("y".to_string(), PropertyValue::Integer(2)), ("x".to_string(), PropertyValue::Integer(1))].into_iter().collect();
    assert_eq!(
        InputProperties::new().with("opts", PropertyValue::Map(map_ab)).hash(),
        InputProperties::new().with("opts", PropertyValue::Map(map_ba)).hash()
    );
}

#[test]
fn extreme_floats_survive_storage() {
    let store = HistoryStore::in_memory();
    let task = TaskIdentity::new("render");
    for value in [
        1.0715660391465826e-75,
        -1.81996730402717e-179,
        -1.603964615428183e143,
        -9.643915712060552e-234,
        f64::MIN_POSITIVE / 3.0,
        f64::MAX,
    ] {
        let float = FiniteFloat::new(value).expect("finite");
        let record = ExecutionRecord::builder()
            .implementation(ImplementationIdentity::for_command("Exec", "render", None))
            .input_properties(InputProperties::new().with("scale", PropertyValue::Float(float)))
            .no_input_files()
            .no_discovered_input_files()
            .no_output_files_snapshot()
            .output_files(Vec::<String>::new())
            .build()
            .expect("complete record");
        store.put(&task, &record).expect("put");
        assert_eq!(store.get(&task), Some(record), "{value:e} changed in storage");
    }
}

#[test]
fn string_and_integer_with_same_text_hash_differently() {
    let a = InputProperties::new().with("level", 1);
    let b = InputProperties::new().with("level", "1");
    assert_ne!(a.hash(), b.hash());
}
