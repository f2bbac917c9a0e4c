//! Tests for managed object discovery

use memsnap_core::prelude::*;
use memsnap_core::resolver::UNRESOLVED_ARRAY_LENGTH;

const VALUE_TYPE: u32 = 0x1;
const ARRAY: u32 = 0x2;

fn words(values: &[u64]) -> Vec<u8>
{
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn padded(values: &[u64], len: usize) -> Vec<u8>
{
    let mut bytes = words(values);
    bytes.resize(len, 0);
    bytes
}

fn heap(data: &mut SnapshotData, start: u64, bytes: Vec<u8>)
{
    data.heap.push(SegmentDescription {
        start_address: Address::from(start),
        bytes,
    });
}

fn managed_type(data: &mut SnapshotData, name: &str, flags: u32, address: u64) -> TypeIndex
{
    let index = TypeIndex(i32::try_from(data.types.len()).unwrap());
    data.types.push(TypeDescription {
        flags,
        name: name.to_string(),
        assembly: "Assembly-CSharp".to_string(),
        field_indices: Vec::new(),
        static_field_bytes: Vec::new(),
        base_or_element_type_index: -1,
        size: 24,
        type_info_address: Address::from(address),
        type_index: index,
    });
    index
}

/// Give the type at `owner` one static field of type `declared` at `offset`.
fn static_field(data: &mut SnapshotData, owner: TypeIndex, declared: TypeIndex, offset: i32, storage: Vec<u8>)
{
    let field_index = i32::try_from(data.field_descriptions.len()).unwrap();
    data.field_descriptions.push(FieldDescription {
        name: format!("s_field{field_index}"),
        offset,
        type_index: declared,
        is_static: true,
    });
    let owner = &mut data.types[usize::try_from(owner.value()).unwrap()];
    owner.field_indices.push(field_index);
    owner.static_field_bytes = storage;
}

fn type_name<'a>(snapshot: &'a Snapshot, record: &ManagedObjectRecord) -> Option<&'a str>
{
    snapshot.type_of(record).map(|ty| ty.name.as_str())
}

#[test]
fn test_handle_root_with_resolvable_class()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000], 64));
    // the class record's own header points back at itself
    heap(&mut data, 0x2000, padded(&[0x2000], 16));
    managed_type(&mut data, "Foo", 0, 0x2000);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    assert_eq!(snapshot.objects().len(), 1);

    let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
    assert_eq!(type_name(&snapshot, record), Some("Foo"));
    assert_eq!(record.offset, 0);
    assert!(record.segment.is_some());
    assert!(!record.is_array);
}

#[test]
fn test_handle_root_with_unreadable_class()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000], 64));
    let foo = managed_type(&mut data, "Foo", 0, 0x2000);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    assert_eq!(snapshot.objects().len(), 1);

    let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
    assert_eq!(record.resolved_type, None);
    assert_eq!(record.header_type, Some(foo));
    assert_eq!(record.header_word, Address::from(0x2000));
    assert_eq!(snapshot.objects().stats().unresolved, 1);
}

#[test]
fn test_static_field_root_without_handles()
{
    let mut data = SnapshotData::default();
    let bar = managed_type(&mut data, "Bar", 0, 0x2000);
    let baz = managed_type(&mut data, "Baz", 0, 0x2100);
    static_field(&mut data, bar, baz, 0, words(&[0x3000]));

    let snapshot = Snapshot::build(data, None).unwrap();
    assert!(snapshot.gc_handles().is_empty());
    assert!(snapshot.objects().contains(Address::from(0x3000)));
    assert_eq!(snapshot.objects().stats().static_field_roots, 1);
}

#[test]
fn test_null_address_is_kept_as_partial_record()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[], 16));
    let bar = managed_type(&mut data, "Bar", 0, 0x2000);
    let baz = managed_type(&mut data, "Baz", 0, 0x2100);
    // a handle to address 0 and a static slot that was never assigned
    data.gc_handle_targets.push(Address::ZERO);
    static_field(&mut data, bar, baz, 0, words(&[0]));

    let snapshot = Snapshot::build(data, None).unwrap();
    let record = snapshot.objects().get(Address::ZERO).unwrap();
    assert_eq!(record.segment, None);
    assert_eq!(record.resolved_type, None);
    assert_eq!(record.offset, 0);
    assert_eq!(snapshot.objects().stats().unmapped_handles, 1);

    let direct = snapshot.crawler().inspect_address(Address::ZERO);
    assert_eq!(&direct, record);
}

#[test]
fn test_handle_to_null_alone_produces_no_record()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[], 16));
    data.gc_handle_targets.push(Address::ZERO);

    let snapshot = Snapshot::build(data, None).unwrap();
    assert!(snapshot.objects().is_empty());
    assert!(!snapshot.objects().contains(Address::ZERO));

    let stats = snapshot.objects().stats();
    assert_eq!(stats.unmapped_handles, 1);
    assert_eq!(stats.gc_handle_roots, 0);
    assert_eq!(stats.static_field_roots, 0);
}

#[test]
fn test_duplicate_handles_produce_one_record()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000], 64));
    managed_type(&mut data, "Foo", 0, 0x2000);
    data.gc_handle_targets.extend([Address::from(0x1000), Address::from(0x1000)]);

    let snapshot = Snapshot::build(data, None).unwrap();
    assert_eq!(snapshot.objects().len(), 1);
    assert_eq!(snapshot.objects().stats().duplicates, 1);
}

#[test]
fn test_first_root_wins()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000], 64));
    let bar = managed_type(&mut data, "Bar", 0, 0x2000);
    static_field(&mut data, bar, bar, 0, words(&[0x1000]));
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    let addresses: Vec<Address> = snapshot.objects().iter().map(|r| r.address).collect();
    assert_eq!(addresses, vec![Address::from(0x1000)]);
    assert_eq!(snapshot.objects().stats().gc_handle_roots, 1);
    assert_eq!(snapshot.objects().stats().static_field_roots, 1);
    assert_eq!(snapshot.objects().stats().duplicates, 1);
}

#[test]
fn test_inspect_address_is_idempotent()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000, 0x2000], 64));
    heap(&mut data, 0x2000, padded(&[0x2000], 16));
    managed_type(&mut data, "Foo", 0, 0x2000);

    let snapshot = Snapshot::build(data, None).unwrap();
    let crawler = snapshot.crawler();
    for address in [0x1000u64, 0x1008, 0x1040, 0x2000, 0x9999] {
        let first = crawler.inspect_address(Address::from(address));
        let second = crawler.inspect_address(Address::from(address));
        assert_eq!(first, second);

        let resolver = snapshot.resolver();
        assert_eq!(
            resolver.resolve_type(Address::from(address)).map(|t| t.type_index),
            resolver.resolve_type(Address::from(address)).map(|t| t.type_index)
        );
    }
}

#[test]
fn test_crawl_is_repeatable()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000], 64));
    heap(&mut data, 0x4000, padded(&[0x2000], 32));
    managed_type(&mut data, "Foo", 0, 0x2000);
    data.gc_handle_targets.extend([Address::from(0x4000), Address::from(0x1000)]);

    let snapshot = Snapshot::build(data, None).unwrap();
    let again = snapshot.crawler().crawl(snapshot.gc_handles());
    let first: Vec<&ManagedObjectRecord> = snapshot.objects().iter().collect();
    let second: Vec<&ManagedObjectRecord> = again.iter().collect();
    assert_eq!(first, second);
}

#[test]
fn test_static_field_skip_rules()
{
    let mut data = SnapshotData::default();
    let holder = managed_type(&mut data, "Holder", 0, 0x2000);
    let int32 = managed_type(&mut data, "Int32", VALUE_TYPE, 0x2100);
    let target = managed_type(&mut data, "Target", 0, 0x2200);
    let storage = words(&[0x5000, 0x6000, 0x7000]);

    // value type, negative offset, past the end, unknown declared type
    static_field(&mut data, holder, int32, 0, storage.clone());
    static_field(&mut data, holder, target, -1, storage.clone());
    static_field(&mut data, holder, target, 20, storage.clone());
    static_field(&mut data, holder, TypeIndex(99), 8, storage.clone());
    // the only readable reference slot
    static_field(&mut data, holder, target, 16, storage);

    let snapshot = Snapshot::build(data, None).unwrap();
    let addresses: Vec<Address> = snapshot.objects().iter().map(|r| r.address).collect();
    assert_eq!(addresses, vec![Address::from(0x7000)]);
    assert_eq!(snapshot.objects().stats().static_field_roots, 1);
}

#[test]
fn test_instance_fields_are_not_followed()
{
    let mut data = SnapshotData::default();
    // object at 0x1000 holds a reference to 0x1100 in its first instance field
    heap(&mut data, 0x1000, padded(&[0x2000, 0, 0x1100], 64));
    heap(&mut data, 0x1100, padded(&[0x2000], 32));
    heap(&mut data, 0x2000, padded(&[0x2000], 16));
    let foo = managed_type(&mut data, "Foo", 0, 0x2000);
    data.field_descriptions.push(FieldDescription {
        name: "m_next".to_string(),
        offset: 16,
        type_index: foo,
        is_static: false,
    });
    data.types[0].field_indices.push(0);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    assert_eq!(snapshot.objects().len(), 1);
    assert!(!snapshot.objects().contains(Address::from(0x1100)));
}

#[test]
fn test_array_record_reads_length()
{
    let mut data = SnapshotData::default();
    // header word, monitor, bounds (null), length
    heap(&mut data, 0x1000, padded(&[0x2000, 0, 0, 7], 96));
    heap(&mut data, 0x2000, padded(&[0x2000], 16));
    managed_type(&mut data, "Int32[]", ARRAY | 0x0001_0000, 0x2000);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
    assert!(record.is_array);
    assert_eq!(record.array_length, 7);
    assert_eq!(record.header_size(snapshot.vm()), snapshot.vm().array_header_size);
}

#[test]
fn test_multi_rank_array_length_is_unresolved()
{
    let mut data = SnapshotData::default();
    heap(&mut data, 0x1000, padded(&[0x2000, 0, 0x1800, 7], 96));
    heap(&mut data, 0x2000, padded(&[0x2000], 16));
    managed_type(&mut data, "Int32[,]", ARRAY | 0x0002_0000, 0x2000);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
    assert!(record.is_array);
    assert_eq!(record.array_length, UNRESOLVED_ARRAY_LENGTH);
}

#[test]
fn test_four_byte_pointers()
{
    let mut data = SnapshotData::default();
    data.vm = VirtualMachineInfo {
        pointer_size: 4,
        object_header_size: 8,
        array_header_size: 16,
        array_bounds_offset_in_header: 8,
        array_size_offset_in_header: 12,
        allocation_granularity: 8,
    };
    let mut object = vec![0u8; 32];
    object[..4].copy_from_slice(&0x2000u32.to_le_bytes());
    heap(&mut data, 0x1000, object);
    let mut class = vec![0u8; 8];
    class[..4].copy_from_slice(&0x2000u32.to_le_bytes());
    heap(&mut data, 0x2000, class);
    managed_type(&mut data, "Foo", 0, 0x2000);
    data.gc_handle_targets.push(Address::from(0x1000));

    let snapshot = Snapshot::build(data, None).unwrap();
    let record = snapshot.objects().get(Address::from(0x1000)).unwrap();
    assert_eq!(type_name(&snapshot, record), Some("Foo"));
    assert_eq!(record.header_size(snapshot.vm()), 8);
    assert_eq!(snapshot.format_address(record.address), "0x00001000");
}
