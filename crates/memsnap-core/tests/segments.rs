//! Tests for segment store lookup

use memsnap_core::segments::SegmentStore;
use memsnap_core::types::{Address, MemorySegment, SegmentKind};

fn heap(start: u64, len: usize) -> MemorySegment
{
    MemorySegment::new(Address::from(start), vec![0; len], SegmentKind::Heap)
}

fn start_of(store: &SegmentStore, address: u64) -> Option<u64>
{
    store.find(Address::from(address)).map(|segment| segment.start.value())
}

#[test]
fn test_reverse_insertion_lookup()
{
    let store = SegmentStore::new(vec![heap(0x200, 8), heap(0x100, 16)], Vec::new());

    assert_eq!(start_of(&store, 0x204), Some(0x200));
    assert_eq!(start_of(&store, 0x050), None);
    assert_eq!(start_of(&store, 0x110), Some(0x100));
}

#[test]
fn test_containment_is_inclusive()
{
    let store = SegmentStore::new(vec![heap(0x1000, 64)], Vec::new());

    for address in 0x1000..=0x1040 {
        assert_eq!(start_of(&store, address), Some(0x1000), "address {address:#x}");
    }
    assert_eq!(start_of(&store, 0x0fff), None);
    assert_eq!(start_of(&store, 0x1041), None);
}

#[test]
fn test_lookup_is_order_independent()
{
    let segments = [heap(0x100, 16), heap(0x200, 8), heap(0x300, 32), heap(0x800, 1)];
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    let lookups: Vec<u64> = (0..0x900).step_by(3).collect();

    let results: Vec<Vec<Option<u64>>> = orders
        .iter()
        .map(|order| {
            let (heap_part, stack_part) = order.split_at(2);
            let store = SegmentStore::new(
                heap_part.iter().map(|&i| segments[i].clone()).collect(),
                stack_part.iter().map(|&i| segments[i].clone()).collect(),
            );
            lookups.iter().map(|&address| start_of(&store, address)).collect()
        })
        .collect();

    for result in &results[1..] {
        assert_eq!(result, &results[0]);
    }
}

#[test]
fn test_stack_segments_are_searched()
{
    let stack = vec![MemorySegment::new(Address::from(0x7000), vec![0; 32], SegmentKind::Stack)];
    let store = SegmentStore::new(vec![heap(0x1000, 16)], stack);

    let segment = store.find(Address::from(0x7010)).unwrap();
    assert_eq!(segment.kind, SegmentKind::Stack);
    assert_eq!(store.len(), 2);
}
