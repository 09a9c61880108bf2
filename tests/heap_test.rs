//! End to end behaviour of the script heap through its public API
use std::cell::Cell;

use scriptheap::{
    heap::{
        create_detached_block, create_free_block, FaultBits, HeapAddress, HeapSettings,
        HeapState, Register, Registers, ScriptHeap, ScriptMemory,
    },
    ops::{
        append_to_list, compare_lists, concat_lists, concat_strings, prepend_to_list, shuffle,
        RandomIndex, SplitMix64,
    },
    Quaternion, Value,
};

fn memory() -> ScriptMemory {
    ScriptMemory::new(&HeapSettings::default()).unwrap()
}

fn ints(xs: &[i32]) -> Vec<Value> {
    xs.iter().copied().map(Value::Integer).collect()
}

/// Registers held by the host outside script memory
#[derive(Default)]
struct HostRegisters {
    hr: Cell<i32>,
    hp: Cell<i32>,
    fr: Cell<i32>,
}

impl HostRegisters {
    fn cell(&self, register: Register) -> &Cell<i32> {
        match register {
            Register::HeapBase => &self.hr,
            Register::HeapPointer => &self.hp,
            Register::Fault => &self.fr,
        }
    }
}

impl Registers for &HostRegisters {
    fn get(&self, _buffer: &[u8], register: Register) -> i32 {
        self.cell(register).get()
    }

    fn set(&self, _buffer: &mut [u8], register: Register, value: i32) {
        self.cell(register).set(value)
    }
}

#[test]
pub fn test_scalar_round_trips() {
    let mut mem = memory();
    let mut heap = mem.heap();
    for value in [
        Value::Integer(i32::MIN),
        Value::Float(f32::INFINITY),
        Value::str(""),
        Value::str("naïve"),
        Value::key("00000000-0000-0000-0000-000000000000"),
        Value::vector(0.1, 0.2, 0.3),
        Value::Quaternion(Quaternion::default()),
    ] {
        let address = heap.allocate(&value);
        assert_eq!(heap.read(address), Some(value));
    }
    assert!(!heap.is_poisoned());
}

#[test]
pub fn test_nan_round_trips_bit_exact() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let nan = f32::from_bits(0x7fc0_1234);
    let address = heap.allocate(&Value::Float(nan));
    match heap.read(address) {
        Some(Value::Float(x)) => assert_eq!(x.to_bits(), 0x7fc0_1234),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
pub fn test_list_round_trip() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let list = Value::List(vec![1.into(), "foo".into(), Value::vector(1.0, 2.0, 3.0)]);
    let address = heap.allocate(&list);
    assert_eq!(heap.read(address), Some(list));
}

#[test]
pub fn test_read_after_free_faults() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let address = heap.allocate(&Value::str("gone"));
    heap.decrease_ref_count(address);
    assert_eq!(heap.read(address), None);
    assert_eq!(heap.state(), HeapState::Poisoned(FaultBits::HEAP_ERROR));
}

#[test]
pub fn test_cascading_free() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let list = heap.allocate(&Value::List(ints(&[1, 2, 3])));
    heap.decrease_ref_count(list);

    // the list and each child are free, everything else is the tail
    let entries: Vec<_> = heap.entries().collect();
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|(_, header)| header.is_free()));
    assert!(!heap.is_poisoned());
}

#[test]
pub fn test_concat_strings() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let a = heap.allocate(&Value::str("abc"));
    let b = heap.allocate(&Value::str("def"));
    let c = concat_strings(&mut heap, a, b);
    assert_eq!(heap.read(c), Some(Value::str("abcdef")));

    // the merged operand slots held the result, nothing else is live
    assert_eq!(c, a);
    assert_eq!(heap.stats().used_entries, 1);
}

#[test]
pub fn test_concat_strings_frees_separated_operands() {
    let mut mem = memory();
    let mut heap = mem.heap();
    let a = heap.allocate(&Value::str("abc"));
    let guard = heap.allocate(&Value::Integer(1));
    let b = heap.allocate(&Value::str("def"));
    let other = heap.allocate(&Value::Integer(2));

    let c = concat_strings(&mut heap, a, b);
    assert_eq!(heap.read(c), Some(Value::str("abcdef")));
    assert!(heap.entry(a).unwrap().is_free());
    assert!(heap.entry(b).unwrap().is_free());
    assert!(!heap.entry(guard).unwrap().is_free());
    assert!(!heap.entry(other).unwrap().is_free());
}

#[test]
pub fn test_repeated_alloc_free_never_collides() {
    let settings = HeapSettings {
        memory_size: 1024,
        heap_base: 16,
        stack_reserve: 256,
    };
    let mut mem = ScriptMemory::new(&settings).unwrap();
    let mut heap = mem.heap();
    let values = [
        Value::Integer(1),
        Value::str("a string of moderate length"),
        Value::List(ints(&[1, 2, 3, 4])),
        Value::Quaternion(Quaternion::default()),
    ];

    for i in 0..10_000 {
        let address = heap.allocate(&values[i % values.len()]);
        assert!(!address.is_null(), "collision on iteration {i}");
        heap.decrease_ref_count(address);
    }
    assert!(!heap.is_poisoned());
}

#[test]
pub fn test_nesting_rejected_without_writes() {
    let mut mem = memory();
    mem.heap().allocate(&Value::Integer(1));
    let before = mem.heap_region().to_vec();

    let nested = Value::List(vec![Value::List(ints(&[1]))]);
    assert!(mem.heap().allocate(&nested).is_null());
    assert_eq!(mem.heap_region(), &before[..]);
    assert_eq!(
        mem.heap().state(),
        HeapState::Poisoned(FaultBits::NESTING_LISTS)
    );
}

#[test]
pub fn test_shuffle_respects_stride() {
    let mut rng = SplitMix64::new(2024);
    assert_eq!(shuffle(ints(&[1, 2, 3, 4, 5]), 2, &mut rng), ints(&[1, 2, 3, 4, 5]));

    for _ in 0..20 {
        let shuffled = shuffle(ints(&[1, 2, 3, 4]), 2, &mut rng);
        assert!(shuffled == ints(&[1, 2, 3, 4]) || shuffled == ints(&[3, 4, 1, 2]));
    }
}

/// Always picks the first bucket
struct First;

impl RandomIndex for First {
    fn index(&mut self, _bound: usize) -> usize {
        0
    }
}

#[test]
pub fn test_shuffle_uses_supplied_source() {
    // swapping each bucket with the first rotates the tuples
    let shuffled = shuffle(ints(&[1, 2, 3, 4, 5, 6]), 2, &mut First);
    assert_eq!(shuffled, ints(&[3, 4, 5, 6, 1, 2]));
}

#[test]
pub fn test_fail_soft_after_fault() {
    let mut mem = memory();
    let address = {
        let mut heap = mem.heap();
        let address = heap.allocate(&Value::List(ints(&[7, 8])));
        heap.increase_ref_count(HeapAddress::from_raw(-40));
        assert_eq!(heap.state(), HeapState::Poisoned(FaultBits::BOUND_CHECK_ERROR));
        address
    };
    let before = mem.bytes().to_vec();

    let mut heap = mem.heap();
    for _ in 0..10 {
        assert!(heap.allocate(&Value::Integer(3)).is_null());
        assert_eq!(heap.read(address), None);
        assert_eq!(heap.consume(address), None);
        heap.decrease_ref_count(address);
        heap.increase_ref_count(address);
        assert_eq!(heap.list_elements(address, true), None);
        assert!(concat_lists(&mut heap, address, address).is_null());
        assert_eq!(compare_lists(&mut heap, address, address), 0);
        assert!(prepend_to_list(&mut heap, &ints(&[1]), address).is_null());
        assert!(append_to_list(&mut heap, address, &ints(&[1])).is_null());
        assert!(!heap.create_heap());
    }
    drop(heap);
    assert_eq!(mem.bytes(), &before[..]);
}

#[test]
pub fn test_only_first_fault_recorded() {
    let mut mem = memory();
    let mut heap = mem.heap();
    heap.allocate(&Value::List(vec![Value::List(vec![])]));
    heap.increase_ref_count(HeapAddress::from_raw(99_999));
    assert_eq!(
        heap.register(Register::Fault),
        FaultBits::NESTING_LISTS.bits()
    );
}

#[test]
pub fn test_host_held_registers() {
    let regs = HostRegisters::default();
    regs.hr.set(0);
    let mut buffer = vec![0u8; 512];
    let mut heap = ScriptHeap::new(&mut buffer, &regs, 256);
    assert!(heap.create_heap());

    let address = heap.allocate(&Value::str("outside"));
    assert_eq!(address.raw(), 1);
    assert_eq!(heap.read(address), Some(Value::str("outside")));
    assert_eq!(regs.hp.get(), 8 + 2 * 7);
    assert_eq!(regs.fr.get(), 0);

    heap.decrease_ref_count(HeapAddress::from_raw(300));
    assert_eq!(regs.fr.get(), FaultBits::BOUND_CHECK_ERROR.bits());
    assert_eq!(regs.hp.get(), 512);
}

#[test]
pub fn test_detached_block_matches_heap_layout() {
    // a list allocated first into a fresh heap lands exactly where a
    // block built for offset 0 says it will
    let list = Value::List(vec![Value::str("x"), Value::Integer(5)]);
    let mut image = create_detached_block(&list, 0).unwrap();

    let mut mem = memory();
    let rest = mem.heap_size() - image.len() - 7;
    image.extend(create_free_block(rest).unwrap());

    mem.heap().allocate(&list);
    assert_eq!(&mem.heap_region()[..image.len()], &image[..]);
}

#[test]
pub fn test_nul_in_text_rejected_without_writes() {
    let mut mem = memory();
    let kept = mem.heap().allocate(&Value::str("kept"));
    let before = mem.heap_region().to_vec();

    assert!(mem.heap().allocate(&Value::str("cut\0short")).is_null());
    assert_eq!(mem.heap_region(), &before[..]);
    assert_eq!(mem.heap().state(), HeapState::Poisoned(FaultBits::HEAP_ERROR));
    assert_eq!(mem.heap().entry(kept).unwrap().ref_count, 1);
}

#[test]
pub fn test_heap_top_and_stats_agree() {
    let mut mem = memory();
    let mut heap = mem.heap();
    heap.allocate(&Value::str("one"));
    heap.allocate(&Value::List(ints(&[1, 2])));
    let stats = heap.stats();
    assert_eq!(heap.heap_top(usize::MAX), stats.total_bytes());
    assert_eq!(stats.used_entries, 4);
}
