use parsekit::arena::Arena;

#[test]
fn early_allocations_survive_growth() {
    let mut arena = Arena::new();

    let initial: Vec<_> = (0..2000).map(|i| arena.alloc((i % 128) as u8)).collect();
    for (i, &id) in initial.iter().enumerate() {
        assert_eq!(arena[id], (i % 128) as u8);
    }
    let first_addr = &arena[initial[0]] as *const u8 as usize;

    // Grow by 64 KiB in 500 steps and make sure nothing moved.
    let steps = 500;
    let step_len = (1usize << 16) / steps;
    let mut middle = Vec::new();
    for step in 0..steps {
        let ids: Vec<_> = (0..step_len).map(|i| arena.alloc((i % 128) as u8)).collect();
        if step == steps / 2 {
            middle = ids;
        }
    }

    assert!(!middle.is_empty());
    for (i, &id) in middle.iter().enumerate() {
        assert_eq!(arena[id], (i % 128) as u8);
    }
    for (i, &id) in initial.iter().enumerate() {
        assert_eq!(arena[id], (i % 128) as u8);
    }
    assert_eq!(&arena[initial[0]] as *const u8 as usize, first_addr);
}

#[test]
fn len_counts_across_chunks() {
    let mut arena = Arena::new();
    assert!(arena.is_empty());
    let ids: Vec<_> = (0..3000u32).map(|i| arena.alloc(i)).collect();
    assert_eq!(arena.len(), 3000);
    assert_eq!(arena[ids[2999]], 2999);
    assert_eq!(arena.get(ids[0]).copied(), Some(0));
}
