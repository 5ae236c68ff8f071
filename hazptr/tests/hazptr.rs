use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering::*};
use std::sync::Arc;
use std::thread::scope;

use hazptr::{do_reclamation, is_protected, retire, HazardPointer, Invalidate};

struct Count {
    value: usize,
    freed: AtomicBool,
}

impl Count {
    fn boxed(value: usize) -> *mut Count {
        Box::into_raw(Box::new(Count {
            value,
            freed: AtomicBool::new(false),
        }))
    }
}

impl Invalidate for Count {
    fn invalidate(&self) {
        assert!(!self.freed.swap(true, AcqRel), "freed twice");
    }
}

#[test]
fn counter() {
    const THREADS: usize = 4;
    const ITER: usize = 1024 * 16;

    let count = AtomicPtr::new(Count::boxed(0));
    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut hp = HazardPointer::default();
                for _ in 0..ITER {
                    loop {
                        let cur = hp.protect(&count);
                        let next = Count::boxed(unsafe { (*cur).value } + 1);
                        if count.compare_exchange(cur, next, AcqRel, Acquire).is_ok() {
                            unsafe { retire(cur) };
                            break;
                        }
                        drop(unsafe { Box::from_raw(next) });
                    }
                }
            });
        }
    });

    let cur = count.load(Acquire);
    assert_eq!(unsafe { (*cur).value }, THREADS * ITER);
    unsafe { retire(cur) };
}

#[test]
fn protection_blocks_reclamation() {
    struct Tracked {
        freed: AtomicBool,
        drops: Arc<AtomicUsize>,
    }
    impl Invalidate for Tracked {
        fn invalidate(&self) {
            assert!(!self.freed.swap(true, AcqRel), "freed twice");
        }
    }
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, AcqRel);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let ptr = Box::into_raw(Box::new(Tracked {
        freed: AtomicBool::new(false),
        drops: drops.clone(),
    }));

    let mut hp = HazardPointer::default();
    hp.protect_raw(ptr);
    assert!(is_protected(ptr));

    unsafe { retire(ptr) };
    do_reclamation();
    assert_eq!(drops.load(Acquire), 0);

    hp.reset_protection();
    assert!(!is_protected(ptr));
    do_reclamation();
    assert_eq!(drops.load(Acquire), 1);
}

#[test]
fn validate_detects_swung_link() {
    let a = Count::boxed(1);
    let b = Count::boxed(2);
    let src = AtomicPtr::new(a);

    let mut hp = HazardPointer::default();
    let snapshot = src.load(Relaxed);
    src.store(b, Release);
    assert!(hp.try_protect(snapshot, &src).is_err());

    let fresh = hp.protect(&src);
    assert_eq!(fresh, b);

    unsafe { retire(a) };
    unsafe { retire(b) };
}

// Slots are recycled through the record's freelist, so repeated handle
// construction must not exhaust the fixed per-thread capacity.
#[test]
fn slots_recycled() {
    for _ in 0..1024 {
        let mut hps: Vec<HazardPointer<'_>> =
            (0..hazptr::SLOTS_PER_THREAD).map(|_| HazardPointer::default()).collect();
        for hp in &mut hps {
            hp.protect_raw(core::ptr::null_mut::<Count>());
        }
    }
}

#[test]
#[should_panic(expected = "hazard-slot capacity")]
fn slot_exhaustion_is_fatal() {
    let _hps: Vec<HazardPointer<'_>> = (0..hazptr::SLOTS_PER_THREAD + 1)
        .map(|_| HazardPointer::default())
        .collect();
}
