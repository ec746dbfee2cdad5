use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Barrier,
    },
    thread::{self, scope, sleep},
    time::Duration,
};

use cachemap::{sync::Cache, ConstantHasher, Fnv1aHasher, Maybe};
use crossbeam_channel::bounded;

fn string_cache() -> Cache<String, String, Fnv1aHasher> {
    Cache::builder_with_key_hasher(10_000, Fnv1aHasher)
        .empty_value(String::new())
        .build()
        .expect("Failed to build")
}

#[test]
fn no_block_disjoint() {
    let cache = &Cache::<u32, u32>::new(64);

    scope(|s| {
        // T1 blocks while inserting 1.
        let (t1_quit_sender, t1_quit_receiver) = bounded(0);
        s.spawn(move || {
            cache.get_with(1, || {
                // block T1
                t1_quit_receiver.recv().unwrap();
                1
            });
        });

        // T2 must not be blocked by T1 when inserting 2.
        let (t2_done_sender, t2_done_receiver) = bounded(0);
        s.spawn(move || {
            cache.get_with(2, || 2);
            t2_done_sender.send(()).unwrap();
        });

        // If T2 is blocked, then this will time out.
        t2_done_receiver
            .recv_timeout(Duration::from_secs(3))
            .expect("Inserting a different key should not block");

        // clean up
        t1_quit_sender.send(()).unwrap();
    });

    assert_eq!(cache.size(), 2);
}

#[test]
fn no_block_disjoint_in_same_bucket() {
    let cache = &Cache::builder_with_key_hasher(64, ConstantHasher)
        .empty_value(0u32)
        .build()
        .expect("Failed to build");

    scope(|s| {
        let (t1_quit_sender, t1_quit_receiver) = bounded(0);
        s.spawn(move || {
            cache.get_with(1, || {
                t1_quit_receiver.recv().unwrap();
                1
            });
        });

        // Both keys share bucket 0. The bucket lock is not held while T1 computes.
        let (t2_done_sender, t2_done_receiver) = bounded(0);
        s.spawn(move || {
            cache.get_with(2, || 2);
            t2_done_sender.send(()).unwrap();
        });

        t2_done_receiver
            .recv_timeout(Duration::from_secs(3))
            .expect("Inserting a different key should not block");

        t1_quit_sender.send(()).unwrap();
    });

    assert_eq!(cache.get(&1), Maybe::Present(1));
    assert_eq!(cache.get(&2), Maybe::Present(2));
}

#[test]
fn no_reader_block() {
    let cache = &Cache::<u32, u32>::new(64);

    scope(|s| {
        let (t1_quit_sender, t1_quit_receiver) = bounded(0);
        let (t3_done_sender, t3_done_receiver) = bounded(0);

        // T1 blocks while inserting 1.
        s.spawn(move || {
            cache.get_with(1, || {
                // T2 is blocked by T1 when reading 1
                s.spawn(move || cache.get_with(1, || panic!()));

                // T3 should not be blocked when inserting 3.
                s.spawn(move || {
                    cache.get_with(3, || 3);
                    t3_done_sender.send(()).unwrap();
                });

                // block T1
                t1_quit_receiver.recv().unwrap();
                1
            });
        });

        // If T3 is blocked, then this will time out.
        t3_done_receiver
            .recv_timeout(Duration::from_secs(3))
            .expect("Inserting a different key should not block");

        // clean up
        t1_quit_sender.send(()).unwrap();
    });

    assert_eq!(cache.size(), 2);
}

#[test]
fn get_blocks_until_ready() {
    let cache = &string_cache();

    scope(|s| {
        let (t1_started_sender, t1_started_receiver) = bounded(0);
        let (t1_quit_sender, t1_quit_receiver) = bounded(0);

        s.spawn(move || {
            cache.get_with("a".to_string(), || {
                t1_started_sender.send(()).unwrap();
                t1_quit_receiver.recv().unwrap();
                "abc".to_string()
            });
        });

        t1_started_receiver.recv().unwrap();
        // The entry exists but its value is being computed.
        assert!(!cache.contains_key(&"a".to_string()));
        assert_eq!(cache.size(), 1);

        let reader = s.spawn(move || cache.get(&"a".to_string()));

        sleep(Duration::from_millis(100));
        assert!(!reader.is_finished());

        t1_quit_sender.send(()).unwrap();
        assert_eq!(
            reader.join().expect("Failed to join"),
            Maybe::Present("abc".to_string())
        );
    });
}

// Thread `fast` computes key K with a short delay. Thread `slow` computes key
// K + 1 with a long delay. While `slow` is still running, the value of K must be
// readable.
#[test]
fn two_gets_can_happen_simultaneously() {
    for i in (0..10).step_by(2) {
        let cache = &string_cache();

        scope(|s| {
            let slow = s.spawn(move || {
                let key = (i + 1).to_string();
                cache.get_with(key.clone(), || {
                    sleep(Duration::from_millis(1_000));
                    key
                })
            });

            let fast = s.spawn(move || {
                let key = i.to_string();
                cache.get_with(key.clone(), || {
                    sleep(Duration::from_micros(500));
                    key
                })
            });

            sleep(Duration::from_millis(300));

            assert!(!slow.is_finished());
            assert_eq!(cache.get(&i.to_string()), Maybe::Present(i.to_string()));

            assert_eq!(fast.join().expect("Failed to join"), i.to_string());
            assert_eq!(slow.join().expect("Failed to join"), (i + 1).to_string());
        });

        assert_eq!(cache.get(&i.to_string()).into_value(), i.to_string());
        assert_eq!(cache.size(), 2);
    }
}

#[test]
fn failed_init_releases_waiters() -> anyhow::Result<()> {
    const NUM_WAITERS: usize = 4;

    let cache = &Cache::<u32, u32>::new(16);
    let num_compute = &AtomicUsize::new(0);
    let barrier = &Barrier::new(NUM_WAITERS);

    scope(|s| -> anyhow::Result<()> {
        let (started_sender, started_receiver) = bounded(0);
        let (fail_sender, fail_receiver) = bounded::<()>(0);

        let failing = s.spawn(move || {
            cache.try_get_with(7, || {
                started_sender.send(()).unwrap();
                fail_receiver.recv().unwrap();
                Err(anyhow::anyhow!("backend is unavailable"))
            })
        });
        started_receiver.recv()?;

        let waiters: Vec<_> = (0..NUM_WAITERS)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    cache.get_with(7, || {
                        num_compute.fetch_add(1, Ordering::AcqRel);
                        70
                    })
                })
            })
            .collect();

        sleep(Duration::from_millis(100));
        fail_sender.send(())?;

        let err = failing
            .join()
            .expect("Failed to join")
            .expect_err("init should have failed");
        assert_eq!(err.to_string(), "backend is unavailable");

        for w in waiters {
            assert_eq!(w.join().expect("Failed to join"), 70);
        }
        Ok(())
    })?;

    // Exactly one waiter took over the computation.
    assert_eq!(num_compute.load(Ordering::Acquire), 1);
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get(&7), Maybe::Present(70));
    Ok(())
}

#[test]
fn panicked_init_releases_the_key() {
    let cache = Cache::<u32, &'static str>::new(16);

    let result = {
        let cache = cache.clone();
        thread::spawn(move || cache.get_with(1, || panic!("oops"))).join()
    };
    assert!(result.is_err());

    assert_eq!(cache.size(), 0);
    assert_eq!(cache.get(&1), Maybe::Absent(""));
    assert_eq!(cache.get_with(1, || "one"), "one");
    assert_eq!(cache.size(), 1);
}
