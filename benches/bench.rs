use criterion::*;
use rand::prelude::*;
use skiparena::{bytes::Bytes, *};
use std::{
  sync::{atomic::*, *},
  thread,
};

fn random_key(rng: &mut ThreadRng) -> Vec<u8> {
  let mut key = vec![0; 16];
  rng.fill_bytes(&mut key);
  key
}

fn bench_put_key(c: &mut Criterion) {
  let mut rng = rand::rng();
  let mut group = c.benchmark_group("arena");
  group.throughput(Throughput::Bytes(16));
  group.bench_function("put_key", |b| {
    b.iter_batched_ref(
      || (Arena::new(1 << 20), random_key(&mut rng)),
      |(arena, key)| {
        black_box(arena.writer().put_key(&key).unwrap());
      },
      BatchSize::SmallInput,
    )
  });
  group.finish();
}

fn bench_new_node(c: &mut Criterion) {
  let arena = Arc::new(Arena::new(1 << 20));
  let head = arena.writer().put_node(MAX_HEIGHT).unwrap();
  let value = Bytes::from_static(b"00123");

  // Keep a reader walking the list while nodes are inserted.
  let stop = Arc::new(AtomicBool::new(false));
  let s = stop.clone();
  let a = arena.clone();
  let j = thread::spawn(move || {
    while !s.load(Ordering::SeqCst) {
      let guard = &skiparena::pin();
      let mut next = unsafe { a.get_element(head, guard) }
        .unwrap()
        .map_or(0, |e| e.next_offset(0));
      while next != 0 {
        let element = unsafe { a.get_element(next, guard) }.unwrap().unwrap();
        black_box(element.key().unwrap());
        next = element.next_offset(0);
        if s.load(Ordering::Relaxed) {
          break;
        }
      }
    }
  });

  let mut rng = rand::rng();
  c.bench_function("new_node", |b| {
    b.iter_batched(
      || random_key(&mut rng),
      |key| {
        let mut w = arena.writer();
        match w.new_node(&key, &value, random_height()) {
          Ok(node) => unsafe {
            let guard = &skiparena::pin();
            let first = first_node(&arena, head, guard);
            w.set_next_offset(node, 0, first).unwrap();
            w.set_next_offset(head, 0, node).unwrap();
          },
          // The arena only ever grows, long runs eventually fill it.
          Err(Error::Full { .. }) => {}
          Err(e) => panic!("{e}"),
        }
      },
      BatchSize::SmallInput,
    )
  });
  stop.store(true, Ordering::SeqCst);
  j.join().unwrap();
}

fn first_node(arena: &Arena, head: u32, guard: &Guard) -> u32 {
  unsafe { arena.get_element(head, guard) }
    .unwrap()
    .map_or(0, |e| e.next_offset(0))
}

fn bench_filter(c: &mut Criterion) {
  let keys = (0..10_000u32)
    .map(|i| hash(&i.to_le_bytes()))
    .collect::<Vec<_>>();

  c.bench_function("filter_build", |b| {
    b.iter(|| black_box(Filter::new(&keys, 10)))
  });

  let filter = Filter::new(&keys, 10);
  let mut rng = rand::rng();
  c.bench_function("filter_may_contain", |b| {
    b.iter_batched(
      || rng.random::<u32>(),
      |h| black_box(filter.may_contain(h)),
      BatchSize::SmallInput,
    )
  });
}

criterion_group!(benches, bench_put_key, bench_new_node, bench_filter);
criterion_main!(benches);
