use super::*;

fn key(i: usize) -> Vec<u8> {
  (i as u32).to_le_bytes().to_vec()
}

fn hashes(n: usize) -> Vec<u32> {
  (0..n).map(|i| hash(&key(i))).collect()
}

#[test]
fn test_empty_filter() {
  let f = Filter::new(&[], 10);
  assert_eq!(f.as_bytes(), &[0, 0, 0, 0, 0, 0, 0, 0, 7]);
  assert_eq!(f.bits(), MIN_BITS);
  assert!(!f.may_contain_key(b"hello"));
  assert!(!f.may_contain_key(b"world"));
}

#[test]
fn test_small() {
  let f = Filter::new(&[hash(b"a"), hash(b"b"), hash(b"c")], 10);
  assert!(f.may_contain(hash(b"a")));
  assert!(f.may_contain(hash(b"b")));
  assert!(f.may_contain(hash(b"c")));

  // Absent keys may or may not match, but the answer is stable.
  let z = f.may_contain(hash(b"z"));
  assert_eq!(z, f.may_contain(hash(b"z")));
  let copy = Filter::from_bytes(f.as_bytes().to_vec()).unwrap();
  assert_eq!(z, copy.may_contain(hash(b"z")));
}

#[test]
fn test_probe_count() {
  assert_eq!(Filter::new(&hashes(10), -5).k(), 1);
  assert_eq!(Filter::new(&hashes(10), 0).k(), 1);
  assert_eq!(Filter::new(&hashes(10), 1).k(), 1);
  assert_eq!(Filter::new(&hashes(10), 10).k(), 7);
  assert_eq!(Filter::new(&hashes(10), 20).k(), 14);
  assert_eq!(Filter::new(&hashes(10), 100).k(), MAX_PROBES);

  for bits_per_key in -2..64 {
    let k = Filter::new(&hashes(3), bits_per_key).k();
    assert!((1..=MAX_PROBES).contains(&k));
  }
}

#[test]
fn test_filter_size() {
  // Tiny sets still get the minimum bit array.
  assert_eq!(Filter::new(&hashes(1), 10).bits(), MIN_BITS);
  assert_eq!(Filter::new(&hashes(6), 0).as_bytes().len(), MIN_BITS / 8 + 1);

  // 10 keys at 10 bits per key need 100 bits, rounded up to whole bytes.
  assert_eq!(Filter::new(&hashes(10), 10).as_bytes().len(), 13 + 1);
  assert_eq!(Filter::new(&hashes(1000), 10).bits(), 10_000);
}

#[test]
fn test_no_false_negatives() {
  let mut mediocre = 0;
  let mut good = 0;

  let mut length = 1;
  while length <= 10_000 {
    let keys = hashes(length);
    let f = Filter::new(&keys, 10);
    assert!(f.as_bytes().len() <= (length * 10 / 8) + 40, "length = {length}");

    for (i, &h) in keys.iter().enumerate() {
      assert!(f.may_contain(h), "length = {length}, key = {i}");
    }

    let false_positives = (0..10_000)
      .filter(|i| f.may_contain_key(&key(i + 1_000_000_000)))
      .count();
    let rate = false_positives as f64 / 10_000.0;
    assert!(rate <= 0.03, "length = {length}, rate = {rate}");
    if rate > 0.0125 {
      mediocre += 1;
    } else {
      good += 1;
    }

    length = if length < 10 {
      length + 1
    } else if length < 100 {
      length + 10
    } else if length < 1000 {
      length + 100
    } else {
      length + 1000
    };
  }

  assert!(mediocre * 5 <= good, "mediocre = {mediocre}, good = {good}");
}

#[test]
fn test_bits_per_key() {
  assert_eq!(bloom_bits_per_key(1, 0.01), 10);
  assert_eq!(bloom_bits_per_key(1_000_000, 0.01), 10);

  let rates = [0.0001, 0.001, 0.01, 0.1, 0.5];
  let bits = rates.map(|fp| bloom_bits_per_key(100, fp));
  assert_eq!(bits, [20, 15, 10, 5, 2]);
  for pair in bits.windows(2) {
    assert!(pair[0] > pair[1]);
  }
}

#[test]
fn test_append_filter() {
  let keys = hashes(100);
  let mut dst = b"prefix".to_vec();
  append_filter(&mut dst, &keys, 10);

  assert_eq!(&dst[..6], b"prefix");
  let f = Filter::from_bytes(dst[6..].to_vec()).unwrap();
  assert_eq!(f, Filter::new(&keys, 10));
  assert!(keys.iter().all(|&h| f.may_contain(h)));
}

#[test]
fn test_malformed() {
  assert_eq!(Filter::from_bytes(Vec::new()).unwrap_err(), Error::InvalidFilter(0));

  // Only the probe count, no bits at all.
  let f = Filter::from_bytes(vec![7]).unwrap();
  assert!(!f.may_contain_key(b"a"));

  // Unknown encodings always match.
  let f = Filter::from_bytes(vec![0, 0, 0, 0, 0, 0, 0, 0, MAX_PROBES + 1]).unwrap();
  assert!(f.may_contain_key(b"a"));
}

#[test]
fn test_persist() {
  use std::io::{Read, Seek, SeekFrom, Write};

  let keys = hashes(500);
  let f = Filter::new(&keys, 10);

  let mut file = tempfile::tempfile().unwrap();
  file.write_all(f.as_bytes()).unwrap();
  file.seek(SeekFrom::Start(0)).unwrap();
  let mut buf = Vec::new();
  file.read_to_end(&mut buf).unwrap();

  let read = Filter::from_bytes(buf).unwrap();
  assert_eq!(read, f);
  assert!(keys.iter().all(|&h| read.may_contain(h)));
}
