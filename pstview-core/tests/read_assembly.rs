use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use pstview_core::{MemoryBlockSource, RandomAccessReader};

fn source_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

/// (source length, unit size, position, length) with the read inside the source.
fn read_case() -> impl Strategy<Value = (usize, usize, u64, usize)> {
    (1usize..4096, 1usize..600).prop_flat_map(|(len, unit)| {
        (0..len).prop_flat_map(move |pos| {
            (Just(len), Just(unit), Just(pos as u64), 0..=(len - pos))
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn read_returns_exactly_the_source_bytes(case in read_case(), pad in 0usize..16) {
        let (len, unit, pos, n) = case;
        let data = source_bytes(len);
        let reader = RandomAccessReader::new(Arc::new(MemoryBlockSource::new(data.clone())), unit).unwrap();
        let mut dest = vec![0xEEu8; pad + n + pad];
        let copied = block_on(reader.read(&mut dest, pad, n, pos)).unwrap();

        prop_assert_eq!(copied, n);
        prop_assert_eq!(&dest[pad..pad + n], &data[pos as usize..pos as usize + n]);
        prop_assert!(dest[..pad].iter().all(|b| *b == 0xEE));
        prop_assert!(dest[pad + n..].iter().all(|b| *b == 0xEE));
    }

    #[test]
    fn each_block_is_fetched_once_on_aligned_ranges(
        len in 1usize..4096,
        unit in 1usize..600,
        reads in proptest::collection::vec((0usize..4096, 0usize..700), 1..12),
    ) {
        let src = MemoryBlockSource::new(source_bytes(len));
        let reader = RandomAccessReader::new(Arc::new(src.clone()), unit).unwrap();
        block_on(async {
            for (pos, n) in &reads {
                let pos = pos % len;
                let n = (*n).min(len - pos);
                let mut buf = vec![0u8; n];
                reader.read_at(&mut buf, pos as u64).await.unwrap();
            }
        });

        let fetches = src.fetches();
        let mut starts = HashSet::new();
        for range in &fetches {
            prop_assert_eq!(range.start % unit as u64, 0);
            prop_assert_eq!(range.end - range.start, unit as u64);
            prop_assert!(starts.insert(range.start), "block at {} fetched twice", range.start);
        }
        prop_assert_eq!(reader.stats().fetches, fetches.len() as u64);
    }
}

#[tokio::test]
async fn zero_length_read_touches_nothing() {
    let src = MemoryBlockSource::new(source_bytes(100));
    let reader = RandomAccessReader::new(Arc::new(src.clone()), 10).unwrap();
    let mut buf = [0u8; 0];
    assert_eq!(reader.read(&mut buf, 0, 0, 50).await.unwrap(), 0);
    assert!(src.fetches().is_empty());
}

#[tokio::test]
async fn concurrent_readers_of_one_block_share_a_fetch() {
    let src = MemoryBlockSource::new(source_bytes(1000)).with_latency(std::time::Duration::from_millis(20));
    let reader = Arc::new(RandomAccessReader::new(Arc::new(src.clone()), 512).unwrap());

    let mut tasks = Vec::new();
    for i in 0..8u64 {
        let reader = reader.clone();
        tasks.push(tokio::spawn(async move {
            let mut buf = [0u8; 16];
            reader.read_at(&mut buf, i * 16).await.unwrap();
            buf
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let buf = task.await.unwrap();
        assert_eq!(buf.to_vec(), source_bytes(1000)[i * 16..i * 16 + 16].to_vec());
    }
    assert_eq!(src.fetches(), vec![0..512]);
}
