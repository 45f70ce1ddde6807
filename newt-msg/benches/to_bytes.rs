use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use bench_input::TestInput;
use newt_msg::TryIntoBytes;

fn message_to_bytes(c: &mut Criterion) {
  let mut group = c.benchmark_group("msg/to_bytes");
  group.measurement_time(std::time::Duration::from_secs(5));

  for inp in TestInput::inputs().iter() {
    let bytes = inp.get_bytes();

    group.bench_with_input(BenchmarkId::new("newt_msg/vec/size", bytes.len()),
                           inp,
                           |b, inp| {
                             b.iter_batched(|| inp.get_message(),
                                            |m| m.try_into_bytes().unwrap(),
                                            BatchSize::SmallInput)
                           });

    let mut buf = vec![0u8; bytes.len()];
    let msg = inp.get_message();
    group.bench_with_input(BenchmarkId::new("newt_msg/slice/size", bytes.len()),
                           &msg,
                           |b, msg| b.iter(|| msg.try_write_bytes(&mut buf).unwrap()));

    let cl_packet = inp.get_coap_lite_packet();
    group.bench_with_input(BenchmarkId::new("coap_lite/size", bytes.len()),
                           &cl_packet,
                           |b, inp| b.iter(|| inp.to_bytes()));
  }
  group.finish();
}

criterion_group!(benches, message_to_bytes);
criterion_main!(benches);
