use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fieldvault::audit::AuditTrail;
use fieldvault::kms::{KeyProviderClient, LocalKms};
use fieldvault::{EncryptionContext, EnvelopeCodec};

fn benchmark_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    let kms = LocalKms::with_master_key("bench-mk").unwrap();
    let codec = EnvelopeCodec::new(KeyProviderClient::new(kms, "bench-mk"), AuditTrail::new());
    let ctx =
        EncryptionContext::new("bench-user", "financial_accounts", "account_number_encrypted");

    let sizes = [("16B", 16), ("1KB", 1024), ("64KB", 64 * 1024)];

    for (name, size) in sizes {
        let value = "x".repeat(size);
        let wire = codec.encrypt_field(&value, &ctx).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt", name), &value, |b, value| {
            b.iter(|| codec.encrypt_field(black_box(value), black_box(&ctx)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decrypt", name), &wire, |b, wire| {
            b.iter(|| codec.decrypt_field(black_box(wire), black_box(&ctx)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_envelope);
criterion_main!(benches);
