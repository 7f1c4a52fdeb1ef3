//! # PKI Platform CMP Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | MAC | PasswordBasedMac and PBMAC1 over increasing iteration counts |
//! | Signature | Protection verification per key type |
//! | Engine | Full ir → ip through `process_der` and the runtime |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use der::Encode;
use std::sync::Arc;
use std::time::Duration;

use pki_cmp::domain::mac::{PbmParameter, Pbmac1Params};
use pki_cmp::domain::validators::SignatureProtectionValidator;
use pki_cmp::test_utils::{cert_req_msg, protected_request, signature_context};
use pki_cmp::{CmpMessageApi, CmpService, InMemoryCa, PkiBody, SigningCredential, StaticContextProvider};
use pki_runtime::{CmpRuntime, RuntimeConfig};

const SALT: &[u8] = b"0123456789abcdef";
const SECRET: &[u8] = b"benchmark shared secret";

// ============================================================================
// MAC protection
// ============================================================================

fn bench_mac_protection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cmp-mac-protection");
    group.measurement_time(Duration::from_secs(10));

    let data = vec![0x5a_u8; 512];

    for iterations in [1_000u32, 10_000] {
        let pbm = PbmParameter::new(SALT, iterations).expect("PBM parameters");
        let pbmac1 = Pbmac1Params::new(SALT, iterations).expect("PBMAC1 parameters");

        group.bench_with_input(BenchmarkId::new("pbm", iterations), &iterations, |b, _| {
            b.iter(|| black_box(pbm.compute(SECRET, &data)))
        });
        group.bench_with_input(BenchmarkId::new("pbmac1", iterations), &iterations, |b, _| {
            b.iter(|| black_box(pbmac1.compute(SECRET, &data)))
        });
    }

    group.finish();
}

// ============================================================================
// Signature protection
// ============================================================================

fn bench_signature_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cmp-signature-validation");

    let keys = [
        ("p256", SigningCredential::generate_p256()),
        ("secp256k1", SigningCredential::generate_k256()),
        ("ed25519", SigningCredential::generate_ed25519()),
    ];

    for (label, key) in &keys {
        let message = protected_request(key, PkiBody::Ir(vec![cert_req_msg(key, "device", 0)]));
        let validator = SignatureProtectionValidator::new();

        group.bench_function(*label, |b| b.iter(|| black_box(validator.validate(&message).is_ok())));
    }

    group.finish();
}

// ============================================================================
// Engine
// ============================================================================

fn bench_process_der(c: &mut Criterion) {
    let mut group = c.benchmark_group("cmp-engine");
    group.measurement_time(Duration::from_secs(10));

    let ca = Arc::new(InMemoryCa::generate("CN=Benchmark CA").expect("CA generation"));
    let (context, _) = signature_context("default");
    let mut profiles = StaticContextProvider::new();
    profiles.insert(context);
    let service = CmpService::new(profiles, ca);

    let device = SigningCredential::generate_p256();
    let request = protected_request(&device, PkiBody::Ir(vec![cert_req_msg(&device, "device", 0)]))
        .to_der()
        .expect("request encoding");

    group.bench_function("ir_to_ip", |b| {
        b.iter(|| black_box(service.process_der("default", &request).is_ok()))
    });

    for size in [8usize, 32] {
        let batch = vec![request.clone(); size];

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("batch", size), &batch, |b, batch| {
            b.iter(|| black_box(service.process_batch("default", batch).len()))
        });
    }

    let runtime = CmpRuntime::new(&RuntimeConfig::default()).expect("runtime");
    group.bench_function("runtime_ir_to_ip", |b| {
        b.iter(|| black_box(runtime.process(&request).is_ok()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mac_protection,
    bench_signature_validation,
    bench_process_der
);
criterion_main!(benches);
